use clap::{App, Arg, ArgMatches, SubCommand};
use env_logger::Env;
use log::error;
use posthorn::build::build_site;
use posthorn::collection::Collection;
use posthorn::config::Config;
use posthorn::feed::format_pub_date;
use std::error::Error;
use std::path::Path;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let source_arg = Arg::with_name("source")
        .long("source")
        .short("s")
        .takes_value(true)
        .help("A directory inside the site (defaults to the current directory)");
    let matches = App::new("posthorn")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a blog and project portfolio into a static site")
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site")
                .arg(source_arg.clone())
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .help("The output directory (defaults to `_site` in the site root)"),
                ),
        )
        .subcommand(
            SubCommand::with_name("posts")
                .about("Lists the site's posts, most recent first")
                .arg(source_arg),
        )
        .get_matches();

    let result = match matches.subcommand() {
        ("build", Some(m)) => build(m),
        ("posts", Some(m)) => posts(m),
        _ => {
            eprintln!("{}", matches.usage());
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        let mut source = e.source();
        while let Some(err) = source {
            error!("  caused by: {}", err);
            source = err.source();
        }
        std::process::exit(1);
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let source = Path::new(matches.value_of("source").unwrap_or("."));
    Ok(Config::from_directory(
        source,
        matches.value_of("output").map(Path::new),
    )?)
}

fn build(matches: &ArgMatches) -> Result<()> {
    let summary = build_site(&load_config(matches)?)?;
    if !summary.failed_steps.is_empty() {
        error!("failed asset steps: {}", summary.failed_steps.join(", "));
    }
    Ok(())
}

fn posts(matches: &ArgMatches) -> Result<()> {
    let collection = Collection::load(&load_config(matches)?)?;
    for post in &collection.posts {
        let date = if post.is_dated() {
            format_pub_date(&post.published)
        } else {
            "undated".to_owned()
        };
        println!("{}\t{}\t{}", post.slug().unwrap_or_default(), date, post.title);
    }
    Ok(())
}
