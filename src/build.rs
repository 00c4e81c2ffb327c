//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: aggregating posts and projects
//! ([`crate::collection`]), building the shared template context
//! ([`crate::context`]), rendering every page of the source tree, copying
//! static assets, and finally writing the RSS feed ([`crate::feed`]) and the
//! small artifacts and external asset steps ([`crate::assets`]).

use crate::assets;
use crate::collection::Collection;
use crate::config::{Config, PROJECT_FILE};
use crate::context::{GlobalContext, PageContext, Revision};
use crate::feed::{write_feed, Error as FeedError, FeedConfig, RenderedBodies};
use crate::frontmatter;
use crate::markdown;
use crate::parser::Error as ParseError;
use crate::post::{Post, HTML_EXTENSION, MARKDOWN_EXTENSION};
use crate::render::{Error as TemplateError, Template};
use crate::tag::TAG_PAGES_DIRECTORY;
use gtmpl_value::Value;
use log::{debug, info, warn};
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// The Markdown page template. A copy in any directory applies to that
/// directory and everything below it.
pub const MARKDOWN_TEMPLATE: &str = "markdown-template.html";

/// The template for pages in the posts directory.
pub const POST_TEMPLATE: &str = "post-template.html";

/// The template for per-tag pages, looked up in the posts directory.
pub const TAG_TEMPLATE: &str = "tag-template.html";

/// Marks a directory as posthorn output, which makes it safe to delete on the
/// next build.
pub const OUTPUT_MARKER: &str = ".posthorn";

/// What a build produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    /// Pages written.
    pub pages: usize,

    /// Pages that failed to render and were left out.
    pub skipped: usize,

    /// Static files copied verbatim.
    pub copied: usize,

    /// Names of the asset steps that failed.
    pub failed_steps: Vec<String>,
}

/// Builds the site described by `config`. Structural problems (missing source
/// tree, unreadable files, broken shared templates, unwritable output) abort
/// the build. Problems local to a single page only skip that page, and a
/// failed asset step only loses its own artifact.
pub fn build_site(config: &Config) -> Result<Summary> {
    if !config.source_directory.is_dir() {
        return Err(Error::MissingSource(config.source_directory.clone()));
    }

    // Aggregate first, then build the immutable context everything renders
    // against.
    let collection = Collection::load(config)?;
    let revision = Revision::lookup(&config.source_directory);
    let context = GlobalContext::new(config, &collection, &revision);
    let header_html = render_fragment(config, &config.header, &context)?;
    let footer_html = render_fragment(config, &config.footer, &context)?;
    let context = context.with_fragments(header_html, footer_html);

    clean_output(&config.output_directory)?;

    let mut writer = Writer {
        config,
        context: &context,
        output_directory: fs::canonicalize(&config.output_directory).map_err(|err| Error::Write {
            path: config.output_directory.clone(),
            err,
        })?,
        bodies: RenderedBodies::default(),
        static_files: Vec::new(),
        summary: Summary::default(),
    };
    writer.write_directory(Path::new(""), None)?;
    writer.copy_static_files()?;
    writer.write_tag_pages(&collection)?;

    let Writer {
        bodies,
        mut summary,
        ..
    } = writer;

    let feed_posts: Vec<Post> = collection
        .posts
        .iter()
        .filter(|post| match post.slug() {
            Some(slug) if bodies.get(slug).is_some() => true,
            _ => {
                warn!("leaving `{}` out of the feed: its page was not written", post.title);
                false
            }
        })
        .cloned()
        .collect();

    let feed_path = config.output_directory.join(&config.feed_file);
    let feed_file = File::create(&feed_path).map_err(|err| Error::Write {
        path: feed_path.clone(),
        err,
    })?;
    write_feed(
        &FeedConfig {
            title: config.title.clone(),
            link: config.posts_url.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            ttl: config.ttl,
            posts_url: config.posts_url.clone(),
        },
        &feed_posts,
        &bodies,
        feed_file,
    )?;
    info!("wrote feed {}", feed_path.display());

    if let Some(domain) = &config.cname {
        assets::write_cname(&config.output_directory, domain).map_err(|err| Error::Write {
            path: config.output_directory.join(assets::CNAME_FILE),
            err,
        })?;
    }

    summary.failed_steps = assets::run_steps(&config.asset_steps, &config.output_directory);

    info!(
        "wrote {} pages ({} skipped), copied {} files",
        summary.pages, summary.skipped, summary.copied
    );
    Ok(summary)
}

/// Renders a shared fragment against the global context. A missing fragment
/// file renders as nothing; a broken one fails the build since every page
/// embeds it.
fn render_fragment(config: &Config, relative: &Path, context: &GlobalContext) -> Result<String> {
    let path = config.source_directory.join(relative);
    if !path.is_file() {
        debug!("no fragment at {}", path.display());
        return Ok(String::new());
    }
    Ok(Template::load(&path)?.render(&context.to_value())?)
}

/// Loads the template at `path` if it exists.
fn optional_template(path: &Path) -> Result<Option<Template>> {
    if path.is_file() {
        Ok(Some(Template::load(path)?))
    } else {
        Ok(None)
    }
}

/// Renders the pages of the source tree and records everything it writes.
struct Writer<'a> {
    config: &'a Config,
    context: &'a GlobalContext,

    /// The canonical output directory, so that an output directory inside the
    /// source tree is never walked.
    output_directory: PathBuf,

    bodies: RenderedBodies,

    /// Source and destination of each file to copy verbatim.
    static_files: Vec<(PathBuf, PathBuf)>,

    summary: Summary,
}

impl Writer<'_> {
    /// Renders every page in the source directory `relative_dir`, then
    /// recurses into its subdirectories in name order. `inherited` is the
    /// Markdown template in effect for the parent directory.
    fn write_directory(&mut self, relative_dir: &Path, inherited: Option<&Template>) -> Result<()> {
        let dir = self.config.source_directory.join(relative_dir);
        let local_template = optional_template(&dir.join(MARKDOWN_TEMPLATE))?;
        let markdown_template = local_template.as_ref().or(inherited);

        let is_posts_directory = relative_dir == Path::new(&self.config.posts_directory);
        let post_template = if is_posts_directory {
            optional_template(&dir.join(POST_TEMPLATE))?
        } else {
            None
        };
        let page_template = post_template.as_ref().or(markdown_template);

        let (files, directories) = self.entries(&dir)?;
        for name in files {
            let relative = relative_dir.join(&name);
            if self.is_reserved(&relative) {
                debug!("not emitting {}", relative.display());
                continue;
            }
            match relative.extension().and_then(|ext| ext.to_str()) {
                Some(MARKDOWN_EXTENSION) => match page_template {
                    Some(template) => {
                        self.write_markdown_page(&relative, template, is_posts_directory)?
                    }
                    None => return Err(Error::MissingTemplate(relative)),
                },
                Some(HTML_EXTENSION) => self.write_html_page(&relative)?,
                _ => self.static_files.push((
                    self.config.source_directory.join(&relative),
                    self.config.output_directory.join(&relative),
                )),
            }
        }

        for name in directories {
            self.write_directory(&relative_dir.join(name), markdown_template)?;
        }
        Ok(())
    }

    /// Lists the files and subdirectories of `dir`, each sorted by name.
    /// Dotfiles and the output directory are left out.
    fn entries(&self, dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let annotate = |err| Error::Read {
            path: dir.to_owned(),
            err,
        };
        let mut files = Vec::new();
        let mut directories = Vec::new();
        for result in fs::read_dir(dir).map_err(annotate)? {
            let entry = result.map_err(annotate)?;
            let name = PathBuf::from(entry.file_name());
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type().map_err(annotate)?.is_dir() {
                if fs::canonicalize(entry.path()).ok().as_ref() != Some(&self.output_directory) {
                    directories.push(name);
                }
            } else {
                files.push(name);
            }
        }
        files.sort();
        directories.sort();
        Ok((files, directories))
    }

    /// Whether `relative` is consumed by the build rather than emitted:
    /// the project file, page templates, shared fragments and ignored names.
    fn is_reserved(&self, relative: &Path) -> bool {
        let name = match relative.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        [PROJECT_FILE, MARKDOWN_TEMPLATE, POST_TEMPLATE, TAG_TEMPLATE].contains(&name)
            || relative == self.config.header.as_path()
            || relative == self.config.footer.as_path()
            || self.config.ignore.iter().any(|i| i == name)
    }

    fn read_source(&self, relative: &Path) -> Result<String> {
        let path = self.config.source_directory.join(relative);
        fs::read_to_string(&path).map_err(|err| Error::Read { path, err })
    }

    /// Renders a Markdown source into its page. Pages in the posts directory
    /// also record their body for the feed.
    fn write_markdown_page(&mut self, relative: &Path, template: &Template, is_post: bool) -> Result<()> {
        let text = self.read_source(relative)?;
        let (frontmatter, body) = frontmatter::parse(&text);
        let frontmatter = frontmatter.unwrap_or_default();

        let mut content = String::new();
        if let Err(e) = markdown::to_html(
            &mut content,
            &self.config.site_url,
            &url_path(relative),
            body,
        ) {
            warn!("skipping {}: {}", relative.display(), e);
            self.summary.skipped += 1;
            return Ok(());
        }

        let post = if is_post {
            Some(Post::from_frontmatter(
                Some(&self.config.source_directory.join(relative)),
                &frontmatter,
            ))
        } else {
            None
        };

        let output = relative.with_extension(HTML_EXTENSION);
        let value = self.context.page(&PageContext {
            path: &url_path(&output),
            frontmatter: Some(&frontmatter),
            content: &content,
            post: post.as_ref(),
            posts_url: &self.config.posts_url,
        });
        let written = self.write_page(template, &value, &output)?;

        // Only posts whose page exists get a body, and with it a feed item.
        if let (true, Some(slug)) = (written, post.as_ref().and_then(Post::slug)) {
            self.bodies.insert(slug, content);
        }
        Ok(())
    }

    /// Renders an HTML source, which is itself a template, against the
    /// global context.
    fn write_html_page(&mut self, relative: &Path) -> Result<()> {
        let text = self.read_source(relative)?;
        let template = match Template::parse(url_path(relative), &text) {
            Ok(template) => template,
            Err(e) => {
                warn!("skipping {}: {}", relative.display(), e);
                self.summary.skipped += 1;
                return Ok(());
            }
        };
        let value = self.context.page(&PageContext {
            path: &url_path(relative),
            frontmatter: None,
            content: "",
            post: None,
            posts_url: &self.config.posts_url,
        });
        self.write_page(&template, &value, relative)?;
        Ok(())
    }

    /// Writes one page per tag if the posts directory has a tag template.
    /// Each page sees the tag as `tag` and only the posts carrying it as
    /// `posts`.
    fn write_tag_pages(&mut self, collection: &Collection) -> Result<()> {
        let config = self.config;
        let template = match optional_template(&config.posts_source_directory().join(TAG_TEMPLATE))? {
            Some(template) => template,
            None => return Ok(()),
        };
        let posts_url = &config.posts_url;

        for tag in collection.tags.tags() {
            let output = Path::new(&config.posts_directory)
                .join(TAG_PAGES_DIRECTORY)
                .join(format!("{}.{}", tag.slug, HTML_EXTENSION));
            let mut value = self.context.page(&PageContext {
                path: &url_path(&output),
                frontmatter: None,
                content: "",
                post: None,
                posts_url,
            });
            if let Value::Object(m) = &mut value {
                let mut tag_value = tag.to_value(posts_url);
                if let Value::Object(t) = &mut tag_value {
                    t.insert(
                        "count".to_owned(),
                        Value::from(collection.tags.count(&tag.name) as i64),
                    );
                }
                m.insert("tag".to_owned(), tag_value);
                m.insert("title".to_owned(), Value::String(tag.name.clone()));
                m.insert(
                    "posts".to_owned(),
                    Value::Array(
                        collection
                            .tags
                            .posts_tagged(&collection.posts, tag)
                            .iter()
                            .map(|p| p.to_value(posts_url))
                            .collect(),
                    ),
                );
            }
            self.write_page(&template, &value, &output)?;
        }
        Ok(())
    }

    /// Executes `template` and writes the result to `output` (relative to
    /// the output directory). A template error skips just this page and
    /// returns `false`.
    fn write_page(&mut self, template: &Template, value: &Value, output: &Path) -> Result<bool> {
        let html = match template.render(value) {
            Ok(html) => html,
            Err(e) => {
                warn!("skipping {}: {}", output.display(), e);
                self.summary.skipped += 1;
                return Ok(false);
            }
        };
        let path = self.config.output_directory.join(output);
        create_parent(&path)?;
        fs::write(&path, html).map_err(|err| Error::Write { path, err })?;
        debug!("wrote {}", output.display());
        self.summary.pages += 1;
        Ok(true)
    }

    fn copy_static_files(&mut self) -> Result<()> {
        for (source, destination) in self.static_files.drain(..) {
            create_parent(&destination)?;
            fs::copy(&source, &destination).map_err(|err| Error::Write {
                path: destination.clone(),
                err,
            })?;
            self.summary.copied += 1;
        }
        Ok(())
    }
}

/// Joins the components of a relative path with `/`.
fn url_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) => fs::create_dir_all(dir).map_err(|err| Error::Write {
            path: dir.to_owned(),
            err,
        }),
        None => Ok(()),
    }
}

/// Empties the output directory so that no stale pages survive. We refuse to
/// delete a non-empty directory that posthorn didn't create (i.e. one
/// without the [`OUTPUT_MARKER`] watermark), in case the user passed the
/// wrong directory.
fn clean_output(dir: &Path) -> Result<()> {
    if dir.exists() {
        let is_empty = fs::read_dir(dir)
            .map_err(|err| Error::Clean {
                path: dir.to_owned(),
                err,
            })?
            .next()
            .is_none();
        if !is_empty && !dir.join(OUTPUT_MARKER).exists() {
            return Err(Error::ForeignOutput(dir.to_owned()));
        }
        rmdir(dir)?;
    }
    fs::create_dir_all(dir).map_err(|err| Error::Write {
        path: dir.to_owned(),
        err,
    })?;
    fs::write(dir.join(OUTPUT_MARKER), "").map_err(|err| Error::Write {
        path: dir.join(OUTPUT_MARKER),
        err,
    })
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during loading,
/// templating, cleaning output directories, writing the feed, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source directory doesn't exist.
    MissingSource(PathBuf),

    /// Returned for errors loading posts and projects.
    Parse(ParseError),

    /// Returned for errors loading or rendering a shared template.
    Template(TemplateError),

    /// Returned when a Markdown page has no template to render with.
    MissingTemplate(PathBuf),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned when the output directory has content posthorn didn't write.
    ForeignOutput(PathBuf),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems reading the source tree.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems writing the output tree.
    Write { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingSource(path) => {
                write!(f, "Source directory '{}' does not exist", path.display())
            }
            Error::Parse(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
            Error::MissingTemplate(path) => write!(
                f,
                "No `{}` applies to '{}'",
                MARKDOWN_TEMPLATE,
                path.display()
            ),
            Error::Feed(err) => err.fmt(f),
            Error::ForeignOutput(path) => write!(
                f,
                "Refusing to clean '{}': it is not empty and was not created by posthorn",
                path.display()
            ),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Read { path, err } => write!(f, "Reading '{}': {}", path.display(), err),
            Error::Write { path, err } => write!(f, "Writing '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingSource(_) => None,
            Error::Parse(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::MissingTemplate(_) => None,
            Error::Feed(err) => Some(err),
            Error::ForeignOutput(_) => None,
            Error::Clean { path: _, err } => Some(err),
            Error::Read { path: _, err } => Some(err),
            Error::Write { path: _, err } => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<TemplateError> for Error {
    /// Converts [`TemplateError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: TemplateError) -> Error {
        Error::Template(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_url_path() {
        assert_eq!("posts/hello.html", url_path(Path::new("posts/hello.html")));
        assert_eq!("index.html", url_path(Path::new("index.html")));
    }

    #[test]
    fn test_clean_output_refuses_foreign_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("precious.txt"), "keep me").unwrap();
        assert!(matches!(
            clean_output(dir.path()),
            Err(Error::ForeignOutput(_))
        ));
        assert!(dir.path().join("precious.txt").exists());
    }

    #[test]
    fn test_clean_output_removes_previous_build() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        clean_output(&out)?;
        fs::write(out.join("stale.html"), "old").unwrap();

        clean_output(&out)?;
        assert!(out.join(OUTPUT_MARKER).exists());
        assert!(!out.join("stale.html").exists());
        Ok(())
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_site(
            dir.path().join("nope"),
            dir.path().join("out"),
            url::Url::parse("https://example.org/").unwrap(),
        )
        .unwrap();
        assert!(matches!(build_site(&config), Err(Error::MissingSource(_))));
    }

    #[test]
    fn test_markdown_without_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("site");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("about.md"), "# About\n").unwrap();
        let config = Config::for_site(
            source,
            dir.path().join("out"),
            url::Url::parse("https://example.org/").unwrap(),
        )
        .unwrap();
        assert!(matches!(
            build_site(&config),
            Err(Error::MissingTemplate(_))
        ));
    }

    #[test]
    fn test_skipped_post_is_left_out_of_feed() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("site/posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(
            posts.join(POST_TEMPLATE),
            "<p>{{ .page.extra.note }}</p>{{ .content }}",
        )
        .unwrap();
        fs::write(
            posts.join("kept.md"),
            "---\ntitle: Kept\npublished-date: 2024-02-01\nextra:\n  note: fine\n---\nKept body.\n",
        )
        .unwrap();
        fs::write(
            posts.join("broken.md"),
            "---\ntitle: Broken\npublished-date: 2024-03-01\n---\nBroken body.\n",
        )
        .unwrap();
        let out = dir.path().join("out");
        let config = Config::for_site(
            dir.path().join("site"),
            out.clone(),
            url::Url::parse("https://example.org/").unwrap(),
        )
        .unwrap();

        let summary = build_site(&config)?;
        assert_eq!(1, summary.skipped);
        assert!(out.join("posts/kept.html").is_file());
        assert!(!out.join("posts/broken.html").exists());

        let feed = fs::read_to_string(out.join("rss.xml")).unwrap();
        let channel = rss::Channel::read_from(feed.as_bytes()).unwrap();
        let links: Vec<&str> = channel.items().iter().filter_map(|i| i.link()).collect();
        assert_eq!(vec!["https://example.org/posts/kept.html"], links);
        Ok(())
    }
}
