//! Defines the [`GlobalContext`], the read-only data every template sees, and
//! [`PageContext`], the per-page data layered on top of it.
//!
//! The global context is assembled bottom-up once per build: collections are
//! aggregated first, then converted into template values here, then the
//! shared header/footer fragments are rendered against that context and
//! attached with [`GlobalContext::with_fragments`]. After that it is only
//! read.

use crate::collection::Collection;
use crate::config::Config;
use crate::frontmatter::{Frontmatter, Value as FrontmatterValue};
use crate::post::Post;
use crate::value;
use gtmpl_value::Value;
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::process::Command;

/// Short and long revision identifiers of the site's source tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Revision {
    pub short: String,
    pub long: String,
}

impl Revision {
    /// Asks git for the current revision of the repository containing
    /// `dir`. A failure (no git, not a repository) is logged and yields
    /// empty identifiers.
    pub fn lookup(dir: &Path) -> Revision {
        match (
            git(dir, &["rev-parse", "--short", "HEAD"]),
            git(dir, &["rev-parse", "HEAD"]),
        ) {
            (Ok(short), Ok(long)) => {
                debug!("source revision {}", long);
                Revision { short, long }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("looking up source revision: {}", e);
                Revision::default()
            }
        }
    }
}

fn git(dir: &Path, args: &[&str]) -> Result<String, CommandError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(CommandError::Spawn)?;
    if !output.status.success() {
        return Err(CommandError::Failed(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

#[derive(Debug)]
enum CommandError {
    Spawn(std::io::Error),
    Failed(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::Spawn(err) => write!(f, "running git: {}", err),
            CommandError::Failed(stderr) => write!(f, "git failed: {}", stderr),
        }
    }
}

/// The shared template data. Every page context starts as a copy of these
/// fields.
#[derive(Clone)]
pub struct GlobalContext {
    fields: HashMap<String, Value>,
}

impl GlobalContext {
    /// Builds the global context from the aggregated `collection`. The
    /// header/footer fragments start out empty.
    pub fn new(config: &Config, collection: &Collection, revision: &Revision) -> GlobalContext {
        let posts_url = &config.posts_url;

        let mut site: HashMap<String, Value> = HashMap::new();
        site.insert("title".to_owned(), Value::String(config.title.clone()));
        site.insert(
            "description".to_owned(),
            Value::String(config.description.clone()),
        );
        site.insert("url".to_owned(), Value::String(config.site_url.to_string()));
        site.insert(
            "feedUrl".to_owned(),
            value::url(config.site_url.join(&config.feed_file).ok().as_ref()),
        );

        let mut fields: HashMap<String, Value> = HashMap::new();
        fields.insert("site".to_owned(), Value::Object(site));
        fields.insert(
            "posts".to_owned(),
            Value::Array(
                collection
                    .posts
                    .iter()
                    .map(|p| p.to_value(posts_url))
                    .collect(),
            ),
        );
        fields.insert(
            "projects".to_owned(),
            Value::Array(
                collection
                    .projects
                    .iter()
                    .map(|p| p.to_value(&config.projects_url))
                    .collect(),
            ),
        );
        fields.insert(
            "allTags".to_owned(),
            Value::Array(
                collection
                    .tags
                    .tags()
                    .iter()
                    .map(|t| Value::String(t.name.clone()))
                    .collect(),
            ),
        );
        fields.insert(
            "tagList".to_owned(),
            Value::Array(
                collection
                    .tags
                    .tags()
                    .iter()
                    .map(|t| {
                        let mut v = t.to_value(posts_url);
                        if let Value::Object(m) = &mut v {
                            m.insert(
                                "count".to_owned(),
                                Value::from(collection.tags.count(&t.name) as i64),
                            );
                        }
                        v
                    })
                    .collect(),
            ),
        );
        fields.insert(
            "tagCounts".to_owned(),
            Value::Object(
                collection
                    .tags
                    .counts()
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(*v as i64)))
                    .collect(),
            ),
        );
        fields.insert("gitHash".to_owned(), Value::String(revision.short.clone()));
        fields.insert(
            "longGitHash".to_owned(),
            Value::String(revision.long.clone()),
        );
        fields.insert("headerHtml".to_owned(), Value::String(String::new()));
        fields.insert("footerHtml".to_owned(), Value::String(String::new()));
        GlobalContext { fields }
    }

    /// Attaches the pre-rendered shared fragments.
    pub fn with_fragments(mut self, header_html: String, footer_html: String) -> GlobalContext {
        self.fields
            .insert("headerHtml".to_owned(), Value::String(header_html));
        self.fields
            .insert("footerHtml".to_owned(), Value::String(footer_html));
        self
    }

    /// The global context on its own, for site-wide renders.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Layers `page` on top of the global fields. The page keys are always
    /// present so that templates can reference them unconditionally; unset
    /// ones are [`Value::Nil`].
    pub fn page(&self, page: &PageContext) -> Value {
        let mut m = self.fields.clone();
        let frontmatter = page.frontmatter;
        let text = |key: &str| {
            value::text(
                frontmatter
                    .and_then(|fm| fm.get(key))
                    .and_then(FrontmatterValue::as_str),
            )
        };

        m.insert(
            "page".to_owned(),
            Value::Object(match frontmatter {
                Some(fm) => value::object_with_known_keys(fm),
                None => value::object_with_known_keys(&Frontmatter::new()),
            }),
        );
        m.insert("content".to_owned(), Value::String(page.content.to_owned()));
        m.insert("path".to_owned(), Value::String(page.path.to_owned()));
        for key in &["title", "description", "source", "docs", "type"] {
            m.insert((*key).to_owned(), text(key));
        }
        for key in &["tags", "pubDate", "editDate", "commentDid"] {
            m.insert((*key).to_owned(), Value::Nil);
        }
        m.insert("post".to_owned(), Value::Nil);

        if let Some(post) = page.post {
            if let Value::Object(fields) = post.to_value(page.posts_url) {
                for key in &["title", "description", "tags", "pubDate", "editDate", "commentDid"] {
                    if let Some(v) = fields.get(*key) {
                        m.insert((*key).to_owned(), v.clone());
                    }
                }
                m.insert("post".to_owned(), Value::Object(fields));
            }
        }
        Value::Object(m)
    }
}

/// Per-page template data.
pub struct PageContext<'a> {
    /// The output path relative to the site root, e.g. `posts/hello.html`.
    pub path: &'a str,

    /// The page's frontmatter, if it has one.
    pub frontmatter: Option<&'a Frontmatter>,

    /// The rendered page body.
    pub content: &'a str,

    /// The post record, for pages in the posts directory.
    pub post: Option<&'a Post>,

    /// The base URL for post links.
    pub posts_url: &'a url::Url,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frontmatter;
    use crate::tag::TagIndex;
    use std::path::PathBuf;

    fn config() -> Config {
        Config::for_site(
            PathBuf::from("site"),
            PathBuf::from("out"),
            url::Url::parse("https://example.org/").unwrap(),
        )
        .unwrap()
    }

    fn collection() -> Collection {
        let post = |name: &str, input: &str| {
            let (fm, _) = frontmatter::parse(input);
            Post::from_frontmatter(
                Some(&Path::new("posts").join(name)),
                &fm.unwrap_or_default(),
            )
        };
        let posts = vec![
            post("b.md", "---\ntitle: B\ntags: [rust, web]\n---\n"),
            post("a.md", "---\ntitle: A\ntags: [rust]\n---\n"),
        ];
        Collection {
            tags: TagIndex::from_posts(&posts),
            posts,
            projects: Vec::new(),
        }
    }

    fn object(v: Value) -> HashMap<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_global_fields() {
        let revision = Revision {
            short: "abc1234".to_owned(),
            long: "abc1234def".to_owned(),
        };
        let context = GlobalContext::new(&config(), &collection(), &revision)
            .with_fragments("<header/>".to_owned(), "<footer/>".to_owned());
        let m = object(context.to_value());

        assert!(matches!(m.get("gitHash"), Some(Value::String(s)) if s == "abc1234"));
        assert!(matches!(m.get("headerHtml"), Some(Value::String(s)) if s == "<header/>"));
        assert!(matches!(m.get("posts"), Some(Value::Array(posts)) if posts.len() == 2));
        match m.get("allTags") {
            Some(Value::Array(tags)) => {
                let names: Vec<&str> = tags
                    .iter()
                    .filter_map(|t| match t {
                        Value::String(s) => Some(s.as_str()),
                        _ => None,
                    })
                    .collect();
                assert_eq!(vec!["rust", "web"], names);
            }
            _ => panic!("expected allTags"),
        }
        match m.get("tagCounts") {
            Some(Value::Object(counts)) => assert_eq!(2, counts.len()),
            _ => panic!("expected tagCounts"),
        }
    }

    #[test]
    fn test_page_keys_always_present() {
        let config = config();
        let context = GlobalContext::new(&config, &collection(), &Revision::default());
        let m = object(context.page(&PageContext {
            path: "other.html",
            frontmatter: None,
            content: "<p>hi</p>",
            post: None,
            posts_url: &config.posts_url,
        }));

        for key in &["title", "description", "source", "docs", "type", "tags", "pubDate", "editDate", "post"] {
            assert!(matches!(m.get(*key), Some(Value::Nil)), "{} should be nil", key);
        }
        assert!(matches!(m.get("content"), Some(Value::String(s)) if s == "<p>hi</p>"));
        assert!(matches!(m.get("posts"), Some(Value::Array(_))));
        match m.get("page") {
            Some(Value::Object(page)) => {
                assert!(matches!(page.get("docs"), Some(Value::Nil)));
                assert!(matches!(page.get("source"), Some(Value::Nil)));
            }
            _ => panic!("expected a page object"),
        }
    }

    #[test]
    fn test_optional_keys_render_when_absent() {
        let config = config();
        let mut project_fm = Frontmatter::new();
        project_fm.insert("title", FrontmatterValue::String("Tool".to_owned()));
        let mut collection = collection();
        collection.projects.push(crate::project::Project::from_frontmatter(
            Path::new("projects/tool.md"),
            project_fm,
        ));
        let context = GlobalContext::new(&config, &collection, &Revision::default());
        let (fm, _) = frontmatter::parse("---\ntitle: About\n---\n");
        let fm = fm.unwrap_or_default();
        let value = context.page(&PageContext {
            path: "about.html",
            frontmatter: Some(&fm),
            content: "",
            post: None,
            posts_url: &config.posts_url,
        });

        let template = crate::render::Template::parse(
            "about",
            "{{.page.title}}{{if .page.docs}}!{{end}};\
             {{range .projects}}{{.title}}{{if .docs}} docs{{end}}{{if .source}} src{{end}};{{end}}",
        )
        .unwrap();
        assert_eq!("About;Tool;", template.render(&value).unwrap());
    }

    #[test]
    fn test_post_page_uses_post_defaults() {
        let config = config();
        let context = GlobalContext::new(&config, &collection(), &Revision::default());
        let fm = Frontmatter::new();
        let post = Post::from_frontmatter(Some(Path::new("posts/untitled.md")), &fm);
        let m = object(context.page(&PageContext {
            path: "posts/untitled.html",
            frontmatter: Some(&fm),
            content: "",
            post: Some(&post),
            posts_url: &config.posts_url,
        }));

        assert!(matches!(m.get("title"), Some(Value::String(s)) if s == "null"));
        assert!(matches!(m.get("pubDate"), Some(Value::Nil)));
        assert!(matches!(m.get("tags"), Some(Value::Array(tags)) if tags.is_empty()));
    }
}
