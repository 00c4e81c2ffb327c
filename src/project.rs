//! Defines the [`Project`] type. Unlike posts, projects are free-form: their
//! frontmatter is kept as-is and handed to templates, with only the
//! `priority` field interpreted.

use crate::frontmatter::{Frontmatter, Value as FrontmatterValue};
use crate::post::HTML_EXTENSION;
use crate::value;
use gtmpl_value::Value;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    /// The project's source file.
    pub path: PathBuf,

    /// The raw frontmatter.
    pub frontmatter: Frontmatter,

    /// The listing priority. Lower values are listed first.
    pub priority: Option<i64>,
}

impl Project {
    pub fn from_frontmatter(path: &Path, frontmatter: Frontmatter) -> Project {
        let priority = frontmatter
            .get("priority")
            .and_then(FrontmatterValue::as_i64);
        Project {
            path: path.to_owned(),
            frontmatter,
            priority,
        }
    }

    pub fn slug(&self) -> Option<&str> {
        self.path.file_stem()?.to_str()
    }

    /// The project's page URL, `{projects_url}{slug}.html`.
    pub fn url(&self, projects_url: &Url) -> Option<Url> {
        projects_url
            .join(&format!("{}.{}", self.slug()?, HTML_EXTENSION))
            .ok()
    }

    fn file_name(&self) -> &std::ffi::OsStr {
        self.path.file_name().unwrap_or_default()
    }

    /// Converts the project into a template [`Value`]: every frontmatter key
    /// (the well-known ones [`Value::Nil`] when absent), plus `path` (source
    /// file name), `slug`, `url` and `priority`.
    pub fn to_value(&self, projects_url: &Url) -> Value {
        let mut m = value::object_with_known_keys(&self.frontmatter);
        m.insert(
            "path".to_owned(),
            Value::String(self.file_name().to_string_lossy().into_owned()),
        );
        m.insert("slug".to_owned(), value::text(self.slug()));
        m.insert("url".to_owned(), value::url(self.url(projects_url).as_ref()));
        m.insert(
            "priority".to_owned(),
            match self.priority {
                Some(p) => Value::from(p),
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }
}

/// Orders projects by ascending priority. Projects without a priority come
/// after all prioritized ones; ties are broken by file name.
pub fn compare(a: &Project, b: &Project) -> Ordering {
    let by_priority = match (a.priority, b.priority) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_priority.then_with(|| a.file_name().cmp(b.file_name()))
}
