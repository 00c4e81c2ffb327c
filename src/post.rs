//! Defines the [`Post`] type and the logic for building posts from their
//! frontmatter. See [`Post::from_frontmatter`] for the field defaults and
//! [`Post::to_value`] for how posts are exposed to templates.

use crate::frontmatter::{Frontmatter, Value as FrontmatterValue};
use crate::tag::Tag;
use crate::value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use gtmpl_value::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Stands in for a missing `title` or `description`. This is a literal
/// string, not an absent value.
pub const MISSING_TEXT: &str = "null";

pub const MARKDOWN_EXTENSION: &str = "md";
pub const HTML_EXTENSION: &str = "html";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A blog post as described by its frontmatter.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The source file. `None` for posts that don't come from disk.
    pub source: Option<PathBuf>,

    /// The title of the post (`title`).
    pub title: String,

    /// A one-line description (`description`).
    pub description: String,

    /// The post's tags in frontmatter order (`tags`).
    pub tags: Vec<String>,

    /// The publish timestamp (`published-date`). Undated posts get
    /// [`NaiveDateTime::MIN`] and so sort after every dated post.
    pub published: NaiveDateTime,

    /// The last-edited timestamp (`updated-date`).
    pub updated: Option<NaiveDateTime>,

    /// A reference to the post's external comment thread (`comment-did`).
    pub comment_did: Option<String>,

    /// Hidden posts are rendered but never listed (`hide`).
    pub hidden: bool,
}

impl Default for Post {
    fn default() -> Self {
        Post {
            source: None,
            title: MISSING_TEXT.to_owned(),
            description: MISSING_TEXT.to_owned(),
            tags: Vec::new(),
            published: NaiveDateTime::MIN,
            updated: None,
            comment_did: None,
            hidden: false,
        }
    }
}

impl Post {
    /// Builds a [`Post`] from `frontmatter`. Each field falls back to its
    /// default independently when its key is absent or holds the wrong kind
    /// of value, so one bad field never invalidates the others.
    pub fn from_frontmatter(source: Option<&Path>, frontmatter: &Frontmatter) -> Post {
        let text = |key: &str| {
            frontmatter
                .get(key)
                .and_then(FrontmatterValue::as_str)
                .map(str::to_owned)
        };
        let timestamp = |key: &str| {
            frontmatter
                .get(key)
                .and_then(FrontmatterValue::as_str)
                .and_then(parse_timestamp)
        };

        Post {
            source: source.map(Path::to_owned),
            title: text("title").unwrap_or_else(|| MISSING_TEXT.to_owned()),
            description: text("description").unwrap_or_else(|| MISSING_TEXT.to_owned()),
            tags: frontmatter
                .get("tags")
                .and_then(FrontmatterValue::as_list)
                .map(|items| items.iter().filter_map(FrontmatterValue::to_text).collect())
                .unwrap_or_default(),
            published: timestamp("published-date").unwrap_or(NaiveDateTime::MIN),
            updated: timestamp("updated-date"),
            comment_did: text("comment-did"),
            hidden: frontmatter
                .get("hide")
                .and_then(FrontmatterValue::as_bool)
                .unwrap_or(false),
        }
    }

    /// The source file name without its extension. The slug names the
    /// post's output page (`{slug}.html`).
    pub fn slug(&self) -> Option<&str> {
        self.source.as_ref()?.file_stem()?.to_str()
    }

    /// Whether the post carries a usable `published-date`.
    pub fn is_dated(&self) -> bool {
        self.published != NaiveDateTime::MIN
    }

    /// The post's permalink, `{posts_url}{slug}.html`.
    pub fn url(&self, posts_url: &Url) -> Option<Url> {
        posts_url
            .join(&format!("{}.{}", self.slug()?, HTML_EXTENSION))
            .ok()
    }

    /// The marker classes for the post's tags, space separated.
    pub fn tag_classes(&self) -> String {
        self.tags
            .iter()
            .map(|t| Tag::new(t).marker_class())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Converts the post into a template [`Value`]. Dates are pre-formatted
    /// (`pubDate` as `YYYY-MM-DD`, `pubDateTime` as ISO date-time); absent
    /// optional fields are [`Value::Nil`].
    pub fn to_value(&self, posts_url: &Url) -> Value {
        let dated = |dt: Option<&NaiveDateTime>, format: &str| {
            value::text(dt.map(|dt| dt.format(format).to_string()).as_deref())
        };
        let published = Some(&self.published).filter(|_| self.is_dated());

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert(
            "description".to_owned(),
            Value::String(self.description.clone()),
        );
        m.insert("slug".to_owned(), value::text(self.slug()));
        m.insert("url".to_owned(), value::url(self.url(posts_url).as_ref()));
        m.insert(
            "tags".to_owned(),
            Value::Array(
                self.tags
                    .iter()
                    .map(|t| Tag::new(t).to_value(posts_url))
                    .collect(),
            ),
        );
        m.insert("tagClasses".to_owned(), Value::String(self.tag_classes()));
        m.insert("pubDate".to_owned(), dated(published, DATE_FORMAT));
        m.insert("pubDateTime".to_owned(), dated(published, DATE_TIME_FORMAT));
        m.insert("editDate".to_owned(), dated(self.updated.as_ref(), DATE_FORMAT));
        m.insert(
            "editDateTime".to_owned(),
            dated(self.updated.as_ref(), DATE_TIME_FORMAT),
        );
        m.insert("commentDid".to_owned(), value::text(self.comment_did.as_deref()));
        m.insert("hidden".to_owned(), Value::Bool(self.hidden));
        Value::Object(m)
    }
}

/// Parses a frontmatter timestamp. Accepts an ISO local date-time with
/// optional seconds and fraction (`2024-06-01T12:30:00.5`), the same with an
/// RFC 3339 offset (the offset is dropped and the local time kept), or a
/// bare date, read as midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
