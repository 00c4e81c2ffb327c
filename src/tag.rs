//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag,
//! and the [`TagIndex`] which derives the site-wide tag list and per-tag
//! counts from the aggregated posts.

use crate::post::Post;
use crate::value;
use gtmpl_value::Value;
use log::warn;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use url::Url;

/// The directory (relative to the posts URL) holding one page per tag.
pub const TAG_PAGES_DIRECTORY: &str = "tags";

/// Represents a [`crate::post::Post`] tag. The `name` is kept verbatim as it
/// appears in frontmatter; the `slug` is its URL- and CSS-safe form.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag's name.
    pub name: String,

    /// The slugified name, used for marker classes, the `?tag=` filter query
    /// and tag page file names.
    pub slug: String,
}

impl Tag {
    pub fn new(name: &str) -> Tag {
        Tag {
            name: name.to_owned(),
            slug: slug::slugify(name),
        }
    }

    /// The CSS class carried by every post listing entry with this tag. The
    /// client-side filter hides entries lacking it.
    pub fn marker_class(&self) -> String {
        format!("post-tag-{}", self.slug)
    }

    /// The URL of the posts index filtered down to this tag, e.g.
    /// `{posts_url}?tag=rust`.
    pub fn filter_url(&self, posts_url: &Url) -> Url {
        let mut url = posts_url.clone();
        url.query_pairs_mut().append_pair("tag", &self.slug);
        url
    }

    /// The URL of this tag's page, `{posts_url}/tags/{slug}.html`.
    pub fn page_url(&self, posts_url: &Url) -> Result<Url, url::ParseError> {
        posts_url.join(&format!("{}/{}.html", TAG_PAGES_DIRECTORY, self.slug))
    }

    /// Converts the tag into a template [`Value`] with `name`, `slug`,
    /// `class`, `url` and `pageUrl` fields.
    pub fn to_value(&self, posts_url: &Url) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), Value::String(self.name.clone()));
        m.insert("slug".to_owned(), Value::String(self.slug.clone()));
        m.insert("class".to_owned(), Value::String(self.marker_class()));
        m.insert(
            "url".to_owned(),
            Value::String(self.filter_url(posts_url).to_string()),
        );
        m.insert(
            "pageUrl".to_owned(),
            value::url(self.page_url(posts_url).ok().as_ref()),
        );
        Value::Object(m)
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `slug`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `slug` field. Names that slugify alike (`Rust`, `rust`) are the
    /// same tag: they share a marker class, a filter URL and a tag page.
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}
impl Eq for Tag {}

/// The tags used across a set of posts. `tags` holds each distinct tag once,
/// in order of first appearance over the posts as given (callers pass the
/// canonically sorted posts). Tags are distinct by slug; a tag is named by
/// its first spelling. `counts` tallies every (post, tag) pair under that
/// name.
#[derive(Clone, Debug, Default)]
pub struct TagIndex {
    tags: Vec<Tag>,
    counts: HashMap<String, usize>,
}

impl TagIndex {
    /// Indexes the tags of all non-hidden `posts`.
    pub fn from_posts(posts: &[Post]) -> TagIndex {
        let mut index = TagIndex::default();
        for name in posts
            .iter()
            .filter(|p| !p.hidden)
            .flat_map(|p| p.tags.iter())
        {
            let tag = Tag::new(name);
            let canonical = match index.tags.iter().find(|t| **t == tag) {
                Some(existing) => {
                    if existing.name != tag.name {
                        warn!(
                            "tag `{}` has the same slug as `{}`, merging them",
                            tag.name, existing.name
                        );
                    }
                    existing.name.clone()
                }
                None => {
                    index.tags.push(tag);
                    name.clone()
                }
            };
            *index.counts.entry(canonical).or_insert(0) += 1;
        }
        index
    }

    /// The distinct tags in first-appearance order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// The number of posts carrying `name`.
    pub fn count(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &HashMap<String, usize> {
        &self.counts
    }

    /// The total number of (post, tag) pairs.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// The posts carrying `tag` under any spelling, in the order given.
    pub fn posts_tagged<'a>(&self, posts: &'a [Post], tag: &Tag) -> Vec<&'a Post> {
        posts
            .iter()
            .filter(|p| !p.hidden && p.tags.iter().any(|t| Tag::new(t) == *tag))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn post(tags: &[&str], hidden: bool) -> Post {
        Post {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            hidden,
            ..Post::default()
        }
    }

    #[test]
    fn test_distinct_tags_first_appearance_order() {
        let posts = vec![
            post(&["rust", "web"], false),
            post(&["life", "rust"], false),
            post(&["web", "kotlin"], false),
        ];
        let index = TagIndex::from_posts(&posts);
        let names: Vec<&str> = index.tags().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(vec!["rust", "web", "life", "kotlin"], names);
    }

    #[test]
    fn test_counts_sum_to_pairs() {
        let posts = vec![
            post(&["rust", "web"], false),
            post(&["rust"], false),
            post(&["rust", "rust"], false),
            post(&["secret"], true),
        ];
        let index = TagIndex::from_posts(&posts);
        let pairs: usize = posts
            .iter()
            .filter(|p| !p.hidden)
            .map(|p| p.tags.len())
            .sum();

        assert_eq!(pairs, index.total());
        assert_eq!(4, index.count("rust"));
        assert_eq!(1, index.count("web"));
        assert_eq!(0, index.count("secret"));
        assert!(index.tags().iter().all(|t| t.name != "secret"));
    }

    #[test]
    fn test_posts_tagged() {
        let posts = vec![post(&["a"], false), post(&["b"], false), post(&["a", "b"], false)];
        let index = TagIndex::from_posts(&posts);
        let tagged = index.posts_tagged(&posts, &Tag::new("a"));
        assert_eq!(2, tagged.len());
        assert!(std::ptr::eq(tagged[0], &posts[0]));
        assert!(std::ptr::eq(tagged[1], &posts[2]));
    }

    #[test]
    fn test_spellings_sharing_a_slug_merge() {
        let posts = vec![
            post(&["rust"], false),
            post(&["Rust", "Open Source"], false),
            post(&["open-source"], false),
        ];
        let index = TagIndex::from_posts(&posts);
        let names: Vec<&str> = index.tags().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(vec!["rust", "Open Source"], names);
        assert_eq!(2, index.count("rust"));
        assert_eq!(0, index.count("Rust"));
        assert_eq!(2, index.count("Open Source"));
        assert_eq!(4, index.total());

        let tagged = index.posts_tagged(&posts, &index.tags()[0]);
        assert_eq!(2, tagged.len());
        assert!(std::ptr::eq(tagged[1], &posts[1]));
    }

    #[test]
    fn test_tag_urls() -> Result<(), url::ParseError> {
        let posts_url = Url::parse("https://example.org/posts/")?;
        let tag = Tag::new("Open Source");
        assert_eq!("open-source", tag.slug);
        assert_eq!("post-tag-open-source", tag.marker_class());
        assert_eq!(
            "https://example.org/posts/?tag=open-source",
            tag.filter_url(&posts_url).as_str()
        );
        assert_eq!(
            "https://example.org/posts/tags/open-source.html",
            tag.page_url(&posts_url)?.as_str()
        );
        Ok(())
    }
}
