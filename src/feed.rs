//! Support for creating RSS 2.0 feeds from a list of posts.

use crate::post::Post;
use chrono::{NaiveDateTime, TimeZone, Utc};
use log::warn;
use rss::validation::{Validate, ValidationError};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use url::Url;

/// RFC 1123 date-time, always in GMT, e.g. `Mon, 1 Jan 2024 00:00:00 GMT`.
const PUB_DATE_FORMAT: &str = "%a, %-d %b %Y %H:%M:%S GMT";

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub link: Url,
    pub description: String,
    pub language: String,
    pub ttl: u32,

    /// The base URL for post permalinks.
    pub posts_url: Url,
}

/// The rendered HTML body of each post, keyed by post slug. Post pages fill
/// this in as they are rendered; the feed embeds the bodies unmodified.
#[derive(Clone, Debug, Default)]
pub struct RenderedBodies(HashMap<String, String>);

impl RenderedBodies {
    pub fn insert(&mut self, slug: impl Into<String>, html: impl Into<String>) {
        self.0.insert(slug.into(), html.into());
    }

    pub fn get(&self, slug: &str) -> Option<&str> {
        self.0.get(slug).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Creates a feed from some configuration ([`FeedConfig`]), the canonically
/// ordered [`Post`]s and their rendered bodies, and writes the result to a
/// [`std::io::Write`].
pub fn write_feed<W: Write>(
    config: &FeedConfig,
    posts: &[Post],
    bodies: &RenderedBodies,
    w: W,
) -> Result<()> {
    build_feed(config, posts, bodies)?.write_to(w)?;
    Ok(())
}

/// Creates the feed's [`Channel`]. Items follow the order of `posts`; hidden
/// posts and posts without a source file are left out.
pub fn build_feed(config: &FeedConfig, posts: &[Post], bodies: &RenderedBodies) -> Result<Channel> {
    let items = posts
        .iter()
        .filter(|p| !p.hidden)
        .filter_map(|p| feed_item(config, p, bodies))
        .collect::<Vec<Item>>();

    let channel = ChannelBuilder::default()
        .title(config.title.clone())
        .link(config.link.to_string())
        .description(config.description.clone())
        .language(Some(config.language.clone()))
        .ttl(Some(config.ttl.to_string()))
        .items(items)
        .build();
    channel.validate()?;
    Ok(channel)
}

fn feed_item(config: &FeedConfig, post: &Post, bodies: &RenderedBodies) -> Option<Item> {
    let slug = post.slug()?;
    let link = post.url(&config.posts_url)?.to_string();
    let body = match bodies.get(slug) {
        Some(body) => body.to_owned(),
        None => {
            warn!("no rendered body for post `{}`, using its description", slug);
            post.description.clone()
        }
    };
    let pub_date = if post.is_dated() {
        Some(format_pub_date(&post.published))
    } else {
        None
    };

    Some(
        ItemBuilder::default()
            .title(Some(post.title.clone()))
            .link(Some(link.clone()))
            .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
            .description(Some(body))
            .pub_date(pub_date)
            .build(),
    )
}

/// Formats a post's publish timestamp for `pubDate`. The timestamp is taken
/// to be UTC.
pub fn format_pub_date(published: &NaiveDateTime) -> String {
    Utc.from_utc_datetime(published)
        .format(PUB_DATE_FORMAT)
        .to_string()
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants inlude I/O, RSS, and
/// validation issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when writing the feed fails.
    Rss(rss::Error),

    /// Returned when the channel isn't valid RSS (e.g. a malformed link).
    Validation(ValidationError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Rss(err) => err.fmt(f),
            Error::Validation(err) => write!(f, "invalid feed: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Rss(err) => Some(err),
            Error::Validation(err) => Some(err),
        }
    }
}

impl From<rss::Error> for Error {
    /// Converts [`rss::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: rss::Error) -> Error {
        Error::Rss(err)
    }
}

impl From<ValidationError> for Error {
    /// Converts [`ValidationError`]s into [`Error`]. This allows us to use
    /// the `?` operator when validating the channel.
    fn from(err: ValidationError) -> Error {
        Error::Validation(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::parse_timestamp;
    use std::path::PathBuf;

    fn config() -> FeedConfig {
        FeedConfig {
            title: "example's blog".to_owned(),
            link: Url::parse("https://example.org/posts/").unwrap(),
            description: "example's blog".to_owned(),
            language: "en".to_owned(),
            ttl: 15,
            posts_url: Url::parse("https://example.org/posts/").unwrap(),
        }
    }

    fn post(slug: &str, published: &str, hidden: bool) -> Post {
        Post {
            source: Some(PathBuf::from(format!("posts/{}.md", slug))),
            title: slug.to_uppercase(),
            published: parse_timestamp(published).unwrap_or(NaiveDateTime::MIN),
            hidden,
            ..Post::default()
        }
    }

    fn bodies(posts: &[Post]) -> RenderedBodies {
        let mut bodies = RenderedBodies::default();
        for p in posts {
            let slug = p.slug().unwrap();
            bodies.insert(slug, format!("<p>{} &amp; <em>more</em></p>", slug));
        }
        bodies
    }

    fn read_back(posts: &[Post], bodies: &RenderedBodies) -> Channel {
        let mut out = Vec::new();
        write_feed(&config(), posts, bodies, &mut out).unwrap();
        Channel::read_from(&out[..]).unwrap()
    }

    #[test]
    fn test_format_pub_date() {
        let dt = parse_timestamp("2024-01-01T09:05:03").unwrap();
        assert_eq!("Mon, 1 Jan 2024 09:05:03 GMT", format_pub_date(&dt));
        let dt = parse_timestamp("2024-06-15T23:00:00").unwrap();
        assert_eq!("Sat, 15 Jun 2024 23:00:00 GMT", format_pub_date(&dt));
    }

    #[test]
    fn test_channel_metadata() {
        let channel = read_back(&[], &RenderedBodies::default());
        assert_eq!("example's blog", channel.title());
        assert_eq!("https://example.org/posts/", channel.link());
        assert_eq!(Some("en"), channel.language());
        assert_eq!(Some("15"), channel.ttl());
        assert!(channel.items().is_empty());
    }

    #[test]
    fn test_items_follow_post_order() {
        let posts = vec![
            post("newest", "2024-06-01T00:00:00", false),
            post("middle", "2024-01-01T00:00:00", false),
            post("oldest", "2023-12-01T00:00:00", false),
        ];
        let channel = read_back(&posts, &bodies(&posts));
        let links: Vec<&str> = channel.items().iter().filter_map(|i| i.link()).collect();
        assert_eq!(
            vec![
                "https://example.org/posts/newest.html",
                "https://example.org/posts/middle.html",
                "https://example.org/posts/oldest.html",
            ],
            links
        );
        assert_eq!(Some("NEWEST"), channel.items()[0].title());
        assert_eq!(
            Some("Sat, 1 Jun 2024 00:00:00 GMT"),
            channel.items()[0].pub_date()
        );
    }

    #[test]
    fn test_body_is_embedded_verbatim() {
        let posts = vec![post("hello", "2024-06-01T00:00:00", false)];
        let bodies = bodies(&posts);
        let channel = read_back(&posts, &bodies);
        assert_eq!(bodies.get("hello"), channel.items()[0].description());
    }

    #[test]
    fn test_hidden_posts_and_undated_posts() {
        let posts = vec![
            post("visible", "2024-06-01T00:00:00", false),
            post("secret", "2024-05-01T00:00:00", true),
            post("undated", "", false),
        ];
        let channel = read_back(&posts, &bodies(&posts));
        let titles: Vec<&str> = channel.items().iter().filter_map(|i| i.title()).collect();
        assert_eq!(vec!["VISIBLE", "UNDATED"], titles);
        assert_eq!(None, channel.items()[1].pub_date());
    }

    #[test]
    fn test_missing_body_falls_back_to_description() {
        let mut p = post("lonely", "2024-06-01T00:00:00", false);
        p.description = "a description".to_owned();
        let channel = read_back(&[p], &RenderedBodies::default());
        assert_eq!(Some("a description"), channel.items()[0].description());
    }
}
