use crate::url::Converter as LinkConverter;
use pulldown_cmark::*;
use std::fmt;
use url::{ParseError as UrlParseError, Url};

/// Converts markdown to HTML, appending the result to `out`.
///
/// * `site_root` is the URL of the site root (e.g., https://example.org/).
///   This should end in a trailing slash.
/// * `source_path` is the relative path to the source file from the site
///   root; relative links are resolved against it.
/// * `markdown` is the document body (without frontmatter).
pub fn to_html(
    out: &mut String,
    site_root: &Url,
    source_path: &str,
    markdown: &str,
) -> Result<(), Error> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let event_converter = EventConverter {
        link_converter: LinkConverter::new(site_root, source_path)?,
    };
    let events = Parser::new_ext(markdown, options)
        .map(|ev| event_converter.convert(ev))
        .collect::<Result<Vec<_>, _>>()?;
    html::push_html(out, events.into_iter());
    Ok(())
}

struct EventConverter<'a> {
    link_converter: LinkConverter<'a>,
}

impl<'a> EventConverter<'a> {
    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Result<Tag<'b>, UrlParseError> {
        Ok(match tag {
            // Links between source documents need to point at the rendered
            // pages (e.g., a post linking to `foo.md` should link to
            // `foo.html`).
            Tag::Link(
                link @ (LinkType::Inline
                | LinkType::Reference
                | LinkType::ReferenceUnknown
                | LinkType::Shortcut
                | LinkType::ShortcutUnknown
                | LinkType::Autolink
                | LinkType::Collapsed
                | LinkType::CollapsedUnknown),
                url,
                title,
            ) => Tag::Link(
                link,
                CowStr::Boxed(self.link_converter.convert(&url)?.into_boxed_str()),
                title,
            ),
            _ => tag,
        })
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Result<Event<'b>, UrlParseError> {
        Ok(match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)?),
            _ => ev,
        })
    }
}

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a problem parsing URLs.
    UrlParse(UrlParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UrlParse(err) => write!(f, "converting link: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(source_path: &str, markdown: &str) -> Result<String, Error> {
        let mut out = String::new();
        to_html(
            &mut out,
            &Url::parse("https://example.org/").unwrap(),
            source_path,
            markdown,
        )?;
        Ok(out)
    }

    #[test]
    fn test_to_html() -> Result<(), Error> {
        assert_eq!(
            "<h1>Hello</h1>\n<p><em>world</em></p>\n",
            render("posts/hello.md", "# Hello\n\n*world*\n")?
        );
        Ok(())
    }

    #[test]
    fn test_links_to_sources_become_pages() -> Result<(), Error> {
        let html = render("posts/hello.md", "[next](next.md) and [img](cat.png)")?;
        assert!(html.contains(r#"href="https://example.org/posts/next.html""#));
        assert!(html.contains(r#"href="https://example.org/posts/cat.png""#));
        Ok(())
    }

    #[test]
    fn test_tables_and_strikethrough() -> Result<(), Error> {
        let html = render("other.md", "| a |\n|---|\n| b |\n\n~~gone~~\n")?;
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        Ok(())
    }
}
