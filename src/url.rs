//! Rewrites links found in Markdown documents. Links to other Markdown
//! sources on the same site (e.g. `other.md` or `../posts/foo.md#intro`) are
//! converted into links to their rendered pages (`.../foo.html#intro`).
//! Everything else is returned normalized but otherwise untouched.

use crate::post::{HTML_EXTENSION, MARKDOWN_EXTENSION};
use url::{ParseError, Url};

pub struct Converter<'a> {
    site_root: &'a Url,
    base: Url,
}

impl<'a> Converter<'a> {
    /// Constructs a new `Converter`
    ///
    /// # Arguments
    ///
    /// * `site_root` - the URL of the site root. This should end in a
    ///   trailing slash.
    /// * `base` - the path of the source document relative to the site root
    ///   (e.g. `posts/hello.md`). Relative links are resolved against it.
    pub fn new(site_root: &'a Url, base: &str) -> Result<Converter<'a>> {
        Ok(Converter {
            site_root,
            base: site_root.join(base)?,
        })
    }

    fn convert_absolute(&self, mut absolute: Url) -> Url {
        if let Some(relative) = self.site_root.make_relative(&absolute) {
            let is_markdown = absolute
                .path()
                .strip_suffix(MARKDOWN_EXTENSION)
                .filter(|stem| stem.ends_with('.'))
                .is_some();
            if !relative.starts_with("../") && is_markdown {
                let path = absolute.path();
                let html = format!(
                    "{}{}",
                    &path[..path.len() - MARKDOWN_EXTENSION.len()],
                    HTML_EXTENSION
                );
                absolute.set_path(&html);
            }
        }
        absolute
    }

    pub fn convert(&self, url: &str) -> Result<String> {
        let absolute = match Url::parse(url) {
            Ok(absolute) => absolute,
            Err(ParseError::RelativeUrlWithoutBase) => self.base.join(url)?,
            Err(e) => return Err(e),
        };
        Ok(self.convert_absolute(absolute).to_string())
    }
}

type Result<T> = std::result::Result<T, ParseError>;
