//! Defines the [`Config`] type and its loading from a `posthorn.yaml` project
//! file. A minimal project file only needs the site URL:
//!
//! ```yaml
//! site_url: https://example.org/
//! title: example's blog
//! description: notes and projects
//! cname: example.org
//! asset_steps:
//!   - name: favicon
//!     command: [magick, -background, transparent, favicon.svg,
//!               -define, "icon:auto-resize=512,16,32", favicon.ico]
//! ```

use crate::assets::AssetStep;
use serde::Deserialize;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use url::Url;

/// The project file name. It marks the root of the site's source tree.
pub const PROJECT_FILE: &str = "posthorn.yaml";

/// The default output directory, relative to the source root.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "_site";

#[derive(Deserialize)]
struct Ttl(u32);
impl Default for Ttl {
    fn default() -> Self {
        Ttl(15)
    }
}

fn default_language() -> String {
    "en".to_owned()
}

fn default_posts_directory() -> String {
    "posts".to_owned()
}

fn default_projects_directory() -> String {
    "projects".to_owned()
}

fn default_feed_file() -> String {
    "rss.xml".to_owned()
}

fn default_header() -> PathBuf {
    PathBuf::from("components/header.html")
}

fn default_footer() -> PathBuf {
    PathBuf::from("components/footer.html")
}

#[derive(Deserialize)]
struct ProjectFile {
    site_url: Url,

    #[serde(default)]
    title: String,

    #[serde(default)]
    description: String,

    #[serde(default = "default_language")]
    language: String,

    #[serde(default)]
    ttl: Ttl,

    #[serde(default = "default_posts_directory")]
    posts_directory: String,

    #[serde(default = "default_projects_directory")]
    projects_directory: String,

    #[serde(default = "default_feed_file")]
    feed_file: String,

    #[serde(default = "default_header")]
    header: PathBuf,

    #[serde(default = "default_footer")]
    footer: PathBuf,

    #[serde(default)]
    cname: Option<String>,

    #[serde(default)]
    asset_steps: Vec<AssetStep>,

    #[serde(default)]
    ignore: Vec<String>,
}

/// Everything a build needs to know about a site.
#[derive(Clone, Debug)]
pub struct Config {
    /// The root of the source tree (the directory holding the project file).
    pub source_directory: PathBuf,

    /// The directory the site is written to.
    pub output_directory: PathBuf,

    /// The public URL of the site root. Always ends in a slash.
    pub site_url: Url,

    /// `{site_url}{posts_directory}/`.
    pub posts_url: Url,

    /// `{site_url}{projects_directory}/`.
    pub projects_url: Url,

    /// Site title, used for the feed channel.
    pub title: String,

    /// Site description, used for the feed channel.
    pub description: String,

    /// Feed language.
    pub language: String,

    /// Feed time-to-live in minutes.
    pub ttl: u32,

    /// The posts directory, relative to the source root.
    pub posts_directory: String,

    /// The projects directory, relative to the source root.
    pub projects_directory: String,

    /// The feed's file name, relative to the output root.
    pub feed_file: String,

    /// The header fragment template, relative to the source root.
    pub header: PathBuf,

    /// The footer fragment template, relative to the source root.
    pub footer: PathBuf,

    /// The custom domain written to `CNAME`, if any.
    pub cname: Option<String>,

    /// External commands run in the output directory after the build.
    pub asset_steps: Vec<AssetStep>,

    /// Extra source file names that are never emitted.
    pub ignore: Vec<String>,
}

impl Config {
    /// Finds the project file in `dir` or the nearest parent directory that
    /// has one and loads it. `output_directory` defaults to
    /// `{project root}/_site`. The search starts from the canonical form of
    /// `dir`, so relative paths like `.` reach their real parents.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let dir = fs::canonicalize(dir).map_err(|err| Error::Open {
            path: dir.to_owned(),
            err,
        })?;
        let mut candidate = Some(dir.as_path());
        while let Some(dir) = candidate {
            let path = dir.join(PROJECT_FILE);
            if path.exists() {
                return Config::from_project_file(&path, output_directory);
            }
            candidate = dir.parent();
        }
        Err(Error::NotFound)
    }

    /// Loads the project file at `path`. The source root is the file's
    /// parent directory.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: ProjectFile = serde_yaml::from_reader(file).map_err(|err| Error::Yaml {
            path: path.to_owned(),
            err,
        })?;
        let source_directory = match path.parent() {
            Some(parent) => parent.to_owned(),
            None => return Err(Error::NoParent(path.to_owned())),
        };
        let output_directory = match output_directory {
            Some(dir) => dir.to_owned(),
            None => source_directory.join(DEFAULT_OUTPUT_DIRECTORY),
        };

        let site_url = directory_url(project.site_url);
        Ok(Config {
            posts_url: site_url.join(&format!("{}/", project.posts_directory))?,
            projects_url: site_url.join(&format!("{}/", project.projects_directory))?,
            site_url,
            source_directory,
            output_directory,
            title: project.title,
            description: project.description,
            language: project.language,
            ttl: project.ttl.0,
            posts_directory: project.posts_directory,
            projects_directory: project.projects_directory,
            feed_file: project.feed_file,
            header: project.header,
            footer: project.footer,
            cname: project.cname,
            asset_steps: project.asset_steps,
            ignore: project.ignore,
        })
    }

    /// Builds a configuration with every optional setting at its default.
    pub fn for_site(
        source_directory: PathBuf,
        output_directory: PathBuf,
        site_url: Url,
    ) -> Result<Config> {
        let site_url = directory_url(site_url);
        let posts_directory = default_posts_directory();
        let projects_directory = default_projects_directory();
        Ok(Config {
            posts_url: site_url.join(&format!("{}/", posts_directory))?,
            projects_url: site_url.join(&format!("{}/", projects_directory))?,
            site_url,
            source_directory,
            output_directory,
            title: String::new(),
            description: String::new(),
            language: default_language(),
            ttl: Ttl::default().0,
            posts_directory,
            projects_directory,
            feed_file: default_feed_file(),
            header: default_header(),
            footer: default_footer(),
            cname: None,
            asset_steps: Vec::new(),
            ignore: Vec::new(),
        })
    }

    pub fn posts_source_directory(&self) -> PathBuf {
        self.source_directory.join(&self.posts_directory)
    }

    pub fn projects_source_directory(&self) -> PathBuf {
        self.source_directory.join(&self.projects_directory)
    }
}

/// Adds the trailing slash that [`Url::join`] needs to treat the last path
/// segment as a directory.
fn directory_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// The result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading the project configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no project file exists in the directory or any parent.
    NotFound,

    /// Returned when the project file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid.
    Yaml { path: PathBuf, err: serde_yaml::Error },

    /// Returned when the project file path has no parent directory.
    NoParent(PathBuf),

    /// Returned when a derived URL can't be built.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::Open { path, err } => {
                write!(f, "Opening project file '{}': {}", path.display(), err)
            }
            Error::Yaml { path, err } => {
                write!(f, "Loading project file '{}': {}", path.display(), err)
            }
            Error::NoParent(path) => write!(
                f,
                "Can't get parent directory for project file '{}'",
                path.display()
            ),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound => None,
            Error::Open { path: _, err } => Some(err),
            Error::Yaml { path: _, err } => Some(err),
            Error::NoParent(_) => None,
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}
