//! Loads [`Post`]s and [`Project`]s from their source directories. Also
//! defines the [`Error`] type for the loading step.

use crate::frontmatter::{self, Frontmatter};
use crate::post::{Post, MARKDOWN_EXTENSION};
use crate::project::{self, Project};
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Searches `source_directory` for post files (extension = `.md`, not
/// recursive) and returns the visible posts sorted by publish date, most
/// recent first. Hidden posts are dropped. Undated posts sort last; posts
/// sharing a date keep file-name order.
pub fn parse_posts(source_directory: &Path) -> Result<Vec<Post>> {
    let mut posts = Vec::new();
    for path in markdown_files(source_directory)? {
        let frontmatter = read_frontmatter(&path)?.unwrap_or_default();
        let post = Post::from_frontmatter(Some(&path), &frontmatter);
        if post.hidden {
            debug!("skipping hidden post {}", path.display());
            continue;
        }
        posts.push(post);
    }

    posts.sort_by(|a, b| b.published.cmp(&a.published));
    Ok(posts)
}

/// Searches `source_directory` for project files (extension = `.md`, not
/// recursive) and returns them ordered by [`project::compare`]. Files
/// without frontmatter are not projects and are skipped.
pub fn parse_projects(source_directory: &Path) -> Result<Vec<Project>> {
    let mut projects = Vec::new();
    for path in markdown_files(source_directory)? {
        match read_frontmatter(&path)? {
            Some(frontmatter) => projects.push(Project::from_frontmatter(&path, frontmatter)),
            None => debug!("skipping {}: no frontmatter", path.display()),
        }
    }

    projects.sort_by(project::compare);
    Ok(projects)
}

/// Lists the Markdown files directly inside `dir`, sorted by file name. A
/// missing directory has no files.
fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!("{} is not a directory, treating it as empty", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for result in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = result?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().map_or(false, |ext| ext == MARKDOWN_EXTENSION)
        {
            files.push(path.to_owned());
        }
    }
    Ok(files)
}

fn read_frontmatter(path: &Path) -> Result<Option<Frontmatter>> {
    let contents = fs::read_to_string(path).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })?;
    Ok(frontmatter::parse(&contents).0)
}

/// Represents the result of a loading operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading posts or projects.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source directory or file can't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when listing a source directory fails.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "reading '{}': {}", path.display(), err),
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator while listing directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_parse_posts_testdata() -> Result<()> {
        let posts = parse_posts(Path::new("./testdata/site/posts"))?;
        let slugs: Vec<&str> = posts.iter().filter_map(Post::slug).collect();
        assert_eq!(
            vec!["second-post", "first-post", "malformed", "undated"],
            slugs
        );
        Ok(())
    }

    #[test]
    fn test_parse_posts_sorted_and_filtered() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "---\ntitle: A\npublished-date: 2024-01-01T00:00:00\n---\n");
        write(dir.path(), "b.md", "---\ntitle: B\npublished-date: 2024-06-01T00:00:00\nhide: true\n---\n");
        write(dir.path(), "c.md", "---\ntitle: C\npublished-date: 2023-12-01T00:00:00\n---\n");
        write(dir.path(), "d.md", "---\ntitle: D\npublished-date: 2024-06-01T00:00:00\n---\n");
        write(dir.path(), "e.md", "no frontmatter at all\n");
        write(dir.path(), "notes.txt", "---\ntitle: not a post\n---\n");

        let posts = parse_posts(dir.path())?;
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["D", "A", "C", "null"], titles);
        assert_eq!(date(2024, 6, 1), posts[0].published);
        assert!(posts.iter().all(|p| !p.hidden));
        Ok(())
    }

    #[test]
    fn test_newest_first_skipping_hidden() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "one.md", "---\npublished-date: 2024-01-01\n---\n");
        write(dir.path(), "two.md", "---\npublished-date: 2024-06-01\n---\n");
        write(dir.path(), "three.md", "---\npublished-date: 2023-12-01\n---\n");
        write(dir.path(), "four.md", "---\npublished-date: 2024-03-01\nhide: true\n---\n");

        let dates: Vec<_> = parse_posts(dir.path())?.iter().map(|p| p.published).collect();
        assert_eq!(
            vec![date(2024, 6, 1), date(2024, 1, 1), date(2023, 12, 1)],
            dates
        );
        Ok(())
    }

    #[test]
    fn test_parse_posts_missing_directory() -> Result<()> {
        assert!(parse_posts(Path::new("./testdata/does-not-exist"))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_projects() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.md", "---\ntitle: B\npriority: 2\n---\n");
        write(dir.path(), "a.md", "---\ntitle: A\n---\n");
        write(dir.path(), "c.md", "---\ntitle: C\npriority: 1\n---\n");
        write(dir.path(), "d.md", "no frontmatter\n");

        let projects = parse_projects(dir.path())?;
        let slugs: Vec<&str> = projects.iter().filter_map(Project::slug).collect();
        assert_eq!(vec!["c", "b", "a"], slugs);
        Ok(())
    }
}
