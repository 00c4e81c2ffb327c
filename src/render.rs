//! Defines the [`Template`] type, a named wrapper around [`gtmpl::Template`].
//!
//! Templates use Go `text/template` syntax (`{{.title}}`, `{{range .posts}}`,
//! `{{if .editDate}}`, `{{index .tagCounts "rust"}}`, ...). They can only read
//! the data context they are given; there is no way for a template to run
//! arbitrary code.

use gtmpl::Context;
use gtmpl_value::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Template {
    name: String,
    inner: gtmpl::Template,
}

impl Template {
    /// Parses `source` into a template. `name` identifies the template in
    /// error messages.
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Template> {
        let name = name.into();
        let mut inner = gtmpl::Template::default();
        inner.parse(source).map_err(|err| Error::Parse {
            name: name.clone(),
            err,
        })?;
        Ok(Template { name, inner })
    }

    /// Reads and parses the template file at `path`.
    pub fn load(path: &Path) -> Result<Template> {
        let source = fs::read_to_string(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        Template::parse(path.display().to_string(), &source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes the template against `value`, which is typically a
    /// [`Value::Object`].
    pub fn render(&self, value: &Value) -> Result<String> {
        let execute_error = |err: String| Error::Execute {
            name: self.name.clone(),
            err,
        };
        let context = Context::from(value.clone()).map_err(execute_error)?;
        self.inner.render(&context).map_err(execute_error)
    }
}

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading, parsing, or executing a template.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned for template syntax errors.
    Parse { name: String, err: String },

    /// Returned for errors while executing a template.
    Execute { name: String, err: String },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::Parse { name, err } => write!(f, "Parsing template '{}': {}", name, err),
            Error::Execute { name, err } => {
                write!(f, "Executing template '{}': {}", name, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { path: _, err } => Some(err),
            Error::Parse { .. } => None,
            Error::Execute { .. } => None,
        }
    }
}
