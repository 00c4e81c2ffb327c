//! External asset steps and other small artifacts written after the pages.
//!
//! An asset step is an arbitrary command (icon conversion, sprite download,
//! ...) run in the output directory. Steps are independent: a step that
//! can't be spawned or exits unsuccessfully is reported and the remaining
//! steps still run.

use log::{info, warn};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

/// The file GitHub Pages reads the custom domain from.
pub const CNAME_FILE: &str = "CNAME";

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AssetStep {
    /// Identifies the step in log output.
    pub name: String,

    /// The program and its arguments.
    pub command: Vec<String>,
}

impl AssetStep {
    /// Runs the step with `dir` as its working directory and waits for it to
    /// finish.
    pub fn run(&self, dir: &Path) -> Result<(), StepError> {
        let (program, args) = match self.command.split_first() {
            Some(split) => split,
            None => return Err(StepError::EmptyCommand),
        };
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(StepError::Spawn)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(StepError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

/// Runs every step in order, logging failures as warnings. Returns the names
/// of the steps that failed.
pub fn run_steps(steps: &[AssetStep], dir: &Path) -> Vec<String> {
    let mut failed = Vec::new();
    for step in steps {
        match step.run(dir) {
            Ok(()) => info!("asset step `{}` done", step.name),
            Err(e) => {
                warn!("asset step `{}` failed: {}", step.name, e);
                failed.push(step.name.clone());
            }
        }
    }
    failed
}

/// Writes the `CNAME` file for `domain` into `dir`.
pub fn write_cname(dir: &Path, domain: &str) -> io::Result<()> {
    fs::write(dir.join(CNAME_FILE), domain)
}

/// Represents a failed [`AssetStep`].
#[derive(Debug)]
pub enum StepError {
    /// The step has no program to run.
    EmptyCommand,

    /// The program couldn't be started.
    Spawn(io::Error),

    /// The program exited unsuccessfully.
    Failed { status: Option<i32>, stderr: String },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StepError::EmptyCommand => write!(f, "empty command"),
            StepError::Spawn(err) => write!(f, "starting command: {}", err),
            StepError::Failed {
                status: Some(code),
                stderr,
            } => write!(f, "exited with status {}: {}", code, stderr),
            StepError::Failed {
                status: None,
                stderr,
            } => write!(f, "terminated by signal: {}", stderr),
        }
    }
}

impl std::error::Error for StepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StepError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn step(name: &str, command: &[&str]) -> AssetStep {
        AssetStep {
            name: name.to_owned(),
            command: command.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let steps = vec![
            step("broken", &["sh", "-c", "echo nope >&2; exit 3"]),
            step("missing", &["posthorn-no-such-program"]),
            step("empty", &[]),
            step("icon", &["sh", "-c", "echo icon > favicon.ico"]),
        ];

        let failed = run_steps(&steps, dir.path());

        assert_eq!(vec!["broken", "missing", "empty"], failed);
        assert_eq!(
            "icon\n",
            fs::read_to_string(dir.path().join("favicon.ico")).unwrap()
        );
    }

    #[test]
    fn test_failed_step_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        match step("x", &["sh", "-c", "echo oops >&2; exit 2"]).run(dir.path()) {
            Err(e @ StepError::Failed { .. }) => {
                assert_eq!("exited with status 2: oops", e.to_string())
            }
            other => panic!("expected a failure, got {:?}", other),
        }
    }

    #[test]
    fn test_write_cname() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        write_cname(dir.path(), "blog.example.org")?;
        assert_eq!(
            "blog.example.org",
            fs::read_to_string(dir.path().join(CNAME_FILE))?
        );
        Ok(())
    }
}
