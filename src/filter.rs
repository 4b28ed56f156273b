//! Seam for the external Humdrum toolchain.
//!
//! The annotator needs the toolchain for exactly one thing: deriving beat
//! metadata (`**cdata-beat` spines) it cannot compute itself. The toolchain is
//! treated as an opaque text filter, so tests can substitute a closure and the
//! CLI can substitute any shell pipeline.

use std::io;
use std::io::Write;
use std::process::{Command, Stdio};

/// A synchronous stream-to-stream transformation: text in, text out.
pub trait StreamFilter {
    fn filter(&self, input: &str) -> Result<String, FilterError>;
}

impl<F> StreamFilter for F
where
    F: Fn(&str) -> Result<String, FilterError>,
{
    fn filter(&self, input: &str) -> Result<String, FilterError> {
        self(input)
    }
}

/// Runs a shell pipeline (e.g. `meter -zfr`) with the stream piped to stdin.
pub struct CommandFilter {
    command_line: String,
}

impl CommandFilter {
    pub fn new(command_line: impl Into<String>) -> Self {
        CommandFilter {
            command_line: command_line.into(),
        }
    }
}

impl StreamFilter for CommandFilter {
    fn filter(&self, input: &str) -> Result<String, FilterError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command_line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(FilterError::Failed {
                command_line: self.command_line.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }
}

#[derive(Debug)]
pub enum FilterError {
    IoError(io::Error),
    /// The pipeline exited with a non-zero status.
    Failed {
        command_line: String,
        stderr: String,
    },
}

impl From<io::Error> for FilterError {
    fn from(v: io::Error) -> Self {
        FilterError::IoError(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_filters() {
        let upper = |input: &str| Ok(input.to_uppercase());
        assert_eq!(upper.filter("**kern").unwrap(), "**KERN");
    }

    #[test]
    fn command_filter_pipes_stdin() {
        let output = CommandFilter::new("cat").filter("=1\n4c").unwrap();
        assert_eq!(output, "=1\n4c");
    }

    #[test]
    fn command_filter_reports_failure() {
        let result = CommandFilter::new("false").filter("");
        assert!(matches!(result, Err(FilterError::Failed { .. })));
    }
}
