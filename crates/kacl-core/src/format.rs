//! Post-processing of rendered changelog text.
//!
//! A [`Formatter`] receives the canonical text once per
//! [`Changelog::render`](crate::Changelog::render) and returns the text to
//! write. Closures work directly; [`CommandFormatter`] pipes the text
//! through an external program such as `prettier --parser markdown`.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from a formatter.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The formatter command exited with a non-zero status.
    #[error("formatter command failed: {command}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code, if available.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// Failed to spawn or talk to the formatter command.
    #[error("failed to execute formatter: {0}")]
    Exec(#[from] std::io::Error),

    /// The formatter wrote something that is not UTF-8.
    #[error("formatter output is not valid UTF-8")]
    InvalidOutput,

    /// A formatter implemented in Rust rejected the text.
    #[error("{0}")]
    Other(String),
}

/// Result alias for formatting.
pub type FormatResult<T> = Result<T, FormatError>;

/// Turns canonical changelog text into its final form.
pub trait Formatter: Send + Sync {
    /// Format `text`.
    ///
    /// # Errors
    ///
    /// Implementation specific; see [`FormatError`].
    fn format(&self, text: String) -> FormatResult<String>;
}

impl<F> Formatter for F
where
    F: Fn(String) -> FormatResult<String> + Send + Sync,
{
    fn format(&self, text: String) -> FormatResult<String> {
        self(text)
    }
}

/// Runs a shell command with the text on stdin and takes its stdout.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    command: String,
    working_dir: Option<Utf8PathBuf>,
}

impl CommandFormatter {
    /// A formatter running `command` through `sh -c`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
        }
    }

    /// Run the command from `dir` instead of the current directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The shell command line.
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Formatter for CommandFormatter {
    #[instrument(skip_all, fields(command = %self.command))]
    fn format(&self, text: String) -> FormatResult<String> {
        let mut command = Command::new("sh");
        command
            .args(["-c", &self.command])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir.as_std_path());
        }

        let mut child = command.spawn()?;
        // stdin is written on its own thread while stdout is drained here.
        let writer = child
            .stdin
            .take()
            .map(|mut stdin| thread::spawn(move || stdin.write_all(text.as_bytes())));
        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
                Ok(_) => {}
                Err(_) => {
                    return Err(FormatError::Other("formatter stdin writer panicked".into()));
                }
            }
        }

        if !output.status.success() {
            return Err(FormatError::CommandFailed {
                command: self.command.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let formatted = String::from_utf8(output.stdout).map_err(|_| FormatError::InvalidOutput)?;
        debug!(bytes = formatted.len(), "formatter finished");
        Ok(formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_formatters() {
        let formatter = |text: String| -> FormatResult<String> { Ok(text.replace('a', "b")) };
        assert_eq!(formatter.format("aaa".into()).unwrap(), "bbb");
    }

    #[test]
    fn command_output_replaces_text() {
        let formatter = CommandFormatter::new("tr a-z A-Z");
        assert_eq!(formatter.format("hello\n".into()).unwrap(), "HELLO\n");
    }

    #[test]
    fn large_input_does_not_deadlock() {
        let text = "line of changelog text\n".repeat(50_000);
        let formatter = CommandFormatter::new("cat");
        assert_eq!(formatter.format(text.clone()).unwrap(), text);
    }

    #[test]
    fn commands_may_ignore_stdin() {
        let formatter = CommandFormatter::new("echo replaced");
        let text = "ignored\n".repeat(100_000);
        assert_eq!(formatter.format(text).unwrap(), "replaced\n");
    }

    #[test]
    fn failing_command_reports_stderr() {
        let formatter = CommandFormatter::new("echo broken >&2; exit 3");
        match formatter.format(String::new()) {
            Err(FormatError::CommandFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn runs_in_the_configured_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        std::fs::write(dir.join("marker").as_std_path(), "x").unwrap();

        let formatter = CommandFormatter::new("ls").in_dir(dir);
        assert_eq!(formatter.format(String::new()).unwrap().trim(), "marker");
    }
}
