//! External process execution
//!
//! Every subprocess ra4draw launches (make, pdflatex, the analysis
//! executables, git, the job submitter) goes through the [`ProcessRunner`]
//! trait so commands can be exercised against a scripted runner in tests.

mod mock;
mod system;

pub use mock::{MockOutcome, MockRunner};
pub use system::SystemRunner;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while launching a process
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started at all
    #[error("Failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// How the child's output streams are wired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Inherit stdout and stderr from ra4draw
    #[default]
    Inherit,
    /// Inherit stdout, capture stderr into [`ProcessOutput::stderr`]
    CaptureStderr,
    /// Capture both streams
    CaptureAll,
    /// Discard stdout, inherit stderr
    Quiet,
}

/// A fully specified command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub output: OutputMode,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            output: OutputMode::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Working directory of the child only; ra4draw's own cwd is never changed.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when the child was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code to propagate; signal terminations map to 1
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(1)
    }
}

/// Runs external commands and waits for them to finish
pub trait ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        (**self).run(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display_quotes_whitespace() {
        let spec = CommandSpec::new("./run/table_all_preds.exe")
            .args(["-f", "-m", "met200"])
            .arg("two words");
        assert_eq!(
            spec.to_string(),
            "./run/table_all_preds.exe -f -m met200 'two words'"
        );
    }

    #[test]
    fn test_builder_defaults() {
        let spec = CommandSpec::new("make");
        assert!(spec.args.is_empty());
        assert!(spec.current_dir.is_none());
        assert_eq!(spec.output, OutputMode::Inherit);
    }

    #[test]
    fn test_exit_code_for_signal() {
        let output = ProcessOutput {
            code: None,
            ..Default::default()
        };
        assert!(!output.is_success());
        assert_eq!(output.exit_code(), 1);
    }

    #[test]
    fn test_failure_keeps_code() {
        let output = ProcessOutput::failure(2, "boom");
        assert_eq!(output.exit_code(), 2);
        assert_eq!(output.stderr, "boom");
    }
}
