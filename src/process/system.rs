use super::{CommandSpec, OutputMode, ProcessError, ProcessOutput, ProcessRunner};
use std::process::{Command, Stdio};
use tracing::debug;

/// Runs commands on the host with `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        debug!(command = %spec, cwd = ?spec.current_dir, "Launching process");

        let mut command = Command::new(&spec.program);
        command.args(&spec.args).stdin(Stdio::inherit());
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let (stdout, stderr) = match spec.output {
            OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
            OutputMode::CaptureStderr => (Stdio::inherit(), Stdio::piped()),
            OutputMode::CaptureAll => (Stdio::piped(), Stdio::piped()),
            OutputMode::Quiet => (Stdio::null(), Stdio::inherit()),
        };
        command.stdout(stdout).stderr(stderr);

        let output = command.output().map_err(|source| ProcessError::Spawn {
            command: spec.to_string(),
            source,
        })?;

        debug!(command = %spec, code = ?output.status.code(), "Process finished");

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
