use super::{CommandSpec, ProcessError, ProcessOutput, ProcessRunner};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Scripted result for one [`MockRunner`] call
#[derive(Debug, Clone)]
pub struct MockOutcome {
    pub output: ProcessOutput,
    /// Files the fake process "writes" before returning
    pub creates: Vec<PathBuf>,
    /// Simulate a program that cannot be launched
    pub spawn_error: bool,
}

impl MockOutcome {
    pub fn success() -> Self {
        Self {
            output: ProcessOutput::success(),
            creates: Vec::new(),
            spawn_error: false,
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            output: ProcessOutput::failure(code, stderr),
            creates: Vec::new(),
            spawn_error: false,
        }
    }

    pub fn spawn_error() -> Self {
        Self {
            spawn_error: true,
            ..Self::success()
        }
    }

    pub fn creating(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates.push(path.into());
        self
    }
}

/// Process runner that records every command and replays scripted outcomes
///
/// Once the script is exhausted every further call succeeds without side
/// effects.
pub struct MockRunner {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outcomes(outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        let runner = Self::new();
        lock(&runner.outcomes).extend(outcomes);
        runner
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        lock(&self.calls).clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        lock(&self.calls).iter().map(ToString::to_string).collect()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for MockRunner {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        lock(&self.calls).push(spec.clone());
        let outcome = lock(&self.outcomes)
            .pop_front()
            .unwrap_or_else(MockOutcome::success);

        if outcome.spawn_error {
            return Err(ProcessError::Spawn {
                command: spec.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock spawn failure"),
            });
        }

        for path in &outcome.creates {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(path, b"");
        }

        Ok(outcome.output)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_in_order_then_succeeds() {
        let runner = MockRunner::with_outcomes([MockOutcome::failure(2, "bad")]);
        let spec = CommandSpec::new("make");

        assert_eq!(runner.run(&spec).unwrap().code, Some(2));
        assert!(runner.run(&spec).unwrap().is_success());
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_creates_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("out/table.tex");
        let runner = MockRunner::with_outcomes([MockOutcome::success().creating(&target)]);

        runner.run(&CommandSpec::new("exe")).unwrap();
        assert!(target.is_file());
    }

    #[test]
    fn test_spawn_error() {
        let runner = MockRunner::with_outcomes([MockOutcome::spawn_error()]);
        assert!(runner.run(&CommandSpec::new("exe")).is_err());
        assert_eq!(runner.command_lines(), vec!["exe".to_string()]);
    }
}
