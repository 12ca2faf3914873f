//! Batch runners
//!
//! A [`BatchPlan`] expands into parameter combinations; [`BatchRunner`]
//! launches the plan's executable once per combination, checks the exit code
//! and the expected output of every invocation, optionally compiles produced
//! `.tex` files, and aggregates everything into a [`BatchReport`]. A failed
//! invocation never stops the batch.

pub mod plan;

pub use plan::{render_template, BatchPlan, IntRange, MatrixAxis, ParamSet, CWD_KEY};

use crate::latex::compile_tex;
use crate::process::{CommandSpec, ProcessRunner};
use crate::util::full_path;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to read plan {}: {source}", path.display())]
    ReadPlan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse plan {}: {message}", path.display())]
    ParsePlan { path: PathBuf, message: String },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Unknown placeholder '{{{key}}}' in '{template}'")]
    UnknownPlaceholder { key: String, template: String },

    #[error("Failed to resolve working directory {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How one invocation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success,
    NonZeroExit { code: i32 },
    MissingOutput { path: PathBuf },
    SpawnFailed { message: String },
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success)
    }
}

/// One fully rendered command of a plan
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub command: CommandSpec,
    pub params: ParamSet,
    /// Expected output as rendered from the plan
    pub expected_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvocationRecord {
    pub invocation: Invocation,
    pub outcome: InvocationOutcome,
    /// Whether LaTeX produced a PDF, when compilation was attempted
    pub pdf_produced: Option<bool>,
}

impl fmt::Display for InvocationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = &self.invocation.command;
        match &self.outcome {
            InvocationOutcome::Success => write!(f, "Succeeded: {}", command),
            InvocationOutcome::NonZeroExit { code } => {
                write!(f, "Exit code {}. Command is  {}", code, command)
            }
            InvocationOutcome::MissingOutput { path } => {
                write!(f, "Could not find {}. Command is  {}", path.display(), command)
            }
            InvocationOutcome::SpawnFailed { message } => {
                write!(f, "Could not launch {}: {}", command, message)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub plan: String,
    pub records: Vec<InvocationRecord>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &InvocationRecord> {
        self.records.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// One line per failed invocation, in execution order
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures().map(ToString::to_string).collect()
    }
}

/// Runs batch plans from a fixed working directory
pub struct BatchRunner<R: ProcessRunner> {
    runner: R,
    working_dir: PathBuf,
    latex_program: String,
}

impl<R: ProcessRunner> BatchRunner<R> {
    /// Relative executables and outputs resolve against `working_dir`.
    pub fn new(
        runner: R,
        working_dir: &Path,
        latex_program: impl Into<String>,
    ) -> Result<Self, BatchError> {
        let working_dir = full_path(working_dir).map_err(|source| BatchError::Resolve {
            path: working_dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            runner,
            working_dir,
            latex_program: latex_program.into(),
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Render every invocation of `plan`.
    ///
    /// All templates are checked here, so a plan error surfaces before any
    /// command runs.
    pub fn prepare(&self, plan: &BatchPlan) -> Result<Vec<Invocation>, BatchError> {
        let cwd = self.working_dir.display().to_string();
        let mut invocations = Vec::new();

        for mut params in plan.expand()? {
            params.insert(CWD_KEY.to_string(), cwd.clone());

            let program = render_template(&plan.executable, &params)?;
            let args = plan
                .args
                .iter()
                .map(|a| render_template(a, &params))
                .collect::<Result<Vec<_>, _>>()?;
            let expected_output = plan
                .expected_output
                .as_deref()
                .map(|t| render_template(t, &params).map(PathBuf::from))
                .transpose()?;

            invocations.push(Invocation {
                command: CommandSpec::new(program)
                    .args(args)
                    .current_dir(&self.working_dir),
                params,
                expected_output,
            });
        }

        Ok(invocations)
    }

    /// Command lines `run` would execute
    pub fn dry_run(&self, plan: &BatchPlan) -> Result<Vec<String>, BatchError> {
        Ok(self
            .prepare(plan)?
            .iter()
            .map(|inv| inv.command.to_string())
            .collect())
    }

    pub fn run(&self, plan: &BatchPlan) -> Result<BatchReport, BatchError> {
        let invocations = self.prepare(plan)?;
        info!(
            plan = plan.display_name(),
            invocations = invocations.len(),
            "Running batch"
        );

        let mut report = BatchReport {
            plan: plan.display_name().to_string(),
            records: Vec::with_capacity(invocations.len()),
        };

        for invocation in invocations {
            println!("\n\n{}\n", invocation.command);
            let outcome = self.execute(&invocation);

            let pdf_produced = match (&outcome, &invocation.expected_output) {
                (InvocationOutcome::Success, Some(output)) if plan.latex && is_tex(output) => {
                    Some(self.compile(&self.working_dir.join(output)))
                }
                _ => None,
            };

            if !outcome.is_success() {
                warn!(command = %invocation.command, outcome = ?outcome, "Invocation failed");
            }
            report.records.push(InvocationRecord {
                invocation,
                outcome,
                pdf_produced,
            });
        }

        info!(
            plan = %report.plan,
            total = report.records.len(),
            failed = report.failure_count(),
            "Batch finished"
        );
        Ok(report)
    }

    fn execute(&self, invocation: &Invocation) -> InvocationOutcome {
        let output = match self.runner.run(&invocation.command) {
            Ok(output) => output,
            Err(err) => {
                return InvocationOutcome::SpawnFailed {
                    message: err.to_string(),
                }
            }
        };
        if !output.is_success() {
            return InvocationOutcome::NonZeroExit {
                code: output.exit_code(),
            };
        }
        match &invocation.expected_output {
            Some(path) if !self.working_dir.join(path).is_file() => {
                InvocationOutcome::MissingOutput { path: path.clone() }
            }
            _ => InvocationOutcome::Success,
        }
    }

    fn compile(&self, tex: &Path) -> bool {
        let out_dir = tex.parent().unwrap_or(&self.working_dir);
        match compile_tex(&self.runner, &self.latex_program, tex, out_dir) {
            Ok(produced) => {
                debug!(tex = %tex.display(), produced, "Compiled table");
                produced
            }
            Err(err) => {
                warn!(tex = %tex.display(), error = %err, "LaTeX compilation failed");
                false
            }
        }
    }
}

fn is_tex(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "tex")
}
