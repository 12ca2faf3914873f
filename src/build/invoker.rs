use super::discover::{discover_into, MissingRoot};
use super::ensure::ensure_subdirs;
use super::rules::write_fragment;
use super::{BuildError, DirStructure, Verbosity};
use crate::config::Ra4DrawConfig;
use crate::process::{CommandSpec, OutputMode, ProcessRunner};
use crate::util::full_path;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of one `make` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    Failed {
        /// Exit code to propagate to the caller
        code: i32,
        /// Everything make wrote to stderr
        stderr: String,
    },
}

/// Prepares the directory layout and runs make for one project root
pub struct BuildInvoker<'a, R: ProcessRunner> {
    project_root: PathBuf,
    dirs: DirStructure,
    config: &'a Ra4DrawConfig,
    runner: R,
}

impl<'a, R: ProcessRunner> BuildInvoker<'a, R> {
    pub fn new(
        project_root: &Path,
        dirs: DirStructure,
        config: &'a Ra4DrawConfig,
        runner: R,
    ) -> Result<Self, BuildError> {
        let project_root = full_path(project_root).map_err(|source| BuildError::Resolve {
            path: project_root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            project_root,
            dirs,
            config,
            runner,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn fragment_path(&self) -> PathBuf {
        self.project_root.join(&self.config.fragment_name)
    }

    fn resolve(&self, dir: &Path) -> Result<PathBuf, BuildError> {
        full_path(self.project_root.join(dir)).map_err(|source| BuildError::Resolve {
            path: dir.to_path_buf(),
            source,
        })
    }

    /// Discover the subdirectories of the source and include trees and create
    /// them under all five roots.
    ///
    /// The source tree must exist; a missing include tree contributes nothing.
    pub fn prepare_subdirs(&self) -> Result<BTreeSet<PathBuf>, BuildError> {
        info!("Checking source code subdirectories");
        let src = self.resolve(&self.dirs.src)?;
        let inc = self.resolve(&self.dirs.inc)?;

        let mut subdirs = BTreeSet::new();
        discover_into(&src, MissingRoot::Error, &mut subdirs)?;
        discover_into(&inc, MissingRoot::Empty, &mut subdirs)?;

        for root in self.dirs.roots() {
            ensure_subdirs(&self.resolve(root)?, &subdirs)?;
        }

        debug!(count = subdirs.len(), "Subdirectories in place");
        Ok(subdirs)
    }

    /// Prepare subdirectories and regenerate the build fragment.
    pub fn set_dirs(&self) -> Result<BTreeSet<PathBuf>, BuildError> {
        let subdirs = self.prepare_subdirs()?;
        write_fragment(&self.fragment_path(), &subdirs)?;
        Ok(subdirs)
    }

    /// The make invocation used by [`BuildInvoker::build`]
    pub fn make_command(&self, verbosity: Verbosity) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.config.make_program)
            .args(["-j".to_string(), self.config.jobs.to_string()])
            .args(["-k", "-r", "-R"])
            .args(self.dirs.make_variables())
            .current_dir(&self.project_root)
            .output(OutputMode::CaptureStderr);
        if let Some(flag) = verbosity.make_flag() {
            spec = spec.arg(flag);
        }
        spec
    }

    /// Regenerate the layout, then run make in keep-going mode.
    ///
    /// A nonzero make exit is reported as [`BuildOutcome::Failed`]; only
    /// filesystem problems and a make that cannot be launched are errors.
    pub fn build(&self, verbosity: Verbosity) -> Result<BuildOutcome, BuildError> {
        self.set_dirs()?;

        let spec = self.make_command(verbosity);
        info!(command = %spec, "Running build");
        let output = self.runner.run(&spec)?;

        if output.is_success() {
            Ok(BuildOutcome::Succeeded)
        } else {
            warn!(code = ?output.code, "Build failed");
            Ok(BuildOutcome::Failed {
                code: output.exit_code(),
                stderr: output.stderr,
            })
        }
    }

    /// Ask the Makefile to print its variables.
    pub fn print_vars(&self) -> Result<(), BuildError> {
        let spec = CommandSpec::new(&self.config.make_program)
            .args(["test", "-r", "-R", "--silent"])
            .args(self.dirs.make_variables())
            .arg("print_vars")
            .current_dir(&self.project_root);

        let output = self.runner.run(&spec)?;
        if output.is_success() {
            Ok(())
        } else {
            Err(BuildError::MakeFailed {
                code: output.exit_code(),
            })
        }
    }
}
