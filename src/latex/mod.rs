//! LaTeX post-processing
//!
//! Tables produced by the analysis executables are plain `.tex` documents.
//! This module compiles them to PDF and builds the signal systematics summary
//! table. The compiler always receives absolute paths and an explicit
//! `-output-directory`; ra4draw never changes its own working directory.

pub mod sys_table;
pub mod texify;

pub use sys_table::{write_sys_table, SysTableOptions};
pub use texify::{texify, TexifyAction, TexifyOptions, TexifyReport};

use crate::process::{CommandSpec, OutputMode, ProcessError, ProcessRunner};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LatexError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Invalid input pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Bad systematics bin '{bin}' in {}: {reason}", path.display())]
    BadBin {
        path: PathBuf,
        bin: String,
        reason: String,
    },
}

impl LatexError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> LatexError {
        let path = path.to_path_buf();
        move |source| LatexError::Io { path, source }
    }
}

/// Command compiling `tex` into `out_dir` in batch mode
pub fn latex_command(program: &str, tex: &Path, out_dir: &Path) -> CommandSpec {
    CommandSpec::new(program)
        .args(["--interaction", "batchmode"])
        .arg(format!("-output-directory={}", out_dir.display()))
        .arg(tex.display().to_string())
        .output(OutputMode::Quiet)
}

/// Run one LaTeX pass over `tex`, writing into `out_dir`.
///
/// The child runs in the directory of `tex` so relative `\input` paths
/// resolve. Returns whether the expected PDF exists afterwards.
pub fn compile_tex<R: ProcessRunner>(
    runner: &R,
    program: &str,
    tex: &Path,
    out_dir: &Path,
) -> Result<bool, LatexError> {
    let mut spec = latex_command(program, tex, out_dir);
    if let Some(parent) = tex.parent() {
        spec = spec.current_dir(parent);
    }
    let output = runner.run(&spec)?;
    let pdf = pdf_path(tex, out_dir);
    debug!(tex = %tex.display(), code = ?output.code, pdf_exists = pdf.exists(), "LaTeX pass finished");
    Ok(pdf.exists())
}

/// Location of the PDF produced for `tex` in `out_dir`
pub fn pdf_path(tex: &Path, out_dir: &Path) -> PathBuf {
    let stem = tex.file_stem().unwrap_or_default().to_string_lossy();
    out_dir.join(format!("{}.pdf", stem))
}
