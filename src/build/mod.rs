//! Native build orchestration
//!
//! The analysis executables are compiled by `make`. Before each build the
//! source and include trees are scanned for subdirectories, the matching
//! subdirectories are created under every output root, and a Makefile
//! fragment with per-subdirectory pattern rules is regenerated.
//!
//! - [`discover`]: collect relative subdirectory paths below a root
//! - [`ensure`]: create missing subdirectories
//! - [`rules`]: emit the Makefile fragment
//! - [`invoker`]: run `make` with the directory layout
//! - [`clean`]: remove generated artifacts

pub mod clean;
pub mod discover;
pub mod ensure;
pub mod invoker;
pub mod rules;

pub use clean::{clean, try_remove, CleanStats};
pub use discover::{discover_subdirs, MissingRoot};
pub use ensure::{ensure_dir, ensure_subdirs};
pub use invoker::{BuildInvoker, BuildOutcome};
pub use rules::{render_rules, write_fragment, write_rules};

use crate::process::ProcessError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the build pipeline
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Directory does not exist: {}", path.display())]
    MissingRoot { path: PathBuf },

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to write build fragment {}: {source}", path.display())]
    WriteFragment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid clean pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to resolve path {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("make exited with code {code}")]
    MakeFailed { code: i32 },
}

/// The five logical roots of the build
///
/// Paths are relative to the project root unless absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirStructure {
    /// Directory containing .cpp and .cxx files
    pub src: PathBuf,
    /// Directory containing .hpp files
    pub inc: PathBuf,
    /// Directory receiving .d dependency files
    pub make: PathBuf,
    /// Directory receiving .o and .a files
    pub obj: PathBuf,
    /// Directory receiving .exe files
    pub exe: PathBuf,
}

impl Default for DirStructure {
    fn default() -> Self {
        Self {
            src: PathBuf::from("src"),
            inc: PathBuf::from("inc"),
            make: PathBuf::from("bin"),
            obj: PathBuf::from("bin"),
            exe: PathBuf::from("run"),
        }
    }
}

impl DirStructure {
    /// `VAR=value` assignments handed to make
    pub fn make_variables(&self) -> Vec<String> {
        vec![
            format!("SRCDIR={}", self.src.display()),
            format!("INCDIR={}", self.inc.display()),
            format!("MAKEDIR={}", self.make.display()),
            format!("OBJDIR={}", self.obj.display()),
            format!("EXEDIR={}", self.exe.display()),
        ]
    }

    /// All five roots in src, inc, obj, make, exe order
    pub fn roots(&self) -> [&PathBuf; 5] {
        [&self.src, &self.inc, &self.obj, &self.make, &self.exe]
    }
}

/// Build tool chattiness, mapped onto make's `--silent` / `--debug`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Silent,
    #[default]
    Normal,
    Debug,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Silent,
            1 => Verbosity::Normal,
            _ => Verbosity::Debug,
        }
    }

    pub fn make_flag(self) -> Option<&'static str> {
        match self {
            Verbosity::Silent => Some("--silent"),
            Verbosity::Normal => None,
            Verbosity::Debug => Some("--debug"),
        }
    }
}
