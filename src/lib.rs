//! ra4draw - build orchestration and post-processing for the ra4_draw tree
//!
//! The analysis code is C++ compiled by `make`; this crate drives everything
//! around it: preparing the build layout, running the analysis executables
//! over parameter scans, and turning their output into PDF tables and plots.
//!
//! # Example Usage
//!
//! ```no_run
//! use ra4draw::batch::{BatchPlan, BatchRunner};
//! use ra4draw::process::SystemRunner;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = BatchPlan::from_file(Path::new("plans/all_preds.toml"))?;
//! let runner = BatchRunner::new(SystemRunner, Path::new("."), "pdflatex")?;
//! let report = runner.run(&plan)?;
//! for line in report.failure_lines() {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`build`]: subdirectory discovery, Makefile fragment, make invocation, clean
//! - [`batch`]: plan files and the batch runner
//! - [`plot`]: limit-ratio series and charts
//! - [`latex`]: `.tex` to PDF compilation and the systematics table
//! - [`jobs`]: batch queue submission
//! - [`housekeeping`]: backup removal and variables sync
//! - [`process`]: the subprocess seam shared by all of the above

pub mod batch;
pub mod build;
pub mod cli;
pub mod config;
pub mod housekeeping;
pub mod jobs;
pub mod latex;
pub mod plot;
pub mod process;
pub mod util;

pub use batch::{BatchError, BatchPlan, BatchReport, BatchRunner, InvocationOutcome};
pub use build::{BuildError, BuildInvoker, BuildOutcome, DirStructure, Verbosity};
pub use config::{ConfigError, Ra4DrawConfig};
pub use latex::LatexError;
pub use plot::PlotError;
pub use process::{CommandSpec, ProcessError, ProcessRunner, SystemRunner};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_ra4draw() {
        assert_eq!(NAME, "ra4draw");
    }
}
