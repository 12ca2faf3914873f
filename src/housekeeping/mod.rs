//! Source tree housekeeping
//!
//! - [`backups`]: remove editor backup files
//! - [`sync`]: refresh the shared variable definitions from another repository

pub mod backups;
pub mod sync;

pub use backups::{is_backup_name, remove_backups, BackupReport};
pub use sync::{sync_variables, SyncOptions, SyncReport};

use crate::process::ProcessError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HousekeepingError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
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

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("git clone of {repo} failed with exit code {code}")]
    CloneFailed { repo: String, code: i32 },

    #[error("Cloned repository has no '{}' folder", path.display())]
    MissingFolder { path: PathBuf },
}
