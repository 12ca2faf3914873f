use super::HousekeepingError;
use crate::process::{CommandSpec, OutputMode, ProcessRunner};
use crate::util::full_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Folder copied out of the cloned repository
pub const VARIABLES_FOLDER: &str = "variables";

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub git_program: String,
    pub repo: String,
    /// Directory replaced by the repository's `variables` folder
    pub dest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub dest: PathBuf,
    pub files_copied: usize,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> HousekeepingError {
    let path = path.to_path_buf();
    move |source| HousekeepingError::Io { path, source }
}

/// Clone `options.repo` into a temporary directory and replace
/// `options.dest` with its `variables` folder.
///
/// The destination is only touched after a successful clone.
pub fn sync_variables<R: ProcessRunner>(
    runner: &R,
    options: &SyncOptions,
) -> Result<SyncReport, HousekeepingError> {
    let dest = full_path(&options.dest).map_err(io_err(&options.dest))?;
    let clone_dir = tempfile::Builder::new()
        .prefix("ra4draw_sync_")
        .tempdir()
        .map_err(io_err(&std::env::temp_dir()))?;

    let spec = CommandSpec::new(&options.git_program)
        .args(["clone", options.repo.as_str()])
        .arg(clone_dir.path().display().to_string())
        .output(OutputMode::Quiet);
    let output = runner.run(&spec)?;
    if !output.is_success() {
        return Err(HousekeepingError::CloneFailed {
            repo: options.repo.clone(),
            code: output.exit_code(),
        });
    }

    let source = clone_dir.path().join(VARIABLES_FOLDER);
    if !source.is_dir() {
        return Err(HousekeepingError::MissingFolder { path: source });
    }

    match fs::remove_dir_all(&dest) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(&dest)(err)),
    }
    let files_copied = copy_tree(&source, &dest)?;

    info!(repo = %options.repo, dest = %dest.display(), files = files_copied, "Synced variables");
    Ok(SyncReport { dest, files_copied })
}

/// Copy the tree below `from` to `to`, returning the number of files.
fn copy_tree(from: &Path, to: &Path) -> Result<usize, HousekeepingError> {
    let mut files = 0;
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|source| HousekeepingError::Walk {
            path: from.to_path_buf(),
            source,
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(io_err(&target))?;
            files += 1;
        }
    }
    Ok(files)
}
