use super::BuildError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Create `path` and any missing parents.
///
/// An existing directory is success; anything else that prevents creation
/// (permissions, a file in the way) is an error.
pub fn ensure_dir(path: &Path) -> Result<(), BuildError> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => Ok(()),
        Err(source) => Err(BuildError::CreateDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Create `base/<subdir>` for every entry of `subdirs`.
pub fn ensure_subdirs(base: &Path, subdirs: &BTreeSet<PathBuf>) -> Result<(), BuildError> {
    for subdir in subdirs {
        let path = base.join(subdir);
        trace!(path = %path.display(), "Ensuring directory");
        ensure_dir(&path)?;
    }
    Ok(())
}
