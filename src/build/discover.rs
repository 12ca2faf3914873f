use super::BuildError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What to do when the root handed to [`discover_subdirs`] is not a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRoot {
    /// Fail with [`BuildError::MissingRoot`]
    Error,
    /// Treat the root as an empty tree
    Empty,
}

/// Collect every directory strictly below `root`, relative to `root`.
///
/// Symlinks are not followed, so a symlink loop cannot make the walk
/// diverge.
pub fn discover_subdirs(root: &Path, missing: MissingRoot) -> Result<BTreeSet<PathBuf>, BuildError> {
    let mut subdirs = BTreeSet::new();
    discover_into(root, missing, &mut subdirs)?;
    Ok(subdirs)
}

/// Like [`discover_subdirs`] but adds to an existing set.
pub fn discover_into(
    root: &Path,
    missing: MissingRoot,
    subdirs: &mut BTreeSet<PathBuf>,
) -> Result<(), BuildError> {
    if !root.is_dir() {
        return match missing {
            MissingRoot::Error => Err(BuildError::MissingRoot {
                path: root.to_path_buf(),
            }),
            MissingRoot::Empty => {
                warn!(root = %root.display(), "Directory not found, treating as empty");
                Ok(())
            }
        };
    }

    let before = subdirs.len();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|source| BuildError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            subdirs.insert(relative.to_path_buf());
        }
    }

    debug!(
        root = %root.display(),
        found = subdirs.len() - before,
        "Discovered subdirectories"
    );
    Ok(())
}
