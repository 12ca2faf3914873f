use super::{BuildError, DirStructure};
use crate::util::full_path;
use glob::Pattern;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Counts of what a clean pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

impl CleanStats {
    fn absorb(&mut self, other: CleanStats) {
        self.files_removed += other.files_removed;
        self.dirs_removed += other.dirs_removed;
    }
}

/// The fixed (directory, pattern) list removed by [`clean`]
pub fn clean_targets(dirs: &DirStructure, fragment_name: &str) -> Vec<(PathBuf, Option<String>)> {
    let here = PathBuf::from(".");
    vec![
        (here.clone(), Some("*~".to_string())),
        (here.clone(), Some("*#".to_string())),
        (dirs.exe.clone(), Some("*.exe".to_string())),
        (dirs.make.clone(), Some("*.d".to_string())),
        (dirs.obj.clone(), Some("*.o".to_string())),
        (dirs.obj.clone(), Some("*.a".to_string())),
        (dirs.inc.clone(), Some("baby*.hpp".to_string())),
        (dirs.src.clone(), Some("baby*.cpp".to_string())),
        (here, Some(fragment_name.to_string())),
    ]
}

/// Remove every generated artifact below `project_root`.
pub fn clean(
    project_root: &Path,
    dirs: &DirStructure,
    fragment_name: &str,
) -> Result<CleanStats, BuildError> {
    let mut stats = CleanStats::default();
    for (dir, pattern) in clean_targets(dirs, fragment_name) {
        stats.absorb(try_remove(&project_root.join(dir), pattern.as_deref())?);
    }
    info!(
        files = stats.files_removed,
        dirs = stats.dirs_removed,
        "Clean finished"
    );
    Ok(stats)
}

/// Remove files below `directory` whose names match `pattern`, then prune
/// every directory left empty (the root included).
///
/// With no pattern the whole directory is removed. Paths that do not exist
/// count as already removed; directories that still have content are left
/// in place.
pub fn try_remove(directory: &Path, pattern: Option<&str>) -> Result<CleanStats, BuildError> {
    let mut stats = CleanStats::default();

    let Some(pattern) = pattern else {
        return match fs::remove_dir_all(directory) {
            Ok(()) => {
                stats.dirs_removed += 1;
                Ok(stats)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(stats),
            Err(source) => Err(BuildError::Remove {
                path: directory.to_path_buf(),
                source,
            }),
        };
    };

    let matcher = Pattern::new(pattern).map_err(|source| BuildError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let root = full_path(directory).map_err(|source| BuildError::Resolve {
        path: directory.to_path_buf(),
        source,
    })?;
    if !root.is_dir() {
        debug!(dir = %root.display(), "Nothing to clean");
        return Ok(stats);
    }

    for entry in WalkDir::new(&root).contents_first(true).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(dir = %root.display(), error = %err, "Skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_dir() {
            match fs::remove_dir(path) {
                Ok(()) => stats.dirs_removed += 1,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::DirectoryNotEmpty | ErrorKind::NotFound
                    ) => {}
                Err(source) => {
                    return Err(BuildError::Remove {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
            continue;
        }

        // Symlinks to directories are listed but never descended into or removed.
        if entry.path_is_symlink() && path.is_dir() {
            continue;
        }

        if !matcher.matches(&entry.file_name().to_string_lossy()) {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(file = %path.display(), "Removed");
                stats.files_removed += 1;
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(BuildError::Remove {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::discover::{discover_subdirs, MissingRoot};
    use crate::build::ensure::ensure_subdirs;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    #[test]
    fn test_pattern_removes_matching_files_only() {
        let dir = TempDir::new().unwrap();
        let run = dir.path().join("run");
        fs::create_dir_all(run.join("hig")).unwrap();
        fs::write(run.join("hig/plot_limit.exe"), "").unwrap();
        fs::write(run.join("texify.py"), "").unwrap();

        let stats = try_remove(&run, Some("*.exe")).unwrap();

        assert_eq!(stats.files_removed, 1);
        assert!(!run.join("hig").exists());
        assert!(run.join("texify.py").is_file());
        assert!(run.is_dir());
    }

    #[test]
    fn test_prunes_root_when_empty() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(bin.join("ra4/mismeas")).unwrap();
        fs::write(bin.join("ra4/mismeas/calc.o"), "").unwrap();

        try_remove(&bin, Some("*.o")).unwrap();
        assert!(!bin.exists());
    }

    #[test]
    fn test_nested_non_empty_dirs_survive() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(bin.join("a/b")).unwrap();
        fs::write(bin.join("a/b/keep.txt"), "").unwrap();

        try_remove(&bin, Some("*.o")).unwrap();
        assert!(bin.join("a/b/keep.txt").is_file());
    }

    #[test]
    fn test_missing_directory_is_noop() {
        let dir = TempDir::new().unwrap();
        let stats = try_remove(&dir.path().join("absent"), Some("*.o")).unwrap();
        assert_eq!(stats, CleanStats::default());
        try_remove(&dir.path().join("absent"), None).unwrap();
    }

    #[test]
    fn test_no_pattern_removes_tree() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("x/y")).unwrap();
        fs::write(out.join("x/y/file"), "").unwrap();

        try_remove(&out, None).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_clean_on_empty_project_succeeds() {
        let dir = TempDir::new().unwrap();
        let stats = clean(dir.path(), &DirStructure::default(), ".subdirs.mk").unwrap();
        assert_eq!(stats.files_removed, 0);
    }

    #[test]
    fn test_clean_removes_generated_sources_and_backups() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("src")).unwrap();
        fs::create_dir_all(base.join("inc")).unwrap();
        fs::write(base.join("src/baby_full.cpp"), "").unwrap();
        fs::write(base.join("src/utilities.cpp"), "").unwrap();
        fs::write(base.join("inc/baby_full.hpp"), "").unwrap();
        fs::write(base.join("notes.txt~"), "").unwrap();
        fs::write(base.join("#scratch#"), "").unwrap();
        fs::write(base.join(".subdirs.mk"), "").unwrap();

        clean(base, &DirStructure::default(), ".subdirs.mk").unwrap();

        assert!(!base.join("src/baby_full.cpp").exists());
        assert!(base.join("src/utilities.cpp").exists());
        assert!(!base.join("inc/baby_full.hpp").exists());
        assert!(!base.join("notes.txt~").exists());
        assert!(!base.join("#scratch#").exists());
        assert!(!base.join(".subdirs.mk").exists());
    }

    #[test]
    fn test_clean_then_discover_then_ensure() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        let wanted: BTreeSet<PathBuf> = ["hig", "ra4", "ra4/mismeas"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let bin = base.join("bin");
        ensure_subdirs(&bin, &wanted).unwrap();
        fs::write(bin.join("ra4/mismeas/plot.o"), "").unwrap();
        fs::write(bin.join("hig/plot.d"), "").unwrap();

        clean(base, &DirStructure::default(), ".subdirs.mk").unwrap();
        assert!(discover_subdirs(&bin, MissingRoot::Empty).unwrap().is_empty());

        ensure_subdirs(&bin, &wanted).unwrap();
        assert_eq!(discover_subdirs(&bin, MissingRoot::Error).unwrap(), wanted);
    }
}
