use crate::util::full_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub removed: Vec<PathBuf>,
    /// Problems that were reported and skipped
    pub errors: Vec<String>,
}

/// `foo~` and `#foo#` are editor backups; a lone `#` counts as well
pub fn is_backup_name(name: &str) -> bool {
    name.ends_with('~') || (name.starts_with('#') && name.ends_with('#'))
}

/// Recursively delete backup files below each of `dirs`.
///
/// Unreadable directories and undeletable files are reported on stdout and
/// skipped. A root that does not exist is skipped silently. Symlinks are not
/// followed.
pub fn remove_backups<P: AsRef<Path>>(dirs: &[P]) -> BackupReport {
    let mut report = BackupReport::default();

    for dir in dirs {
        let root = match full_path(dir.as_ref()) {
            Ok(root) => root,
            Err(err) => {
                report.note(format!(
                    "Cannot resolve {} ({})",
                    dir.as_ref().display(),
                    err
                ));
                continue;
            }
        };

        match fs::symlink_metadata(&root) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %root.display(), "Skipping missing directory");
                continue;
            }
            _ => {}
        }

        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(&root).display().to_string();
                    report.note(format!("Cannot access directory {} ({})", path, err));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if !is_backup_name(&entry.file_name().to_string_lossy()) {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!(path = %entry.path().display(), "Removed backup");
                    report.removed.push(entry.into_path());
                }
                Err(err) => report.note(format!(
                    "Cannot remove file {} ({})",
                    entry.path().display(),
                    err
                )),
            }
        }
    }

    report
}

impl BackupReport {
    fn note(&mut self, message: String) {
        println!("{}", message);
        warn!("{}", message);
        self.errors.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yare::parameterized;

    #[parameterized(
        tilde = { "compile.py~", true },
        autosave = { "#plot.cpp#", true },
        lone_hash = { "#", true },
        hash_prefix_only = { "#notes", false },
        regular = { "plot.cpp", false },
    )]
    fn test_is_backup_name(name: &str, expected: bool) {
        assert_eq!(is_backup_name(name), expected);
    }

    #[test]
    fn test_removes_nested_backups_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/core")).unwrap();
        for name in ["a.cpp", "a.cpp~", "src/#b.cpp#", "src/core/c.hpp~", "src/core/c.hpp"] {
            fs::write(root.join(name), "").unwrap();
        }

        let report = remove_backups(&[root]);

        assert_eq!(report.removed.len(), 3);
        assert!(report.errors.is_empty());
        assert!(root.join("a.cpp").exists());
        assert!(root.join("src/core/c.hpp").exists());
        assert!(!root.join("src/#b.cpp#").exists());
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.cpp~"), "").unwrap();

        let report = remove_backups(&[dir.path().join("absent"), dir.path().to_path_buf()]);

        assert!(report.errors.is_empty());
        assert_eq!(report.removed.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("x~"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // root ignores permission bits
        let readable = fs::read_dir(&locked).is_ok();

        let report = remove_backups(&[dir.path()]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert_eq!(report.errors.len(), 1);
            assert!(report.errors[0].starts_with("Cannot access directory"));
        }
    }
}
