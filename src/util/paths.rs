use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Resolve `path` to an absolute path.
///
/// A leading `~` is expanded from `HOME`. Existing paths are canonicalized so
/// symlinks resolve; paths that do not exist yet are returned absolute but
/// otherwise untouched.
pub fn full_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = expand_home(path.as_ref());
    let absolute = if path.is_absolute() {
        path
    } else {
        env::current_dir()?.join(path)
    };

    match absolute.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(absolute),
        Err(err) => Err(err),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
