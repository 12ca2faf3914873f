use super::{latex_command, pdf_path, LatexError};
use crate::process::ProcessRunner;
use crate::util::full_path;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Extra passes after a successful first compile, for references and TOCs
const RERUN_PASSES: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct TexifyOptions {
    /// Directories scanned for `.tex` files; missing ones are skipped
    pub inputs: Vec<PathBuf>,
    /// Where PDFs go; each input directory when `None`
    pub output: Option<PathBuf>,
    /// Only compile files whose name contains this tag
    pub tag: Option<String>,
}

/// What happened to one `.tex` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "path", rename_all = "snake_case")]
pub enum TexifyAction {
    /// PDF newer than the source already present
    Kept(PathBuf),
    /// A log newer than the source marks it as known-uncompilable
    Ignored(PathBuf),
    /// PDF written to the given path
    Produced(PathBuf),
    /// Compilation failed; the source path
    Failed(PathBuf),
}

impl std::fmt::Display for TexifyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TexifyAction::Kept(p) => write!(f, "Kept pre-existing {}", p.display()),
            TexifyAction::Ignored(p) => write!(f, "Ignoring uncompilable {}", p.display()),
            TexifyAction::Produced(p) => write!(f, "Produced {}", p.display()),
            TexifyAction::Failed(p) => write!(f, "Failed to compile {}", p.display()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TexifyReport {
    pub actions: Vec<TexifyAction>,
}

impl TexifyReport {
    pub fn failures(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, TexifyAction::Failed(_)))
            .count()
    }
}

/// Compile every `.tex` file of the input directories.
pub fn texify<R: ProcessRunner>(
    runner: &R,
    program: &str,
    options: &TexifyOptions,
) -> Result<TexifyReport, LatexError> {
    let mut report = TexifyReport::default();

    let mut in_dirs = BTreeSet::new();
    for dir in options.inputs.iter().filter(|d| d.exists()) {
        in_dirs.insert(full_path(dir).map_err(LatexError::io(dir))?);
    }

    for in_dir in in_dirs {
        let out_dir = match &options.output {
            Some(out) => {
                let out = full_path(out).map_err(LatexError::io(out))?;
                fs::create_dir_all(&out).map_err(LatexError::io(&out))?;
                out
            }
            None => in_dir.clone(),
        };
        let tmp_dir = tempfile::Builder::new()
            .prefix("tmp_texify_")
            .tempdir_in(&out_dir)
            .map_err(LatexError::io(&out_dir))?;
        debug!(input = %in_dir.display(), tmp = %tmp_dir.path().display(), "Texifying directory");

        for tex in tex_files(&in_dir, options.tag.as_deref())? {
            let action = texify_one(runner, program, &tex, &out_dir, tmp_dir.path())?;
            println!("{}", action);
            report.actions.push(action);
        }
    }

    info!(
        files = report.actions.len(),
        failed = report.failures(),
        "Texify finished"
    );
    Ok(report)
}

fn tex_files(dir: &Path, tag: Option<&str>) -> Result<Vec<PathBuf>, LatexError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(LatexError::io(dir))? {
        let entry = entry.map_err(LatexError::io(dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".tex") {
            continue;
        }
        if tag.is_some_and(|t| !name.contains(t)) {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

fn texify_one<R: ProcessRunner>(
    runner: &R,
    program: &str,
    tex: &Path,
    out_dir: &Path,
    tmp_dir: &Path,
) -> Result<TexifyAction, LatexError> {
    let out_pdf = pdf_path(tex, out_dir);
    let out_log = out_pdf.with_extension("log");
    let tmp_pdf = pdf_path(tex, tmp_dir);
    let tmp_log = tmp_pdf.with_extension("log");

    let source_time = modified(tex);
    if is_newer(&out_pdf, source_time) {
        return Ok(TexifyAction::Kept(out_pdf));
    }
    if is_newer(&out_log, source_time) {
        return Ok(TexifyAction::Ignored(tex.to_path_buf()));
    }

    let mut spec = latex_command(program, tex, tmp_dir);
    spec.args.insert(0, "--shell-escape".to_string());
    if let Some(parent) = tex.parent() {
        spec = spec.current_dir(parent);
    }

    runner.run(&spec)?;
    if tmp_pdf.exists() {
        for _ in 0..RERUN_PASSES {
            runner.run(&spec)?;
        }
        fs::rename(&tmp_pdf, &out_pdf).map_err(LatexError::io(&out_pdf))?;
        Ok(TexifyAction::Produced(out_pdf))
    } else {
        warn!(tex = %tex.display(), "LaTeX produced no PDF");
        if tmp_log.exists() {
            fs::rename(&tmp_log, &out_log).map_err(LatexError::io(&out_log))?;
        }
        Ok(TexifyAction::Failed(tex.to_path_buf()))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// `path` exists and is strictly newer than `than`
fn is_newer(path: &Path, than: Option<SystemTime>) -> bool {
    match (modified(path), than) {
        (Some(t), Some(source)) => source < t,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockOutcome, MockRunner};
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    fn tables() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("table_full.tex"), "\\documentclass{article}").unwrap();
        dir
    }

    fn age(path: &Path, seconds: i64) {
        set_file_mtime(path, FileTime::from_unix_time(1_600_000_000 + seconds, 0)).unwrap();
    }

    #[test]
    fn test_keeps_newer_pdf() {
        let dir = tables();
        let tex = dir.path().join("table_full.tex");
        let pdf = dir.path().join("table_full.pdf");
        fs::write(&pdf, "").unwrap();
        age(&tex, 0);
        age(&pdf, 100);

        let runner = MockRunner::new();
        let report = texify(
            &runner,
            "pdflatex",
            &TexifyOptions {
                inputs: vec![dir.path().to_path_buf()],
                ..Default::default()
            },
        )
        .unwrap();

        assert!(matches!(report.actions[0], TexifyAction::Kept(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_ignores_known_uncompilable() {
        let dir = tables();
        let tex = dir.path().join("table_full.tex");
        let log = dir.path().join("table_full.log");
        fs::write(&log, "").unwrap();
        age(&tex, 0);
        age(&log, 100);

        let report = texify(
            &MockRunner::new(),
            "pdflatex",
            &TexifyOptions {
                inputs: vec![dir.path().to_path_buf()],
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(report.actions[0], TexifyAction::Ignored(_)));
    }

    #[test]
    fn test_failed_compile_is_reported() {
        let dir = tables();
        let out = TempDir::new().unwrap();
        let out_dir = out.path().canonicalize().unwrap();

        let runner = MockRunner::with_outcomes([MockOutcome::failure(1, "")]);
        let report = texify(
            &runner,
            "pdflatex",
            &TexifyOptions {
                inputs: vec![dir.path().to_path_buf()],
                output: Some(out_dir.clone()),
                tag: None,
            },
        )
        .unwrap();

        assert_eq!(report.failures(), 1);
        assert_eq!(runner.calls().len(), 1);
        let call = &runner.calls()[0];
        assert_eq!(call.args[0], "--shell-escape");
        assert!(call.args[3].starts_with(&format!("-output-directory={}", out_dir.display())));
        assert!(call.args[3].contains("tmp_texify_"));
    }

    #[test]
    fn test_tag_filter_and_missing_dirs() {
        let dir = tables();
        fs::write(dir.path().join("other.tex"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = tex_files(dir.path(), Some("full")).unwrap();
        assert_eq!(files, vec![dir.path().join("table_full.tex")]);
        assert_eq!(tex_files(dir.path(), None).unwrap().len(), 2);

        let report = texify(
            &MockRunner::new(),
            "pdflatex",
            &TexifyOptions {
                inputs: vec![dir.path().join("absent")],
                ..Default::default()
            },
        )
        .unwrap();
        assert!(report.actions.is_empty());
    }

    #[test]
    fn test_action_messages() {
        assert_eq!(
            TexifyAction::Produced(PathBuf::from("out/a.pdf")).to_string(),
            "Produced out/a.pdf"
        );
        assert_eq!(
            TexifyAction::Failed(PathBuf::from("t/a.tex")).to_string(),
            "Failed to compile t/a.tex"
        );
    }
}
