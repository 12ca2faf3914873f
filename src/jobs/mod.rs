//! Batch job submission for the signal systematics scan
//!
//! The `.root` files of an input directory are split into nearly equal
//! chunks, one shell script is written per chunk and every script is handed
//! to the queue's submit command.

use crate::process::{CommandSpec, ProcessRunner};
use crate::util::full_path;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment set-up sourced by every job script
pub const DEFAULT_SETUP_SCRIPT: &str = "/net/cms2/cms2r0/babymaker/cmsset_default.sh";

#[derive(Debug, Error)]
pub enum JobsError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input directory does not exist: {}", path.display())]
    MissingInput { path: PathBuf },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> JobsError {
    let path = path.to_path_buf();
    move |source| JobsError::Io { path, source }
}

#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Directory containing the signal ntuples
    pub in_dir: PathBuf,
    /// Directory receiving the systematics text files
    pub out_dir: PathBuf,
    /// Upper bound on the number of jobs
    pub num_jobs: usize,
    /// Pass `--fake_PU` to the scan executable
    pub fake_pu: bool,
    /// Scan executable run on every file
    pub executable: PathBuf,
    /// `src` directory of the software release the jobs set up
    pub release_src: PathBuf,
    pub setup_script: String,
    pub submit_program: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub out_dir: PathBuf,
    pub run_dir: PathBuf,
    pub scripts: Vec<PathBuf>,
    /// Scripts the submit command accepted
    pub submitted: usize,
    /// Scripts whose submission could not be launched or was rejected
    pub failed: usize,
}

/// Split `items` into `n` consecutive chunks whose sizes differ by at most
/// one; the first `len % n` chunks are the larger ones. `n == 0` counts as 1.
pub fn array_split<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    let n = n.max(1);
    let (base, extra) = (items.len() / n, items.len() % n);
    let mut chunks = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let len = base + usize::from(i < extra);
        chunks.push(items[start..start + len].to_vec());
        start += len;
    }
    chunks
}

/// `.root` files directly inside `dir`, sorted
pub fn root_files(dir: &Path) -> Result<Vec<PathBuf>, JobsError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "root") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Shell script processing `files` one after another.
pub fn render_script(files: &[PathBuf], options: &SubmitOptions, out_dir: &Path) -> String {
    let mut script = String::new();
    let _ = writeln!(script, "#! /bin/bash");
    let _ = writeln!(script);
    let _ = writeln!(script, "DIRECTORY=`pwd`");
    let _ = writeln!(script, "cd {}", options.release_src.display());
    let _ = writeln!(script, ". {}", options.setup_script);
    let _ = writeln!(script, "eval `scramv1 runtime -sh`");
    let _ = writeln!(script, "cd $DIRECTORY");

    for (i, file) in files.iter().enumerate() {
        let dir = file.parent().unwrap_or(Path::new("."));
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        let _ = writeln!(script);
        let _ = writeln!(
            script,
            "echo Starting to process file {} of {}",
            i + 1,
            files.len()
        );
        let _ = write!(
            script,
            "{} -i {} -f {} -o {}",
            options.executable.display(),
            dir.display(),
            name,
            out_dir.display()
        );
        if options.fake_pu {
            let _ = write!(script, " --fake_PU");
        }
        let _ = writeln!(script);
    }
    script
}

fn write_script(path: &Path, contents: &str) -> Result<(), JobsError> {
    fs::write(path, contents).map_err(io_err(path))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(io_err(path))?;
    }
    Ok(())
}

/// Write one script per non-empty chunk and submit it.
///
/// Submission does not wait for the jobs; only the launch status of the
/// submit command is checked.
pub fn submit_jobs<R: ProcessRunner>(
    runner: &R,
    options: &SubmitOptions,
) -> Result<SubmitReport, JobsError> {
    let in_dir = full_path(&options.in_dir).map_err(io_err(&options.in_dir))?;
    if !in_dir.is_dir() {
        return Err(JobsError::MissingInput { path: in_dir });
    }
    let out_dir = full_path(&options.out_dir).map_err(io_err(&options.out_dir))?;
    let run_dir = out_dir.join("run");
    fs::create_dir_all(&run_dir).map_err(io_err(&run_dir))?;

    let files = root_files(&in_dir)?;
    debug!(files = files.len(), jobs = options.num_jobs, "Splitting input files");

    let mut report = SubmitReport {
        out_dir: out_dir.clone(),
        run_dir: run_dir.clone(),
        ..Default::default()
    };

    for chunk in array_split(&files, options.num_jobs)
        .into_iter()
        .filter(|c| !c.is_empty())
    {
        let script = run_dir.join(format!("syscalc_scan_{}.sh", report.scripts.len()));
        write_script(&script, &render_script(&chunk, options, &out_dir))?;

        let spec = CommandSpec::new(&options.submit_program).arg(script.display().to_string());
        match runner.run(&spec) {
            Ok(output) if output.is_success() => report.submitted += 1,
            Ok(output) => {
                warn!(script = %script.display(), code = output.exit_code(), "Submission rejected");
                report.failed += 1;
            }
            Err(err) => {
                warn!(script = %script.display(), error = %err, "Could not launch submission");
                report.failed += 1;
            }
        }
        report.scripts.push(script);
    }

    info!(
        submitted = report.submitted,
        failed = report.failed,
        out_dir = %out_dir.display(),
        "Job submission finished"
    );
    Ok(report)
}
