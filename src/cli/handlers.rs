//! Command handlers
//!
//! Each `handle_*` function runs one subcommand against the real system and
//! returns the process exit code. The `run_*` functions hold the logic and
//! take the [`ProcessRunner`] explicitly so they can be driven by tests.

use anyhow::{Context, Result};
use tracing::{debug, error, warn};

use super::commands::{
    BatchArgs, CompileArgs, CompileMode, LimitRatioArgs, RemoveBackupsArgs, SubmitArgs,
    SyncVariablesArgs, SysTableArgs, TexifyArgs,
};
use super::output::{errors_banner, failure_banner, success_banner, OutputFormatter};
use crate::batch::{BatchPlan, BatchRunner};
use crate::build::{clean, BuildError, BuildInvoker, BuildOutcome, DirStructure, Verbosity};
use crate::config::Ra4DrawConfig;
use crate::housekeeping::{remove_backups, sync_variables, SyncOptions};
use crate::jobs::{submit_jobs, SubmitOptions, DEFAULT_SETUP_SCRIPT};
use crate::latex::{texify, write_sys_table, SysTableOptions, TexifyOptions};
use crate::plot::{compute_series, load_table, write_plot, ChartStyle, LoadOptions};
use crate::process::{ProcessRunner, SystemRunner};
use crate::util::full_path;

const GIT_PROGRAM: &str = "git";

fn exit_code(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            1
        }
    }
}

fn flag(failed: bool) -> i32 {
    i32::from(failed)
}

pub fn handle_compile(args: &CompileArgs, config: &Ra4DrawConfig) -> i32 {
    exit_code(run_compile(args, config, &SystemRunner))
}

pub fn handle_batch(args: &BatchArgs, config: &Ra4DrawConfig) -> i32 {
    exit_code(run_batch(args, config, &SystemRunner))
}

pub fn handle_limit_ratio(args: &LimitRatioArgs) -> i32 {
    exit_code(run_limit_ratio(args))
}

pub fn handle_texify(args: &TexifyArgs, config: &Ra4DrawConfig) -> i32 {
    exit_code(run_texify(args, config, &SystemRunner))
}

pub fn handle_sys_table(args: &SysTableArgs, config: &Ra4DrawConfig) -> i32 {
    exit_code(run_sys_table(args, config, &SystemRunner))
}

pub fn handle_submit(args: &SubmitArgs, config: &Ra4DrawConfig) -> i32 {
    exit_code(run_submit(args, config, &SystemRunner))
}

pub fn handle_remove_backups(args: &RemoveBackupsArgs) -> i32 {
    let report = remove_backups(&args.dirs);
    debug!(removed = report.removed.len(), errors = report.errors.len(), "Backups removed");
    flag(!report.errors.is_empty())
}

pub fn handle_sync_variables(args: &SyncVariablesArgs, config: &Ra4DrawConfig) -> i32 {
    exit_code(run_sync_variables(args, config, &SystemRunner))
}

impl From<&CompileArgs> for DirStructure {
    fn from(args: &CompileArgs) -> Self {
        Self {
            src: args.src_dir.clone(),
            inc: args.inc_dir.clone(),
            make: args.make_dir.clone(),
            obj: args.obj_dir.clone(),
            exe: args.exe_dir.clone(),
        }
    }
}

/// Print the build banners; returns make's exit code.
fn report_build(outcome: BuildOutcome) -> i32 {
    match outcome {
        BuildOutcome::Succeeded => {
            println!("{}", success_banner());
            0
        }
        BuildOutcome::Failed { code, stderr } => {
            eprintln!("{}", errors_banner());
            eprintln!("{}", stderr);
            eprintln!("{}", failure_banner());
            code
        }
    }
}

pub fn run_compile<R: ProcessRunner>(
    args: &CompileArgs,
    config: &Ra4DrawConfig,
    runner: &R,
) -> Result<i32> {
    let mut config = config.clone();
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    let dirs = DirStructure::from(args);

    if args.mode == CompileMode::Clean {
        let root = full_path(&args.root)
            .with_context(|| format!("Failed to resolve {}", args.root.display()))?;
        clean(&root, &dirs, &config.fragment_name).context("Clean failed")?;
        return Ok(0);
    }

    let invoker = BuildInvoker::new(&args.root, dirs, &config, runner)
        .context("Failed to set up build")?;
    match args.mode {
        CompileMode::Build => {
            let outcome = invoker
                .build(Verbosity::from_level(args.verbosity))
                .context("Build failed")?;
            Ok(report_build(outcome))
        }
        CompileMode::SetDirs => {
            invoker.set_dirs().context("Failed to set up directories")?;
            Ok(0)
        }
        CompileMode::PrintVars => match invoker.print_vars() {
            Ok(()) => Ok(0),
            Err(BuildError::MakeFailed { code }) => {
                warn!(code, "print_vars failed");
                Ok(code)
            }
            Err(err) => Err(err).context("print_vars failed"),
        },
        CompileMode::Clean => Ok(0),
    }
}

pub fn run_batch<R: ProcessRunner>(
    args: &BatchArgs,
    config: &Ra4DrawConfig,
    runner: &R,
) -> Result<i32> {
    let plan = BatchPlan::from_file(&args.plan)
        .with_context(|| format!("Failed to load plan {}", args.plan.display()))?;
    let batch = BatchRunner::new(runner, &args.root, config.latex_program.as_str())?;

    if args.dry_run {
        for line in batch.dry_run(&plan)? {
            println!("{}", line);
        }
        return Ok(0);
    }

    if plan.prebuild {
        let invoker = BuildInvoker::new(&args.root, DirStructure::default(), config, runner)
            .context("Failed to set up build")?;
        let code = report_build(invoker.build(Verbosity::Normal).context("Build failed")?);
        if code != 0 {
            return Ok(code);
        }
    }

    let report = batch
        .run(&plan)
        .with_context(|| format!("Batch {} failed", plan.display_name()))?;
    let text = OutputFormatter::new(args.format.into()).format_batch(&report)?;
    print!("{}", text);
    Ok(flag(!report.is_success()))
}

pub fn run_limit_ratio(args: &LimitRatioArgs) -> Result<i32> {
    let options = LoadOptions {
        column: args.column,
        min_key: args.min_key,
    };
    let num = load_table(&args.num, &options)?;
    let den = load_table(&args.den, &options)?;
    let series = compute_series(&num, &den, args.mode)?;

    let outputs = write_plot(&series, &args.output, &ChartStyle::default())
        .context("Failed to write limit ratio plot")?;
    println!(
        "Wrote {} and {}",
        outputs.svg.display(),
        outputs.csv.display()
    );
    Ok(0)
}

pub fn run_texify<R: ProcessRunner>(
    args: &TexifyArgs,
    config: &Ra4DrawConfig,
    runner: &R,
) -> Result<i32> {
    let options = TexifyOptions {
        inputs: args.inputs.clone(),
        output: args.output.clone(),
        tag: args.tag.clone(),
    };
    let report = texify(runner, &config.latex_program, &options).context("Texify failed")?;
    print!(
        "{}",
        OutputFormatter::new(args.format.into()).format_texify(&report)?
    );
    Ok(flag(report.failures() > 0))
}

pub fn run_sys_table<R: ProcessRunner>(
    args: &SysTableArgs,
    config: &Ra4DrawConfig,
    runner: &R,
) -> Result<i32> {
    let options = SysTableOptions {
        output: args.output.clone(),
        inputs: args.inputs.clone(),
        compile: !args.no_compile,
    };
    let summary = write_sys_table(runner, &config.latex_program, &options)
        .context("Failed to build systematics table")?;
    if summary.pdf_produced == Some(false) {
        warn!(output = %summary.output.display(), "LaTeX did not produce a PDF");
    }
    Ok(flag(summary.pdf_produced == Some(false)))
}

pub fn run_submit<R: ProcessRunner>(
    args: &SubmitArgs,
    config: &Ra4DrawConfig,
    runner: &R,
) -> Result<i32> {
    let options = SubmitOptions {
        in_dir: args.in_dir.clone(),
        out_dir: args.out_dir.clone(),
        num_jobs: args.njobs,
        fake_pu: args.fake_pu,
        executable: full_path(&args.exe)
            .with_context(|| format!("Failed to resolve {}", args.exe.display()))?,
        release_src: args.release.join("src"),
        setup_script: DEFAULT_SETUP_SCRIPT.to_string(),
        submit_program: config.submit_program.clone(),
    };
    let report = submit_jobs(runner, &options).context("Job submission failed")?;

    println!("\nSubmitted {} jobs.", report.submitted);
    println!("Text systematics files sent to {}.", report.out_dir.display());
    println!("Shell scripts sent to {}.", report.run_dir.display());
    Ok(flag(report.failed > 0))
}

pub fn run_sync_variables<R: ProcessRunner>(
    args: &SyncVariablesArgs,
    config: &Ra4DrawConfig,
    runner: &R,
) -> Result<i32> {
    let options = SyncOptions {
        git_program: GIT_PROGRAM.to_string(),
        repo: args
            .repo
            .clone()
            .unwrap_or_else(|| config.variables_repo.clone()),
        dest: args.dest.clone(),
    };
    let report = sync_variables(runner, &options).context("Failed to sync variables")?;
    println!(
        "Copied {} files into {}",
        report.files_copied,
        report.dest.display()
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::{CliArgs, Commands};
    use crate::process::{MockOutcome, MockRunner};
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn compile_args(root: &Path, extra: &[&str]) -> CompileArgs {
        let root = root.display().to_string();
        let mut argv = vec!["ra4draw", "compile"];
        argv.extend_from_slice(extra);
        argv.extend(["--root", root.as_str()]);
        match CliArgs::parse_from(argv).command {
            Commands::Compile(args) => args,
            _ => unreachable!(),
        }
    }

    fn config() -> Ra4DrawConfig {
        Ra4DrawConfig {
            make_program: "make".to_string(),
            latex_program: "pdflatex".to_string(),
            submit_program: "JobSubmit.csh".to_string(),
            jobs: 4,
            fragment_name: ".subdirs.mk".to_string(),
            variables_repo: "git@example.com:a/b".to_string(),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_compile_propagates_make_exit_code() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/core")).unwrap();
        let runner = MockRunner::with_outcomes([MockOutcome::failure(2, "error: x")]);

        let code = run_compile(&compile_args(dir.path(), &[]), &config(), &runner).unwrap();

        assert_eq!(code, 2);
        assert!(dir.path().join(".subdirs.mk").is_file());
        assert!(dir.path().join("run/core").is_dir());
        assert!(runner.command_lines()[0].starts_with("make -j 4 -k -r -R SRCDIR=src"));
    }

    #[test]
    fn test_compile_jobs_override() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let runner = MockRunner::new();

        let code =
            run_compile(&compile_args(dir.path(), &["-j", "7", "-v", "0"]), &config(), &runner)
                .unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            runner.command_lines()[0],
            "make -j 7 -k -r -R SRCDIR=src INCDIR=inc MAKEDIR=bin OBJDIR=bin EXEDIR=run --silent"
        );
    }

    #[test]
    fn test_compile_missing_src_is_error() {
        let dir = TempDir::new().unwrap();
        let result = run_compile(&compile_args(dir.path(), &[]), &config(), &MockRunner::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_print_vars_exit_code() {
        let dir = TempDir::new().unwrap();
        let runner = MockRunner::with_outcomes([MockOutcome::failure(2, "")]);
        let code =
            run_compile(&compile_args(dir.path(), &["print_vars"]), &config(), &runner).unwrap();
        assert_eq!(code, 2);
    }

    #[test]
    fn test_clean_on_empty_tree() {
        let dir = TempDir::new().unwrap();
        let runner = MockRunner::new();
        let code = run_compile(&compile_args(dir.path(), &["clean"]), &config(), &runner).unwrap();
        assert_eq!(code, 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_batch_prebuild_failure_stops_batch() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let plan = dir.path().join("plan.toml");
        fs::write(&plan, "executable = \"./run/a.exe\"\nprebuild = true\n").unwrap();

        let args = BatchArgs {
            plan,
            dry_run: false,
            root: dir.path().to_path_buf(),
            format: crate::cli::commands::OutputFormatArg::Human,
        };
        let runner = MockRunner::with_outcomes([MockOutcome::failure(2, "")]);

        assert_eq!(run_batch(&args, &config(), &runner).unwrap(), 2);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_batch_failures_exit_one() {
        let dir = TempDir::new().unwrap();
        let plan = dir.path().join("plan.toml");
        fs::write(
            &plan,
            "executable = \"./run/a.exe\"\nexpected_output = \"out/{m}.tex\"\n[[params]]\nm = \"x\"\n",
        )
        .unwrap();
        let args = BatchArgs {
            plan,
            dry_run: false,
            root: dir.path().to_path_buf(),
            format: crate::cli::commands::OutputFormatArg::Json,
        };

        assert_eq!(run_batch(&args, &config(), &MockRunner::new()).unwrap(), 1);
    }

    #[test]
    fn test_sync_uses_configured_repo() {
        let dir = TempDir::new().unwrap();
        let args = SyncVariablesArgs {
            repo: None,
            dest: dir.path().join("txt/variables"),
        };
        let runner = MockRunner::with_outcomes([MockOutcome::failure(128, "")]);
        assert!(run_sync_variables(&args, &config(), &runner).is_err());
        assert_eq!(runner.calls()[0].args[1], "git@example.com:a/b");
    }
}
