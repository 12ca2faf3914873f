use crate::plot::{RatioMode, DEFAULT_COLUMN};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Build orchestration and post-processing for the ra4_draw analysis tree
#[derive(Parser, Debug)]
#[command(
    name = "ra4draw",
    about = "Build orchestration and post-processing for the ra4_draw analysis tree",
    version,
    author,
    long_about = "ra4draw compiles the analysis executables, runs them over parameter \
                  combinations described in plan files, and post-processes their output \
                  into PDF tables and plots."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'q',
        long,
        global = true,
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Compile the analysis code",
        long_about = "Discovers source subdirectories, regenerates the Makefile fragment and \
                      runs make.\n\n\
                      Examples:\n  \
                      ra4draw compile\n  \
                      ra4draw compile clean\n  \
                      ra4draw compile build -v 2 --exe_dir run"
    )]
    Compile(CompileArgs),

    #[command(
        about = "Run an executable over the parameter combinations of a plan file",
        long_about = "Expands a plan file into command lines, runs each one, checks exit \
                      codes and expected outputs, and reports every failure at the end.\n\n\
                      Examples:\n  \
                      ra4draw batch plans/all_preds.toml\n  \
                      ra4draw batch plans/hig_sys.toml --dry-run"
    )]
    Batch(BatchArgs),

    #[command(about = "Plot the ratio of two limit tables")]
    LimitRatio(LimitRatioArgs),

    #[command(about = "Compile the .tex files of one or more directories")]
    Texify(TexifyArgs),

    #[command(about = "Build the LaTeX table of signal systematics")]
    SysTable(SysTableArgs),

    #[command(about = "Submit batch jobs computing systematics in the SMS mass plane")]
    Submit(SubmitArgs),

    #[command(about = "Remove editor backup files")]
    RemoveBackups(RemoveBackupsArgs),

    #[command(about = "Replace the variables folder with the one of another repository")]
    SyncVariables(SyncVariablesArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[value(rename_all = "snake_case")]
pub enum CompileMode {
    #[default]
    Build,
    Clean,
    SetDirs,
    PrintVars,
}

#[derive(Parser, Debug, Clone)]
pub struct CompileArgs {
    #[arg(value_enum, default_value = "build", help = "Action to perform")]
    pub mode: CompileMode,

    #[arg(
        short = 'v',
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u8).range(0..=2),
        help = "Verbosity. Lower = less printing"
    )]
    pub verbosity: u8,

    #[arg(long = "src_dir", default_value = "src", help = "Directory containing .cpp and .cxx files")]
    pub src_dir: PathBuf,

    #[arg(long = "inc_dir", default_value = "inc", help = "Directory containing .hpp files")]
    pub inc_dir: PathBuf,

    #[arg(long = "make_dir", default_value = "bin", help = "Directory in which to store .d files")]
    pub make_dir: PathBuf,

    #[arg(long = "obj_dir", default_value = "bin", help = "Directory in which to place .o files")]
    pub obj_dir: PathBuf,

    #[arg(long = "exe_dir", default_value = "run", help = "Directory in which to store .exe files")]
    pub exe_dir: PathBuf,

    #[arg(long, default_value = ".", help = "Project root holding the Makefile")]
    pub root: PathBuf,

    #[arg(
        short = 'j',
        long,
        value_parser = parse_jobs,
        help = "Parallel make jobs (defaults to the number of CPUs)"
    )]
    pub jobs: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct BatchArgs {
    #[arg(value_name = "PLAN", help = "Plan file (TOML)")]
    pub plan: PathBuf,

    #[arg(long, help = "Print the command lines without running them")]
    pub dry_run: bool,

    #[arg(long, default_value = ".", help = "Directory the commands run in")]
    pub root: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Report format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct LimitRatioArgs {
    #[arg(long, value_name = "FILE", help = "Numerator limit table")]
    pub num: PathBuf,

    #[arg(long, value_name = "FILE", help = "Denominator limit table")]
    pub den: PathBuf,

    #[arg(long, default_value_t = DEFAULT_COLUMN, help = "Zero-based column holding the limit")]
    pub column: usize,

    #[arg(long, value_name = "MASS", allow_negative_numbers = true, help = "Ignore masses below this value")]
    pub min_key: Option<i64>,

    #[arg(long, value_enum, default_value = "ratio-minus-one", help = "How the two tables are combined")]
    pub mode: RatioMode,

    #[arg(short = 'o', long, default_value = "limits_ratio.svg", help = "Output chart; a .csv is written next to it")]
    pub output: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct TexifyArgs {
    #[arg(value_name = "DIR", default_value = "tables", help = "Directories containing .tex files")]
    pub inputs: Vec<PathBuf>,

    #[arg(short = 'o', long, value_name = "DIR", help = "Directory for the PDFs (defaults to each input directory)")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Only compile files whose name contains this tag")]
    pub tag: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Report format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct SysTableArgs {
    #[arg(value_name = "OUTPUT", help = "Output LaTeX file containing the table")]
    pub output: PathBuf,

    #[arg(value_name = "INPUT", help = "Input systematics files or glob patterns")]
    pub inputs: Vec<String>,

    #[arg(long = "no_compile", alias = "no-compile", help = "Do not run LaTeX on the resulting file")]
    pub no_compile: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SubmitArgs {
    #[arg(short = 'i', long = "in_dir", help = "Directory containing signal ntuples")]
    pub in_dir: PathBuf,

    #[arg(short = 'o', long = "out_dir", help = "Directory in which to store text systematics files")]
    pub out_dir: PathBuf,

    #[arg(short = 'n', long = "njobs", default_value = "50", help = "Number of jobs to submit")]
    pub njobs: usize,

    #[arg(long = "fake_PU", alias = "fake-pu", help = "Use dummy 10/15 percent PU systematic")]
    pub fake_pu: bool,

    #[arg(long, default_value = "run/ra4/syscalc_scan.exe", help = "Scan executable")]
    pub exe: PathBuf,

    #[arg(long, env = "CMSSW_BASE", help = "Software release the jobs set up")]
    pub release: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct RemoveBackupsArgs {
    #[arg(value_name = "INPUT_DIR", default_value = ".", help = "Directories from which to remove backup files")]
    pub dirs: Vec<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct SyncVariablesArgs {
    #[arg(long, help = "Repository holding the variables folder")]
    pub repo: Option<String>,

    #[arg(long, default_value = "txt/variables", help = "Directory to replace")]
    pub dest: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_jobs(s: &str) -> Result<usize, String> {
    crate::config::parse_jobs(s).map_err(|e| e.to_string())
}
