pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, CompileArgs, CompileMode};
pub use output::{OutputFormat, OutputFormatter, Term};
