//! Terminal output for the commands
//!
//! Build banners use ANSI colours. Batch and texify reports can be printed
//! for humans or as JSON for scripts.
//!
//! # Example
//!
//! ```
//! use ra4draw::batch::BatchReport;
//! use ra4draw::cli::output::{OutputFormat, OutputFormatter};
//!
//! let report = BatchReport::default();
//! let text = OutputFormatter::new(OutputFormat::Human)
//!     .format_batch(&report)
//!     .unwrap();
//! assert!(text.contains("0 invocations"));
//! ```

use anyhow::{Context, Result};
use std::fmt::Write as _;

use crate::batch::BatchReport;
use crate::latex::{TexifyAction, TexifyReport};

/// ANSI escape sequences
pub struct Term;

impl Term {
    pub const RED: &'static str = "\x1b[31m";
    pub const GREEN: &'static str = "\x1b[32m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const END: &'static str = "\x1b[0m";
}

pub fn success_banner() -> String {
    format!(
        "\n\n{}{}Compilation succeeded!{}\n",
        Term::GREEN,
        Term::BOLD,
        Term::END
    )
}

pub fn errors_banner() -> String {
    format!(
        "\n\n{}{}################ ERRORS AND WARNINGS ################{}\n",
        Term::RED,
        Term::BOLD,
        Term::END
    )
}

pub fn failure_banner() -> String {
    format!(
        "\n\n{}{}Compilation failed.{}\n",
        Term::RED,
        Term::BOLD,
        Term::END
    )
}

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Machine-readable JSON
    Json,
    /// Plain text summary
    Human,
}

/// Formats command reports
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_batch(&self, report: &BatchReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize batch report to JSON"),
            OutputFormat::Human => Ok(self.format_batch_human(report)),
        }
    }

    pub fn format_texify(&self, report: &TexifyReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize texify report to JSON"),
            OutputFormat::Human => Ok(self.format_texify_human(report)),
        }
    }

    fn format_batch_human(&self, report: &BatchReport) -> String {
        let mut output = String::new();
        let failed = report.failure_count();
        let mark = if failed == 0 { "\u{2713}" } else { "\u{26A0}" };
        let _ = writeln!(
            output,
            "{} Batch {}: {} invocations, {} failed",
            mark,
            report.plan,
            report.records.len(),
            failed
        );
        for line in report.failure_lines() {
            let _ = writeln!(output, "{}", line);
        }
        output
    }

    fn format_texify_human(&self, report: &TexifyReport) -> String {
        let count = |pred: fn(&TexifyAction) -> bool| report.actions.iter().filter(|a| pred(a)).count();
        format!(
            "Texify: {} produced, {} kept, {} ignored, {} failed\n",
            count(|a| matches!(a, TexifyAction::Produced(_))),
            count(|a| matches!(a, TexifyAction::Kept(_))),
            count(|a| matches!(a, TexifyAction::Ignored(_))),
            report.failures()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Invocation, InvocationOutcome, InvocationRecord, ParamSet};
    use crate::process::CommandSpec;
    use std::path::PathBuf;

    fn failed_report() -> BatchReport {
        BatchReport {
            plan: "all_preds".to_string(),
            records: vec![InvocationRecord {
                invocation: Invocation {
                    command: CommandSpec::new("./run/table_all_preds.exe").args(["-m", "met200"]),
                    params: ParamSet::new(),
                    expected_output: Some(PathBuf::from("out/t.tex")),
                },
                outcome: InvocationOutcome::MissingOutput {
                    path: PathBuf::from("out/t.tex"),
                },
                pdf_produced: None,
            }],
        }
    }

    #[test]
    fn test_banners() {
        assert_eq!(
            success_banner(),
            "\n\n\x1b[32m\x1b[1mCompilation succeeded!\x1b[0m\n"
        );
        assert!(errors_banner().contains("ERRORS AND WARNINGS"));
        assert!(failure_banner().contains("Compilation failed."));
    }

    #[test]
    fn test_format_batch_human() {
        let text = OutputFormatter::new(OutputFormat::Human)
            .format_batch(&failed_report())
            .unwrap();
        assert!(text.starts_with("\u{26A0} Batch all_preds: 1 invocations, 1 failed\n"));
        assert!(text.contains("Could not find out/t.tex. Command is  ./run/table_all_preds.exe -m met200"));
    }

    #[test]
    fn test_format_batch_json() {
        let text = OutputFormatter::new(OutputFormat::Json)
            .format_batch(&failed_report())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["plan"], "all_preds");
        assert_eq!(value["records"][0]["outcome"]["status"], "missing_output");
        assert_eq!(value["records"][0]["invocation"]["command"]["args"][1], "met200");
    }

    #[test]
    fn test_format_texify_human() {
        let report = TexifyReport {
            actions: vec![
                TexifyAction::Produced(PathBuf::from("a.pdf")),
                TexifyAction::Failed(PathBuf::from("b.tex")),
            ],
        };
        let text = OutputFormatter::new(OutputFormat::Human)
            .format_texify(&report)
            .unwrap();
        assert_eq!(text, "Texify: 1 produced, 0 kept, 0 ignored, 1 failed\n");
    }
}
