//! Signal systematics summary table
//!
//! Input files list, per systematic and process, the relative uncertainty of
//! every analysis bin:
//!
//! ```text
//! SYSTEMATIC lepeff
//!  PROCESSES signal
//!   r4_lowmet_lownj_1b 0.031
//! ```
//!
//! Only region `r4` of the `signal` process is tabulated: 3 MET bins times
//! 2 jet multiplicity bins times 3 b-tag bins.

use super::{compile_tex, LatexError};
use crate::process::ProcessRunner;
use crate::util::full_path;
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

const MET_BINS: [&str; 3] = ["lowmet", "medmet", "highmet"];
const NJETS_BINS: [&str; 2] = ["lownj", "highnj"];
const NB_BINS: [&str; 3] = ["1b", "2b", "3b"];
const TABULATED_REGION: &str = "r4";
const EMPTY_CELL: &str = "-";

/// Rounded percentages per (MET, Njets, Nb) bin
type BinValues = [[[Option<String>; 3]; 2]; 3];

const HEADER: &str = r#"\documentclass{article}
\usepackage{rotating}
\usepackage{amsmath}
\usepackage{multirow}

\newcommand{\cPqb}{\ifmmode{\text{b}}\else{b}}
\newcommand{\MET}{E_{\text{T}}^{\text{miss}}}
\newcommand{\njets}{N_{\text{jets}}}
\newcommand{\nb}{N_{\text{b}}}

\begin{document}

\begin{sidewaystable}[p!]
  \centering
  \caption{Summary of the signal systematic uncertainties. Systematics are considered
           fully correlated between bins and opposite signs indicate anti-correlation.
           Different sources of uncertainties are considered uncorrelated.}
  \label{tab:unc:sig}
  \resizebox{\textwidth}{!}{
  \renewcommand{\arraystretch}{1.2}
  \begin{tabular}[tbp!]{l|c|c|c|c|c|c|c|c|c|c|c|c|c|c|c|c|c|c}\hline\hline
  \multirow{3}{*}{Uncertainty [\%]} & \multicolumn{6}{c|}{$200<\MET\leq350$} & \multicolumn{6}{c|}{$350<\MET\leq500$} & \multicolumn{6}{c}{$\MET>500$}\\
  \cline{2-19} & \multicolumn{3}{c|}{$6\leq\njets\leq8$} & \multicolumn{3}{c|}{$\njets\geq9$} & \multicolumn{3}{c|}{$6\leq\njets\leq8$} & \multicolumn{3}{c|}{$\njets\geq9$} & \multicolumn{3}{c|}{$6\leq\njets\leq8$} & \multicolumn{3}{c|}{$\njets\geq9$}\\
  \cline{2-19} & $\nb=1$ & $\nb=2$ & $\nb\geq3$ & $\nb=1$ & $\nb=2$ & $\nb\geq3$ & $\nb=1$ & $\nb=2$ & $\nb\geq3$ & $\nb=1$ & $\nb=2$ & $\nb\geq3$ & $\nb=1$ & $\nb=2$ & $\nb\geq3$ & $\nb=1$ & $\nb=2$ & $\nb\geq3$\\
"#;

const FOOTER: &str = r#"  \hline\hline
  \end{tabular}
  }
\end{sidewaystable}
\end{document}
"#;

#[derive(Debug, Clone)]
pub struct SysTableOptions {
    /// LaTeX file to write
    pub output: PathBuf,
    /// Input files or glob patterns; directories and non-matches are skipped
    pub inputs: Vec<String>,
    /// Run the LaTeX compiler on the written table
    pub compile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysTableSummary {
    pub output: PathBuf,
    pub models: usize,
    /// Whether a PDF came out, when compilation was requested
    pub pdf_produced: Option<bool>,
}

/// Write the systematics table and optionally compile it.
pub fn write_sys_table<R: ProcessRunner>(
    runner: &R,
    program: &str,
    options: &SysTableOptions,
) -> Result<SysTableSummary, LatexError> {
    let output = full_path(&options.output).map_err(LatexError::io(&options.output))?;
    let inputs = expand_inputs(&options.inputs)?;

    let file = File::create(&output).map_err(LatexError::io(&output))?;
    let mut out = BufWriter::new(file);
    out.write_all(HEADER.as_bytes())
        .map_err(LatexError::io(&output))?;
    for input in &inputs {
        let reader = BufReader::new(File::open(input).map_err(LatexError::io(input))?);
        write_model(&mut out, input, reader)?;
    }
    out.write_all(FOOTER.as_bytes())
        .map_err(LatexError::io(&output))?;
    out.flush().map_err(LatexError::io(&output))?;

    println!("\nWrote signal systematics table to {}\n", output.display());
    info!(output = %output.display(), models = inputs.len(), "Wrote systematics table");

    let pdf_produced = if options.compile {
        let out_dir = output.parent().unwrap_or(Path::new("/"));
        let produced = compile_tex(runner, program, &output, out_dir)?;
        println!("\nCompiled {}\n", output.display());
        Some(produced)
    } else {
        None
    };

    Ok(SysTableSummary {
        output,
        models: inputs.len(),
        pdf_produced,
    })
}

fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>, LatexError> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let paths = glob::glob(pattern).map_err(|source| LatexError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        for path in paths.flatten().filter(|p| p.is_file()) {
            inputs.push(full_path(&path).map_err(LatexError::io(&path))?);
        }
    }
    debug!(count = inputs.len(), "Expanded systematics inputs");
    Ok(inputs)
}

/// Human readable label for a systematic
pub fn pretty_sys_name(name: &str) -> &str {
    match name.trim() {
        "lepeff" => "Lepton efficiency",
        "fs_lepeff" => "FastSim lepton efficiency",
        "trig" => "Trigger efficiency",
        "bctag" => r"\cPqb{}-tag efficiency",
        "fs_bctag" => r"FastSim \cPqb{}-tag efficiency",
        "udsgtag" => "Mistag efficiency",
        "fs_udsgtag" => "FastSim mistag efficiency",
        "fs_genmet" => "FastSim MET",
        "jec" => "Jet energy corrections",
        "jetid" => "Jet ID",
        "murf" => "QCD Scales",
        "isr" => "ISR",
        "pu" => "Pile up",
        "lumi" => "Luminosity",
        other => other,
    }
}

fn model_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^sys.*?_SMS-(.*?)_mGluino-(.*?)_mLSP-(.*?)_").expect("valid regex")
    })
}

/// `sys_SMS-T1tttt_mGluino-1500_mLSP-100_...` becomes `T1tttt(1500,100)`;
/// other names are returned unchanged.
pub fn model_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match model_regex().captures(&name) {
        Some(caps) => format!("{}({},{})", &caps[1], &caps[2], &caps[3]),
        None => name,
    }
}

/// Percentage cell for a relative uncertainty
pub fn format_percent(value: f64) -> String {
    let percent = (100.0 * value).round() as i64;
    if percent == 0 {
        "$<1$".to_string()
    } else {
        format!("${}$", percent)
    }
}

/// Store the value of one `<bin> <value>` line.
///
/// Lines that are not exactly two fields, or belong to another region, are
/// ignored.
fn record_value(line: &str, values: &mut BinValues, path: &Path) -> Result<(), LatexError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [name, value] = fields[..] else {
        return Ok(());
    };

    let bad = |reason: String| LatexError::BadBin {
        path: path.to_path_buf(),
        bin: name.to_string(),
        reason,
    };

    let (region, bin) = name
        .split_once('_')
        .ok_or_else(|| bad("missing region prefix".to_string()))?;
    if region != TABULATED_REGION {
        return Ok(());
    }

    let parts: Vec<&str> = bin.split('_').collect();
    let [met, njets, nb] = parts[..] else {
        return Err(bad(format!("expected 3 bin labels, found {}", parts.len())));
    };

    let imet = position(&MET_BINS, met).ok_or_else(|| bad(format!("Bad MET: {}", met)))?;
    let injets =
        position(&NJETS_BINS, njets).ok_or_else(|| bad(format!("Bad Njets: {}", njets)))?;
    let inb = position(&NB_BINS, nb).ok_or_else(|| bad(format!("Bad Nb: {}", nb)))?;

    let value: f64 = value
        .parse()
        .map_err(|_| bad(format!("Bad value: {}", value)))?;
    values[imet][injets][inb] = Some(format_percent(value));
    Ok(())
}

fn position(labels: &[&str], label: &str) -> Option<usize> {
    labels.iter().position(|l| *l == label)
}

fn write_systematic<W: Write>(out: &mut W, name: &str, values: &BinValues) -> io::Result<()> {
    write!(out, "  {}", pretty_sys_name(name))?;
    for cell in values.iter().flatten().flatten() {
        write!(out, " & {}", cell.as_deref().unwrap_or(EMPTY_CELL))?;
    }
    writeln!(out, "\\\\")
}

/// Write the block of one signal model.
fn write_model<W: Write, B: BufRead>(out: &mut W, path: &Path, input: B) -> Result<(), LatexError> {
    let io_err = |source: io::Error| LatexError::Io {
        path: path.to_path_buf(),
        source,
    };

    writeln!(out, "  \\hline").map_err(io_err)?;
    writeln!(
        out,
        "  & \\multicolumn{{18}}{{c}}{{Signal model: {} }}\\\\",
        model_name(path)
    )
    .map_err(io_err)?;
    writeln!(out, "  \\hline").map_err(io_err)?;

    let mut sys_name: Option<String> = None;
    let mut is_signal = false;
    let mut pending = false;
    let mut values = BinValues::default();

    for line in input.lines() {
        let line = line.map_err(io_err)?;
        if let Some((_, name)) = line.split_once("SYSTEMATIC") {
            if let Some(current) = sys_name.as_deref().filter(|_| is_signal && pending) {
                write_systematic(out, current, &values).map_err(io_err)?;
                values = BinValues::default();
                pending = false;
            }
            sys_name = Some(name.trim_end().to_string());
        } else if line.contains("PROCESSES") {
            if let Some(current) = sys_name.as_deref().filter(|_| is_signal && pending) {
                write_systematic(out, current, &values).map_err(io_err)?;
                values = BinValues::default();
                pending = false;
            }
            is_signal = line.contains("signal");
        } else if sys_name.is_some() && is_signal {
            pending = true;
            record_value(&line, &mut values, path)?;
        }
    }

    if let Some(current) = sys_name.as_deref().filter(|_| is_signal && pending) {
        write_systematic(out, current, &values).map_err(io_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockOutcome, MockRunner};
    use tempfile::TempDir;
    use yare::parameterized;

    const SAMPLE: &str = "\
SYSTEMATIC lepeff
 PROCESSES signal
  r4_lowmet_lownj_1b 0.031
  r4_highmet_highnj_3b 0.002
  r1_lowmet_lownj_1b 0.5
 PROCESSES ttbar
  r4_lowmet_lownj_2b 0.9
SYSTEMATIC isr
 PROCESSES signal
  r4_medmet_lownj_2b -0.104
";

    #[parameterized(
        efficiency = { "lepeff", "Lepton efficiency" },
        btag = { "fs_bctag", r"FastSim \cPqb{}-tag efficiency" },
        padded = { " pu ", "Pile up" },
        unknown = { "mystery", "mystery" },
    )]
    fn test_pretty_sys_name(raw: &str, expected: &str) {
        assert_eq!(pretty_sys_name(raw), expected);
    }

    #[parameterized(
        small = { 0.004, "$<1$" },
        zero = { 0.0, "$<1$" },
        rounds_up = { 0.126, "$13$" },
        negative = { -0.104, "$-10$" },
    )]
    fn test_format_percent(value: f64, expected: &str) {
        assert_eq!(format_percent(value), expected);
    }

    #[test]
    fn test_model_name() {
        assert_eq!(
            model_name(Path::new(
                "/data/sys_SMS-T1tttt_mGluino-1500_mLSP-100_Tune.txt"
            )),
            "T1tttt(1500,100)"
        );
        assert_eq!(model_name(Path::new("other.txt")), "other.txt");
    }

    #[test]
    fn test_write_model_rows() {
        let mut out = Vec::new();
        write_model(
            &mut out,
            Path::new("sys_SMS-T1tttt_mGluino-1500_mLSP-100_x.txt"),
            SAMPLE.as_bytes(),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[1],
            r"  & \multicolumn{18}{c}{Signal model: T1tttt(1500,100) }\\"
        );
        assert!(lines[3].starts_with("  Lepton efficiency & $3$ & - & -"));
        assert!(lines[3].ends_with(r"& $<1$\\"));
        assert_eq!(lines[3].matches('&').count(), 18);
        assert!(lines[4].starts_with("  ISR & - & - & - & - & - & - & - & $-10$"));
    }

    #[test]
    fn test_bad_bin_is_error() {
        let mut out = Vec::new();
        let err = write_model(
            &mut out,
            Path::new("sys.txt"),
            "SYSTEMATIC jec\nPROCESSES signal\nr4_lowmet_lownj_4b 0.1\n".as_bytes(),
        )
        .unwrap_err();
        match err {
            LatexError::BadBin { bin, reason, .. } => {
                assert_eq!(bin, "r4_lowmet_lownj_4b");
                assert_eq!(reason, "Bad Nb: 4b");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_write_and_compile() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("sys_SMS-T1tttt_mGluino-1500_mLSP-100_a.txt"), SAMPLE).unwrap();
        fs::create_dir(root.join("sys_dir.txt")).unwrap();

        let runner =
            MockRunner::with_outcomes([MockOutcome::success().creating(root.join("table.pdf"))]);
        let summary = write_sys_table(
            &runner,
            "pdflatex",
            &SysTableOptions {
                output: root.join("table.tex"),
                inputs: vec![format!("{}/sys*.txt", root.display())],
                compile: true,
            },
        )
        .unwrap();

        assert_eq!(summary.models, 1);
        assert_eq!(summary.pdf_produced, Some(true));
        let text = fs::read_to_string(root.join("table.tex")).unwrap();
        assert!(text.starts_with("\\documentclass{article}"));
        assert!(text.ends_with("\\end{document}\n"));
        assert_eq!(runner.calls()[0].current_dir.as_deref(), Some(root.as_path()));
    }

    #[test]
    fn test_no_compile_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let runner = MockRunner::new();
        let summary = write_sys_table(
            &runner,
            "pdflatex",
            &SysTableOptions {
                output: dir.path().join("empty.tex"),
                inputs: Vec::new(),
                compile: false,
            },
        )
        .unwrap();

        assert_eq!(summary.models, 0);
        assert!(summary.pdf_produced.is_none());
        assert!(runner.calls().is_empty());
    }
}
