//! Batch plan files
//!
//! A plan says *what* to run: one executable, an argument template, an
//! optional expected output file, and the parameter records that fill the
//! templates. Placeholders look like `{method}`; `{cwd}` is always available
//! and expands to the batch working directory.
//!
//! ```toml
//! executable = "./run/hig/write_datacards.exe"
//! args = ["-f", "*SMS-TChiHH*_mGluino-{mass}_mLSP-1_*.root", "--bf", "{bf}"]
//!
//! [[matrix]]
//! name = "mass"
//! values = ["127"]
//! range = { start = 150, end = 1000, step = 25 }
//!
//! [[matrix]]
//! name = "bf"
//! values = ["0.9", "0.8"]
//! ```

use super::BatchError;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// One parameter combination
pub type ParamSet = BTreeMap<String, String>;

/// Key always available to templates
pub const CWD_KEY: &str = "cwd";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchPlan {
    /// Display name, defaults to the plan file stem
    #[serde(default)]
    pub name: Option<String>,

    /// Program to invoke for every parameter combination
    pub executable: String,

    /// Argument templates
    #[serde(default)]
    pub args: Vec<String>,

    /// Template of the file each invocation must produce
    #[serde(default)]
    pub expected_output: Option<String>,

    /// Compile produced `.tex` outputs with the LaTeX program
    #[serde(default)]
    pub latex: bool,

    /// Run the native build before the batch
    #[serde(default)]
    pub prebuild: bool,

    /// Explicit parameter records
    #[serde(default)]
    pub params: Vec<ParamSet>,

    /// Axes of a cartesian product combined with every record
    #[serde(default)]
    pub matrix: Vec<MatrixAxis>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixAxis {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
    /// Integer range appended after `values`
    #[serde(default)]
    pub range: Option<IntRange>,
}

/// Inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
    #[serde(default = "default_step")]
    pub step: i64,
}

fn default_step() -> i64 {
    1
}

impl IntRange {
    pub fn values(&self) -> Result<Vec<String>, BatchError> {
        if self.step <= 0 {
            return Err(BatchError::InvalidPlan(format!(
                "range step must be positive, got {}",
                self.step
            )));
        }
        let mut out = Vec::new();
        let mut next = Some(self.start);
        while let Some(v) = next.filter(|v| *v <= self.end) {
            out.push(v.to_string());
            next = v.checked_add(self.step);
        }
        Ok(out)
    }
}

impl MatrixAxis {
    pub fn all_values(&self) -> Result<Vec<String>, BatchError> {
        let mut values = self.values.clone();
        if let Some(range) = &self.range {
            values.extend(range.values()?);
        }
        if values.is_empty() {
            return Err(BatchError::InvalidPlan(format!(
                "matrix axis '{}' has no values",
                self.name
            )));
        }
        Ok(values)
    }
}

impl BatchPlan {
    /// Load a plan from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, BatchError> {
        let text = fs::read_to_string(path).map_err(|source| BatchError::ReadPlan {
            path: path.to_path_buf(),
            source,
        })?;
        let mut plan = Self::from_toml(&text).map_err(|err| match err {
            BatchError::ParsePlan { message, .. } => BatchError::ParsePlan {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        if plan.name.is_none() {
            plan.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned());
        }
        Ok(plan)
    }

    pub fn from_toml(text: &str) -> Result<Self, BatchError> {
        let plan: BatchPlan = toml::from_str(text).map_err(|e| BatchError::ParsePlan {
            path: Default::default(),
            message: e.to_string(),
        })?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("batch")
    }

    fn validate(&self) -> Result<(), BatchError> {
        if self.executable.trim().is_empty() {
            return Err(BatchError::InvalidPlan("executable must not be empty".to_string()));
        }
        let mut seen = Vec::new();
        for axis in &self.matrix {
            if seen.contains(&axis.name) {
                return Err(BatchError::InvalidPlan(format!(
                    "matrix axis '{}' declared twice",
                    axis.name
                )));
            }
            seen.push(axis.name.clone());
        }
        Ok(())
    }

    /// Every parameter combination, records first then matrix axes in
    /// declaration order (last axis varies fastest).
    ///
    /// Matrix values override record values with the same key.
    pub fn expand(&self) -> Result<Vec<ParamSet>, BatchError> {
        let mut combos: Vec<ParamSet> = if self.params.is_empty() {
            vec![ParamSet::new()]
        } else {
            self.params.clone()
        };

        for axis in &self.matrix {
            let values = axis.all_values()?;
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for value in &values {
                    let mut extended = combo.clone();
                    extended.insert(axis.name.clone(), value.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }

        Ok(combos)
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Substitute `{key}` placeholders from `params`.
pub fn render_template(template: &str, params: &ParamSet) -> Result<String, BatchError> {
    let mut missing = None;
    let rendered = placeholder_regex().replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        match params.get(key) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(key) => Err(BatchError::UnknownPlaceholder {
            key,
            template: template.to_string(),
        }),
        None => Ok(rendered.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn params(pairs: &[(&str, &str)]) -> ParamSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[parameterized(
        single = { "-m {method}", "-m met200" },
        two = { "txt/table_predictions_{tag}_{method}.tex", "txt/table_predictions_lumi2p6_met200.tex" },
        none = { "--bf", "--bf" },
        shell_glob_braces_untouched = { "*_{tag}*", "*_lumi2p6*" },
    )]
    fn test_render_template(template: &str, expected: &str) {
        let p = params(&[("method", "met200"), ("tag", "lumi2p6")]);
        assert_eq!(render_template(template, &p).unwrap(), expected);
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = render_template("{mass}", &ParamSet::new()).unwrap_err();
        match err {
            BatchError::UnknownPlaceholder { key, .. } => assert_eq!(key, "mass"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_records() {
        let plan = BatchPlan::from_toml(
            r#"
executable = "./run/table_all_preds.exe"
args = ["-f", "-u", "-m", "{method}"]
expected_output = "txt/table_predictions_{tag}_{method}.tex"
latex = true

[[params]]
method = "m2lveto"
tag = "unblind_lumi2p6"

[[params]]
method = "m2lveto_2015"
tag = "unblind_lumi2p3"
"#,
        )
        .unwrap();

        assert!(plan.latex);
        assert!(!plan.prebuild);
        let combos = plan.expand().unwrap();
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[1]["tag"], "unblind_lumi2p3");
    }

    #[test]
    fn test_matrix_product_order() {
        let plan = BatchPlan::from_toml(
            r#"
executable = "exe"

[[matrix]]
name = "mass"
values = ["127"]
range = { start = 150, end = 200, step = 25 }

[[matrix]]
name = "bf"
values = ["0.9", "0.8"]
"#,
        )
        .unwrap();

        let combos = plan.expand().unwrap();
        assert_eq!(combos.len(), 8);
        assert_eq!(combos[0], params(&[("mass", "127"), ("bf", "0.9")]));
        assert_eq!(combos[1], params(&[("mass", "127"), ("bf", "0.8")]));
        assert_eq!(combos[7], params(&[("mass", "200"), ("bf", "0.8")]));
    }

    #[test]
    fn test_records_times_matrix() {
        let plan = BatchPlan::from_toml(
            r#"
executable = "exe"

[[params]]
model = "TChiHH"

[[params]]
model = "TChiHZ"

[[matrix]]
name = "bf"
values = ["1.0", "0.5"]
"#,
        )
        .unwrap();
        assert_eq!(plan.expand().unwrap().len(), 4);
    }

    #[test]
    fn test_matrix_value_overrides_record() {
        let plan = BatchPlan::from_toml(
            r#"
executable = "exe"

[[params]]
model = "TChiHH"
bf = "0.3"

[[matrix]]
name = "bf"
values = ["1.0", "0.5"]
"#,
        )
        .unwrap();

        let combos = plan.expand().unwrap();
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[0], params(&[("model", "TChiHH"), ("bf", "1.0")]));
        assert_eq!(combos[1], params(&[("model", "TChiHH"), ("bf", "0.5")]));
    }

    #[test]
    fn test_range_values() {
        let range = IntRange {
            start: 150,
            end: 1000,
            step: 25,
        };
        let values = range.values().unwrap();
        assert_eq!(values.first().unwrap(), "150");
        assert_eq!(values.last().unwrap(), "1000");
        assert_eq!(values.len(), 35);
    }

    #[test]
    fn test_range_stops_before_overflow() {
        let range = IntRange {
            start: i64::MAX - 7,
            end: i64::MAX,
            step: 5,
        };
        assert_eq!(
            range.values().unwrap(),
            vec![(i64::MAX - 7).to_string(), (i64::MAX - 2).to_string()]
        );

        let single = IntRange {
            start: i64::MAX,
            end: i64::MAX,
            step: 1,
        };
        assert_eq!(single.values().unwrap(), vec![i64::MAX.to_string()]);
    }

    #[test]
    fn test_rejects_bad_step_and_empty_axis() {
        let bad_step = IntRange {
            start: 1,
            end: 2,
            step: 0,
        };
        assert!(bad_step.values().is_err());

        let plan = BatchPlan::from_toml(
            "executable = \"exe\"\n[[matrix]]\nname = \"x\"\n",
        )
        .unwrap();
        assert!(matches!(plan.expand(), Err(BatchError::InvalidPlan(_))));
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = BatchPlan::from_toml("executable = \"exe\"\nlatexx = true\n").unwrap_err();
        assert!(matches!(err, BatchError::ParsePlan { .. }));
    }

    #[test]
    fn test_rejects_duplicate_axis() {
        let err = BatchPlan::from_toml(
            "executable = \"exe\"\n[[matrix]]\nname = \"a\"\nvalues=[\"1\"]\n[[matrix]]\nname = \"a\"\nvalues=[\"2\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, BatchError::InvalidPlan(_)));
    }
}
