use super::PlotError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Limit value per signal mass, ascending
pub type LimitTable = BTreeMap<i64, f64>;

/// Column holding the expected limit in the limit text files
pub const DEFAULT_COLUMN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    /// Zero-based column of the value; column 0 is the key
    pub column: usize,
    /// Drop keys below this value
    pub min_key: Option<i64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            column: DEFAULT_COLUMN,
            min_key: None,
        }
    }
}

pub fn load_table(path: &Path, options: &LoadOptions) -> Result<LimitTable, PlotError> {
    let text = fs::read_to_string(path).map_err(|source| PlotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(&text, path, options)
}

/// Parse whitespace separated `<mass> <value>...` lines.
///
/// Blank lines and `#` comments are skipped. A repeated key keeps the last
/// value.
pub fn parse_table(text: &str, path: &Path, options: &LoadOptions) -> Result<LimitTable, PlotError> {
    let mut table = LimitTable::new();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parse_err = |message: String| PlotError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            message,
        };

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let key: i64 = fields[0]
            .parse()
            .map_err(|_| parse_err(format!("invalid mass '{}'", fields[0])))?;
        let raw = fields.get(options.column).ok_or_else(|| {
            parse_err(format!(
                "expected at least {} columns, found {}",
                options.column + 1,
                fields.len()
            ))
        })?;
        let value: f64 = raw
            .parse()
            .map_err(|_| parse_err(format!("invalid value '{}'", raw)))?;

        if options.min_key.is_some_and(|min| key < min) {
            continue;
        }
        table.insert(key, value);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const LIMITS: &str = "\
127 0.1 0.2 0.3 10.0 0.5
# comment

200 0.1 0.2 0.3 20.0 0.5
150 0.1 0.2 0.3 15.0 0.5
";

    fn path() -> PathBuf {
        PathBuf::from("limits.txt")
    }

    #[test]
    fn test_parse_default_column() {
        let table = parse_table(LIMITS, &path(), &LoadOptions::default()).unwrap();
        let keys: Vec<i64> = table.keys().copied().collect();
        assert_eq!(keys, vec![127, 150, 200]);
        assert_eq!(table[&200], 20.0);
    }

    #[test]
    fn test_min_key_and_column() {
        let table = parse_table(
            LIMITS,
            &path(),
            &LoadOptions {
                column: 1,
                min_key: Some(150),
            },
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[&150], 0.1);
    }

    #[test]
    fn test_short_line_reports_position() {
        let err = parse_table("127 1 2\n", &path(), &LoadOptions::default()).unwrap_err();
        match err {
            PlotError::Parse { line, message, .. } => {
                assert_eq!(line, 1);
                assert!(message.contains("expected at least 5 columns"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_key() {
        assert!(parse_table("abc 1 2 3 4\n", &path(), &LoadOptions::default()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_table(Path::new("/nonexistent/limits.txt"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlotError::Read { .. }));
    }
}
