use super::{LimitTable, PlotError};
use clap::ValueEnum;

/// How a numerator and denominator point are combined
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatioMode {
    /// `num / den`
    Ratio,
    /// `num / den - 1`
    #[default]
    RatioMinusOne,
    /// `num - den`
    Difference,
}

impl RatioMode {
    fn apply(self, key: i64, num: f64, den: f64) -> Result<f64, PlotError> {
        match self {
            RatioMode::Difference => Ok(num - den),
            _ if den == 0.0 => Err(PlotError::ZeroDenominator { key }),
            RatioMode::Ratio => Ok(num / den),
            RatioMode::RatioMinusOne => Ok(num / den - 1.0),
        }
    }
}

/// Points in ascending key order
pub type Series = Vec<(i64, f64)>;

/// Combine two tables over the same set of keys.
pub fn compute_series(
    num: &LimitTable,
    den: &LimitTable,
    mode: RatioMode,
) -> Result<Series, PlotError> {
    let missing_in_num: Vec<i64> = den.keys().filter(|k| !num.contains_key(k)).copied().collect();
    let missing_in_den: Vec<i64> = num.keys().filter(|k| !den.contains_key(k)).copied().collect();
    if !missing_in_num.is_empty() || !missing_in_den.is_empty() {
        return Err(PlotError::KeyMismatch {
            missing_in_num,
            missing_in_den,
        });
    }

    den.iter()
        .map(|(&key, &d)| Ok((key, mode.apply(key, num[&key], d)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(points: &[(i64, f64)]) -> LimitTable {
        points.iter().copied().collect()
    }

    #[test]
    fn test_ratio() {
        let series = compute_series(
            &table(&[(127, 10.0), (200, 20.0)]),
            &table(&[(127, 9.0), (200, 22.0)]),
            RatioMode::Ratio,
        )
        .unwrap();
        assert_eq!(series, vec![(127, 10.0 / 9.0), (200, 20.0 / 22.0)]);
    }

    #[test]
    fn test_ratio_minus_one_and_difference() {
        let num = table(&[(150, 3.0)]);
        let den = table(&[(150, 2.0)]);
        assert_eq!(
            compute_series(&num, &den, RatioMode::RatioMinusOne).unwrap(),
            vec![(150, 0.5)]
        );
        assert_eq!(
            compute_series(&num, &den, RatioMode::Difference).unwrap(),
            vec![(150, 1.0)]
        );
    }

    #[test]
    fn test_key_mismatch_names_both_sides() {
        let err = compute_series(
            &table(&[(127, 1.0), (175, 1.0)]),
            &table(&[(127, 1.0), (150, 1.0)]),
            RatioMode::Ratio,
        )
        .unwrap_err();
        match err {
            PlotError::KeyMismatch {
                missing_in_num,
                missing_in_den,
            } => {
                assert_eq!(missing_in_num, vec![150]);
                assert_eq!(missing_in_den, vec![175]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_denominator() {
        let err = compute_series(&table(&[(127, 1.0)]), &table(&[(127, 0.0)]), RatioMode::Ratio)
            .unwrap_err();
        assert!(matches!(err, PlotError::ZeroDenominator { key: 127 }));
        assert!(compute_series(&table(&[(127, 1.0)]), &table(&[(127, 0.0)]), RatioMode::Difference).is_ok());
    }

    #[test]
    fn test_empty_tables() {
        let series = compute_series(&LimitTable::new(), &LimitTable::new(), RatioMode::Ratio).unwrap();
        assert!(series.is_empty());
    }
}
