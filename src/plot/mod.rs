//! Limit-ratio plots
//!
//! Two limit tables keyed by signal mass are compared point by point and the
//! resulting series is rendered as an SVG chart next to a CSV of the values.

pub mod load;
pub mod ratio;
pub mod render;

pub use load::{load_table, parse_table, LoadOptions, LimitTable, DEFAULT_COLUMN};
pub use ratio::{compute_series, RatioMode, Series};
pub use render::{render_svg, write_csv, write_plot, ChartStyle, PlotOutputs};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error(
        "Limit tables cover different masses (missing in numerator: {missing_in_num:?}, missing in denominator: {missing_in_den:?})"
    )]
    KeyMismatch {
        missing_in_num: Vec<i64>,
        missing_in_den: Vec<i64>,
    },

    #[error("Denominator is zero at mass {key}")]
    ZeroDenominator { key: i64 },

    #[error("No points to plot")]
    Empty,

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
