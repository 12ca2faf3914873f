use super::{PlotError, Series};
use csv::WriterBuilder;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub width: u32,
    pub height: u32,
    /// Line and marker colour
    pub color: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: "Datacard-based limit / workspace-based limit".to_string(),
            x_title: "Higgsino mass [GeV]".to_string(),
            y_title: "Limit ratio".to_string(),
            width: 800,
            height: 600,
            color: "#cc0000".to_string(),
        }
    }
}

/// Files written by [`write_plot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotOutputs {
    pub svg: PathBuf,
    pub csv: PathBuf,
}

/// Linear map from data to pixel coordinates
struct Axis {
    min: f64,
    max: f64,
    start: f64,
    end: f64,
}

impl Axis {
    fn new(min: f64, max: f64, start: f64, end: f64) -> Self {
        let (min, max) = if (max - min).abs() < f64::EPSILON {
            (min - 1.0, max + 1.0)
        } else {
            (min, max)
        };
        Self { min, max, start, end }
    }

    fn map(&self, v: f64) -> f64 {
        self.start + (v - self.min) / (self.max - self.min) * (self.end - self.start)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        (0..TICKS).map(move |i| self.min + (self.max - self.min) * i as f64 / (TICKS - 1) as f64)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn tick_label(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    // avoid "-0"
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

/// Render the series as a line chart with circular markers.
pub fn render_svg(series: &Series, style: &ChartStyle) -> Result<String, PlotError> {
    if series.is_empty() {
        return Err(PlotError::Empty);
    }

    let (w, h) = (f64::from(style.width), f64::from(style.height));
    let xs = series.iter().map(|&(k, _)| k as f64);
    let ys = series.iter().map(|&(_, v)| v);
    let x_axis = Axis::new(
        xs.clone().fold(f64::INFINITY, f64::min),
        xs.fold(f64::NEG_INFINITY, f64::max),
        MARGIN_LEFT,
        w - MARGIN_RIGHT,
    );
    let (y_min, y_max) = (
        ys.clone().fold(f64::INFINITY, f64::min),
        ys.fold(f64::NEG_INFINITY, f64::max),
    );
    let pad = (y_max - y_min) * 0.05;
    let y_axis = Axis::new(y_min - pad, y_max + pad, h - MARGIN_BOTTOM, MARGIN_TOP);

    let mut svg = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"  <rect width="{w}" height="{h}" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="30" text-anchor="middle" font-size="18">{}</text>"#,
        w / 2.0,
        escape(&style.title)
    );

    // frame
    let _ = writeln!(
        svg,
        r#"  <rect x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{}" height="{}" fill="none" stroke="black"/>"#,
        w - MARGIN_LEFT - MARGIN_RIGHT,
        h - MARGIN_TOP - MARGIN_BOTTOM
    );

    for tick in x_axis.ticks() {
        let x = x_axis.map(tick);
        let y = h - MARGIN_BOTTOM;
        let _ = writeln!(
            svg,
            r#"  <line x1="{x:.1}" y1="{y}" x2="{x:.1}" y2="{}" stroke="black"/>"#,
            y - 6.0
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{x:.1}" y="{}" text-anchor="middle" font-size="12">{}</text>"#,
            y + 18.0,
            tick_label(tick)
        );
    }
    for tick in y_axis.ticks() {
        let y = y_axis.map(tick);
        let _ = writeln!(
            svg,
            r#"  <line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="black"/>"#,
            MARGIN_LEFT + 6.0
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{:.1}" text-anchor="end" font-size="12">{}</text>"#,
            MARGIN_LEFT - 8.0,
            y + 4.0,
            tick_label(tick)
        );
    }

    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="{}" text-anchor="end" font-size="14">{}</text>"#,
        w - MARGIN_RIGHT,
        h - 15.0,
        escape(&style.x_title)
    );
    let _ = writeln!(
        svg,
        r#"  <text x="20" y="{MARGIN_TOP}" text-anchor="end" font-size="14" transform="rotate(-90 20 {MARGIN_TOP})">{}</text>"#,
        escape(&style.y_title)
    );

    let points: Vec<String> = series
        .iter()
        .map(|&(k, v)| format!("{:.1},{:.1}", x_axis.map(k as f64), y_axis.map(v)))
        .collect();
    let _ = writeln!(
        svg,
        r#"  <polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
        points.join(" "),
        escape(&style.color)
    );
    for &(k, v) in series {
        let _ = writeln!(
            svg,
            r#"  <circle cx="{:.1}" cy="{:.1}" r="4" fill="{}"/>"#,
            x_axis.map(k as f64),
            y_axis.map(v),
            escape(&style.color)
        );
    }
    svg.push_str("</svg>\n");

    Ok(svg)
}

/// Write the series as `mass,value` rows.
pub fn write_csv(path: &Path, series: &Series) -> Result<(), PlotError> {
    let csv_err = |source: csv::Error| PlotError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = WriterBuilder::new().from_path(path).map_err(csv_err)?;
    wtr.write_record(["mass", "value"]).map_err(csv_err)?;
    for (key, value) in series {
        wtr.write_record([key.to_string(), value.to_string()])
            .map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| PlotError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the chart to `svg_path` and the values next to it as `.csv`.
pub fn write_plot(series: &Series, svg_path: &Path, style: &ChartStyle) -> Result<PlotOutputs, PlotError> {
    let svg = render_svg(series, style)?;
    fs::write(svg_path, svg).map_err(|source| PlotError::Write {
        path: svg_path.to_path_buf(),
        source,
    })?;

    let csv_path = svg_path.with_extension("csv");
    write_csv(&csv_path, series)?;

    info!(svg = %svg_path.display(), csv = %csv_path.display(), points = series.len(), "Wrote limit ratio plot");
    Ok(PlotOutputs {
        svg: svg_path.to_path_buf(),
        csv: csv_path,
    })
}
