//! Convergence chart: metric vs. key parameter, one line per tool.
//!
//! Rendered as standalone SVG (log-scaled x axis when every x is positive)
//! or as JSON for external plotting.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use provcheck_query::ResultTable;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 440.0;
const LEFT: f64 = 90.0;
const RIGHT: f64 = 220.0;
const TOP: f64 = 50.0;
const BOTTOM: f64 = 80.0;
const PALETTE: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Svg,
    Json,
}

impl ChartFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("unknown chart format `{other}` (expected svg|json)")),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow!("chart path {} has no extension", path.display()))?;
        Self::parse(ext)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub log_x: bool,
    pub series: Vec<Series>,
}

impl Chart {
    /// Key column on x, first metric on y, grouped by tool label.
    pub fn from_table(table: &ResultTable, title: &str) -> Result<Self> {
        let x_col = table.key_column();
        let y_col = table.metric_columns().start;
        let tool_col = table.tool_column();
        let header = |i: usize| table.headers.get(i).cloned().unwrap_or_default();

        let mut grouped: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
        for (i, row) in table.rows.iter().enumerate() {
            let number = |col: usize| {
                row.get(col)
                    .and_then(|v| v.to_number())
                    .ok_or_else(|| anyhow!("row {i}: `{}` is not numeric", header(col)))
            };
            let label = row.get(tool_col).map(ToString::to_string).unwrap_or_default();
            grouped
                .entry(label)
                .or_default()
                .push((number(x_col)?, number(y_col)?));
        }

        let series: Vec<Series> = grouped
            .into_iter()
            .map(|(label, mut points)| {
                points.sort_by(|a, b| a.0.total_cmp(&b.0));
                Series { label, points }
            })
            .collect();
        let log_x = series.iter().flat_map(|s| &s.points).all(|(x, _)| *x > 0.0);
        Ok(Self {
            title: title.to_string(),
            x_label: header(x_col),
            y_label: header(y_col),
            log_x,
            series,
        })
    }

    fn x_ticks(&self) -> Vec<f64> {
        let mut seen = BTreeSet::new();
        let mut ticks = Vec::new();
        for (x, _) in self.series.iter().flat_map(|s| &s.points) {
            if seen.insert(x.to_bits()) {
                ticks.push(*x);
            }
        }
        ticks.sort_by(f64::total_cmp);
        ticks
    }

    pub fn render_svg(&self) -> String {
        let plot_w = WIDTH - LEFT - RIGHT;
        let plot_h = HEIGHT - TOP - BOTTOM;
        let tx = |x: f64| if self.log_x { x.log10() } else { x };

        let xs: Vec<f64> = self.x_ticks().into_iter().map(tx).collect();
        let ys: Vec<f64> = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .collect();
        let (x_lo, x_hi) = padded_range(&xs, 0.05);
        let (y_lo, y_hi) = padded_range(&ys, 0.08);

        let px = |x: f64| LEFT + (tx(x) - x_lo) / (x_hi - x_lo) * plot_w;
        let py = |y: f64| TOP + plot_h - (y - y_lo) / (y_hi - y_lo) * plot_h;

        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
        );
        let _ = writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
            LEFT + plot_w / 2.0,
            escape(&self.title)
        );

        // grid + ticks
        for x in self.x_ticks() {
            let x_px = px(x);
            let _ = writeln!(
                out,
                r##"<line x1="{x_px:.2}" y1="{TOP}" x2="{x_px:.2}" y2="{:.2}" stroke="#dddddd"/>"##,
                TOP + plot_h
            );
            let _ = writeln!(
                out,
                r#"<text x="{x_px:.2}" y="{:.2}" text-anchor="end" transform="rotate(-45 {x_px:.2} {:.2})">{x}</text>"#,
                TOP + plot_h + 16.0,
                TOP + plot_h + 16.0
            );
        }
        for i in 0..=5 {
            let y = y_lo + (y_hi - y_lo) * f64::from(i) / 5.0;
            let y_px = py(y);
            let _ = writeln!(
                out,
                r##"<line x1="{LEFT}" y1="{y_px:.2}" x2="{:.2}" y2="{y_px:.2}" stroke="#dddddd"/>"##,
                LEFT + plot_w
            );
            let _ = writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}" text-anchor="end">{}</text>"#,
                LEFT - 6.0,
                y_px + 4.0,
                format_tick(y)
            );
        }
        let _ = writeln!(
            out,
            r#"<rect x="{LEFT}" y="{TOP}" width="{plot_w:.2}" height="{plot_h:.2}" fill="none" stroke="black"/>"#
        );

        // axis labels
        let x_caption = if self.log_x {
            format!("{} (log scale)", self.x_label)
        } else {
            self.x_label.clone()
        };
        let _ = writeln!(
            out,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
            LEFT + plot_w / 2.0,
            HEIGHT - 12.0,
            escape(&x_caption)
        );
        let _ = writeln!(
            out,
            r#"<text x="18" y="{:.2}" text-anchor="middle" transform="rotate(-90 18 {:.2})">{}</text>"#,
            TOP + plot_h / 2.0,
            TOP + plot_h / 2.0,
            escape(&self.y_label)
        );

        for (i, series) in self.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let points: Vec<String> = series
                .points
                .iter()
                .map(|(x, y)| format!("{:.2},{:.2}", px(*x), py(*y)))
                .collect();
            let _ = writeln!(
                out,
                r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="2"/>"#,
                points.join(" ")
            );
            for (x, y) in &series.points {
                let _ = writeln!(
                    out,
                    r#"<circle cx="{:.2}" cy="{:.2}" r="3.5" fill="{color}"/>"#,
                    px(*x),
                    py(*y)
                );
            }
            let legend_y = TOP + 10.0 + 20.0 * i as f64;
            let legend_x = WIDTH - RIGHT + 16.0;
            let _ = writeln!(
                out,
                r#"<line x1="{legend_x:.2}" y1="{legend_y:.2}" x2="{:.2}" y2="{legend_y:.2}" stroke="{color}" stroke-width="2"/>"#,
                legend_x + 22.0
            );
            let _ = writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}">{}</text>"#,
                legend_x + 28.0,
                legend_y + 4.0,
                escape(&series.label)
            );
        }
        out.push_str("</svg>\n");
        out
    }

    pub fn render_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let body = match ChartFormat::from_path(path)? {
            ChartFormat::Svg => self.render_svg(),
            ChartFormat::Json => self.render_json()?,
        };
        fs::write(path, body).with_context(|| format!("failed to write chart {}", path.display()))
    }
}

fn padded_range(values: &[f64], pad: f64) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        let half = if lo == 0.0 { 1.0 } else { lo.abs() * 0.5 };
        return (lo - half, hi + half);
    }
    let span = hi - lo;
    (lo - span * pad, hi + span * pad)
}

fn format_tick(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e5 || v.abs() < 1e-3) {
        format!("{v:.2e}")
    } else {
        format!("{v:.3}")
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
