//! SVG line plots of a sweep.

use crate::series::MetricSeries;
use crate::sink::{ReportSink, RunLabel};
use anyhow::Result;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::info;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const MARGIN: f64 = 70.0;
const Y_TICKS: usize = 5;

/// Writes `{dir}/{device}_performance_{sweep}.svg`.
#[derive(Debug, Clone)]
pub struct PlotSink {
    dir: PathBuf,
}

impl PlotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, run: &RunLabel) -> PathBuf {
        self.dir.join(format!("{}.svg", run.file_stem()))
    }
}

impl ReportSink for PlotSink {
    fn report(&mut self, run: &RunLabel, series: &MetricSeries) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(run);
        fs::write(&path, render_svg(run, series)?)?;
        info!(path = %path.display(), points = series.len(), "wrote plot");
        Ok(())
    }
}

/// Maps data coordinates onto the plot area.
struct Frame {
    x_min: f64,
    x_max: f64,
    y_max: f64,
    log_x: bool,
}

impl Frame {
    fn new(run: &RunLabel, series: &MetricSeries) -> Self {
        let log_x = run.log_x && series.points().iter().all(|p| p.x > 0.0);
        let xs = series.points().iter().map(|p| if log_x { p.x.log2() } else { p.x });
        let x_min = xs.clone().fold(f64::INFINITY, f64::min);
        let x_max = xs.fold(f64::NEG_INFINITY, f64::max);
        let y_max = series
            .gflops()
            .into_iter()
            .flatten()
            .fold(0.0_f64, f64::max);

        let (x_min, x_max) = if x_min.is_finite() && x_max > x_min {
            (x_min, x_max)
        } else if x_min.is_finite() {
            (x_min - 1.0, x_min + 1.0)
        } else {
            (0.0, 1.0)
        };
        let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

        Self {
            x_min,
            x_max,
            y_max,
            log_x,
        }
    }

    fn px(&self, x: f64) -> f64 {
        let x = if self.log_x { x.log2() } else { x };
        MARGIN + (x - self.x_min) / (self.x_max - self.x_min) * (WIDTH - 2.0 * MARGIN)
    }

    fn py(&self, y: f64) -> f64 {
        HEIGHT - MARGIN - y / self.y_max * (HEIGHT - 2.0 * MARGIN)
    }
}

/// Renders the series as a standalone SVG document. Gaps split the line.
pub fn render_svg(run: &RunLabel, series: &MetricSeries) -> Result<String, std::fmt::Error> {
    let frame = Frame::new(run, series);
    let mut svg = String::new();

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle" font-size="18">{} performance ({})</text>"#,
        WIDTH / 2.0,
        escape(&run.device.name),
        escape(&run.sweep)
    )?;

    // axes
    let (left, right, top, bottom) = (MARGIN, WIDTH - MARGIN, MARGIN, HEIGHT - MARGIN);
    writeln!(
        svg,
        r#"<path d="M{left} {top} L{left} {bottom} L{right} {bottom}" stroke="black" fill="none"/>"#
    )?;
    for tick in 0..=Y_TICKS {
        let value = frame.y_max * tick as f64 / Y_TICKS as f64;
        let y = frame.py(value);
        writeln!(
            svg,
            r#"<text x="{}" y="{y:.1}" text-anchor="end" font-size="11">{value:.1}</text>"#,
            left - 6.0
        )?;
    }
    for point in series.points() {
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{}" text-anchor="middle" font-size="9">{}</text>"#,
            frame.px(point.x),
            bottom + 14.0,
            format_tick(point.x)
        )?;
    }
    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="13">{}</text>"#,
        WIDTH / 2.0,
        HEIGHT - 20.0,
        escape(run.x_axis.label())
    )?;
    writeln!(
        svg,
        r#"<text x="20" y="{}" text-anchor="middle" font-size="13" transform="rotate(-90 20 {})">GFLOP/s</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0
    )?;

    for segment in segments(series) {
        let coords: Vec<String> = segment
            .iter()
            .map(|&(x, y)| format!("{:.1},{:.1}", frame.px(x), frame.py(y)))
            .collect();
        writeln!(
            svg,
            r#"<polyline points="{}" fill="none" stroke="steelblue" stroke-width="2"/>"#,
            coords.join(" ")
        )?;
    }
    for point in series.points() {
        if let Some(gflops) = point.gflops() {
            writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="steelblue"/>"#,
                frame.px(point.x),
                frame.py(gflops)
            )?;
        }
    }

    writeln!(svg, "</svg>")?;
    Ok(svg)
}

/// Runs of consecutive measured points.
fn segments(series: &MetricSeries) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for point in series.points() {
        match point.gflops() {
            Some(gflops) => current.push((point.x, gflops)),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn format_tick(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{x:.0}")
    } else {
        format!("{x:.2}")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesPoint;
    use perfsweep_model::{metrics, Device, ProblemShape, TimeUnit};

    fn series_with_gap() -> MetricSeries {
        let mut series = MetricSeries::new();
        for (i, p) in [16u64, 32, 64, 128].into_iter().enumerate() {
            let shape = ProblemShape::new(p, p, 64).unwrap();
            let throughput = if i == 2 {
                None
            } else {
                metrics::throughput(&shape, 1.0e-5).ok()
            };
            series.push(SeriesPoint {
                shape,
                x: p as f64,
                throughput,
            });
        }
        series
    }

    #[test]
    fn gaps_split_the_line() {
        let series = series_with_gap();
        let parts = segments(&series);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 1);

        let run = RunLabel::new(Device::new("gpu", TimeUnit::Milliseconds), "geometric");
        let svg = render_svg(&run, &series).unwrap();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("gpu performance (geometric)"));
    }

    #[test]
    fn all_gap_series_still_renders() {
        let shape = ProblemShape::square(8).unwrap();
        let mut series = MetricSeries::new();
        series.push(SeriesPoint {
            shape,
            x: 8.0,
            throughput: None,
        });
        let run = RunLabel::new(Device::new("cpu", TimeUnit::Milliseconds), "linear");
        let svg = render_svg(&run, &series).unwrap();
        assert!(!svg.contains("<polyline"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn writes_file_named_by_device_and_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunLabel::new(Device::new("m2", TimeUnit::Nanoseconds), "linear");
        let mut sink = PlotSink::new(dir.path().join("plots"));
        sink.report(&run, &series_with_gap()).unwrap();

        let path = sink.path_for(&run);
        assert_eq!(path, dir.path().join("plots").join("m2_performance_linear.svg"));
        assert!(fs::read_to_string(path).unwrap().contains("</svg>"));
    }

    #[test]
    fn device_names_are_escaped() {
        let run = RunLabel::new(Device::new("a<b>&c", TimeUnit::Seconds), "linear");
        let svg = render_svg(&run, &series_with_gap()).unwrap();
        assert!(svg.contains("a&lt;b&gt;&amp;c"));
    }
}
