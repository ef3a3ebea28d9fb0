//! JSON report of a single sweep.

use crate::driver::XAxis;
use crate::series::MetricSeries;
use crate::sink::{ReportSink, RunLabel};
use anyhow::Result;
use perfsweep_model::{metrics, Bound, ProblemShape, Roofline, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPoint {
    pub shape: ProblemShape,
    pub x: f64,
    /// `null` where the invocation failed.
    pub gflops: Option<f64>,
    pub arithmetic_intensity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction_of_peak: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound: Option<Bound>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub device: String,
    pub executable: PathBuf,
    pub time_unit: TimeUnit,
    pub sweep: String,
    pub x_axis: XAxis,
    pub generated_at_unix_ms: u128,
    pub interrupted: bool,
    pub gaps: usize,
    pub points: Vec<ReportPoint>,
}

impl SweepReport {
    pub fn from_series(run: &RunLabel, series: &MetricSeries) -> Self {
        let device = &run.device;
        let roofline = Roofline::for_device(device);

        let points = series
            .points()
            .iter()
            .map(|point| ReportPoint {
                shape: point.shape,
                x: point.x,
                gflops: point.gflops(),
                arithmetic_intensity: metrics::arithmetic_intensity(&point.shape),
                fraction_of_peak: point
                    .throughput
                    .zip(device.peak_gflops)
                    .map(|(tp, peak)| metrics::fraction_of_peak(tp, peak)),
                bound: roofline.map(|roofline| roofline.bound(&point.shape)),
            })
            .collect();

        let generated_at_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0))
            .as_millis();

        Self {
            device: device.name.clone(),
            executable: device.executable.clone(),
            time_unit: device.time_unit,
            sweep: run.sweep.clone(),
            x_axis: run.x_axis,
            generated_at_unix_ms,
            interrupted: series.is_interrupted(),
            gaps: series.gaps(),
            points,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let blob = serde_json::to_vec_pretty(self)?;
        fs::write(path, blob)?;
        Ok(())
    }
}

/// Writes a [`SweepReport`] to a fixed path.
#[derive(Debug, Clone)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonSink {
    fn report(&mut self, run: &RunLabel, series: &MetricSeries) -> Result<()> {
        let report = SweepReport::from_series(run, series);
        report.save(&self.path)?;
        info!(path = %self.path.display(), gaps = report.gaps, "wrote sweep report");
        Ok(())
    }
}
