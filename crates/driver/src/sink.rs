//! Reporting sinks that consume a finished series.

use crate::domain::SweepDomain;
use crate::driver::XAxis;
use crate::series::MetricSeries;
use anyhow::Result;
use perfsweep_model::Device;
use std::io::{self, Write};

/// Identifies a run for sinks that label or name their output.
#[derive(Debug, Clone)]
pub struct RunLabel {
    pub device: Device,
    /// Sweep-type label, e.g. `geometric` or `linear`.
    pub sweep: String,
    pub x_axis: XAxis,
    pub log_x: bool,
}

impl RunLabel {
    pub fn new(device: Device, sweep: impl Into<String>) -> Self {
        Self {
            device,
            sweep: sweep.into(),
            x_axis: XAxis::default(),
            log_x: false,
        }
    }

    pub fn for_domain(device: Device, domain: &SweepDomain, x_axis: XAxis) -> Self {
        Self {
            device,
            sweep: domain.label().to_string(),
            x_axis,
            log_x: domain.is_geometric() && x_axis == XAxis::Size,
        }
    }

    /// `{device}_performance_{sweep}`, shared by every file-writing sink.
    pub fn file_stem(&self) -> String {
        format!("{}_performance_{}", self.device.name, self.sweep)
    }
}

pub trait ReportSink {
    fn report(&mut self, run: &RunLabel, series: &MetricSeries) -> Result<()>;
}

/// Prints one GFLOP/s value per line in sweep order; gaps print as `n/a`.
pub struct ConsoleSink<W> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn report(&mut self, _run: &RunLabel, series: &MetricSeries) -> Result<()> {
        for point in series.points() {
            match point.gflops() {
                Some(gflops) => writeln!(self.out, "{gflops}")?,
                None => writeln!(self.out, "n/a")?,
            }
        }
        self.out.flush()?;
        Ok(())
    }
}
