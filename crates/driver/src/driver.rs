//! Sequential sweep driver.

use crate::domain::SweepDomain;
use crate::series::{MetricSeries, SeriesPoint};
use perfsweep_invoker::{CancellationToken, KernelInvoker};
use perfsweep_model::{metrics, ConfigError, Device, ProblemShape};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Independent variable recorded for each sweep position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAxis {
    /// The swept dimension `m` (equal to `n`, and to `k` for square sweeps).
    #[default]
    Size,
    ArithmeticIntensity,
}

impl XAxis {
    pub fn value(&self, shape: &ProblemShape) -> f64 {
        match self {
            XAxis::Size => shape.m() as f64,
            XAxis::ArithmeticIntensity => metrics::arithmetic_intensity(shape),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            XAxis::Size => "problem size (m = n)",
            XAxis::ArithmeticIntensity => "arithmetic intensity (FLOP/element)",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    pub x_axis: XAxis,
}

/// Walks a list of shapes, invoking the kernel once per shape, one at a time.
pub struct SweepDriver<I> {
    invoker: I,
    options: DriverOptions,
    cancel: CancellationToken,
}

impl<I: KernelInvoker> SweepDriver<I> {
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            options: DriverOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    /// Share the token handed to the invoker so an interrupt stops both the
    /// running kernel and the remaining sweep.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs every shape in order. Failed points become gaps; cancellation
    /// returns what was measured so far, marked as interrupted.
    pub fn run(&self, device: &Device, shapes: &[ProblemShape]) -> MetricSeries {
        info!(device = %device.name, points = shapes.len(), "starting sweep");
        let mut series = MetricSeries::with_capacity(shapes.len());

        for (position, &shape) in shapes.iter().enumerate() {
            if self.cancel.is_cancelled() {
                series.mark_interrupted();
                break;
            }

            let x = self.options.x_axis.value(&shape);
            let throughput = match self.invoker.invoke(device, shape) {
                Ok(throughput) => {
                    info!(
                        position,
                        m = shape.m(),
                        n = shape.n(),
                        k = shape.k(),
                        gflops = throughput.gflops(),
                        "measured"
                    );
                    Some(throughput)
                }
                Err(failure) if failure.is_cancelled() => {
                    series.mark_interrupted();
                    break;
                }
                Err(_) => None,
            };
            series.push(SeriesPoint { shape, x, throughput });
        }

        if series.is_interrupted() {
            warn!(
                device = %device.name,
                completed = series.len(),
                planned = shapes.len(),
                "sweep interrupted"
            );
        } else {
            info!(
                device = %device.name,
                points = series.len(),
                gaps = series.gaps(),
                "sweep finished"
            );
        }
        series
    }

    /// Validates the device and domain before launching anything.
    pub fn run_domain(
        &self,
        device: &Device,
        domain: &SweepDomain,
    ) -> Result<MetricSeries, ConfigError> {
        device.validate()?;
        let shapes = domain.shapes()?;
        Ok(self.run(device, &shapes))
    }
}
