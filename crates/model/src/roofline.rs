//! Roofline classification of a problem shape against a device's peaks.

use crate::device::Device;
use crate::metrics::arithmetic_intensity;
use crate::shape::ProblemShape;
use serde::{Deserialize, Serialize};

/// Single-precision element size of the reference kernels.
pub const F32_BYTES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Compute,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roofline {
    pub peak_gflops: f64,
    pub peak_bandwidth_gbps: f64,
    pub element_bytes: u32,
}

impl Roofline {
    pub fn new(peak_gflops: f64, peak_bandwidth_gbps: f64) -> Self {
        Self {
            peak_gflops,
            peak_bandwidth_gbps,
            element_bytes: F32_BYTES,
        }
    }

    /// Only available when the device declares both peaks.
    pub fn for_device(device: &Device) -> Option<Self> {
        match (device.peak_gflops, device.peak_bandwidth_gbps) {
            (Some(compute), Some(bandwidth)) => Some(Self::new(compute, bandwidth)),
            _ => None,
        }
    }

    /// Elements moved per second at peak bandwidth, in billions.
    fn peak_gelements(&self) -> f64 {
        self.peak_bandwidth_gbps / self.element_bytes as f64
    }

    /// Arithmetic intensity (FLOP per element) where the two ceilings meet.
    pub fn ridge_point(&self) -> f64 {
        self.peak_gflops / self.peak_gelements()
    }

    pub fn attainable_gflops(&self, shape: &ProblemShape) -> f64 {
        let memory_ceiling = self.peak_gelements() * arithmetic_intensity(shape);
        memory_ceiling.min(self.peak_gflops)
    }

    pub fn bound(&self, shape: &ProblemShape) -> Bound {
        if arithmetic_intensity(shape) < self.ridge_point() {
            Bound::Memory
        } else {
            Bound::Compute
        }
    }
}
