//! Device descriptions: which executable to launch and how to read it.

use crate::error::ConfigError;
use crate::units::TimeUnit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Label used in logs, plot titles and output file names.
    pub name: String,
    pub executable: PathBuf,
    pub time_unit: TimeUnit,
    /// Declared peak compute throughput, used for normalization only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_gflops: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_bandwidth_gbps: Option<f64>,
}

impl Device {
    /// Creates a device whose executable follows the `./{name}_performance.x`
    /// naming used by the kernel build scripts.
    pub fn new(name: impl Into<String>, time_unit: TimeUnit) -> Self {
        let name = name.into();
        let executable = PathBuf::from(format!("./{name}_performance.x"));
        Self {
            name,
            executable,
            time_unit,
            peak_gflops: None,
            peak_bandwidth_gbps: None,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_time_unit(mut self, time_unit: TimeUnit) -> Self {
        self.time_unit = time_unit;
        self
    }

    pub fn with_peak_gflops(mut self, peak_gflops: f64) -> Self {
        self.peak_gflops = Some(peak_gflops);
        self
    }

    pub fn with_peak_bandwidth_gbps(mut self, peak_bandwidth_gbps: f64) -> Self {
        self.peak_bandwidth_gbps = Some(peak_bandwidth_gbps);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceName);
        }
        if self.executable.as_os_str().is_empty() {
            return Err(ConfigError::EmptyExecutable {
                device: self.name.clone(),
            });
        }
        for (field, value) in [
            ("peak_gflops", self.peak_gflops),
            ("peak_bandwidth_gbps", self.peak_bandwidth_gbps),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ConfigError::InvalidPeak { field, value });
                }
            }
        }
        Ok(())
    }
}
