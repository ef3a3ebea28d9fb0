//! Time units reported by kernel executables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit of the single elapsed-time value a kernel executable prints.
///
/// Executables disagree here: cuBLAS event timers report milliseconds while
/// the Accelerate and oneMKL builds report nanoseconds. The unit is part of
/// the device definition so the conversion happens in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    pub fn seconds_per_unit(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Milliseconds => 1.0e-3,
            TimeUnit::Microseconds => 1.0e-6,
            TimeUnit::Nanoseconds => 1.0e-9,
        }
    }

    pub fn to_seconds(&self, raw: f64) -> f64 {
        raw * self.seconds_per_unit()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "us",
            TimeUnit::Nanoseconds => "ns",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TimeUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "seconds" => Ok(TimeUnit::Seconds),
            "ms" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "us" | "µs" | "microseconds" => Ok(TimeUnit::Microseconds),
            "ns" | "nanoseconds" => Ok(TimeUnit::Nanoseconds),
            other => Err(ConfigError::UnknownTimeUnit(other.to_string())),
        }
    }
}
