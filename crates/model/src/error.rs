//! Error types shared by the sweep definition layers.

use thiserror::Error;

/// A malformed sweep definition. Raised before any kernel is launched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("dimension `{dim}` must be at least 1")]
    NonPositiveDimension { dim: &'static str },
    #[error("operation count of m={m} n={n} k={k} overflows 128 bits")]
    ShapeTooLarge { m: u64, n: u64, k: u64 },
    #[error("sweep step must be at least 1")]
    ZeroStep,
    #[error("sweep start {start} is greater than sweep end {end}")]
    InvertedRange { start: u64, end: u64 },
    #[error("sweep has {points} points, more than the limit of {limit}")]
    TooManyPoints { points: u128, limit: u64 },
    #[error("sweep domain is empty")]
    EmptyDomain,
    #[error("exponent {exponent} overflows a 64-bit dimension")]
    ExponentTooLarge { exponent: u32 },
    #[error("device name must not be empty")]
    EmptyDeviceName,
    #[error("device `{device}` has no executable path")]
    EmptyExecutable { device: String },
    #[error("{field} must be positive and finite, got {value}")]
    InvalidPeak { field: &'static str, value: f64 },
    #[error("unknown time unit `{0}` (expected s, ms, us or ns)")]
    UnknownTimeUnit(String),
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MetricError {
    #[error("elapsed time must be positive and finite, got {0} s")]
    NonPositiveElapsed(f64),
}
