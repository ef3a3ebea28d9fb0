//! Invocation failures.

use perfsweep_model::ProblemShape;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Why a single kernel invocation produced no measurement.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to start executable: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read kernel output: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },
    #[error("executable produced no output")]
    NoOutput,
    #[error("expected a single line of output, got extra line {line:?}")]
    ExtraOutput { line: String },
    #[error("output {line:?} is not a number: {source}")]
    NotNumeric {
        line: String,
        #[source]
        source: std::num::ParseFloatError,
    },
    #[error("reported time {value} must be positive and finite")]
    NonPositiveTime { value: f64 },
    #[error("executable exited with {status}")]
    ExitStatus { status: ExitStatus },
    #[error("no result after {}ms", .after.as_millis())]
    TimedOut { after: Duration },
    #[error("cancelled")]
    Cancelled,
}

/// An [`InvocationError`] together with enough context to rerun the failing
/// point by hand.
#[derive(Debug, Error)]
#[error("device `{device}` ({}) failed at {shape}: {error}", .executable.display())]
pub struct InvocationFailure {
    pub device: String,
    pub executable: PathBuf,
    pub shape: ProblemShape,
    #[source]
    pub error: InvocationError,
}

impl InvocationFailure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, InvocationError::Cancelled)
    }
}
