//! Matmul problem shapes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An `m x k` by `k x n` multiply producing an `m x n` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ShapeDims")]
pub struct ProblemShape {
    m: u64,
    n: u64,
    k: u64,
}

impl ProblemShape {
    pub fn new(m: u64, n: u64, k: u64) -> Result<Self, ConfigError> {
        for (dim, value) in [("m", m), ("n", n), ("k", k)] {
            if value == 0 {
                return Err(ConfigError::NonPositiveDimension { dim });
            }
        }
        // Operation and traffic counts are computed in u128 without checks.
        let (wm, wn, wk) = (m as u128, n as u128, k as u128);
        let operations = wm
            .checked_mul(wn)
            .and_then(|mn| mn.checked_mul(wk))
            .and_then(|mnk| mnk.checked_mul(2));
        let traffic = wm
            .checked_mul(wn)
            .and_then(|mn| mn.checked_mul(2))
            .zip(wm.checked_mul(wk))
            .zip(wk.checked_mul(wn))
            .and_then(|((out, a), b)| out.checked_add(a)?.checked_add(b));
        if operations.is_none() || traffic.is_none() {
            return Err(ConfigError::ShapeTooLarge { m, n, k });
        }
        Ok(Self { m, n, k })
    }

    pub fn square(p: u64) -> Result<Self, ConfigError> {
        Self::new(p, p, p)
    }

    pub fn m(&self) -> u64 {
        self.m
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn k(&self) -> u64 {
        self.k
    }

    /// Positional arguments handed to a kernel executable, in `m n k` order.
    pub fn args(&self) -> [String; 3] {
        [self.m.to_string(), self.n.to_string(), self.k.to_string()]
    }
}

#[derive(Deserialize)]
struct ShapeDims {
    m: u64,
    n: u64,
    k: u64,
}

impl TryFrom<ShapeDims> for ProblemShape {
    type Error = ConfigError;

    fn try_from(dims: ShapeDims) -> Result<Self, Self::Error> {
        Self::new(dims.m, dims.n, dims.k)
    }
}

impl fmt::Display for ProblemShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={} n={} k={}", self.m, self.n, self.k)
    }
}
