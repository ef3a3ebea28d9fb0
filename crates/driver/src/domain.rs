//! Problem-size domains a sweep walks over.

use perfsweep_model::{ConfigError, ProblemShape};
use serde::{Deserialize, Serialize};
use std::iter;
use std::ops::RangeInclusive;

/// Largest exponent whose power of two still fits in a `u64` dimension.
const MAX_EXPONENT: u32 = 62;

/// Upper bound on the number of points a single sweep may expand to.
pub const MAX_SWEEP_POINTS: u64 = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SweepDomain {
    /// `m = n = 2^i` for every exponent in the range, with `k` held fixed.
    Geometric {
        min_exponent: u32,
        max_exponent: u32,
        k: u64,
    },
    /// Square `p x p x p` problems from `start` to `end` inclusive.
    Linear { start: u64, end: u64, step: u64 },
    /// Square problems (or fixed `k`) for a caller-supplied size list.
    Explicit { sizes: Vec<u64>, k: Option<u64> },
}

impl SweepDomain {
    pub fn geometric(exponents: RangeInclusive<u32>, k: u64) -> Self {
        Self::Geometric {
            min_exponent: *exponents.start(),
            max_exponent: *exponents.end(),
            k,
        }
    }

    pub fn linear(start: u64, end: u64, step: u64) -> Self {
        Self::Linear { start, end, step }
    }

    pub fn explicit(sizes: Vec<u64>, k: Option<u64>) -> Self {
        Self::Explicit { sizes, k }
    }

    /// 16 through 4096 with `k = 64`.
    pub fn default_geometric() -> Self {
        Self::geometric(4..=12, 64)
    }

    /// 32 through 2048 in steps of 32.
    pub fn default_linear() -> Self {
        Self::linear(32, 2048, 32)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SweepDomain::Geometric { .. } => "geometric",
            SweepDomain::Linear { .. } => "linear",
            SweepDomain::Explicit { .. } => "explicit",
        }
    }

    pub fn is_geometric(&self) -> bool {
        matches!(self, SweepDomain::Geometric { .. })
    }

    /// Expands the domain into shapes in sweep order.
    pub fn shapes(&self) -> Result<Vec<ProblemShape>, ConfigError> {
        match self {
            SweepDomain::Geometric {
                min_exponent,
                max_exponent,
                k,
            } => {
                if min_exponent > max_exponent {
                    return Err(ConfigError::InvertedRange {
                        start: *min_exponent as u64,
                        end: *max_exponent as u64,
                    });
                }
                if *max_exponent > MAX_EXPONENT {
                    return Err(ConfigError::ExponentTooLarge {
                        exponent: *max_exponent,
                    });
                }
                (*min_exponent..=*max_exponent)
                    .map(|exponent| {
                        let p = 1u64 << exponent;
                        ProblemShape::new(p, p, *k)
                    })
                    .collect()
            }
            SweepDomain::Linear { start, end, step } => {
                if *step == 0 {
                    return Err(ConfigError::ZeroStep);
                }
                if start > end {
                    return Err(ConfigError::InvertedRange {
                        start: *start,
                        end: *end,
                    });
                }
                let points = (end - start) as u128 / *step as u128 + 1;
                if points > MAX_SWEEP_POINTS as u128 {
                    return Err(ConfigError::TooManyPoints {
                        points,
                        limit: MAX_SWEEP_POINTS,
                    });
                }
                iter::successors(Some(*start), |p| {
                    p.checked_add(*step).filter(|next| next <= end)
                })
                .map(ProblemShape::square)
                .collect()
            }
            SweepDomain::Explicit { sizes, k } => {
                if sizes.is_empty() {
                    return Err(ConfigError::EmptyDomain);
                }
                if sizes.len() as u64 > MAX_SWEEP_POINTS {
                    return Err(ConfigError::TooManyPoints {
                        points: sizes.len() as u128,
                        limit: MAX_SWEEP_POINTS,
                    });
                }
                sizes
                    .iter()
                    .map(|&p| ProblemShape::new(p, p, k.unwrap_or(p)))
                    .collect()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shapes().map(|_| ())
    }
}
