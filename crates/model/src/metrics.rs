//! Operation counts, naive memory traffic and throughput.
//!
//! Traffic assumes `C += A * B` with every input element loaded once and every
//! output element loaded and stored once, which gives `2mn + mk + kn`
//! elements. It is an idealized lower bound, not a measurement.

use crate::error::MetricError;
use crate::shape::ProblemShape;
use serde::{Deserialize, Serialize};

/// Floating-point operations per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Throughput(f64);

impl Throughput {
    pub fn flops_per_second(&self) -> f64 {
        self.0
    }

    pub fn gflops(&self) -> f64 {
        self.0 / 1.0e9
    }
}

/// Total floating-point operations, counting a multiply-add as two.
pub fn operations(shape: &ProblemShape) -> u128 {
    2 * shape.m() as u128 * shape.n() as u128 * shape.k() as u128
}

pub fn naive_memory_traffic(shape: &ProblemShape) -> u128 {
    let (m, n, k) = (shape.m() as u128, shape.n() as u128, shape.k() as u128);
    2 * m * n + m * k + k * n
}

/// Operations per element moved under the naive traffic model.
pub fn arithmetic_intensity(shape: &ProblemShape) -> f64 {
    operations(shape) as f64 / naive_memory_traffic(shape) as f64
}

/// `elapsed_seconds` must already be in seconds; unit conversion belongs to the
/// caller that knows what the kernel reported.
pub fn throughput(shape: &ProblemShape, elapsed_seconds: f64) -> Result<Throughput, MetricError> {
    if !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
        return Err(MetricError::NonPositiveElapsed(elapsed_seconds));
    }
    Ok(Throughput(operations(shape) as f64 / elapsed_seconds))
}

pub fn fraction_of_peak(throughput: Throughput, peak_gflops: f64) -> f64 {
    throughput.gflops() / peak_gflops
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn shape(m: u64, n: u64, k: u64) -> ProblemShape {
        ProblemShape::new(m, n, k).unwrap()
    }

    #[test]
    fn operations_are_exact() {
        assert_eq!(operations(&shape(1, 1, 1)), 2);
        assert_eq!(operations(&shape(64, 64, 64)), 524_288);
        assert_eq!(operations(&shape(3, 5, 7)), 210);
        // 2^21 cubed overflows u64 once doubled.
        let big = 1u64 << 21;
        assert_eq!(operations(&shape(big, big, big)), 2u128 << 63);
    }

    #[test]
    fn traffic_counts_output_twice() {
        assert_eq!(naive_memory_traffic(&shape(1, 1, 1)), 4);
        assert_eq!(naive_memory_traffic(&shape(2, 3, 4)), 2 * 6 + 8 + 12);
        assert_eq!(naive_memory_traffic(&shape(16, 16, 64)), 512 + 1024 + 1024);
    }

    #[test]
    fn intensity_grows_with_square_size() {
        let mut previous = 0.0;
        for p in 1..=512 {
            let ai = arithmetic_intensity(&shape(p, p, p));
            assert!(ai >= previous, "intensity dropped at p={p}");
            previous = ai;
        }
        // 2p^3 / 4p^2
        assert_relative_eq!(arithmetic_intensity(&shape(128, 128, 128)), 64.0);
    }

    #[test]
    fn intensity_is_non_decreasing_in_each_dimension() {
        for dim in 0..3 {
            let mut previous = 0.0;
            for value in 1..=256 {
                let dims = match dim {
                    0 => (value, 32, 32),
                    1 => (32, value, 32),
                    _ => (32, 32, value),
                };
                let ai = arithmetic_intensity(&shape(dims.0, dims.1, dims.2));
                assert!(ai >= previous);
                previous = ai;
            }
        }
    }

    #[test]
    fn throughput_divides_operations_by_seconds() {
        let s = shape(1024, 1024, 1024);
        let tp = throughput(&s, 0.5).unwrap();
        assert_relative_eq!(tp.flops_per_second(), operations(&s) as f64 / 0.5);
        assert_relative_eq!(tp.gflops(), operations(&s) as f64 / 0.5 / 1.0e9);
    }

    #[test]
    fn throughput_rejects_non_positive_time() {
        let s = shape(8, 8, 8);
        assert_eq!(throughput(&s, 0.0), Err(MetricError::NonPositiveElapsed(0.0)));
        assert_eq!(throughput(&s, -1.0), Err(MetricError::NonPositiveElapsed(-1.0)));
        assert!(throughput(&s, f64::NAN).is_err());
        assert!(throughput(&s, f64::INFINITY).is_err());
    }

    #[test]
    fn fraction_of_peak_normalizes_gflops() {
        let s = shape(1000, 1000, 1000);
        // 2e9 flops in 1 s
        let tp = throughput(&s, 1.0).unwrap();
        assert_relative_eq!(fraction_of_peak(tp, 4.0), 0.5);
    }
}
