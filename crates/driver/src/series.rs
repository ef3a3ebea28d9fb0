//! Ordered sweep results.

use perfsweep_model::{ProblemShape, Throughput};
use serde::{Deserialize, Serialize};

/// One sweep position. `throughput` is `None` where the invocation failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub shape: ProblemShape,
    /// Independent variable plotted against.
    pub x: f64,
    pub throughput: Option<Throughput>,
}

impl SeriesPoint {
    pub fn gflops(&self) -> Option<f64> {
        self.throughput.map(|tp| tp.gflops())
    }

    pub fn is_gap(&self) -> bool {
        self.throughput.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    points: Vec<SeriesPoint>,
    interrupted: bool,
}

impl MetricSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            interrupted: false,
        }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn gflops(&self) -> Vec<Option<f64>> {
        self.points.iter().map(SeriesPoint::gflops).collect()
    }

    pub fn gap_positions(&self) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_gap())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn gaps(&self) -> usize {
        self.points.iter().filter(|p| p.is_gap()).count()
    }

    /// True when the sweep stopped before visiting every shape.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfsweep_model::metrics;

    #[test]
    fn gaps_are_tracked_by_position() {
        let shape = ProblemShape::square(4).unwrap();
        let mut series = MetricSeries::new();
        series.push(SeriesPoint {
            shape,
            x: 4.0,
            throughput: metrics::throughput(&shape, 1.0e-6).ok(),
        });
        series.push(SeriesPoint {
            shape,
            x: 8.0,
            throughput: None,
        });

        assert_eq!(series.len(), 2);
        assert_eq!(series.gaps(), 1);
        assert_eq!(series.gap_positions(), vec![1]);
        assert_eq!(series.x_values(), vec![4.0, 8.0]);
        assert!(series.gflops()[0].is_some());
        assert!(!series.is_interrupted());
    }
}
