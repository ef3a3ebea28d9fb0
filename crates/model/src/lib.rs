//! Problem shapes, devices and throughput metrics for perfsweep.

pub mod device;
pub mod error;
pub mod metrics;
pub mod roofline;
pub mod shape;
pub mod units;

pub use device::*;
pub use error::*;
pub use metrics::*;
pub use roofline::*;
pub use shape::*;
pub use units::*;
