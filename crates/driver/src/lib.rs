//! Sweep generation, sequential driving and reporting for perfsweep.

#[cfg(feature = "cli")]
pub mod cli;
pub mod domain;
pub mod driver;
pub mod plot;
pub mod report;
pub mod series;
pub mod sink;

#[cfg(feature = "cli")]
pub use cli::*;
pub use domain::*;
pub use driver::*;
pub use plot::*;
pub use report::*;
pub use series::*;
pub use sink::*;
