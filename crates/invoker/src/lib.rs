//! Kernel executable invocation for perfsweep.
//!
//! A [`KernelInvoker`] turns one `(device, shape)` pair into either a
//! throughput or an [`InvocationFailure`]. [`ProcessInvoker`] is the real
//! implementation: it launches the device's executable as a child process,
//! reads the single elapsed-time line it prints and converts it with the
//! device's [`perfsweep_model::TimeUnit`].

pub mod cancel;
pub mod error;
pub mod registry;
pub mod runtime;

pub use cancel::*;
pub use error::*;
pub use registry::*;
pub use runtime::*;
