//! CAD Kernel Abstraction Layer
//!
//! Provides a trait-based abstraction over geometry kernels so the fidget
//! parts can be built without depending on a specific backend.

mod traits;

#[cfg(feature = "truck")]
mod truck;

pub use traits::*;

#[cfg(feature = "truck")]
pub use truck::TruckKernel;
