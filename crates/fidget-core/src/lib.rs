//! Printable gear fidget
//!
//! Parametric parts for a fidget toy: an octahedron-cored body carrying eight
//! tapered gears, held on by split pins. Parts are built as solids in a
//! [`CadKernel`](fidget_cad::CadKernel), combined with boolean operations and
//! laid out on print plates.

pub mod config;
pub mod error;
pub mod ops;
pub mod types;

pub use config::{ConfigError, load_config, save_config};
pub use error::{FidgetError, FidgetResult};
pub use ops::*;
pub use types::*;
