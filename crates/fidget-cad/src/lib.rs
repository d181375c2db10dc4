//! Geometry layer for the fidget generator
//!
//! - [`kernel`]: trait-based abstraction over a B-Rep kernel (Truck)
//! - [`polyhedron`]: planar-faced solids described as vertex/face lists
//! - [`sketch`]: 2D profiles, including SVG outline loading
//! - [`mesh`]: measurement of tessellated meshes (volume, watertightness)
//! - [`stl`]: STL import and export

pub mod kernel;
pub mod mesh;
pub mod polyhedron;
pub mod sketch;
pub mod stl;

pub use kernel::*;
pub use polyhedron::Polyhedron;
pub use sketch::{ProfileError, Wire2D};
pub use stl::{StlError, load_stl, save_stl};
