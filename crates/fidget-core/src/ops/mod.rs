//! Part construction and assembly
//!
//! Every operation takes the kernel explicitly and returns new solids; the
//! solids passed in are never modified or released.

mod body;
mod fidget;
mod gear;
mod layout;
mod pin;
mod shape;

pub use body::{add_holes, build_core};
pub use fidget::{FidgetParts, build_fidget};
pub use gear::{
    align_gear, align_gears_vertically, build_gear, build_gear_from_profile, rotate_gear,
    top_diameter,
};
pub use layout::arrange_meshes;
pub use pin::{add_hole, build_pin, pin_outline, slot_outline};
pub use shape::{apply_shape, build_shape};

use fidget_cad::{CadKernel, Solid};
use glam::{Mat4, Vec3};

use crate::types::Face;

/// Tessellation tolerance for measuring solids
///
/// Parts are planar-faced, so their tessellation is exact at any tolerance.
const MEASURE_TOLERANCE: f32 = 0.1;

/// Solids created by an operation still in progress
///
/// Everything held is released when the guard drops, so an early `?` return
/// leaves no intermediate solids behind in the kernel.
struct Scratch<'k> {
    kernel: &'k dyn CadKernel,
    held: Vec<Solid>,
}

impl<'k> Scratch<'k> {
    fn new(kernel: &'k dyn CadKernel) -> Self {
        Self {
            kernel,
            held: Vec::new(),
        }
    }

    /// Track a solid until the guard drops
    fn hold(&mut self, solid: Solid) -> Solid {
        self.held.push(solid);
        solid
    }

    fn hold_all(&mut self, solids: Vec<Solid>) -> Vec<Solid> {
        self.held.extend_from_slice(&solids);
        solids
    }

    /// Release a held solid now
    fn release(&mut self, solid: &Solid) {
        self.held.retain(|held| held != solid);
        self.kernel.release(solid);
    }

    fn release_all(&mut self, solids: &[Solid]) {
        for solid in solids {
            self.release(solid);
        }
    }

    /// Hand a held solid to the caller
    fn keep(&mut self, solid: Solid) -> Solid {
        self.held.retain(|held| *held != solid);
        solid
    }

    /// Hand every held solid to the caller, in the order they were held
    fn keep_all(mut self) -> Vec<Solid> {
        std::mem::take(&mut self.held)
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        for solid in self.held.drain(..) {
            self.kernel.release(&solid);
        }
    }
}

/// Place a pin on a face: Z onto the normal, onto the face center, then
/// scaled about the world origin
fn mount_transform(face: &Face, scale: f32) -> Mat4 {
    Mat4::from_scale(Vec3::splat(scale))
        * Mat4::from_translation(face.origin)
        * Mat4::from_quat(face.alignment())
}
