use std::f64::consts::SQRT_2;

use fidget_cad::{CadKernel, Polyhedron};
use glam::Vec3;

use super::{Scratch, mount_transform};
use crate::error::{FidgetError, FidgetResult};
use crate::types::{Core, Face, Pin};

/// Build the core: a cube with its corners cut off by an octahedron
///
/// The cube has edge `diameter`; the octahedron reaches `sqrt(2) * diameter / 2`
/// along each axis. Each octahedron face gives one gear [`Face`], in the
/// octahedron's face order.
pub fn build_core(kernel: &dyn CadKernel, diameter: f32) -> FidgetResult<Core> {
    if diameter.is_nan() || diameter <= 0.0 {
        return Err(FidgetError::InvalidParameter(format!(
            "Core diameter must be positive, got {}",
            diameter
        )));
    }

    let octahedron = Polyhedron::octahedron(SQRT_2 * diameter as f64 / 2.0);
    let faces: Vec<Face> = octahedron
        .face_normals()
        .into_iter()
        .zip(octahedron.face_centroids())
        .map(|(normal, origin)| Face::new(normal.as_vec3(), origin.as_vec3()))
        .collect();

    let mut scratch = Scratch::new(kernel);
    let cube = scratch.hold(kernel.create_box(Vec3::ZERO, Vec3::splat(diameter))?);
    let octa = scratch.hold(kernel.create_polyhedron(&octahedron)?);
    let solid = kernel.intersect(&octa, &cube)?;

    tracing::debug!(diameter, faces = faces.len(), "built core");
    Ok(Core { solid, faces })
}

/// Cut a flat-pin hole into every face of the core
pub fn add_holes(
    kernel: &dyn CadKernel,
    core: &Core,
    pin: &Pin,
    scale: f32,
) -> FidgetResult<Core> {
    let mut scratch = Scratch::new(kernel);
    let mut solid = core.solid;

    for (index, face) in core.faces.iter().enumerate() {
        let hole = scratch.hold(kernel.transform(&pin.flat, mount_transform(face, scale))?);
        let cut = scratch.hold(kernel.subtract(&solid, &hole)?);
        scratch.release(&hole);
        if solid != core.solid {
            scratch.release(&solid);
        }
        solid = cut;
        tracing::trace!(index, "cut core hole");
    }

    tracing::debug!(holes = core.faces.len(), scale, "added core holes");
    Ok(Core {
        solid: scratch.keep(solid),
        faces: core.faces.clone(),
    })
}
