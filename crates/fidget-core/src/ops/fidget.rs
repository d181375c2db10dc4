use fidget_cad::{CadKernel, Solid};

use super::{
    Scratch, add_hole, add_holes, align_gear, align_gears_vertically, apply_shape,
    arrange_meshes, build_core, build_gear, build_pin, build_shape, rotate_gear,
};
use crate::error::FidgetResult;
use crate::types::{Core, FidgetConfig, Gear};

/// Print-ready parts of a complete fidget
#[derive(Debug, Clone, PartialEq)]
pub struct FidgetParts {
    /// Core with a pin hole in every face
    pub core: Core,
    /// Trimmed and bored gears, standing upright on the gear plate
    pub gears: Vec<Gear>,
    /// One split pin per gear, on the pin plate
    pub pins: Vec<Solid>,
}

impl FidgetParts {
    /// Every solid owned by these parts
    pub fn solids(&self) -> impl Iterator<Item = &Solid> {
        std::iter::once(&self.core.solid)
            .chain(&self.gears)
            .chain(&self.pins)
    }
}

/// Build every part of a fidget
///
/// One gear is mounted on each core face, turned by the matching entry of
/// `gear_rotations` and trimmed to the shape. Core and gears are bored for
/// the pins, then gears and pins are laid out on their plates. On error no
/// solid is left behind in the kernel.
pub fn build_fidget(kernel: &dyn CadKernel, config: &FidgetConfig) -> FidgetResult<FidgetParts> {
    config.validate()?;
    let mut scratch = Scratch::new(kernel);

    let core = build_core(kernel, config.core_diameter)?;
    scratch.hold(core.solid);
    tracing::info!(faces = core.faces.len(), "built core");

    if config.gear_rotations.len() != core.faces.len() {
        tracing::warn!(
            rotations = config.gear_rotations.len(),
            faces = core.faces.len(),
            "gear rotation count differs from face count"
        );
    }

    let gear = scratch.hold(build_gear(kernel, &config.gear)?);
    let mut gears = Vec::with_capacity(core.faces.len());
    for (face, angle) in core.faces.iter().zip(&config.gear_rotations) {
        let aligned = scratch.hold(align_gear(kernel, &gear, face, 0.0)?);
        gears.push(scratch.hold(rotate_gear(kernel, &aligned, face, *angle)?));
        scratch.release(&aligned);
    }
    scratch.release(&gear);
    tracing::info!(gears = gears.len(), "mounted gears");

    let shape = scratch.hold(build_shape(kernel, &config.shape)?);
    let trimmed = scratch.hold_all(apply_shape(kernel, &shape, &gears)?);
    scratch.release_all(&gears);
    scratch.release(&shape);
    tracing::info!(shape_type = ?config.shape.shape_type, "trimmed gears");

    let pin = build_pin(kernel, &config.pin)?;
    scratch.hold_all(vec![pin.round, pin.flat, pin.pin]);
    let drilled = add_holes(kernel, &core, &pin, config.hole_scale)?;
    scratch.hold(drilled.solid);
    scratch.release(&core.solid);

    let mut bored = Vec::with_capacity(trimmed.len());
    for (gear, face) in trimmed.iter().zip(&core.faces) {
        bored.push(scratch.hold(add_hole(kernel, gear, face, &pin, config.hole_scale)?));
    }
    scratch.release_all(&trimmed);
    tracing::info!("bored pin holes");

    let upright = scratch.hold_all(align_gears_vertically(kernel, &bored, &core.faces)?);
    scratch.release_all(&bored);
    let gears = scratch.hold_all(arrange_meshes(kernel, &upright, &config.gear_layout)?);
    scratch.release_all(&upright);

    let pins = scratch.hold_all(arrange_meshes(
        kernel,
        &vec![pin.pin; core.faces.len()],
        &config.pin_layout,
    )?);
    scratch.release_all(&[pin.round, pin.flat, pin.pin]);
    tracing::info!(gears = gears.len(), pins = pins.len(), "laid out print plates");

    // Everything still held is a finished part
    scratch.keep_all();
    Ok(FidgetParts {
        core: drilled,
        gears,
        pins,
    })
}
