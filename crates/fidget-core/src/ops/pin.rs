use std::f64::consts::{FRAC_PI_2, PI};

use fidget_cad::{CadKernel, Polyhedron, Solid, Wire2D};
use glam::{DMat4, DVec3, Vec2};

use super::{Scratch, mount_transform};
use crate::error::{FidgetError, FidgetResult};
use crate::types::{Face, Gear, Pin, PinConfig};

/// Depth of the slot cut that splits the pin
const SLOT_DEPTH: f64 = 1024.0;

/// Pin outline as `(radius, height)` points for revolving around Z
///
/// Two collars joined by a straight section of length `center_length`.
pub fn pin_outline(center_length: f32) -> Wire2D {
    let l = center_length;
    // (axial, radius)
    let points = [
        (2.5, 0.0),
        (2.5, 1.25),
        (5.0, 2.5),
        (10.0, 3.5),
        (11.0, 2.75),
        (11.0 + l, 2.75),
        (12.0 + l, 3.5),
        (17.0 + l, 2.5),
        (19.5 + l, 1.25),
        (19.5 + l, 0.0),
    ];
    Wire2D::new(points.iter().map(|&(a, r)| Vec2::new(a, r)).collect()).transposed()
}

/// Outline of the slot splitting the pin, across then along the pin axis
pub fn slot_outline(center_length: f32) -> Wire2D {
    let l = center_length;
    let points = [
        (4.0, 0.0),
        (6.0, 1.0),
        (16.0 + l, 1.0),
        (18.0 + l, 0.0),
        (16.0 + l, -1.0),
        (6.0, -1.0),
    ];
    Wire2D::new(points.iter().map(|&(a, r)| Vec2::new(a, r)).collect()).transposed()
}

/// Build the round, flat and printable split pin
///
/// The round pin is the revolved outline. The flat pin keeps the slab
/// `|y| <= R / 2` of it, where `R` is the pin's largest radius. The split pin
/// is the flat pin with a slot through it, laid on a flat side for printing.
/// Round and flat pins are centered on their centers of mass.
pub fn build_pin(kernel: &dyn CadKernel, config: &PinConfig) -> FidgetResult<Pin> {
    if config.center_length.is_nan() || config.center_length < 0.0 {
        return Err(FidgetError::InvalidParameter(format!(
            "Pin center length must not be negative, got {}",
            config.center_length
        )));
    }

    // Twisted by a quarter section so the facets of pins meeting head on
    // from opposite core faces never line up
    let twist = DMat4::from_rotation_z(PI / (2.0 * config.sections.max(1) as f64));
    let revolved = Polyhedron::revolution(&pin_outline(config.center_length), config.sections)?
        .transformed(twist);
    let radius = revolved
        .vertices
        .iter()
        .map(|v| v.truncate().length())
        .fold(0.0, f64::max);
    let flattened = revolved
        .clipped(DVec3::Y, radius / 2.0)?
        .clipped(DVec3::NEG_Y, radius / 2.0)?;

    let mut scratch = Scratch::new(kernel);
    let round = scratch.hold(kernel.create_polyhedron(&centered(&revolved))?);
    let flat = scratch.hold(kernel.create_polyhedron(&centered(&flattened))?);
    let pin = split_pin(kernel, &flat, config.center_length)?;

    tracing::debug!(
        center_length = config.center_length,
        sections = config.sections,
        radius,
        "built pin"
    );
    Ok(Pin {
        round: scratch.keep(round),
        flat: scratch.keep(flat),
        pin,
    })
}

/// Move a polyhedron so its center of mass is at the origin
fn centered(polyhedron: &Polyhedron) -> Polyhedron {
    polyhedron.transformed(DMat4::from_translation(-polyhedron.centroid()))
}

/// Cut the slot through a flat pin and lay it down for printing
fn split_pin(kernel: &dyn CadKernel, flat: &Solid, center_length: f32) -> FidgetResult<Solid> {
    let upright = DMat4::from_rotation_x(FRAC_PI_2);
    let slot = Polyhedron::extrusion(&slot_outline(center_length), SLOT_DEPTH, 1.0)?;

    let mut scratch = Scratch::new(kernel);
    let cut = scratch.hold(kernel.create_polyhedron(&centered(&slot).transformed(upright))?);
    let split = scratch.hold(kernel.subtract(flat, &cut)?);
    Ok(kernel.transform(&split, upright.as_mat4())?)
}

/// Bore a round-pin hole through a gear at a core face
pub fn add_hole(
    kernel: &dyn CadKernel,
    gear: &Gear,
    face: &Face,
    pin: &Pin,
    scale: f32,
) -> FidgetResult<Gear> {
    let hole = kernel.transform(&pin.round, mount_transform(face, scale))?;
    let bored = kernel.subtract(gear, &hole);
    kernel.release(&hole);
    Ok(bored?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fidget_cad::TruckKernel;
    use glam::Vec3;

    #[test]
    fn test_pin_outline() {
        let outline = pin_outline(12.0);
        assert_eq!(outline.len(), 10);
        outline.validate().unwrap();

        // Both ends sit on the axis
        assert_eq!(outline.points[0], Vec2::new(0.0, 2.5));
        assert_eq!(outline.points[9], Vec2::new(0.0, 31.5));

        // Symmetric about the middle of the pin
        let mid = (2.5 + 31.5) / 2.0;
        for (a, b) in outline.points.iter().zip(outline.points.iter().rev()) {
            assert_relative_eq!(a.x, b.x);
            assert_relative_eq!(a.y - mid, mid - b.y);
        }
    }

    #[test]
    fn test_slot_outline() {
        let slot = slot_outline(12.0);
        assert_eq!(slot.len(), 6);
        // 2 wide, 14 + L long, with pointed ends
        assert_relative_eq!(slot.signed_area().abs(), 2.0 * 22.0 + 2.0 * 2.0);
        assert_eq!(slot.points[0], Vec2::new(0.0, 4.0));
    }

    #[test]
    fn test_build_pin() {
        let kernel = TruckKernel::new();
        let config = PinConfig {
            center_length: 4.0,
            diameter: 6.0,
            sections: 16,
        };
        let pin = build_pin(&kernel, &config).unwrap();

        let round = kernel.tessellate(&pin.round, 0.1).unwrap();
        assert!(round.is_watertight());
        assert!(round.centroid().length() < 1e-3);
        let (min, max) = round.bounds();
        // 17 + L long along Z, centered
        assert_relative_eq!(max.z - min.z, 21.0, epsilon = 1e-4);
        assert_relative_eq!(max.z, 10.5, epsilon = 1e-3);

        let flat = kernel.tessellate(&pin.flat, 0.1).unwrap();
        assert!(flat.is_watertight());
        let (min, max) = flat.bounds();
        assert_relative_eq!(max.y - min.y, 3.5, epsilon = 1e-3);
        assert!(flat.volume() < round.volume());

        let split = kernel.tessellate(&pin.pin, 0.1).unwrap();
        assert!(split.is_watertight());
        assert!(split.volume() > 0.0 && split.volume() < flat.volume());
        // Lying down: long along Y, flat sides facing Z
        let (min, max) = split.bounds();
        assert_relative_eq!(max.y - min.y, 21.0, epsilon = 1e-3);
        assert_relative_eq!(max.z - min.z, 3.5, epsilon = 1e-3);

        assert_eq!(kernel.solid_count(), 3);
    }

    #[test]
    fn test_negative_length_rejected() {
        let kernel = TruckKernel::new();
        let config = PinConfig {
            center_length: -1.0,
            ..PinConfig::default()
        };
        assert!(matches!(
            build_pin(&kernel, &config),
            Err(FidgetError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_flat_pin_keeps_round_ends() {
        let kernel = TruckKernel::new();
        let config = PinConfig {
            sections: 24,
            ..PinConfig::default()
        };
        let pin = build_pin(&kernel, &config).unwrap();

        let round = kernel.tessellate(&pin.round, 0.1).unwrap();
        let flat = kernel.tessellate(&pin.flat, 0.1).unwrap();
        assert!(flat.is_watertight());
        // Same length and width, only the sides are cut
        let ((round_min, round_max), (flat_min, flat_max)) = (round.bounds(), flat.bounds());
        assert_relative_eq!(flat_max.z - flat_min.z, round_max.z - round_min.z, epsilon = 1e-3);
        assert_relative_eq!(flat_max.x - flat_min.x, round_max.x - round_min.x, epsilon = 1e-3);
        assert_relative_eq!(flat_max.y, 1.75, epsilon = 1e-3);
        assert!(flat.centroid().length() < 1e-3);
    }

    #[test]
    fn test_add_hole_with_pin() {
        let kernel = TruckKernel::new();
        let gear = kernel
            .create_box(Vec3::new(0.0, 0.0, 3.0), Vec3::new(20.0, 20.0, 6.0))
            .unwrap();
        let config = PinConfig {
            sections: 16,
            ..PinConfig::default()
        };
        let pin = build_pin(&kernel, &config).unwrap();
        let face = Face::new(Vec3::Z, Vec3::ZERO);

        let bored = add_hole(&kernel, &gear, &face, &pin, 1.05).unwrap();
        let mesh = kernel.tessellate(&bored, 0.1).unwrap();
        assert!(mesh.is_watertight());

        // The straight middle of the pin, radius 2.75 scaled by 1.05
        let r = 2.75 * 1.05_f64;
        let section = 8.0 * r * r * (std::f64::consts::TAU / 16.0).sin();
        assert_relative_eq!(mesh.volume(), 2400.0 - 6.0 * section, epsilon = 0.1);
        assert_eq!(kernel.solid_count(), 5);
    }

    #[test]
    fn test_add_hole_through_gear() {
        let kernel = TruckKernel::new();
        let gear = kernel
            .create_box(Vec3::new(0.0, 0.0, 1.0), Vec3::new(10.0, 10.0, 2.0))
            .unwrap();
        let rod = kernel
            .create_box(Vec3::ZERO, Vec3::new(2.0, 2.0, 6.0))
            .unwrap();
        let pin = Pin {
            round: rod,
            flat: rod,
            pin: rod,
        };
        let face = Face::new(Vec3::Z, Vec3::ZERO);

        let bored = add_hole(&kernel, &gear, &face, &pin, 1.0).unwrap();
        let mesh = kernel.tessellate(&bored, 0.1).unwrap();
        assert!(mesh.is_watertight());
        assert_relative_eq!(mesh.volume(), 200.0 - 8.0, epsilon = 1e-2);

        // The gear itself is untouched
        let untouched = kernel.tessellate(&gear, 0.1).unwrap();
        assert_relative_eq!(untouched.volume(), 200.0, epsilon = 1e-2);
    }
}
