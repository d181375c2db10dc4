use fidget_cad::sketch::svg;
use fidget_cad::{CadKernel, Wire2D};
use glam::{Mat4, Quat, Vec3};

use super::Scratch;
use crate::error::{FidgetError, FidgetResult};
use crate::types::{Face, Gear, GearConfig};

/// Top diameter of a gear whose flanks lean at `angle` degrees
///
/// Each flank moves outward by `height * tan(90 - angle)`, so angles below
/// 90 widen the gear towards the top and angles above 90 narrow it.
pub fn top_diameter(bottom_diameter: f32, height: f32, angle: f32) -> FidgetResult<f32> {
    let top = bottom_diameter + 2.0 * height * (90.0 - angle).to_radians().tan();
    if top.is_nan() || top <= 0.0 {
        return Err(FidgetError::InvalidGear(format!(
            "Flank angle {} closes a {} tall gear of diameter {} before its top",
            angle, height, bottom_diameter
        )));
    }
    Ok(top)
}

/// Extrude the SVG gear outline into a tapered gear
pub fn build_gear(kernel: &dyn CadKernel, config: &GearConfig) -> FidgetResult<Gear> {
    let profile = svg::load_profile(&config.profile)?;
    tracing::debug!(
        profile = %config.profile.display(),
        points = profile.len(),
        "loaded gear outline"
    );
    build_gear_from_profile(kernel, &profile, config)
}

/// Extrude a gear outline into a tapered gear
///
/// The outline is centered on its smallest enclosing circle, whose diameter
/// is taken as the bottom diameter. The gear then tapers linearly to
/// [`top_diameter`] and is scaled in XY so the bottom matches
/// `base_diameter`. The bottom face lies at `z = 0`.
pub fn build_gear_from_profile(
    kernel: &dyn CadKernel,
    profile: &Wire2D,
    config: &GearConfig,
) -> FidgetResult<Gear> {
    if config.height.is_nan() || config.height <= 0.0 {
        return Err(FidgetError::InvalidGear(format!(
            "Height must be positive, got {}",
            config.height
        )));
    }
    if config.base_diameter.is_nan() || config.base_diameter <= 0.0 {
        return Err(FidgetError::InvalidGear(format!(
            "Base diameter must be positive, got {}",
            config.base_diameter
        )));
    }
    profile.validate()?;

    let circle = profile.bounding_circle();
    let bottom = 2.0 * circle.radius;
    let top = top_diameter(bottom, config.height, config.angle)?;
    let xy_scale = config.base_diameter / bottom;

    let outline = profile.translated(-circle.center).scaled(xy_scale);
    let gear = kernel.extrude(&outline, config.height, top / bottom)?;

    tracing::debug!(bottom, top, xy_scale, "built gear");
    Ok(gear)
}

/// Rotate a gear by `angle` degrees about a face's normal through its origin
pub fn rotate_gear(
    kernel: &dyn CadKernel,
    gear: &Gear,
    face: &Face,
    angle: f32,
) -> FidgetResult<Gear> {
    let matrix = Mat4::from_translation(face.origin)
        * Mat4::from_axis_angle(face.normal, angle.to_radians())
        * Mat4::from_translation(-face.origin);
    Ok(kernel.transform(gear, matrix)?)
}

/// Stand a gear on a face, `offset` along the normal from its origin
pub fn align_gear(
    kernel: &dyn CadKernel,
    gear: &Gear,
    face: &Face,
    offset: f32,
) -> FidgetResult<Gear> {
    let matrix = Mat4::from_translation(face.origin + face.normal * offset)
        * Mat4::from_quat(face.alignment());
    Ok(kernel.transform(gear, matrix)?)
}

/// Turn each gear so its face normal points up
///
/// Gears and faces are paired in order; extra items on either side are
/// ignored.
pub fn align_gears_vertically(
    kernel: &dyn CadKernel,
    gears: &[Gear],
    faces: &[Face],
) -> FidgetResult<Vec<Gear>> {
    if gears.len() != faces.len() {
        tracing::warn!(
            gears = gears.len(),
            faces = faces.len(),
            "gear and face counts differ"
        );
    }
    let mut upright = Scratch::new(kernel);
    for (gear, face) in gears.iter().zip(faces) {
        upright.hold(kernel.rotate(gear, Quat::from_rotation_arc(face.normal, Vec3::Z))?);
    }
    Ok(upright.keep_all())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fidget_cad::TruckKernel;
    use glam::Vec2;

    fn gear_config(angle: f32) -> GearConfig {
        GearConfig {
            profile: "unused.svg".into(),
            base_diameter: 24.0,
            height: 10.0,
            angle,
        }
    }

    /// Regular 12-gon of radius 10, off the origin
    fn dodecagon() -> Wire2D {
        Wire2D::circle(Vec2::new(5.0, 5.0), 10.0, 12)
    }

    #[test]
    fn test_top_diameter() {
        assert_relative_eq!(top_diameter(20.0, 10.0, 90.0).unwrap(), 20.0, epsilon = 1e-5);
        assert_relative_eq!(top_diameter(20.0, 10.0, 45.0).unwrap(), 40.0, epsilon = 1e-4);
        assert_relative_eq!(top_diameter(120.0, 50.0, 135.0).unwrap(), 20.0, epsilon = 1e-3);
        assert!(matches!(
            top_diameter(100.0, 60.0, 135.0),
            Err(FidgetError::InvalidGear(_))
        ));
    }

    #[test]
    fn test_straight_gear() {
        let kernel = TruckKernel::new();
        let gear = build_gear_from_profile(&kernel, &dodecagon(), &gear_config(90.0)).unwrap();
        let mesh = kernel.tessellate(&gear, 0.1).unwrap();
        assert!(mesh.is_watertight());

        // 12-gon area 3 r^2, scaled by 1.2 in both directions
        assert_relative_eq!(mesh.volume(), 300.0 * 1.44 * 10.0, epsilon = 0.1);

        let (min, max) = mesh.bounds();
        assert_relative_eq!(max.x, 12.0, epsilon = 1e-3);
        assert_relative_eq!(min.x, -12.0, epsilon = 1e-3);
        assert_relative_eq!(min.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_tapered_gear() {
        let kernel = TruckKernel::new();
        let gear = build_gear_from_profile(&kernel, &dodecagon(), &gear_config(45.0)).unwrap();
        let mesh = kernel.tessellate(&gear, 0.1).unwrap();
        assert!(mesh.is_watertight());

        // Top is twice the bottom: h/3 (A + 4A + 2A)
        let base = 300.0 * 1.44;
        assert_relative_eq!(mesh.volume(), 10.0 / 3.0 * 7.0 * base, epsilon = 0.5);
        let (_, max) = mesh.bounds();
        assert_relative_eq!(max.x, 24.0, epsilon = 1e-3);
    }

    #[test]
    fn test_gear_rejects_closing_taper() {
        let kernel = TruckKernel::new();
        let mut config = gear_config(135.0);
        config.height = 50.0;
        assert!(matches!(
            build_gear_from_profile(&kernel, &dodecagon(), &config),
            Err(FidgetError::InvalidGear(_))
        ));
        assert_eq!(kernel.solid_count(), 0);
    }

    #[test]
    fn test_gear_from_svg_asset() {
        let kernel = TruckKernel::new();
        let config = GearConfig {
            profile: concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/gear.svg").into(),
            base_diameter: 100.0,
            height: 50.0,
            angle: 135.0,
        };
        let gear = build_gear(&kernel, &config).unwrap();
        let mesh = kernel.tessellate(&gear, 0.1).unwrap();
        assert!(mesh.is_watertight());
        assert!(mesh.volume() > 0.0);
    }

    #[test]
    fn test_missing_profile() {
        let kernel = TruckKernel::new();
        let config = GearConfig {
            profile: "does/not/exist.svg".into(),
            ..GearConfig::default()
        };
        assert!(matches!(
            build_gear(&kernel, &config),
            Err(FidgetError::Profile(_))
        ));
    }

    #[test]
    fn test_align_and_rotate_gear() {
        let kernel = TruckKernel::new();
        // Off-center block so rotation about the normal is visible
        let gear = kernel
            .create_box(Vec3::new(2.0, 0.0, 0.5), Vec3::new(1.0, 1.0, 1.0))
            .unwrap();
        let face = Face::new(Vec3::X, Vec3::new(5.0, 0.0, 0.0));

        let aligned = align_gear(&kernel, &gear, &face, 1.0).unwrap();
        let c = kernel.tessellate(&aligned, 0.1).unwrap().centroid();
        // Local +Z now runs along +X, starting at origin + offset
        assert_relative_eq!(c.x, 6.5, epsilon = 1e-4);
        assert_relative_eq!(c.y.hypot(c.z), 2.0, epsilon = 1e-4);

        let turned = rotate_gear(&kernel, &aligned, &face, 90.0).unwrap();
        let t = kernel.tessellate(&turned, 0.1).unwrap().centroid();
        assert_relative_eq!(t.x, 6.5, epsilon = 1e-4);
        assert_relative_eq!(t.y.hypot(t.z), 2.0, epsilon = 1e-4);
        // A quarter turn about the normal
        assert_relative_eq!(Vec2::new(c.y, c.z).dot(Vec2::new(t.y, t.z)), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_align_gears_vertically() {
        let kernel = TruckKernel::new();
        let gear = kernel
            .create_box(Vec3::new(0.0, 0.0, 3.0), Vec3::new(1.0, 1.0, 2.0))
            .unwrap();
        let faces = [Face::new(Vec3::new(1.0, 1.0, 1.0), Vec3::ZERO)];
        let placed = align_gear(&kernel, &gear, &faces[0], 0.0).unwrap();

        let upright = align_gears_vertically(&kernel, &[placed], &faces).unwrap();
        assert_eq!(upright.len(), 1);
        let c = kernel.tessellate(&upright[0], 0.1).unwrap().centroid();
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(c.z, 3.0, epsilon = 1e-4);
    }
}
