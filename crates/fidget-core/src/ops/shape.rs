use fidget_cad::{CadKernel, Polyhedron, load_stl};
use glam::{Mat4, Vec3};

use super::{MEASURE_TOLERANCE, Scratch};
use crate::error::{FidgetError, FidgetResult};
use crate::types::{Gear, Shape, ShapeConfig, ShapeType};

/// Build the shape the gears are trimmed to
///
/// The primitive is centered on the area-weighted center of its surface,
/// rotated by the Euler angles, scaled per axis and finally moved by
/// `offset`.
pub fn build_shape(kernel: &dyn CadKernel, config: &ShapeConfig) -> FidgetResult<Shape> {
    let mut scratch = Scratch::new(kernel);
    let primitive = scratch.hold(match config.shape_type {
        ShapeType::Cube => kernel.create_box(Vec3::ZERO, config.size.to_vec3())?,
        ShapeType::Sphere => {
            kernel.create_sphere(Vec3::ZERO, config.radius, config.subdivisions)?
        }
        ShapeType::Cylinder => {
            kernel.create_cylinder(Vec3::ZERO, config.radius, config.height, Vec3::Z)?
        }
        ShapeType::Custom => {
            let path = config.stl_path.as_ref().ok_or_else(|| {
                FidgetError::InvalidShape("STL path is required for custom shape".into())
            })?;
            let mesh = load_stl(path)?;
            kernel.create_polyhedron(&Polyhedron::from_mesh(&mesh))?
        }
    });

    let center = kernel
        .tessellate(&primitive, MEASURE_TOLERANCE)?
        .surface_centroid();
    let shape = kernel.transform(&primitive, shape_transform(config, center))?;

    tracing::debug!(shape_type = ?config.shape_type, ?center, "built shape");
    Ok(shape)
}

/// Placement of a shape whose center is at `center`
fn shape_transform(config: &ShapeConfig, center: Vec3) -> Mat4 {
    Mat4::from_translation(Vec3::from(config.offset))
        * Mat4::from_scale(config.scale.to_vec3())
        * Mat4::from_quat(config.orientation())
        * Mat4::from_translation(-center)
}

/// Trim every gear to the shape
pub fn apply_shape(
    kernel: &dyn CadKernel,
    shape: &Shape,
    gears: &[Gear],
) -> FidgetResult<Vec<Gear>> {
    let mut trimmed = Scratch::new(kernel);
    for gear in gears {
        trimmed.hold(kernel.intersect(gear, shape)?);
    }
    Ok(trimmed.keep_all())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extent;
    use approx::assert_relative_eq;
    use fidget_cad::{Solid, TessellatedMesh, TruckKernel, save_stl};
    use std::f32::consts::FRAC_PI_2;

    fn mesh(kernel: &TruckKernel, solid: &Solid) -> TessellatedMesh {
        kernel.tessellate(solid, 0.1).unwrap()
    }

    #[test]
    fn test_shape_transform_order() {
        let mut config = ShapeConfig::new(ShapeType::Cube);
        config.rotation = [0.0, 0.0, FRAC_PI_2];
        config.scale = Extent::PerAxis([2.0, 1.0, 1.0]);
        config.offset = [0.0, 0.0, 5.0];

        let m = shape_transform(&config, Vec3::new(1.0, 0.0, 0.0));
        // Center first, then rotate X onto Y, then stretch X only
        let p = m.transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 5.0, epsilon = 1e-6);

        let q = m.transform_point3(Vec3::new(1.0, -1.0, 0.0));
        assert_relative_eq!(q.x, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cube_shape() {
        let kernel = TruckKernel::new();
        let mut config = ShapeConfig::new(ShapeType::Cube);
        config.size = Extent::PerAxis([4.0, 2.0, 1.0]);
        config.offset = [1.0, 2.0, 3.0];

        let shape = build_shape(&kernel, &config).unwrap();
        let m = mesh(&kernel, &shape);
        assert!(m.is_watertight());
        assert_relative_eq!(m.volume(), 8.0, epsilon = 1e-3);
        let c = m.centroid();
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(c.z, 3.0, epsilon = 1e-4);
        assert_eq!(kernel.solid_count(), 1);
    }

    #[test]
    fn test_sphere_shape_scaled() {
        let kernel = TruckKernel::new();
        let mut config = ShapeConfig::new(ShapeType::Sphere);
        config.radius = 2.0;
        config.subdivisions = 1;
        config.scale = Extent::PerAxis([1.0, 1.0, 0.5]);

        let shape = build_shape(&kernel, &config).unwrap();
        let m = mesh(&kernel, &shape);
        assert!(m.is_watertight());
        let (min, max) = m.bounds();
        assert_relative_eq!(max.z - min.z, 2.0, epsilon = 1e-3);
        assert!(m.volume() < 4.0 / 3.0 * std::f64::consts::PI * 8.0 * 0.5);
    }

    #[test]
    fn test_cylinder_shape_is_centered() {
        let kernel = TruckKernel::new();
        let mut config = ShapeConfig::new(ShapeType::Cylinder);
        config.radius = 3.0;
        config.height = 4.0;

        let shape = build_shape(&kernel, &config).unwrap();
        let m = mesh(&kernel, &shape);
        assert!(m.is_watertight());
        let (min, max) = m.bounds();
        assert_relative_eq!(min.z, -2.0, epsilon = 1e-4);
        assert_relative_eq!(max.z, 2.0, epsilon = 1e-4);
        assert_relative_eq!(max.x, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_custom_shape_requires_path() {
        let kernel = TruckKernel::new();
        let config = ShapeConfig::new(ShapeType::Custom);
        assert!(matches!(
            build_shape(&kernel, &config),
            Err(FidgetError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_custom_shape_from_stl() {
        let kernel = TruckKernel::new();
        let cube = kernel
            .create_box(Vec3::new(10.0, 0.0, 0.0), Vec3::splat(2.0))
            .unwrap();
        let path = std::env::temp_dir().join(format!("fidget-shape-{}.stl", uuid::Uuid::new_v4()));
        save_stl(&mesh(&kernel, &cube), &path).unwrap();

        let mut config = ShapeConfig::new(ShapeType::Custom);
        config.stl_path = Some(path.clone());
        let shape = build_shape(&kernel, &config);
        std::fs::remove_file(&path).unwrap();

        let m = mesh(&kernel, &shape.unwrap());
        assert_relative_eq!(m.volume(), 8.0, epsilon = 1e-3);
        // Recentered on the origin
        assert!(m.centroid().length() < 1e-4);
    }

    #[test]
    fn test_custom_shape_centered_on_surface() {
        let kernel = TruckKernel::new();
        let corner = TessellatedMesh::from_indexed(
            vec![[0.0, 0.0, 0.0], [6.0, 0.0, 0.0], [0.0, 6.0, 0.0], [0.0, 0.0, 6.0]],
            vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
        );
        let path = std::env::temp_dir().join(format!("fidget-corner-{}.stl", uuid::Uuid::new_v4()));
        save_stl(&corner, &path).unwrap();

        let mut config = ShapeConfig::new(ShapeType::Custom);
        config.stl_path = Some(path.clone());
        let shape = build_shape(&kernel, &config);
        std::fs::remove_file(&path).unwrap();

        let m = mesh(&kernel, &shape.unwrap());
        assert!(m.surface_centroid().length() < 1e-4);
        // The volume centroid sits off the surface center, towards the corner
        let c = m.centroid();
        assert!(c.x < -0.05 && (c.x - c.y).abs() < 1e-4 && (c.x - c.z).abs() < 1e-4);
        assert_eq!(kernel.solid_count(), 1);
    }

    #[test]
    fn test_apply_shape() {
        let kernel = TruckKernel::new();
        let shape = kernel.create_box(Vec3::ZERO, Vec3::splat(4.0)).unwrap();
        let gears = [
            kernel
                .create_box(Vec3::new(0.0, 0.0, 3.0), Vec3::new(1.0, 1.0, 4.0))
                .unwrap(),
            kernel
                .create_box(Vec3::new(0.0, 3.0, 0.0), Vec3::new(1.0, 4.0, 1.0))
                .unwrap(),
        ];

        let trimmed = apply_shape(&kernel, &shape, &gears).unwrap();
        assert_eq!(trimmed.len(), 2);
        for gear in &trimmed {
            let m = mesh(&kernel, gear);
            assert!(m.is_watertight());
            // Only the part below 2 of the span 1..5 remains
            assert_relative_eq!(m.volume(), 1.0, epsilon = 1e-3);
        }
    }
}
