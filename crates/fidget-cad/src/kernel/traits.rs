//! CAD Kernel trait definitions
//!
//! These traits define the interface that all CAD kernels must implement.

use glam::{DVec3, Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::polyhedron::Polyhedron;
use crate::sketch::Wire2D;

/// Error type for CAD kernel operations
#[derive(Debug, Clone, Error)]
pub enum CadError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid polyhedron: {0}")]
    InvalidPolyhedron(String),

    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),

    #[error("Tessellation failed: {0}")]
    TessellationFailed(String),

    #[error("Solid not found: {0}")]
    SolidNotFound(Uuid),

    #[error("Kernel not available: {0}")]
    KernelNotAvailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for CAD operations
pub type CadResult<T> = Result<T, CadError>;

/// A tessellated mesh output from the CAD kernel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TessellatedMesh {
    /// Vertex positions (3 floats per vertex)
    pub vertices: Vec<[f32; 3]>,
    /// Face normals (one per triangle)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (3 indices per triangle)
    pub indices: Vec<u32>,
}

impl TessellatedMesh {
    /// Create an empty tessellated mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A 3D solid body
///
/// The geometry itself lives in the kernel that created the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Solid {
    /// Unique identifier
    pub id: Uuid,
}

impl Solid {
    /// Create a new solid with the given ID
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanType {
    /// Union (add)
    Union,
    /// Subtraction (cut)
    Subtract,
    /// Intersection (common)
    Intersect,
}

/// The main CAD kernel trait
///
/// Implementations of this trait provide the actual geometry operations
/// using different backends. Every operation returns a new [`Solid`] and
/// leaves its inputs untouched.
pub trait CadKernel: Send + Sync {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    /// Check if the kernel is available
    fn is_available(&self) -> bool;

    /// Build a closed solid from planar faces
    fn create_polyhedron(&self, polyhedron: &Polyhedron) -> CadResult<Solid>;

    /// Extrude a profile lying in the XY plane along +Z
    ///
    /// # Arguments
    /// * `profile` - The closed 2D profile
    /// * `distance` - The extrusion distance
    /// * `top_scale` - Scale of the top outline about the origin (1 = prism)
    fn extrude(&self, profile: &Wire2D, distance: f32, top_scale: f32) -> CadResult<Solid>;

    /// Perform a boolean operation on two solids
    ///
    /// # Arguments
    /// * `a` - The first solid
    /// * `b` - The second solid
    /// * `op` - The boolean operation type
    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid>;

    /// Apply an affine transform
    fn transform(&self, solid: &Solid, matrix: Mat4) -> CadResult<Solid>;

    /// Tessellate a solid into triangles
    ///
    /// # Arguments
    /// * `solid` - The solid to tessellate
    /// * `tolerance` - The tessellation tolerance (lower = more triangles)
    fn tessellate(&self, solid: &Solid, tolerance: f32) -> CadResult<TessellatedMesh>;

    /// Forget a solid that is no longer needed
    fn release(&self, solid: &Solid);

    /// Create a box primitive
    fn create_box(&self, center: Vec3, size: Vec3) -> CadResult<Solid>;

    /// Revolve a `(radius, height)` profile a full turn around the Z axis
    fn revolve(&self, profile: &Wire2D, sections: u32) -> CadResult<Solid> {
        self.create_polyhedron(&Polyhedron::revolution(profile, sections)?)
    }

    /// Create a cylinder primitive
    fn create_cylinder(
        &self,
        center: Vec3,
        radius: f32,
        height: f32,
        axis: Vec3,
    ) -> CadResult<Solid> {
        let wire = Wire2D::circle(Vec2::ZERO, radius, 32);
        let prism = self.extrude(&wire, height, 1.0)?;

        let axis = axis.normalize();
        let base_center = center - axis * (height / 2.0);
        let placed = self.transform(
            &prism,
            Mat4::from_rotation_translation(Quat::from_rotation_arc(Vec3::Z, axis), base_center),
        );
        self.release(&prism);
        placed
    }

    /// Create a geodesic sphere primitive
    fn create_sphere(&self, center: Vec3, radius: f32, subdivisions: u32) -> CadResult<Solid> {
        let sphere = Polyhedron::icosphere(radius as f64, subdivisions);
        let offset = DVec3::new(center.x as f64, center.y as f64, center.z as f64);
        self.create_polyhedron(&sphere.transformed(glam::DMat4::from_translation(offset)))
    }

    fn union(&self, a: &Solid, b: &Solid) -> CadResult<Solid> {
        self.boolean(a, b, BooleanType::Union)
    }

    fn intersect(&self, a: &Solid, b: &Solid) -> CadResult<Solid> {
        self.boolean(a, b, BooleanType::Intersect)
    }

    fn subtract(&self, a: &Solid, b: &Solid) -> CadResult<Solid> {
        self.boolean(a, b, BooleanType::Subtract)
    }

    fn translate(&self, solid: &Solid, offset: Vec3) -> CadResult<Solid> {
        self.transform(solid, Mat4::from_translation(offset))
    }

    /// Rotate about the origin
    fn rotate(&self, solid: &Solid, rotation: Quat) -> CadResult<Solid> {
        self.transform(solid, Mat4::from_quat(rotation))
    }

    /// Scale about the origin
    fn scale(&self, solid: &Solid, factors: Vec3) -> CadResult<Solid> {
        self.transform(solid, Mat4::from_scale(factors))
    }
}

/// A null kernel that always returns errors (used when no kernel is available)
#[derive(Debug, Default)]
pub struct NullKernel;

impl NullKernel {
    fn unavailable<T>() -> CadResult<T> {
        Err(CadError::KernelNotAvailable(
            "No CAD kernel available".into(),
        ))
    }
}

impl CadKernel for NullKernel {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn create_polyhedron(&self, _polyhedron: &Polyhedron) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn extrude(&self, _profile: &Wire2D, _distance: f32, _top_scale: f32) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn boolean(&self, _a: &Solid, _b: &Solid, _op: BooleanType) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn transform(&self, _solid: &Solid, _matrix: Mat4) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn tessellate(&self, _solid: &Solid, _tolerance: f32) -> CadResult<TessellatedMesh> {
        Self::unavailable()
    }

    fn release(&self, _solid: &Solid) {}

    fn create_box(&self, _center: Vec3, _size: Vec3) -> CadResult<Solid> {
        Self::unavailable()
    }
}

/// Get the default CAD kernel based on available features
#[cfg(feature = "truck")]
pub fn default_kernel() -> Box<dyn CadKernel> {
    Box::new(super::TruckKernel::new())
}

/// Get the default CAD kernel based on available features
#[cfg(not(feature = "truck"))]
pub fn default_kernel() -> Box<dyn CadKernel> {
    Box::new(NullKernel)
}
