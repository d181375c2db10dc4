//! Truck CAD Kernel Backend
//!
//! Pure Rust B-Rep kernel using the Truck library.
//!
//! Supports polyhedral solids, extrusion, boolean operations (union,
//! intersection and subtraction) and affine transforms.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use parking_lot::Mutex;
use uuid::Uuid;

use truck_meshalgo::prelude::*;
use truck_modeling::{
    Edge, EdgeID, Face, Matrix4, Point3, Shell, Solid as TruckSolid, Vector3, Vertex, VertexID,
    Wire, builder,
};
use truck_polymesh::PolygonMesh;
use truck_shapeops::{and as solid_and, or as solid_or};
use truck_topology::shell::ShellCondition;

use super::{BooleanType, CadError, CadKernel, CadResult, Solid, TessellatedMesh};
use crate::polyhedron::Polyhedron;
use crate::sketch::Wire2D;

/// Default tolerance for boolean operations
const BOOLEAN_TOLERANCE: f64 = 0.05;

/// Truck-based CAD kernel
pub struct TruckKernel {
    /// Storage for solid data (keyed by UUID)
    solids: Mutex<HashMap<Uuid, TruckSolid>>,
    /// Tolerance handed to the shape operations
    tolerance: f64,
}

impl TruckKernel {
    /// Create a new Truck kernel
    pub fn new() -> Self {
        Self::with_tolerance(BOOLEAN_TOLERANCE)
    }

    /// Create a Truck kernel with a custom boolean tolerance
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            solids: Mutex::new(HashMap::new()),
            tolerance,
        }
    }

    /// Number of solids currently stored
    pub fn solid_count(&self) -> usize {
        self.solids.lock().len()
    }

    /// Store a solid and return a Solid reference
    fn store_solid(&self, solid: TruckSolid) -> Solid {
        let id = Uuid::new_v4();
        self.solids.lock().insert(id, solid);
        Solid::new(id)
    }

    /// Get a stored solid by ID
    fn get_solid(&self, solid: &Solid) -> CadResult<TruckSolid> {
        self.solids
            .lock()
            .get(&solid.id)
            .cloned()
            .ok_or(CadError::SolidNotFound(solid.id))
    }

    /// Build the B-Rep of a polyhedron, sharing each edge between its two faces
    fn build_polyhedron(polyhedron: &Polyhedron) -> CadResult<TruckSolid> {
        polyhedron.validate()?;

        let vertices: Vec<Vertex> = polyhedron
            .vertices
            .iter()
            .map(|v| builder::vertex(Point3::new(v.x, v.y, v.z)))
            .collect();

        let mut edges: HashMap<(u32, u32), Edge> = HashMap::new();
        let mut faces: Vec<Face> = Vec::with_capacity(polyhedron.faces.len());
        for (index, face) in polyhedron.faces.iter().enumerate() {
            let n = face.len();
            let wire_edges: Vec<Edge> = (0..n)
                .map(|k| {
                    let a = face[k];
                    let b = face[(k + 1) % n];
                    let key = (a.min(b), a.max(b));
                    let edge = edges.entry(key).or_insert_with(|| {
                        builder::line(&vertices[key.0 as usize], &vertices[key.1 as usize])
                    });
                    if a < b { edge.clone() } else { edge.inverse() }
                })
                .collect();
            let wire: Wire = wire_edges.into();

            let face = builder::try_attach_plane(&[wire]).map_err(|e| {
                CadError::InvalidPolyhedron(format!("Face {} is not planar: {:?}", index, e))
            })?;
            faces.push(face);
        }

        let shell: Shell = faces.into();
        if shell.shell_condition() != ShellCondition::Closed {
            return Err(CadError::InvalidPolyhedron("Shell is not closed".into()));
        }
        TruckSolid::try_new(vec![shell])
            .map_err(|e| CadError::InvalidPolyhedron(format!("{:?}", e)))
    }

    /// Rebuild a solid with every edge a straight line between its ends
    ///
    /// Boolean results bound their faces with intersection curves, which are
    /// re-projected onto both surfaces on every evaluation. All faces here are
    /// planar, so those curves are straight segments.
    fn straightened(solid: &TruckSolid) -> CadResult<TruckSolid> {
        let mut vertices: HashMap<VertexID, Vertex> = HashMap::new();
        let mut edges: HashMap<EdgeID, Edge> = HashMap::new();
        let mut shared = |vertex: &Vertex| {
            vertices
                .entry(vertex.id())
                .or_insert_with(|| builder::vertex(vertex.point()))
                .clone()
        };

        let mut shells: Vec<Shell> = Vec::with_capacity(solid.boundaries().len());
        for shell in solid.boundaries() {
            let mut faces: Vec<Face> = Vec::with_capacity(shell.len());
            for face in shell.face_iter() {
                let mut wires: Vec<Wire> = Vec::with_capacity(face.absolute_boundaries().len());
                for wire in face.absolute_boundaries() {
                    let mut wire_edges: Vec<Edge> = Vec::with_capacity(wire.len());
                    for edge in wire.edge_iter() {
                        let line = match edges.get(&edge.id()) {
                            Some(line) => line.clone(),
                            None => {
                                let front = shared(edge.absolute_front());
                                let back = shared(edge.absolute_back());
                                if front == back {
                                    return Err(CadError::OperationFailed(
                                        "Closed edge on a planar face".into(),
                                    ));
                                }
                                let line = builder::line(&front, &back);
                                edges.insert(edge.id(), line.clone());
                                line
                            }
                        };
                        wire_edges.push(if edge.orientation() { line } else { line.inverse() });
                    }
                    wires.push(wire_edges.into());
                }

                let mut straight = Face::try_new(wires, face.surface())
                    .map_err(|e| CadError::OperationFailed(format!("{:?}", e)))?;
                if !face.orientation() {
                    straight.invert();
                }
                faces.push(straight);
            }
            shells.push(faces.into());
        }

        TruckSolid::try_new(shells).map_err(|e| CadError::OperationFailed(format!("{:?}", e)))
    }

    /// Create a wire from a profile in the XY plane
    fn create_wire(profile: &Wire2D) -> Wire {
        let vertices: Vec<Vertex> = profile
            .points
            .iter()
            .map(|p| builder::vertex(Point3::new(p.x as f64, p.y as f64, 0.0)))
            .collect();

        // Create edges between consecutive vertices
        let n = vertices.len();
        let edges: Vec<Edge> = (0..n)
            .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
            .collect();

        edges.into()
    }

    fn to_matrix(matrix: Mat4) -> Matrix4 {
        let c = matrix.to_cols_array().map(|v| v as f64);
        Matrix4::new(
            c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7], c[8], c[9], c[10], c[11], c[12],
            c[13], c[14], c[15],
        )
    }

    fn to_tessellated(mesh: &PolygonMesh) -> TessellatedMesh {
        let vertices: Vec<[f32; 3]> = mesh
            .positions()
            .iter()
            .map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect();

        // Fan-triangulate every face; quads and larger polygons are convex here
        let mut indices: Vec<u32> = Vec::new();
        for face in mesh.faces().face_iter() {
            for k in 1..face.len().saturating_sub(1) {
                indices.push(face[0].pos as u32);
                indices.push(face[k].pos as u32);
                indices.push(face[k + 1].pos as u32);
            }
        }

        TessellatedMesh::from_indexed(vertices, indices)
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl CadKernel for TruckKernel {
    fn name(&self) -> &str {
        "truck"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn create_polyhedron(&self, polyhedron: &Polyhedron) -> CadResult<Solid> {
        let solid = Self::build_polyhedron(polyhedron)?;
        Ok(self.store_solid(solid))
    }

    fn extrude(&self, profile: &Wire2D, distance: f32, top_scale: f32) -> CadResult<Solid> {
        if (top_scale - 1.0).abs() > f32::EPSILON {
            let frustum = Polyhedron::extrusion(profile, distance as f64, top_scale as f64)?;
            return self.create_polyhedron(&frustum);
        }

        profile
            .validate()
            .map_err(|e| CadError::InvalidProfile(e.to_string()))?;
        if distance <= 0.0 {
            return Err(CadError::InvalidProfile(format!(
                "Extrusion distance must be positive, got {}",
                distance
            )));
        }

        let wire = Self::create_wire(&profile.clone().to_ccw());
        let face = builder::try_attach_plane(&[wire])
            .map_err(|e| CadError::OperationFailed(format!("Failed to create face: {:?}", e)))?;
        let solid = builder::tsweep(&face, Vector3::new(0.0, 0.0, distance as f64));

        Ok(self.store_solid(solid))
    }

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid> {
        let solid_a = self.get_solid(a)?;
        let mut solid_b = self.get_solid(b)?;

        let result = match op {
            BooleanType::Union => solid_or(&solid_a, &solid_b, self.tolerance),
            BooleanType::Intersect => solid_and(&solid_a, &solid_b, self.tolerance),
            BooleanType::Subtract => {
                // A - B is A ∩ complement(B)
                solid_b.not();
                solid_and(&solid_a, &solid_b, self.tolerance)
            }
        }
        .ok_or_else(|| CadError::BooleanFailed(format!("{:?} of {} and {}", op, a.id, b.id)))?;
        let result = Self::straightened(&result)?;

        tracing::trace!(?op, faces = result.face_iter().count(), "boolean operation completed");
        Ok(self.store_solid(result))
    }

    fn transform(&self, solid: &Solid, matrix: Mat4) -> CadResult<Solid> {
        let truck_solid = self.get_solid(solid)?;
        let transformed = builder::transformed(&truck_solid, Self::to_matrix(matrix));
        Ok(self.store_solid(transformed))
    }

    fn tessellate(&self, solid: &Solid, tolerance: f32) -> CadResult<TessellatedMesh> {
        if tolerance <= 0.0 {
            return Err(CadError::TessellationFailed(format!(
                "Tolerance must be positive, got {}",
                tolerance
            )));
        }
        let truck_solid = self.get_solid(solid)?;

        // Tessellate using truck-meshalgo and convert to polygon mesh
        let meshed_solid = truck_solid.triangulation(tolerance as f64);
        let mut mesh = meshed_solid.to_polygon();

        // Clean up the mesh
        mesh.put_together_same_attrs(1e-6);
        mesh.remove_degenerate_faces();
        mesh.remove_unused_attrs();

        let tessellated = Self::to_tessellated(&mesh);
        if tessellated.is_empty() {
            return Err(CadError::TessellationFailed(format!(
                "Solid {} produced no triangles",
                solid.id
            )));
        }
        Ok(tessellated)
    }

    fn release(&self, solid: &Solid) {
        self.solids.lock().remove(&solid.id);
    }

    fn create_box(&self, center: Vec3, size: Vec3) -> CadResult<Solid> {
        if size.min_element() <= 0.0 {
            return Err(CadError::OperationFailed(format!(
                "Box size must be positive, got {}",
                size
            )));
        }
        let half = size * 0.5;
        let min = center - half;

        let vertex = builder::vertex(Point3::new(min.x as f64, min.y as f64, min.z as f64));
        let edge = builder::tsweep(&vertex, Vector3::new(size.x as f64, 0.0, 0.0));
        let face = builder::tsweep(&edge, Vector3::new(0.0, size.y as f64, 0.0));
        let solid = builder::tsweep(&face, Vector3::new(0.0, 0.0, size.z as f64));

        Ok(self.store_solid(solid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{DVec3, Quat, Vec2};

    const TOLERANCE: f32 = 0.01;

    fn volume(kernel: &TruckKernel, solid: &Solid) -> f64 {
        kernel.tessellate(solid, TOLERANCE).unwrap().volume()
    }

    #[test]
    fn test_box_volume_and_watertight() {
        let kernel = TruckKernel::new();
        let solid = kernel
            .create_box(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 3.0, 4.0))
            .unwrap();
        let mesh = kernel.tessellate(&solid, TOLERANCE).unwrap();
        assert!(mesh.is_watertight());
        assert_relative_eq!(mesh.volume(), 24.0, epsilon = 1e-3);

        let (min, max) = mesh.bounds();
        assert_relative_eq!(min.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(max.z, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_polyhedron_solid() {
        let kernel = TruckKernel::new();
        let solid = kernel
            .create_polyhedron(&Polyhedron::octahedron(2.0))
            .unwrap();
        let mesh = kernel.tessellate(&solid, TOLERANCE).unwrap();
        assert!(mesh.is_watertight());
        assert_relative_eq!(mesh.volume(), 32.0 / 3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_open_polyhedron_rejected() {
        let kernel = TruckKernel::new();
        let mut cube = Polyhedron::cuboid(DVec3::ONE);
        cube.faces.pop();
        assert!(matches!(
            kernel.create_polyhedron(&cube),
            Err(CadError::InvalidPolyhedron(_))
        ));
        assert_eq!(kernel.solid_count(), 0);
    }

    #[test]
    fn test_extrude_prism_and_frustum() {
        let kernel = TruckKernel::new();
        let profile = Wire2D::rectangle(Vec2::ZERO, 2.0, 2.0);

        let prism = kernel.extrude(&profile, 3.0, 1.0).unwrap();
        assert_relative_eq!(volume(&kernel, &prism), 12.0, epsilon = 1e-3);

        let frustum = kernel.extrude(&profile, 3.0, 0.5).unwrap();
        assert_relative_eq!(volume(&kernel, &frustum), 7.0, epsilon = 1e-3);
    }

    #[test]
    fn test_boolean_operations() {
        let kernel = TruckKernel::new();
        let a = kernel.create_box(Vec3::ZERO, Vec3::splat(2.0)).unwrap();
        let b = kernel
            .create_box(Vec3::new(1.0, 0.5, 0.25), Vec3::splat(2.0))
            .unwrap();

        // Overlap is 1 x 1.5 x 1.75
        let common = kernel.intersect(&a, &b).unwrap();
        assert_relative_eq!(volume(&kernel, &common), 2.625, epsilon = 1e-3);

        let cut = kernel.subtract(&a, &b).unwrap();
        let cut_mesh = kernel.tessellate(&cut, TOLERANCE).unwrap();
        assert!(cut_mesh.is_watertight());
        assert_relative_eq!(cut_mesh.volume(), 8.0 - 2.625, epsilon = 1e-3);

        let joined = kernel.union(&a, &b).unwrap();
        assert_relative_eq!(volume(&kernel, &joined), 16.0 - 2.625, epsilon = 1e-3);
    }

    #[test]
    fn test_transform_keeps_input() {
        let kernel = TruckKernel::new();
        let solid = kernel.create_box(Vec3::ZERO, Vec3::ONE).unwrap();
        let moved = kernel
            .translate(&solid, Vec3::new(10.0, 0.0, 0.0))
            .unwrap();
        let turned = kernel
            .rotate(&moved, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
            .unwrap();

        let (min, _) = kernel.tessellate(&solid, TOLERANCE).unwrap().bounds();
        assert_relative_eq!(min.x, -0.5, epsilon = 1e-5);

        let center = kernel.tessellate(&turned, TOLERANCE).unwrap().centroid();
        assert_relative_eq!(center.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(center.y, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_boolean_result_has_straight_edges() {
        let kernel = TruckKernel::new();
        let block = kernel.create_box(Vec3::ZERO, Vec3::splat(2.0)).unwrap();
        let octa = kernel
            .create_polyhedron(&Polyhedron::octahedron(1.2))
            .unwrap();
        let cut = kernel.subtract(&block, &octa).unwrap();

        let solid = kernel.get_solid(&cut).unwrap();
        assert!(
            solid
                .edge_iter()
                .all(|edge| matches!(edge.curve(), truck_modeling::Curve::Line(_)))
        );
        assert!(kernel.tessellate(&cut, TOLERANCE).unwrap().is_watertight());
    }

    #[test]
    fn test_chained_subtractions() {
        let kernel = TruckKernel::new();
        let mut block = kernel.create_box(Vec3::ZERO, Vec3::splat(4.0)).unwrap();

        // Three crossing bores, each cut from the previous result
        for size in [
            Vec3::new(6.0, 1.0, 1.0),
            Vec3::new(1.2, 6.0, 0.8),
            Vec3::new(0.6, 1.4, 6.0),
        ] {
            let bore = kernel.create_box(Vec3::ZERO, size).unwrap();
            let drilled = kernel.subtract(&block, &bore).unwrap();
            kernel.release(&bore);
            kernel.release(&block);
            block = drilled;
        }

        let mesh = kernel.tessellate(&block, TOLERANCE).unwrap();
        assert!(mesh.is_watertight());
        // Inclusion-exclusion over the bores inside the block
        let removed = 4.0 + 3.84 + 3.36 - 0.96 - 0.6 - 0.672 + 0.48;
        assert_relative_eq!(mesh.volume(), 64.0 - removed, epsilon = 1e-3);
        assert_eq!(kernel.solid_count(), 1);
    }

    #[test]
    fn test_release_and_missing_solid() {
        let kernel = TruckKernel::new();
        let solid = kernel.create_box(Vec3::ZERO, Vec3::ONE).unwrap();
        assert_eq!(kernel.solid_count(), 1);

        kernel.release(&solid);
        assert_eq!(kernel.solid_count(), 0);
        assert!(matches!(
            kernel.tessellate(&solid, TOLERANCE),
            Err(CadError::SolidNotFound(id)) if id == solid.id
        ));
    }

    #[test]
    fn test_invalid_box_size() {
        let kernel = TruckKernel::new();
        assert!(kernel.create_box(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0)).is_err());
    }
}
