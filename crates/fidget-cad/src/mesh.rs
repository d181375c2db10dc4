//! Measurement and assembly of tessellated meshes

use std::collections::HashMap;

use glam::{DVec3, Mat4, Vec3};

use crate::kernel::TessellatedMesh;

/// Positions closer than 1 / WELD_PRECISION are treated as the same vertex
const WELD_PRECISION: f32 = 10000.0;

fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> [f32; 3] {
    let n = (b - a).cross(c - a).normalize_or_zero();
    if n == Vec3::ZERO {
        [0.0, 0.0, 1.0]
    } else {
        n.to_array()
    }
}

impl TessellatedMesh {
    /// Build a mesh from indexed triangles, computing face normals
    pub fn from_indexed(vertices: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let mut mesh = Self {
            vertices,
            normals: Vec::new(),
            indices,
        };
        mesh.compute_normals();
        mesh
    }

    /// Recompute one normal per triangle from its winding
    pub fn compute_normals(&mut self) {
        self.normals = self
            .triangles()
            .map(|[a, b, c]| triangle_normal(a, b, c))
            .collect();
    }

    /// Iterate over triangle corner positions
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            [
                Vec3::from(self.vertices[t[0] as usize]),
                Vec3::from(self.vertices[t[1] as usize]),
                Vec3::from(self.vertices[t[2] as usize]),
            ]
        })
    }

    /// Enclosed volume by the divergence theorem
    ///
    /// Positive for outward-facing triangles.
    pub fn volume(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| a.as_dvec3().dot(b.as_dvec3().cross(c.as_dvec3())) / 6.0)
            .sum()
    }

    /// Volume-weighted center of the enclosed solid
    ///
    /// Falls back to the vertex average when the volume vanishes.
    pub fn centroid(&self) -> Vec3 {
        let (moment, volume) = self.triangles().fold(
            (DVec3::ZERO, 0.0_f64),
            |(moment, volume), [a, b, c]| {
                let (a, b, c) = (a.as_dvec3(), b.as_dvec3(), c.as_dvec3());
                let v = a.dot(b.cross(c)) / 6.0;
                (moment + (a + b + c) * (v / 4.0), volume + v)
            },
        );

        if volume.abs() > f64::EPSILON {
            (moment / volume).as_vec3()
        } else if self.vertices.is_empty() {
            Vec3::ZERO
        } else {
            self.vertices.iter().map(|v| Vec3::from(*v)).sum::<Vec3>() / self.vertices.len() as f32
        }
    }

    /// Area-weighted center of the surface
    ///
    /// Differs from [`centroid`](Self::centroid) for solids whose surface is
    /// unevenly spread around their volume, such as a tetrahedron's corner.
    pub fn surface_centroid(&self) -> Vec3 {
        let (moment, area) = self.triangles().fold(
            (DVec3::ZERO, 0.0_f64),
            |(moment, area), [a, b, c]| {
                let (a, b, c) = (a.as_dvec3(), b.as_dvec3(), c.as_dvec3());
                let w = (b - a).cross(c - a).length() / 2.0;
                (moment + (a + b + c) * (w / 3.0), area + w)
            },
        );
        if area > f64::EPSILON {
            (moment / area).as_vec3()
        } else {
            self.centroid()
        }
    }

    /// Axis-aligned bounds as `(min, max)`
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.vertices.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        self.vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), v| {
                let v = Vec3::from(*v);
                (min.min(v), max.max(v))
            },
        )
    }

    /// Merge coincident vertices
    pub fn welded(&self) -> Self {
        let mut unique: Vec<[f32; 3]> = Vec::new();
        let mut lookup: HashMap<[i64; 3], u32> = HashMap::new();
        let remap: Vec<u32> = self
            .vertices
            .iter()
            .map(|v| {
                let key = v.map(|c| (c * WELD_PRECISION).round() as i64);
                *lookup.entry(key).or_insert_with(|| {
                    unique.push(*v);
                    (unique.len() - 1) as u32
                })
            })
            .collect();

        Self {
            vertices: unique,
            normals: self.normals.clone(),
            indices: self.indices.iter().map(|&i| remap[i as usize]).collect(),
        }
    }

    /// Check that the mesh encloses a volume without holes
    ///
    /// After welding, every edge must be shared by exactly two triangles
    /// traversing it in opposite directions.
    pub fn is_watertight(&self) -> bool {
        if self.indices.is_empty() || self.indices.len() % 3 != 0 {
            return false;
        }
        let welded = self.welded();

        let mut directed: HashMap<(u32, u32), u32> = HashMap::new();
        for t in welded.indices.chunks_exact(3) {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                if a == b {
                    return false;
                }
                *directed.entry((a, b)).or_default() += 1;
            }
        }
        directed
            .iter()
            .all(|(&(a, b), &count)| count == 1 && directed.get(&(b, a)) == Some(&1))
    }

    /// Apply an affine transform to the vertices
    pub fn transformed(&self, matrix: Mat4) -> Self {
        let vertices = self
            .vertices
            .iter()
            .map(|v| matrix.transform_point3(Vec3::from(*v)).to_array())
            .collect();
        Self::from_indexed(vertices, self.indices.clone())
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        self.transformed(Mat4::from_translation(offset))
    }

    /// Concatenate several meshes into one
    pub fn merge<'a>(meshes: impl IntoIterator<Item = &'a TessellatedMesh>) -> Self {
        let mut merged = Self::new();
        for mesh in meshes {
            let base = merged.vertices.len() as u32;
            merged.vertices.extend_from_slice(&mesh.vertices);
            merged.normals.extend_from_slice(&mesh.normals);
            merged.indices.extend(mesh.indices.iter().map(|i| i + base));
        }
        merged
    }
}
