//! Planar-faced solids
//!
//! A [`Polyhedron`] is a vertex list plus face loops, each loop wound
//! counter-clockwise when seen from outside. Kernels turn it into a B-Rep
//! solid with [`CadKernel::create_polyhedron`](crate::CadKernel::create_polyhedron).
//!
//! Coordinates are kept in `f64` so that faces computed with trigonometry
//! (revolutions, tapered extrusions) stay planar within kernel tolerance.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::{DMat4, DVec2, DVec3};

use crate::kernel::{CadError, CadResult, TessellatedMesh};
use crate::sketch::Wire2D;

/// Profile points closer than this to the revolve axis collapse onto it
const AXIS_EPSILON: f64 = 1e-9;

/// Vertices closer than this to a clip plane are taken to lie on it
const PLANE_EPSILON: f64 = 1e-9;

/// Vertex/face description of a closed polyhedral solid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyhedron {
    pub vertices: Vec<DVec3>,
    /// Face loops as vertex indices, CCW from outside
    pub faces: Vec<Vec<u32>>,
}

impl Polyhedron {
    pub fn new(vertices: Vec<DVec3>, faces: Vec<Vec<u32>>) -> Self {
        Self { vertices, faces }
    }

    /// Axis-aligned box centered at the origin
    pub fn cuboid(size: DVec3) -> Self {
        let h = size / 2.0;
        let vertices = (0..8)
            .map(|i| {
                DVec3::new(
                    if i & 1 == 0 { -h.x } else { h.x },
                    if i & 2 == 0 { -h.y } else { h.y },
                    if i & 4 == 0 { -h.z } else { h.z },
                )
            })
            .collect();
        let faces = vec![
            vec![0, 2, 3, 1],
            vec![4, 5, 7, 6],
            vec![0, 1, 5, 4],
            vec![2, 6, 7, 3],
            vec![0, 4, 6, 2],
            vec![1, 3, 7, 5],
        ];
        Self { vertices, faces }
    }

    /// Regular octahedron with its vertices at `radius` on each axis
    ///
    /// Face order is fixed; downstream code pairs faces with per-face
    /// parameters by index.
    pub fn octahedron(radius: f64) -> Self {
        let vertices = vec![
            DVec3::new(radius, 0.0, 0.0),
            DVec3::new(-radius, 0.0, 0.0),
            DVec3::new(0.0, radius, 0.0),
            DVec3::new(0.0, -radius, 0.0),
            DVec3::new(0.0, 0.0, radius),
            DVec3::new(0.0, 0.0, -radius),
        ];
        let faces = vec![
            vec![0, 2, 4],
            vec![0, 4, 3],
            vec![0, 3, 5],
            vec![0, 5, 2],
            vec![1, 4, 2],
            vec![1, 3, 4],
            vec![1, 5, 3],
            vec![1, 2, 5],
        ];
        Self { vertices, faces }
    }

    /// Geodesic sphere from a subdivided icosahedron
    pub fn icosphere(radius: f64, subdivisions: u32) -> Self {
        let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
        let mut vertices: Vec<DVec3> = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .into_iter()
        .map(|(x, y, z)| DVec3::new(x, y, z).normalize())
        .collect();

        let mut triangles: Vec<[u32; 3]> = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
            let mut midpoint = |a: u32, b: u32, vertices: &mut Vec<DVec3>| -> u32 {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let m = (vertices[a as usize] + vertices[b as usize]).normalize();
                    vertices.push(m);
                    (vertices.len() - 1) as u32
                })
            };

            let mut next = Vec::with_capacity(triangles.len() * 4);
            for [a, b, c] in triangles {
                let ab = midpoint(a, b, &mut vertices);
                let bc = midpoint(b, c, &mut vertices);
                let ca = midpoint(c, a, &mut vertices);
                next.push([a, ab, ca]);
                next.push([b, bc, ab]);
                next.push([c, ca, bc]);
                next.push([ab, bc, ca]);
            }
            triangles = next;
        }

        Self {
            vertices: vertices.into_iter().map(|v| v * radius).collect(),
            faces: triangles.into_iter().map(|t| t.to_vec()).collect(),
        }
    }

    /// Extrude a profile from `z = 0` to `z = height`
    ///
    /// The top outline is the profile scaled by `top_scale` about the origin,
    /// which yields a linearly tapered frustum. The side faces stay planar
    /// because every lateral edge passes through the same apex on the Z axis.
    pub fn extrusion(profile: &Wire2D, height: f64, top_scale: f64) -> CadResult<Self> {
        profile
            .validate()
            .map_err(|e| CadError::InvalidProfile(e.to_string()))?;
        if height <= 0.0 {
            return Err(CadError::InvalidProfile(format!(
                "Extrusion height must be positive, got {}",
                height
            )));
        }
        if top_scale <= 0.0 {
            return Err(CadError::InvalidProfile(format!(
                "Taper scale must be positive, got {}",
                top_scale
            )));
        }

        let profile = profile.clone().to_ccw();
        let n = profile.len() as u32;
        let bottom = profile.points.iter().map(|p| p.as_dvec2().extend(0.0));
        let top = profile
            .points
            .iter()
            .map(|p| (p.as_dvec2() * top_scale).extend(height));
        let vertices = bottom.chain(top).collect();

        let mut faces = Vec::with_capacity(n as usize + 2);
        faces.push((0..n).rev().collect());
        faces.push((n..2 * n).collect());
        for i in 0..n {
            let j = (i + 1) % n;
            faces.push(vec![i, j, n + j, n + i]);
        }

        Ok(Self { vertices, faces })
    }

    /// Revolve a `(radius, height)` profile a full turn around the Z axis
    ///
    /// The profile is a closed loop in the half plane `radius >= 0`. Points
    /// on the axis become single pole vertices, and loop segments lying on
    /// the axis produce no faces. A segment running straight out from the
    /// axis at constant height becomes one flat polygon cap.
    pub fn revolution(profile: &Wire2D, sections: u32) -> CadResult<Self> {
        if sections < 3 {
            return Err(CadError::InvalidProfile(format!(
                "Revolve needs at least 3 sections, got {}",
                sections
            )));
        }
        profile
            .validate()
            .map_err(|e| CadError::InvalidProfile(e.to_string()))?;

        let mut points: Vec<DVec2> = profile
            .clone()
            .to_ccw()
            .points
            .iter()
            .map(|p| p.as_dvec2())
            .collect();
        points.dedup();
        if points.iter().any(|p| p.x < -AXIS_EPSILON) {
            return Err(CadError::InvalidProfile(
                "Revolve profile crosses the axis".into(),
            ));
        }

        let mut vertices = Vec::new();
        // First vertex index of each profile point; poles own one vertex
        let mut rings = Vec::with_capacity(points.len());
        for p in &points {
            rings.push(vertices.len() as u32);
            if p.x <= AXIS_EPSILON {
                vertices.push(DVec3::new(0.0, 0.0, p.y));
            } else {
                for j in 0..sections {
                    let theta = j as f64 / sections as f64 * std::f64::consts::TAU;
                    vertices.push(DVec3::new(p.x * theta.cos(), p.x * theta.sin(), p.y));
                }
            }
        }

        let on_axis = |i: usize| points[i].x <= AXIS_EPSILON;
        let vertex = |i: usize, j: u32| {
            if on_axis(i) {
                rings[i]
            } else {
                rings[i] + j % sections
            }
        };

        let mut faces = Vec::new();
        for a in 0..points.len() {
            let b = (a + 1) % points.len();
            if on_axis(a) && on_axis(b) {
                continue;
            }
            let flat = (points[a].y - points[b].y).abs() <= AXIS_EPSILON;
            if on_axis(a) && flat {
                faces.push((0..sections).rev().map(|j| vertex(b, j)).collect());
                continue;
            }
            if on_axis(b) && flat {
                faces.push((0..sections).map(|j| vertex(a, j)).collect());
                continue;
            }
            for j in 0..sections {
                let face = if on_axis(a) {
                    vec![vertex(a, 0), vertex(b, j + 1), vertex(b, j)]
                } else if on_axis(b) {
                    vec![vertex(a, j), vertex(a, j + 1), vertex(b, 0)]
                } else {
                    vec![vertex(a, j), vertex(a, j + 1), vertex(b, j + 1), vertex(b, j)]
                };
                faces.push(face);
            }
        }

        Ok(Self { vertices, faces }.compacted())
    }

    /// Use every triangle of a mesh as a face
    pub fn from_mesh(mesh: &TessellatedMesh) -> Self {
        Self {
            vertices: mesh
                .vertices
                .iter()
                .map(|v| DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64))
                .collect(),
            faces: mesh.indices.chunks_exact(3).map(|t| t.to_vec()).collect(),
        }
    }

    /// Apply an affine transform to every vertex
    pub fn transformed(&self, matrix: DMat4) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|v| matrix.transform_point3(*v))
                .collect(),
            faces: self.faces.clone(),
        }
    }

    /// Keep the part of the solid where `normal . p <= offset`
    ///
    /// Faces crossing the plane must be convex. Each section loop is closed
    /// with one flat cap; a section with holes is rejected.
    pub fn clipped(&self, normal: DVec3, offset: f64) -> CadResult<Self> {
        let normal = normal.normalize_or_zero();
        if normal == DVec3::ZERO {
            return Err(CadError::InvalidPolyhedron(
                "Clip plane needs a non-zero normal".into(),
            ));
        }

        let distance: Vec<f64> = self
            .vertices
            .iter()
            .map(|v| {
                let d = normal.dot(*v) - offset;
                if d.abs() <= PLANE_EPSILON { 0.0 } else { d }
            })
            .collect();
        if distance.iter().all(|&d| d <= 0.0) {
            return Ok(self.clone());
        }

        let mut vertices = self.vertices.clone();
        let mut on_plane: Vec<bool> = distance.iter().map(|&d| d == 0.0).collect();
        // New vertex on each crossed edge, shared by both faces of the edge
        let mut crossings: HashMap<(u32, u32), u32> = HashMap::new();
        // Directed edges of the section, wound for the cap faces
        let mut section: BTreeSet<(u32, u32)> = BTreeSet::new();
        let mut faces = Vec::with_capacity(self.faces.len());

        for (f, face) in self.faces.iter().enumerate() {
            let kept = if face.iter().all(|&i| on_plane[i as usize]) {
                // In the plane: only a face looking at the removed side stays
                if self.face_normal(f).dot(normal) <= 0.0 {
                    continue;
                }
                face.clone()
            } else {
                let mut kept = Vec::with_capacity(face.len() + 2);
                for (k, &a) in face.iter().enumerate() {
                    let b = face[(k + 1) % face.len()];
                    let (da, db) = (distance[a as usize], distance[b as usize]);
                    if da <= 0.0 {
                        kept.push(a);
                    }
                    if da * db < 0.0 {
                        let key = (a.min(b), a.max(b));
                        let index = *crossings.entry(key).or_insert_with(|| {
                            let (p, q) = (key.0 as usize, key.1 as usize);
                            let t = distance[p] / (distance[p] - distance[q]);
                            vertices.push(self.vertices[p].lerp(self.vertices[q], t));
                            on_plane.push(true);
                            vertices.len() as u32 - 1
                        });
                        kept.push(index);
                    }
                }
                if kept.len() < 3 {
                    continue;
                }
                kept
            };

            for (k, &a) in kept.iter().enumerate() {
                let b = kept[(k + 1) % kept.len()];
                if on_plane[a as usize] && on_plane[b as usize] && !section.remove(&(a, b)) {
                    section.insert((b, a));
                }
            }
            faces.push(kept);
        }
        if faces.is_empty() {
            return Err(CadError::InvalidPolyhedron(
                "Clip plane removes the whole solid".into(),
            ));
        }

        let mut next: BTreeMap<u32, u32> = BTreeMap::new();
        for &(a, b) in &section {
            if next.insert(a, b).is_some() {
                return Err(CadError::InvalidPolyhedron(
                    "Section touches itself at a vertex".into(),
                ));
            }
        }
        while let Some((start, mut current)) = next.pop_first() {
            let mut cap = vec![start];
            while current != start {
                cap.push(current);
                current = next.remove(&current).ok_or_else(|| {
                    CadError::InvalidPolyhedron("Section loop is open".into())
                })?;
            }
            if newell(&vertices, &cap).dot(normal) <= 0.0 {
                return Err(CadError::InvalidPolyhedron(
                    "Section has a hole".into(),
                ));
            }
            faces.push(cap);
        }

        let clipped = Self { vertices, faces }.compacted();
        clipped.validate()?;
        Ok(clipped)
    }

    /// Drop vertices no face uses, keeping the order of first use
    fn compacted(self) -> Self {
        let Self { vertices: old, faces } = self;
        let mut remap = vec![u32::MAX; old.len()];
        let mut vertices = Vec::with_capacity(old.len());
        let faces = faces
            .into_iter()
            .map(|face| {
                face.into_iter()
                    .map(|i| {
                        let slot = &mut remap[i as usize];
                        if *slot == u32::MAX {
                            *slot = vertices.len() as u32;
                            vertices.push(old[i as usize]);
                        }
                        *slot
                    })
                    .collect()
            })
            .collect();
        Self { vertices, faces }
    }

    /// Check that the faces form a closed, consistently oriented surface
    pub fn validate(&self) -> CadResult<()> {
        if self.vertices.len() < 4 || self.faces.len() < 4 {
            return Err(CadError::InvalidPolyhedron(format!(
                "{} vertices and {} faces cannot enclose a volume",
                self.vertices.len(),
                self.faces.len()
            )));
        }

        let mut directed: HashMap<(u32, u32), usize> = HashMap::new();
        for (f, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(CadError::InvalidPolyhedron(format!(
                    "Face {} has only {} vertices",
                    f,
                    face.len()
                )));
            }
            for (k, &a) in face.iter().enumerate() {
                let b = face[(k + 1) % face.len()];
                if a as usize >= self.vertices.len() || a == b {
                    return Err(CadError::InvalidPolyhedron(format!(
                        "Face {} has an invalid vertex index",
                        f
                    )));
                }
                *directed.entry((a, b)).or_default() += 1;
            }
        }

        for (&(a, b), &count) in &directed {
            if count != 1 {
                return Err(CadError::InvalidPolyhedron(format!(
                    "Edge {}-{} is used {} times in the same direction",
                    a, b, count
                )));
            }
            if !directed.contains_key(&(b, a)) {
                return Err(CadError::InvalidPolyhedron(format!(
                    "Edge {}-{} is on an open boundary",
                    a, b
                )));
            }
        }
        Ok(())
    }

    /// Unit normal of a face (Newell's method)
    pub fn face_normal(&self, face: usize) -> DVec3 {
        newell(&self.vertices, &self.faces[face]).normalize_or_zero()
    }

    pub fn face_normals(&self) -> Vec<DVec3> {
        (0..self.faces.len()).map(|f| self.face_normal(f)).collect()
    }

    /// Mean of each face's vertices
    pub fn face_centroids(&self) -> Vec<DVec3> {
        self.faces
            .iter()
            .map(|face| {
                face.iter()
                    .map(|&i| self.vertices[i as usize])
                    .sum::<DVec3>()
                    / face.len() as f64
            })
            .collect()
    }

    /// Enclosed volume (positive when faces point outward)
    pub fn volume(&self) -> f64 {
        self.fan_triangles()
            .map(|[a, b, c]| a.dot(b.cross(c)) / 6.0)
            .sum()
    }

    /// Center of mass of the enclosed volume
    pub fn centroid(&self) -> DVec3 {
        let (volume, moment) = self.fan_triangles().fold(
            (0.0, DVec3::ZERO),
            |(volume, moment), [a, b, c]| {
                let v = a.dot(b.cross(c)) / 6.0;
                (volume + v, moment + (a + b + c) * (v / 4.0))
            },
        );
        if volume.abs() < f64::EPSILON {
            return DVec3::ZERO;
        }
        moment / volume
    }

    fn fan_triangles(&self) -> impl Iterator<Item = [DVec3; 3]> + '_ {
        self.faces.iter().flat_map(move |face| {
            let v0 = self.vertices[face[0] as usize];
            face.windows(2).skip(1).map(move |w| {
                [
                    v0,
                    self.vertices[w[0] as usize],
                    self.vertices[w[1] as usize],
                ]
            })
        })
    }
}

/// Unnormalized area normal of a vertex loop
fn newell(vertices: &[DVec3], loop_: &[u32]) -> DVec3 {
    loop_.iter().enumerate().fold(DVec3::ZERO, |acc, (k, &a)| {
        let p = vertices[a as usize];
        let q = vertices[loop_[(k + 1) % loop_.len()] as usize];
        acc + DVec3::new(
            (p.y - q.y) * (p.z + q.z),
            (p.z - q.z) * (p.x + q.x),
            (p.x - q.x) * (p.y + q.y),
        )
    })
}
