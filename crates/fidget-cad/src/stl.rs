//! STL file loading and saving

use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::kernel::TessellatedMesh;

/// Precision for vertex comparison (multiply by this, then round to int)
const PRECISION: f32 = 10000.0;

/// Load an STL file as an indexed mesh
///
/// Vertices closer than `1 / PRECISION` are merged so that solids read back
/// from triangle soup are watertight again.
pub fn load_stl(path: impl AsRef<Path>) -> Result<TessellatedMesh, StlError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| StlError::Io(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let mesh = stl_io::read_stl(&mut reader).map_err(|e| StlError::Parse(e.to_string()))?;
    if mesh.faces.is_empty() {
        return Err(StlError::Parse(format!(
            "{} contains no triangles",
            path.display()
        )));
    }

    let (vertices, normals, indices) = index_mesh(&mesh);
    tracing::debug!(
        path = %path.display(),
        vertices = vertices.len(),
        triangles = normals.len(),
        "loaded STL"
    );

    Ok(TessellatedMesh {
        vertices,
        normals,
        indices,
    })
}

/// Convert triangle soup to indexed mesh
fn index_mesh(mesh: &stl_io::IndexedMesh) -> (Vec<[f32; 3]>, Vec<[f32; 3]>, Vec<u32>) {
    let mut unique_vertices: Vec<[f32; 3]> = Vec::new();
    let mut vertex_map: HashMap<[i32; 3], u32> = HashMap::new();
    let mut indices: Vec<u32> = Vec::with_capacity(mesh.faces.len() * 3);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(mesh.faces.len());

    for face in &mesh.faces {
        normals.push([face.normal[0], face.normal[1], face.normal[2]]);

        for &vertex_idx in &face.vertices {
            let vertex = mesh.vertices[vertex_idx];
            let v = [vertex[0], vertex[1], vertex[2]];
            let key = v.map(|c| (c * PRECISION).round() as i32);

            let index = *vertex_map.entry(key).or_insert_with(|| {
                unique_vertices.push(v);
                (unique_vertices.len() - 1) as u32
            });
            indices.push(index);
        }
    }

    (unique_vertices, normals, indices)
}

/// Save a mesh as a binary STL file
pub fn save_stl(mesh: &TessellatedMesh, path: impl AsRef<Path>) -> Result<(), StlError> {
    let path = path.as_ref();

    let triangles: Vec<stl_io::Triangle> = mesh
        .indices
        .chunks_exact(3)
        .enumerate()
        .map(|(i, chunk)| {
            let v0 = mesh.vertices[chunk[0] as usize];
            let v1 = mesh.vertices[chunk[1] as usize];
            let v2 = mesh.vertices[chunk[2] as usize];

            // Use the stored normal, or derive one from the winding
            let normal = mesh.normals.get(i).copied().unwrap_or_else(|| {
                let e1 = glam::Vec3::from(v1) - glam::Vec3::from(v0);
                let e2 = glam::Vec3::from(v2) - glam::Vec3::from(v0);
                let n = e1.cross(e2).normalize_or_zero();
                if n == glam::Vec3::ZERO {
                    [0.0, 0.0, 1.0]
                } else {
                    n.to_array()
                }
            });

            stl_io::Triangle {
                normal: stl_io::Normal::new(normal),
                vertices: [
                    stl_io::Vertex::new(v0),
                    stl_io::Vertex::new(v1),
                    stl_io::Vertex::new(v2),
                ],
            }
        })
        .collect();

    let file = std::fs::File::create(path).map_err(|e| StlError::Io(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    stl_io::write_stl(&mut writer, triangles.iter())
        .map_err(|e| StlError::Write(e.to_string()))?;

    tracing::debug!(path = %path.display(), triangles = triangles.len(), "wrote STL");
    Ok(())
}

/// STL-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StlError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Write error: {0}")]
    Write(String),
}
