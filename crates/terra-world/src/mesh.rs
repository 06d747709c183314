//! Height-field tessellation with LOD decimation.
//!
//! The grid is centred on the origin in the XZ plane. Row `y` of the field
//! runs toward −Z, column `x` toward +X, and the curve-shaped height becomes
//! +Y. Each decimated quad is split into two triangles with a fixed winding,
//! so every face normal points up.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curve::HeightCurve;
use crate::lod::lod_increment;
use crate::noise_field::HeightField;

/// Mesh building errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    /// The LOD step does not divide the grid edge
    #[error("LOD {lod} (increment {increment}) does not divide grid edge {edge}")]
    IndivisibleLod {
        /// LOD index
        lod: u32,
        /// Decimation increment
        increment: u32,
        /// Field dimension minus one
        edge: usize,
    },
    /// The field is not square
    #[error("Height field must be square, got {width}x{height}")]
    NotSquare {
        /// Columns
        width: usize,
        /// Rows
        height: usize,
    },
    /// The LOD step overflows
    #[error("LOD {0} is too large")]
    LodTooLarge(u32),
    /// The field has fewer than two samples per side
    #[error("Height field too small: {0}x{0}")]
    TooSmall(usize),
}

/// Shape of the mesh in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// World height of a normalized height of 1 after the curve
    pub height_scale: f32,
    /// Response curve applied to heights
    pub height_curve: HeightCurve,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            height_scale: 36.0,
            height_curve: HeightCurve::default(),
        }
    }
}

/// Triangulated terrain geometry for one chunk at one LOD.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// LOD the mesh was built at
    pub lod: u32,
    /// Vertices per grid line
    pub vertices_per_line: usize,
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Texture coordinates, continuous across LODs
    pub uvs: Vec<Vec2>,
    /// Triangle list, three indices per triangle
    pub triangles: Vec<u32>,
    /// Normalized per-vertex normals
    pub normals: Vec<Vec3>,
}

impl MeshData {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Triangles as index triples.
    pub fn faces(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.triangles.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

/// Number of vertices per grid line for a field dimension at a LOD.
pub fn vertices_per_line(dimension: usize, lod: u32) -> Result<usize, MeshError> {
    if dimension < 2 {
        return Err(MeshError::TooSmall(dimension));
    }
    let increment = lod_increment(lod).ok_or(MeshError::LodTooLarge(lod))?;
    let edge = dimension - 1;
    if edge % increment as usize != 0 {
        return Err(MeshError::IndivisibleLod {
            lod,
            increment,
            edge,
        });
    }
    Ok(1 + edge / increment as usize)
}

/// Builds the mesh for `field` at `lod`.
pub fn build_terrain_mesh(
    field: &HeightField,
    height_scale: f32,
    curve: &HeightCurve,
    lod: u32,
) -> Result<MeshData, MeshError> {
    let width = field.width();
    let height = field.height();
    if width != height {
        return Err(MeshError::NotSquare { width, height });
    }
    let per_line = vertices_per_line(width, lod)?;
    let increment = lod_increment(lod).ok_or(MeshError::LodTooLarge(lod))? as usize;

    let top_left_x = (width as f32 - 1.0) / -2.0;
    let top_left_z = (height as f32 - 1.0) / 2.0;

    let mut vertices = Vec::with_capacity(per_line * per_line);
    let mut uvs = Vec::with_capacity(per_line * per_line);
    let mut triangles = Vec::with_capacity((per_line - 1) * (per_line - 1) * 6);

    for y in (0..height).step_by(increment) {
        for x in (0..width).step_by(increment) {
            // Right and bottom edge vertices start no quad.
            if x < width - 1 && y < height - 1 {
                let tl = vertices.len() as u32;
                let tr = tl + 1;
                let bl = tl + per_line as u32;
                let br = bl + 1;
                triangles.extend_from_slice(&[tl, br, bl]);
                triangles.extend_from_slice(&[br, tl, tr]);
            }

            let sample = field.get(x, y).unwrap_or_default();
            vertices.push(Vec3::new(
                top_left_x + x as f32,
                curve.evaluate(sample) * height_scale,
                top_left_z - y as f32,
            ));
            uvs.push(Vec2::new(x as f32 / width as f32, y as f32 / height as f32));
        }
    }

    let normals = recalculate_normals(&vertices, &triangles);

    Ok(MeshData {
        lod,
        vertices_per_line: per_line,
        vertices,
        uvs,
        triangles,
        normals,
    })
}

/// Sums the face normals around each vertex and normalizes.
fn recalculate_normals(vertices: &[Vec3], triangles: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for tri in triangles.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (vertices[b] - vertices[a])
            .cross(vertices[c] - vertices[a])
            .normalize_or_zero();
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    for normal in &mut normals {
        *normal = normal.normalize_or_zero();
    }
    normals
}
