//! Single-map previews for tuning generation parameters.

use serde::{Deserialize, Serialize};

use crate::classify::Rgba;
use crate::generator::TerrainGenerator;
use crate::mesh::{MeshData, MeshError};
use glam::Vec2;

/// What a preview shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawMode {
    /// Heights as greyscale
    #[default]
    NoiseMap,
    /// Region colours
    ColourMap,
    /// Mesh textured with region colours
    Mesh,
}

/// Row-major colour buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ColourBuffer {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// Pixels, `width * height` long
    pub pixels: Vec<Rgba>,
}

/// Rendered preview.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// A flat image
    Texture(ColourBuffer),
    /// A mesh and the texture mapped onto it
    Mesh {
        /// Geometry at the requested LOD
        mesh: MeshData,
        /// Region colours
        texture: ColourBuffer,
    },
}

impl Preview {
    /// The colour buffer of either variant.
    #[must_use]
    pub const fn texture(&self) -> &ColourBuffer {
        match self {
            Self::Texture(texture) | Self::Mesh { texture, .. } => texture,
        }
    }
}

/// Renders the chunk at the origin in a chosen [`DrawMode`].
pub struct MapPreview;

impl MapPreview {
    /// Renders a preview. `lod` only affects [`DrawMode::Mesh`].
    pub fn render(
        generator: &TerrainGenerator,
        mode: DrawMode,
        lod: u32,
    ) -> Result<Preview, MeshError> {
        let data = generator.generate_map_data(Vec2::ZERO);
        let width = data.heights.width();
        let height = data.heights.height();

        let preview = match mode {
            DrawMode::NoiseMap => Preview::Texture(ColourBuffer {
                width,
                height,
                pixels: data.heights.values().iter().map(|&h| Rgba::grey(h)).collect(),
            }),
            DrawMode::ColourMap => Preview::Texture(ColourBuffer {
                width,
                height,
                pixels: data.classification.colours().to_vec(),
            }),
            DrawMode::Mesh => {
                let mesh = generator.generate_mesh(&data, lod)?;
                Preview::Mesh {
                    mesh,
                    texture: ColourBuffer {
                        width,
                        height,
                        pixels: data.classification.colours().to_vec(),
                    },
                }
            },
        };
        Ok(preview)
    }
}
