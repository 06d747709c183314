//! Procedural terrain generator.
//!
//! One [`TerrainGenerator`] is built from the validated configuration and
//! shared (behind an `Arc`) by the chunk store and every background job. It
//! is immutable after construction.

use glam::Vec2;

use crate::classify::{classify, Classification, Region};
use crate::config::ValidatedConfig;
use crate::mesh::{build_terrain_mesh, MeshData, MeshError, MeshSettings};
use crate::noise_field::{self, GradientNoise, HeightField, NoiseParams};

/// Height field and its classification for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    /// Normalized heights
    pub heights: HeightField,
    /// Per-cell region and colour
    pub classification: Classification,
}

/// Procedural terrain generator.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    noise: GradientNoise,
    params: NoiseParams,
    regions: Vec<Region>,
    mesh: MeshSettings,
    dimension: usize,
}

impl TerrainGenerator {
    /// Creates a generator for a validated configuration.
    #[must_use]
    pub fn new(config: &ValidatedConfig) -> Self {
        Self {
            noise: GradientNoise::new(),
            params: *config.noise(),
            regions: config.regions().to_vec(),
            mesh: config.mesh().clone(),
            dimension: config.chunk_dimension() as usize,
        }
    }

    /// Samples per chunk side.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Noise parameters (already clamped).
    #[must_use]
    pub const fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Region table.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Noise parameters for the chunk centred at `centre`.
    ///
    /// The centre is folded into the offset so that neighbouring chunks
    /// sample adjoining parts of the noise domain. Grid rows run toward −Z,
    /// hence the flipped Y.
    #[must_use]
    pub fn params_for_chunk(&self, centre: Vec2) -> NoiseParams {
        let mut params = self.params;
        params.offset += Vec2::new(centre.x, -centre.y) / params.scale;
        params
    }

    /// Generates heights and classification for the chunk centred at
    /// `centre`.
    #[must_use]
    pub fn generate_map_data(&self, centre: Vec2) -> MapData {
        let params = self.params_for_chunk(centre);
        let heights = noise_field::generate(self.dimension, self.dimension, &params, &self.noise);
        let classification = classify(&heights, &self.regions);
        MapData {
            heights,
            classification,
        }
    }

    /// Builds the mesh for already generated map data.
    pub fn generate_mesh(&self, data: &MapData, lod: u32) -> Result<MeshData, MeshError> {
        build_terrain_mesh(
            &data.heights,
            self.mesh.height_scale,
            &self.mesh.height_curve,
            lod,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::lod::LodLevel;

    fn small_generator() -> TerrainGenerator {
        let mut config = TerrainConfig::default();
        config.streaming.chunk_dimension = 25;
        config.detail_levels = vec![LodLevel::new(0, 10.0), LodLevel::new(2, 20.0)];
        TerrainGenerator::new(&config.validate().expect("valid"))
    }

    #[test]
    fn test_map_data_dimensions() {
        let generator = small_generator();
        let data = generator.generate_map_data(Vec2::ZERO);
        assert_eq!(data.heights.width(), 25);
        assert_eq!(data.classification.colours().len(), 25 * 25);
    }

    #[test]
    fn test_chunks_get_distinct_terrain() {
        let generator = small_generator();
        let a = generator.generate_map_data(Vec2::ZERO);
        let b = generator.generate_map_data(Vec2::new(24.0, 0.0));
        assert_ne!(a.heights, b.heights);
    }

    #[test]
    fn test_chunk_offset_follows_world_axes() {
        let generator = small_generator();
        let scale = generator.params().scale;
        let params = generator.params_for_chunk(Vec2::new(48.0, 24.0));
        let delta = params.offset - generator.params().offset;
        assert!((delta.x - 48.0 / scale).abs() < 1e-4);
        assert!((delta.y + 24.0 / scale).abs() < 1e-4);
    }

    #[test]
    fn test_generate_mesh_for_lod() {
        let generator = small_generator();
        let data = generator.generate_map_data(Vec2::ZERO);
        let mesh = generator.generate_mesh(&data, 2).expect("24 divisible by 4");
        assert_eq!(mesh.vertices_per_line, 7);
        assert!(generator.generate_mesh(&data, 5).is_err());
    }
}
