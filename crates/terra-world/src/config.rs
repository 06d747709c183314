//! Terrain configuration.
//!
//! [`TerrainConfig`] is the serializable surface (TOML on disk). It is never
//! used directly by the pipeline: [`TerrainConfig::validate`] clamps the
//! parameter domains and rejects tables that would produce corrupt output,
//! yielding a [`ValidatedConfig`].

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use terra_common::ConfigError;
use tracing::{debug, info, warn};

use crate::classify::{default_regions, Region};
use crate::lod::{default_detail_levels, validate_detail_levels, LodLevel};
use crate::mesh::MeshSettings;
use crate::noise_field::NoiseParams;

/// Default chunk dimension in samples per side.
pub const DEFAULT_CHUNK_DIMENSION: u32 = 241;

/// Default observer displacement that triggers a visibility pass.
pub const DEFAULT_MOVE_UPDATE_THRESHOLD: f32 = 25.0;

/// Largest view radius, in chunks, a visibility pass walks.
pub const MAX_VIEW_RADIUS_CHUNKS: u32 = 512;

/// Streaming settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Samples per chunk side
    pub chunk_dimension: u32,
    /// Observer displacement that triggers a visibility pass
    pub move_update_threshold: f32,
    /// View distance; defaults to the last LOD threshold
    pub max_view_distance: Option<f32>,
    /// Worker threads; defaults to available parallelism
    pub worker_threads: Option<usize>,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            chunk_dimension: DEFAULT_CHUNK_DIMENSION,
            move_update_threshold: DEFAULT_MOVE_UPDATE_THRESHOLD,
            max_view_distance: None,
            worker_threads: None,
        }
    }
}

/// Terrain configuration as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Height-field synthesis
    pub noise: NoiseParams,
    /// Mesh shape
    pub mesh: MeshSettings,
    /// Streaming behaviour
    pub streaming: StreamingSettings,
    /// LOD table, ascending by distance
    pub detail_levels: Vec<LodLevel>,
    /// Height regions, ascending by threshold
    pub regions: Vec<Region>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            noise: NoiseParams::default(),
            mesh: MeshSettings::default(),
            streaming: StreamingSettings::default(),
            detail_levels: default_detail_levels(),
            regions: default_regions(),
        }
    }
}

impl TerrainConfig {
    /// Load configuration from a path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Terrain config {} not found, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded terrain config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse terrain config: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read terrain config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a path, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved terrain config to {}", path.display());
        Ok(())
    }

    /// Clamps parameter domains and checks the tables.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let noise = self.noise.clamped();
        if noise != self.noise {
            debug!("Clamped noise parameters: {:?} -> {:?}", self.noise, noise);
        }

        let dimension = self.streaming.chunk_dimension;
        if dimension < 2 {
            return Err(ConfigError::DimensionTooSmall(dimension));
        }

        validate_detail_levels(&self.detail_levels, dimension)?;

        if let Some((index, key)) = self.mesh.height_curve.first_non_finite() {
            return Err(ConfigError::InvalidCurveKey {
                index,
                time: key.time,
                value: key.value,
            });
        }

        for pair in self.regions.windows(2) {
            if pair[1].height < pair[0].height {
                return Err(ConfigError::RegionsNotAscending {
                    name: pair[1].name.clone(),
                    threshold: pair[1].height,
                    previous: pair[0].height,
                });
            }
        }

        let max_view_distance = match self.streaming.max_view_distance {
            Some(distance) => distance,
            None => self
                .detail_levels
                .last()
                .map_or(0.0, |level| level.visible_distance),
        };
        if !max_view_distance.is_finite() || max_view_distance < 0.0 {
            return Err(ConfigError::InvalidDistance {
                field: "streaming.max_view_distance",
                value: max_view_distance,
            });
        }
        let radius = (max_view_distance / (dimension - 1) as f32).round();
        if radius > MAX_VIEW_RADIUS_CHUNKS as f32 {
            return Err(ConfigError::ViewDistanceTooLarge {
                distance: max_view_distance,
                radius,
                max: MAX_VIEW_RADIUS_CHUNKS,
            });
        }

        let move_update_threshold = self.streaming.move_update_threshold;
        if move_update_threshold.is_nan() || move_update_threshold.is_infinite() {
            return Err(ConfigError::InvalidDistance {
                field: "streaming.move_update_threshold",
                value: move_update_threshold,
            });
        }

        Ok(ValidatedConfig {
            noise,
            mesh: self.mesh.clone(),
            detail_levels: self.detail_levels.clone(),
            regions: self.regions.clone(),
            chunk_dimension: dimension,
            max_view_distance,
            move_update_threshold: move_update_threshold.max(0.0),
            worker_threads: self.streaming.worker_threads.map(|n| n.max(1)),
        })
    }
}

/// Configuration that passed validation. Only constructible through
/// [`TerrainConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    noise: NoiseParams,
    mesh: MeshSettings,
    detail_levels: Vec<LodLevel>,
    regions: Vec<Region>,
    chunk_dimension: u32,
    max_view_distance: f32,
    move_update_threshold: f32,
    worker_threads: Option<usize>,
}

impl ValidatedConfig {
    /// Clamped noise parameters.
    #[must_use]
    pub const fn noise(&self) -> &NoiseParams {
        &self.noise
    }

    /// Mesh settings.
    #[must_use]
    pub const fn mesh(&self) -> &MeshSettings {
        &self.mesh
    }

    /// Non-empty, ascending LOD table.
    #[must_use]
    pub fn detail_levels(&self) -> &[LodLevel] {
        &self.detail_levels
    }

    /// Ascending region table.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Samples per chunk side.
    #[must_use]
    pub const fn chunk_dimension(&self) -> u32 {
        self.chunk_dimension
    }

    /// Distance between neighbouring chunk centres.
    #[must_use]
    pub fn chunk_stride(&self) -> f32 {
        (self.chunk_dimension - 1) as f32
    }

    /// View distance.
    #[must_use]
    pub const fn max_view_distance(&self) -> f32 {
        self.max_view_distance
    }

    /// Observer displacement that triggers a visibility pass.
    #[must_use]
    pub const fn move_update_threshold(&self) -> f32 {
        self.move_update_threshold
    }

    /// Requested worker thread count.
    #[must_use]
    pub const fn worker_threads(&self) -> Option<usize> {
        self.worker_threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Rgba;
    use crate::curve::{CurveKey, HeightCurve};
    use tempfile::TempDir;

    #[test]
    fn test_default_config_validates() {
        let validated = TerrainConfig::default().validate().expect("defaults are valid");
        assert_eq!(validated.chunk_dimension(), 241);
        assert_eq!(validated.chunk_stride(), 240.0);
        assert_eq!(validated.max_view_distance(), 600.0);
        assert_eq!(validated.move_update_threshold(), 25.0);
    }

    #[test]
    fn test_noise_parameters_are_clamped() {
        let mut config = TerrainConfig::default();
        config.noise.scale = 0.0;
        config.noise.lacunarity = 0.5;

        let validated = config.validate().expect("clamping is not an error");
        assert!(validated.noise().scale > 0.0);
        assert_eq!(validated.noise().lacunarity, 1.0);
    }

    #[test]
    fn test_explicit_view_distance_wins() {
        let mut config = TerrainConfig::default();
        config.streaming.max_view_distance = Some(450.0);
        assert_eq!(config.validate().expect("valid").max_view_distance(), 450.0);
    }

    #[test]
    fn test_rejects_indivisible_lod() {
        let mut config = TerrainConfig::default();
        config.streaming.chunk_dimension = 242;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IndivisibleLod { lod: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_unsorted_regions() {
        let mut config = TerrainConfig::default();
        config.regions = vec![
            Region::new("high", 0.8, Rgba::WHITE),
            Region::new("low", 0.2, Rgba::BLACK),
        ];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RegionsNotAscending { .. })
        ));
    }

    #[test]
    fn test_view_distance_capped_in_chunks() {
        let mut config = TerrainConfig::default();
        config.streaming.max_view_distance = Some(240.0 * MAX_VIEW_RADIUS_CHUNKS as f32);
        assert!(config.validate().is_ok());

        config.streaming.max_view_distance = Some(1.0e30);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ViewDistanceTooLarge { max: MAX_VIEW_RADIUS_CHUNKS, .. })
        ));
    }

    #[test]
    fn test_unsorted_curve_keys_from_toml() {
        let config: TerrainConfig = toml::from_str(
            r"
            [mesh]
            height_scale = 10.0

            [[mesh.height_curve]]
            time = 1.0
            value = 1.0

            [[mesh.height_curve]]
            time = 0.0
            value = 0.0
            ",
        )
        .expect("parse");

        let validated = config.validate().expect("valid");
        let curve = &validated.mesh().height_curve;
        assert_eq!(curve.keys()[0], CurveKey::new(0.0, 0.0));
        assert!((curve.evaluate(0.25) - 0.25).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_nan_curve_key() {
        let mut config = TerrainConfig::default();
        config.mesh.height_curve =
            HeightCurve::from_keys(vec![CurveKey::new(0.0, 0.0), CurveKey::new(f32::NAN, 1.0)]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCurveKey { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_tiny_dimension() {
        let mut config = TerrainConfig::default();
        config.streaming.chunk_dimension = 1;
        assert_eq!(config.validate(), Err(ConfigError::DimensionTooSmall(1)));
    }

    #[test]
    fn test_negative_move_threshold_clamped() {
        let mut config = TerrainConfig::default();
        config.streaming.move_update_threshold = -5.0;
        assert_eq!(config.validate().expect("valid").move_update_threshold(), 0.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("terrain.toml");

        let mut config = TerrainConfig::default();
        config.noise.seed = 1234;
        config.noise.octaves = 6;
        config.streaming.max_view_distance = Some(300.0);
        config.detail_levels = vec![LodLevel::new(0, 150.0), LodLevel::new(2, 300.0)];

        config.save_to(&path).expect("Failed to save config");
        let loaded = TerrainConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = TerrainConfig::load_from("/nonexistent/path/terrain.toml");
        assert_eq!(config, TerrainConfig::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TerrainConfig = toml::from_str(
            r"
            [noise]
            seed = 42
            scale = 10.0
            ",
        )
        .expect("parse");
        assert_eq!(config.noise.seed, 42);
        assert_eq!(config.noise.octaves, NoiseParams::default().octaves);
        assert_eq!(config.detail_levels, default_detail_levels());
    }
}
