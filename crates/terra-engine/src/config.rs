//! Engine configuration.
//!
//! Controls the observer flight path, tick pacing and where the terrain
//! configuration lives. Loaded from `terra.toml` in the working directory.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "terra.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Terrain ===
    /// Path of the terrain configuration file
    pub terrain_config: PathBuf,

    // === Run ===
    /// Number of ticks to run
    pub ticks: u32,
    /// Target ticks per second
    pub target_tps: u32,
    /// Sleep between ticks to hold the target rate
    pub pace_ticks: bool,
    /// Seconds to keep ticking after the run so outstanding jobs land
    pub settle_timeout_secs: f32,

    // === Observer ===
    /// Observer speed in world units per second
    pub observer_speed: f32,
    /// Flight heading in degrees, counter-clockwise from +X
    pub observer_heading_deg: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            terrain_config: PathBuf::from("terrain.toml"),
            ticks: 600,
            target_tps: 60,
            pace_ticks: true,
            settle_timeout_secs: 10.0,
            observer_speed: 120.0,
            observer_heading_deg: 30.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    #[allow(dead_code)]
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.target_tps = self.target_tps.clamp(1, 1000);
        self.settle_timeout_secs = if self.settle_timeout_secs.is_finite() {
            self.settle_timeout_secs.clamp(0.0, 600.0)
        } else {
            0.0
        };
        if !self.observer_speed.is_finite() {
            self.observer_speed = 0.0;
        }
        self.observer_speed = self.observer_speed.clamp(0.0, 10_000.0);
        self.observer_heading_deg = if self.observer_heading_deg.is_finite() {
            self.observer_heading_deg.rem_euclid(360.0)
        } else {
            0.0
        };
    }

    /// Observer displacement per tick.
    #[must_use]
    pub fn step_per_tick(&self) -> Vec2 {
        let heading = self.observer_heading_deg.to_radians();
        let distance = self.observer_speed / self.target_tps.max(1) as f32;
        Vec2::new(heading.cos(), heading.sin()) * distance
    }
}
