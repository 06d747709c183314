//! Level-of-detail table and distance-based selection.

use serde::{Deserialize, Serialize};
use terra_common::ConfigError;

/// One entry of the LOD table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Decimation level passed to the mesh builder (0 = full detail)
    pub lod: u32,
    /// Largest observer distance at which this entry is chosen
    pub visible_distance: f32,
}

impl LodLevel {
    /// Creates a table entry.
    #[must_use]
    pub const fn new(lod: u32, visible_distance: f32) -> Self {
        Self {
            lod,
            visible_distance,
        }
    }
}

/// Default table: full detail up to 200 units, then LOD 1, then LOD 4.
#[must_use]
pub fn default_detail_levels() -> Vec<LodLevel> {
    vec![
        LodLevel::new(0, 200.0),
        LodLevel::new(1, 400.0),
        LodLevel::new(4, 600.0),
    ]
}

/// Grid step between sampled cells at a LOD, or `None` if it overflows.
#[must_use]
pub const fn lod_increment(lod: u32) -> Option<u32> {
    if lod == 0 {
        Some(1)
    } else {
        lod.checked_mul(2)
    }
}

/// Picks the table index for an observer distance: the first entry whose
/// threshold is at or beyond `distance`, otherwise the last entry.
///
/// `levels` must be non-empty and ascending.
#[must_use]
pub fn select_lod(distance: f32, levels: &[LodLevel]) -> usize {
    let last = levels.len().saturating_sub(1);
    levels[..last]
        .iter()
        .position(|level| distance <= level.visible_distance)
        .unwrap_or(last)
}

/// Checks a LOD table against a chunk dimension.
pub fn validate_detail_levels(levels: &[LodLevel], dimension: u32) -> Result<(), ConfigError> {
    if levels.is_empty() {
        return Err(ConfigError::EmptyLodTable);
    }

    let edge = dimension.saturating_sub(1);
    for (index, level) in levels.iter().enumerate() {
        if !level.visible_distance.is_finite() || level.visible_distance < 0.0 {
            return Err(ConfigError::InvalidDistance {
                field: "detail_levels.visible_distance",
                value: level.visible_distance,
            });
        }
        if index > 0 {
            let previous = levels[index - 1].visible_distance;
            if level.visible_distance < previous {
                return Err(ConfigError::LodThresholdsNotAscending {
                    index,
                    threshold: level.visible_distance,
                    previous,
                });
            }
        }
        let Some(increment) = lod_increment(level.lod) else {
            return Err(ConfigError::LodTooLarge(level.lod));
        };
        if edge % increment != 0 {
            return Err(ConfigError::IndivisibleLod {
                lod: level.lod,
                increment,
                edge,
            });
        }
    }
    Ok(())
}
