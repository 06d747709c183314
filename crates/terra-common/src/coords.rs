//! Coordinate types for the chunk grid and the ground plane.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Chunk coordinate (identifies a chunk in the streaming grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space (maps to world Z on the ground plane)
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the chunk whose centre is nearest to a ground-plane position.
    ///
    /// Chunks are centred on multiples of `stride`, so this rounds rather
    /// than floors.
    #[must_use]
    pub fn nearest(position: Vec2, stride: f32) -> Self {
        Self {
            x: (position.x / stride).round() as i32,
            y: (position.y / stride).round() as i32,
        }
    }

    /// Returns the world-space centre of this chunk.
    #[must_use]
    pub fn world_centre(self, stride: f32) -> Vec2 {
        Vec2::new(self.x as f32 * stride, self.y as f32 * stride)
    }

    /// Returns this coordinate shifted by an offset in chunk units.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned square on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundBounds {
    /// Centre of the box
    pub centre: Vec2,
    /// Half the side length
    pub half_extent: f32,
}

impl GroundBounds {
    /// Creates a square box from its centre and full side length.
    #[must_use]
    pub fn from_centre_size(centre: Vec2, size: f32) -> Self {
        Self {
            centre,
            half_extent: size * 0.5,
        }
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Vec2 {
        self.centre - Vec2::splat(self.half_extent)
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.centre + Vec2::splat(self.half_extent)
    }

    /// Squared distance from `point` to the nearest point of the box.
    /// Zero when the point is inside.
    #[must_use]
    pub fn sqr_distance(&self, point: Vec2) -> f32 {
        let nearest = point.clamp(self.min(), self.max());
        (point - nearest).length_squared()
    }

    /// Euclidean distance from `point` to the nearest edge of the box.
    #[must_use]
    pub fn distance(&self, point: Vec2) -> f32 {
        self.sqr_distance(point).sqrt()
    }
}
