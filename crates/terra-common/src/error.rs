//! Error types for the terrain pipeline.

use thiserror::Error;

/// Top-level error type for terrain operations.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// Configuration rejected at validation time
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool could not be started
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Configuration errors. Raised when a configuration cannot be clamped
/// into a usable shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No LOD levels were configured
    #[error("LOD table is empty")]
    EmptyLodTable,

    /// LOD thresholds must be ascending
    #[error("LOD thresholds must be ascending: entry {index} has {threshold} after {previous}")]
    LodThresholdsNotAscending {
        /// Offending entry
        index: usize,
        /// Its threshold
        threshold: f32,
        /// Threshold of the entry before it
        previous: f32,
    },

    /// The chunk edge length is not divisible by an LOD's decimation step
    #[error("LOD {lod} (increment {increment}) does not divide chunk edge {edge}")]
    IndivisibleLod {
        /// LOD index
        lod: u32,
        /// Decimation increment derived from the LOD index
        increment: u32,
        /// Chunk dimension minus one
        edge: u32,
    },

    /// LOD index so large its decimation step does not fit in a `u32`
    #[error("LOD {0} is too large")]
    LodTooLarge(u32),

    /// Region thresholds must be ascending
    #[error("Region thresholds must be ascending: '{name}' has {threshold} after {previous}")]
    RegionsNotAscending {
        /// Offending region
        name: String,
        /// Its threshold
        threshold: f32,
        /// Threshold of the region before it
        previous: f32,
    },

    /// Chunk dimension too small to form a single quad
    #[error("Chunk dimension must be at least 2, got {0}")]
    DimensionTooSmall(u32),

    /// A distance setting was not a finite, non-negative number
    #[error("Invalid distance for {field}: {value}")]
    InvalidDistance {
        /// Setting name
        field: &'static str,
        /// Rejected value
        value: f32,
    },

    /// The view distance spans more chunks than a visibility pass can walk
    #[error("View distance {distance} spans {radius} chunks, at most {max} allowed")]
    ViewDistanceTooLarge {
        /// Configured view distance
        distance: f32,
        /// Radius in chunks it works out to
        radius: f32,
        /// Largest accepted radius in chunks
        max: u32,
    },

    /// A height curve key was NaN or infinite
    #[error("Height curve key {index} is not finite: ({time}, {value})")]
    InvalidCurveKey {
        /// Key index after sorting
        index: usize,
        /// Key time
        time: f32,
        /// Key value
        value: f32,
    },
}

/// Background job errors, delivered through the completion channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The job panicked on its worker thread
    #[error("Job panicked: {0}")]
    Panicked(String),

    /// The job ran but could not produce a result
    #[error("Job failed: {0}")]
    Failed(String),
}

/// Result type alias for terrain operations.
pub type TerrainResult<T> = Result<T, TerrainError>;
