//! # Terra Common
//!
//! Common types shared by the terra terrain crates:
//! - Coordinate types (chunk grid, ground-plane bounds)
//! - Job identifiers
//! - Version stamps for generated data
//! - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_sequence() {
        let first = JobId::from_raw(0);
        assert_eq!(first.next().raw(), 1);
        assert!(first < first.next());
    }

    #[test]
    fn test_version_reproducibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        assert!(v2.can_reproduce(&v1));
        assert!(!v3.can_reproduce(&v1));
    }

    #[test]
    fn test_config_error_converts_into_terrain_error() {
        let err: TerrainError = ConfigError::EmptyLodTable.into();
        assert!(matches!(err, TerrainError::Config(ConfigError::EmptyLodTable)));
        assert_eq!(err.to_string(), "Configuration error: LOD table is empty");
    }
}
