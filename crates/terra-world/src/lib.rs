//! # Terra World
//!
//! Procedural terrain for Terra.
//!
//! This crate handles:
//! - Height-field synthesis from layered gradient noise
//! - Height classification into coloured regions
//! - LOD mesh construction
//! - Background generation and chunk streaming around an observer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod classify;
pub mod config;
pub mod curve;
pub mod generator;
pub mod lod;
pub mod mesh;
pub mod noise_field;
pub mod preview;
pub mod queue;
pub mod streaming;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::classify::*;
    pub use crate::config::*;
    pub use crate::curve::*;
    pub use crate::generator::*;
    pub use crate::lod::*;
    pub use crate::mesh::*;
    pub use crate::noise_field::{GradientNoise, HeightField, NoiseParams};
    pub use crate::preview::*;
    pub use crate::queue::*;
    pub use crate::streaming::*;
}

pub use prelude::*;
