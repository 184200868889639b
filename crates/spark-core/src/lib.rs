//! Spark Core - Foundational types for the Spark particle engine
//!
//! This crate provides the types every other Spark crate depends on:
//! - `EmitterId` - Stable emitter identifiers
//! - `ContentHash` - SHA-256 based content hashing
//! - `Vec3`, `Color` - Spatial and color types
//! - `Interpolation` - Easing curves referenced by id
//! - Error types and Result alias

mod error;
mod hash;
mod id;
pub mod interpolation;
mod types;

pub use error::{Result, SparkError};
pub use hash::ContentHash;
pub use id::EmitterId;
pub use interpolation::Interpolation;
pub use types::{Color, Vec3};
