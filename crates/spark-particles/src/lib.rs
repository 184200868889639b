//! Spark Particles - CPU particle simulation core
//!
//! Provides slot-pooled per-emitter particle simulation with:
//! - Leaky-bucket emission with delay and lifetime gating
//! - Triangle-mesh emission shapes with selectable faces and edge points
//! - A pluggable influencer pipeline with per-particle data slots
//! - Keyframed alpha, color, size, rotation and sprite animation
//! - Instance packing for instanced draw calls
//! - TOML emitter definitions

pub mod curves;
pub mod emitter;
pub mod influencer;
pub mod loader;
pub mod particle;
pub mod rand;
pub mod shape;
pub mod slots;
pub mod system;

pub use emitter::{
    BillboardMode, EmitterConfig, ForcedStretchAxis, ParticleEmitter, ParticleMeshType,
    MIN_EMISSIONS_PER_SECOND,
};
pub use influencer::{
    AlphaInfluencer, ColorInfluencer, GravityInfluencer, ImpulseInfluencer, Influencer,
    InfluencerKind, Keyframe, Keyframes, ParticleInfluencer, RotationInfluencer, SizeInfluencer,
    SpriteInfluencer,
};
pub use loader::{load_definition_from_file, load_definition_from_str, EmitterDefinition};
pub use particle::{ParticleData, ParticleInstance};
pub use shape::{
    DirectionType, EmissionPoint, EmitterShape, SelectionPolicy, ShapeDefinition, TriangleMesh,
};
pub use system::{ParticleDrawData, ParticleSystem};
