//! Influencer pipeline: ordered per-particle property modifiers
//!
//! Each influencer holds configuration shared by every particle, while
//! per-particle state lives in the particle's own fields or in its data slot
//! at the influencer's pipeline position. Hooks are driven by the emitter in
//! pipeline order; a later influencer writing the same attribute wins.

mod alpha;
mod color;
mod gravity;
mod impulse;
mod keyframes;
mod rotation;
mod size;
mod sprite;

pub use alpha::AlphaInfluencer;
pub use color::ColorInfluencer;
pub use gravity::GravityInfluencer;
pub use impulse::ImpulseInfluencer;
pub use keyframes::{Keyframe, Keyframes, StepState};
pub use rotation::{RotationData, RotationInfluencer};
pub use size::{SizeData, SizeInfluencer};
pub use sprite::{SpriteData, SpriteInfluencer};

use crate::emitter::EmitterConfig;
use crate::particle::ParticleData;
use crate::rand::ParticleRng;
use serde::{Deserialize, Serialize};

/// Emitter state an influencer may read while touching a particle
pub struct InfluenceContext<'a> {
    pub rng: &'a mut ParticleRng,
    pub sprite_cols: u32,
    pub sprite_rows: u32,
}

impl<'a> InfluenceContext<'a> {
    pub(crate) fn new(rng: &'a mut ParticleRng, config: &EmitterConfig) -> Self {
        Self {
            rng,
            sprite_cols: config.sprite_cols,
            sprite_rows: config.sprite_rows,
        }
    }
}

/// Hooks implemented by every influencer variant.
///
/// The `_impl` hooks are only reached through [`Influencer`], which runs
/// `first_initialize` once and skips disabled influencers.
pub trait ParticleInfluencer {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Whether particles need a private data slot for this influencer
    fn uses_data_slot(&self) -> bool {
        false
    }

    /// Called when a particle record is allocated, only if
    /// `uses_data_slot` is true.
    fn create_data(&self, _particle: &mut ParticleData, _slot: usize) {}

    /// Called once per influencer before its first spawn
    fn first_initialize(&mut self) {}

    fn initialize_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        ctx: &mut InfluenceContext<'_>,
    );

    fn update_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        tpf: f32,
        ctx: &mut InfluenceContext<'_>,
    );

    fn reset_impl(&self, _particle: &mut ParticleData, _slot: usize) {}
}

/// Every influencer variant, tagged by `type` in definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InfluencerKind {
    Alpha(AlphaInfluencer),
    Color(ColorInfluencer),
    Size(SizeInfluencer),
    Rotation(RotationInfluencer),
    Sprite(SpriteInfluencer),
    Gravity(GravityInfluencer),
    Impulse(ImpulseInfluencer),
}

/// A pipeline entry: one influencer variant plus its lazy-setup flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "InfluencerKind", into = "InfluencerKind")]
pub struct Influencer {
    kind: InfluencerKind,
    prepared: bool,
}

impl Influencer {
    pub fn new(kind: InfluencerKind) -> Self {
        Self {
            kind,
            prepared: false,
        }
    }

    pub fn kind(&self) -> &InfluencerKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut InfluencerKind {
        &mut self.kind
    }

    pub fn name(&self) -> &'static str {
        self.as_dyn().name()
    }

    pub fn is_enabled(&self) -> bool {
        self.as_dyn().is_enabled()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.as_dyn_mut().set_enabled(enabled);
    }

    pub fn uses_data_slot(&self) -> bool {
        self.as_dyn().uses_data_slot()
    }

    pub(crate) fn create_data(&self, particle: &mut ParticleData, slot: usize) {
        let influencer = self.as_dyn();
        if influencer.uses_data_slot() {
            particle.slots.reserve(slot);
            influencer.create_data(particle, slot);
        }
    }

    pub(crate) fn initialize(
        &mut self,
        particle: &mut ParticleData,
        slot: usize,
        ctx: &mut InfluenceContext<'_>,
    ) {
        if !self.prepared {
            self.prepared = true;
            self.as_dyn_mut().first_initialize();
        }
        let influencer = self.as_dyn();
        if influencer.is_enabled() {
            influencer.initialize_impl(particle, slot, ctx);
        }
    }

    pub(crate) fn update(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        tpf: f32,
        ctx: &mut InfluenceContext<'_>,
    ) {
        let influencer = self.as_dyn();
        if influencer.is_enabled() {
            influencer.update_impl(particle, slot, tpf, ctx);
        }
    }

    pub(crate) fn reset(&self, particle: &mut ParticleData, slot: usize) {
        self.as_dyn().reset_impl(particle, slot);
    }

    fn as_dyn(&self) -> &dyn ParticleInfluencer {
        match &self.kind {
            InfluencerKind::Alpha(i) => i,
            InfluencerKind::Color(i) => i,
            InfluencerKind::Size(i) => i,
            InfluencerKind::Rotation(i) => i,
            InfluencerKind::Sprite(i) => i,
            InfluencerKind::Gravity(i) => i,
            InfluencerKind::Impulse(i) => i,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn ParticleInfluencer {
        match &mut self.kind {
            InfluencerKind::Alpha(i) => i,
            InfluencerKind::Color(i) => i,
            InfluencerKind::Size(i) => i,
            InfluencerKind::Rotation(i) => i,
            InfluencerKind::Sprite(i) => i,
            InfluencerKind::Gravity(i) => i,
            InfluencerKind::Impulse(i) => i,
        }
    }
}

impl From<InfluencerKind> for Influencer {
    fn from(kind: InfluencerKind) -> Self {
        Self::new(kind)
    }
}

impl From<Influencer> for InfluencerKind {
    fn from(influencer: Influencer) -> Self {
        influencer.kind
    }
}

macro_rules! influencer_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Influencer {
                fn from(influencer: $ty) -> Self {
                    Self::new(InfluencerKind::$variant(influencer))
                }
            }
        )*
    };
}

influencer_from!(
    Alpha(AlphaInfluencer),
    Color(ColorInfluencer),
    Size(SizeInfluencer),
    Rotation(RotationInfluencer),
    Sprite(SpriteInfluencer),
    Gravity(GravityInfluencer),
    Impulse(ImpulseInfluencer),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_influencer_skips_hooks() {
        let mut influencer = Influencer::from(GravityInfluencer::default());
        influencer.set_enabled(false);
        let mut particle = ParticleData::new(0, 4);
        let mut rng = ParticleRng::new(1);
        let config = EmitterConfig::default();
        let mut ctx = InfluenceContext::new(&mut rng, &config);
        influencer.update(&mut particle, 0, 1.0, &mut ctx);
        assert_eq!(particle.velocity, spark_core::Vec3::ZERO);
    }

    #[test]
    fn influencers_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            influencers: Vec<Influencer>,
        }
        let doc: Doc = toml::from_str(
            r#"
[[influencers]]
type = "alpha"
random_start = true
keyframes = { steps = [{ value = 1.0 }, { value = 0.0, interpolation = "fade" }] }

[[influencers]]
type = "gravity"
enabled = false
gravity = [0.0, -2.0, 0.0]
"#,
        )
        .unwrap();
        assert_eq!(doc.influencers.len(), 2);
        assert_eq!(doc.influencers[0].name(), "alpha");
        assert!(doc.influencers[0].uses_data_slot());
        assert_eq!(doc.influencers[1].name(), "gravity");
        assert!(!doc.influencers[1].is_enabled());
        assert!(!doc.influencers[1].uses_data_slot());
    }
}
