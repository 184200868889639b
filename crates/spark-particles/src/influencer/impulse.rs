//! Random velocity kicks

use super::{InfluenceContext, ParticleInfluencer};
use crate::particle::ParticleData;
use serde::{Deserialize, Serialize};

/// Each frame, with probability `chance`, pushes a particle in a random
/// direction by up to `strength * magnitude`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpulseInfluencer {
    pub enabled: bool,
    pub chance: f32,
    pub magnitude: f32,
    pub strength: f32,
}

impl Default for ImpulseInfluencer {
    fn default() -> Self {
        Self {
            enabled: true,
            chance: 0.02,
            magnitude: 0.2,
            strength: 3.0,
        }
    }
}

impl ParticleInfluencer for ImpulseInfluencer {
    fn name(&self) -> &'static str {
        "impulse"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn initialize_impl(
        &self,
        _particle: &mut ParticleData,
        _slot: usize,
        _ctx: &mut InfluenceContext<'_>,
    ) {
    }

    fn update_impl(
        &self,
        particle: &mut ParticleData,
        _slot: usize,
        _tpf: f32,
        ctx: &mut InfluenceContext<'_>,
    ) {
        if ctx.rng.chance(self.chance) {
            let kick = ctx.rng.random_direction() * ctx.rng.range(0.0, self.strength);
            particle.velocity += kick * self.magnitude;
        }
    }
}
