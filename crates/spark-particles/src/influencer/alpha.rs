//! Alpha over lifetime

use super::{InfluenceContext, Keyframes, ParticleInfluencer, StepState};
use crate::particle::ParticleData;
use serde::{Deserialize, Serialize};
use spark_core::Interpolation;

/// Fades particle alpha through keyframes. Defaults to 1 → 0 when no
/// keyframes are configured; a single keyframe disables the influencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaInfluencer {
    pub enabled: bool,
    /// Start each particle at a random keyframe
    pub random_start: bool,
    pub keyframes: Keyframes<f32>,
}

impl Default for AlphaInfluencer {
    fn default() -> Self {
        Self {
            enabled: true,
            keyframes: Keyframes::new(),
            random_start: false,
        }
    }
}

impl AlphaInfluencer {
    pub fn new(keyframes: Keyframes<f32>) -> Self {
        Self {
            keyframes,
            ..Default::default()
        }
    }
}

impl ParticleInfluencer for AlphaInfluencer {
    fn name(&self) -> &'static str {
        "alpha"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn uses_data_slot(&self) -> bool {
        true
    }

    fn create_data(&self, particle: &mut ParticleData, slot: usize) {
        particle.slots.insert(slot, StepState::default());
    }

    fn first_initialize(&mut self) {
        if self.keyframes.is_empty() {
            self.keyframes.push(1.0, Interpolation::Linear);
            self.keyframes.push(0.0, Interpolation::Linear);
        } else if self.keyframes.len() == 1 {
            self.enabled = false;
        }
    }

    fn initialize_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        ctx: &mut InfluenceContext<'_>,
    ) {
        let index = self.keyframes.start_index(self.random_start, ctx.rng);
        let Ok(alpha) = self.keyframes.value(index) else {
            return;
        };
        particle.alpha = alpha;
        particle
            .slots
            .insert(slot, self.keyframes.begin(index, particle.start_life));
    }

    fn update_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        tpf: f32,
        _ctx: &mut InfluenceContext<'_>,
    ) {
        let Some(state) = particle.slots.get_mut::<StepState>(slot) else {
            return;
        };
        if let Some(alpha) = self.keyframes.advance(state, tpf) {
            particle.alpha = alpha;
        }
    }

    fn reset_impl(&self, particle: &mut ParticleData, _slot: usize) {
        particle.alpha = 0.0;
    }
}
