//! Size over lifetime

use super::{InfluenceContext, Keyframes, ParticleInfluencer, StepState};
use crate::particle::ParticleData;
use serde::{Deserialize, Serialize};
use spark_core::{Interpolation, Vec3};

/// Per-particle size state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeData {
    pub step: StepState,
    /// Multiplier applied to every keyframe value
    pub factor: f32,
}

impl Default for SizeData {
    fn default() -> Self {
        Self {
            step: StepState::default(),
            factor: 1.0,
        }
    }
}

/// Scales particles through per-axis size keyframes. Defaults to 1 → 0.
///
/// With `random_size`, each particle gets its own factor in
/// `[1 - variation, 1 + variation]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeInfluencer {
    pub enabled: bool,
    pub random_start: bool,
    pub random_size: bool,
    pub size_variation: f32,
    pub keyframes: Keyframes<Vec3>,
}

impl Default for SizeInfluencer {
    fn default() -> Self {
        Self {
            enabled: true,
            keyframes: Keyframes::new(),
            random_start: false,
            random_size: false,
            size_variation: 0.5,
        }
    }
}

impl SizeInfluencer {
    pub fn new(keyframes: Keyframes<Vec3>) -> Self {
        Self {
            keyframes,
            ..Default::default()
        }
    }
}

impl ParticleInfluencer for SizeInfluencer {
    fn name(&self) -> &'static str {
        "size"
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
        particle.slots.insert(slot, SizeData::default());
    }

    fn first_initialize(&mut self) {
        match self.keyframes.steps() {
            [] => {
                self.keyframes.push(Vec3::ONE, Interpolation::Linear);
                self.keyframes.push(Vec3::ZERO, Interpolation::Linear);
            }
            [only] => {
                let only = *only;
                self.keyframes.push(only.value, only.interpolation);
            }
            _ => {}
        }
    }

    fn initialize_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        ctx: &mut InfluenceContext<'_>,
    ) {
        let index = self.keyframes.start_index(self.random_start, ctx.rng);
        let Ok(size) = self.keyframes.value(index) else {
            return;
        };
        let factor = if self.random_size {
            let variation = self.size_variation.clamp(0.0, 1.0);
            ctx.rng.range(1.0 - variation, 1.0 + variation)
        } else {
            1.0
        };
        particle.size = size * factor;
        particle.slots.insert(
            slot,
            SizeData {
                step: self.keyframes.begin(index, particle.start_life),
                factor,
            },
        );
    }

    fn update_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        tpf: f32,
        _ctx: &mut InfluenceContext<'_>,
    ) {
        let Some(data) = particle.slots.get_mut::<SizeData>(slot) else {
            return;
        };
        if let Some(size) = self.keyframes.advance(&mut data.step, tpf) {
            particle.size = size * data.factor;
        }
    }

    fn reset_impl(&self, particle: &mut ParticleData, _slot: usize) {
        particle.size = Vec3::ZERO;
    }
}
