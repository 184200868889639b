//! Color over lifetime

use super::{InfluenceContext, Keyframes, ParticleInfluencer, StepState};
use crate::particle::ParticleData;
use serde::{Deserialize, Serialize};
use spark_core::{Color, Interpolation};

/// Blends particle color through keyframes. Defaults to white → black; a
/// single keyframe holds that color for the whole life.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorInfluencer {
    pub enabled: bool,
    pub random_start: bool,
    pub keyframes: Keyframes<Color>,
}

impl Default for ColorInfluencer {
    fn default() -> Self {
        Self {
            enabled: true,
            keyframes: Keyframes::new(),
            random_start: false,
        }
    }
}

impl ColorInfluencer {
    pub fn new(keyframes: Keyframes<Color>) -> Self {
        Self {
            keyframes,
            ..Default::default()
        }
    }
}

impl ParticleInfluencer for ColorInfluencer {
    fn name(&self) -> &'static str {
        "color"
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
        match self.keyframes.steps() {
            [] => {
                self.keyframes.push(Color::WHITE, Interpolation::Linear);
                self.keyframes.push(Color::BLACK, Interpolation::Linear);
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
        let Ok(color) = self.keyframes.value(index) else {
            return;
        };
        particle.color = color;
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
        if let Some(color) = self.keyframes.advance(state, tpf) {
            particle.color = color;
        }
    }

    fn reset_impl(&self, particle: &mut ParticleData, _slot: usize) {
        particle.color = Color::TRANSPARENT;
    }
}
