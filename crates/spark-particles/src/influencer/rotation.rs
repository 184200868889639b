//! Angular speed over lifetime

use super::{InfluenceContext, Keyframes, ParticleInfluencer, StepState};
use crate::particle::ParticleData;
use serde::{Deserialize, Serialize};
use spark_core::{Interpolation, Vec3};
use std::f32::consts::{PI, TAU};

/// Per-particle rotation state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationData {
    pub step: StepState,
    /// Per-axis sign applied to the keyframed speed
    pub direction: Vec3,
}

impl Default for RotationData {
    fn default() -> Self {
        Self {
            step: StepState::default(),
            direction: Vec3::ONE,
        }
    }
}

/// Spins particles with keyframed per-axis angular speed (radians/s).
/// Defaults to half a turn per second around Z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationInfluencer {
    pub enabled: bool,
    pub random_start: bool,
    /// Flip each axis' spin direction per particle at random
    pub random_direction: bool,
    /// Start each spinning axis at a random angle
    pub random_start_angle: bool,
    pub keyframes: Keyframes<Vec3>,
}

impl Default for RotationInfluencer {
    fn default() -> Self {
        Self {
            enabled: true,
            keyframes: Keyframes::new(),
            random_start: false,
            random_direction: false,
            random_start_angle: false,
        }
    }
}

impl RotationInfluencer {
    pub fn new(keyframes: Keyframes<Vec3>) -> Self {
        Self {
            keyframes,
            ..Default::default()
        }
    }
}

impl ParticleInfluencer for RotationInfluencer {
    fn name(&self) -> &'static str {
        "rotation"
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
        particle.slots.insert(slot, RotationData::default());
    }

    fn first_initialize(&mut self) {
        if self.keyframes.is_empty() {
            self.keyframes.push(Vec3::new(0.0, 0.0, PI), Interpolation::Linear);
        }
        // one keyframe means constant speed
        if let [only] = self.keyframes.steps() {
            let only = *only;
            self.keyframes.push(only.value, only.interpolation);
        }
    }

    fn initialize_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        ctx: &mut InfluenceContext<'_>,
    ) {
        let index = self.keyframes.start_index(self.random_start, ctx.rng);
        let Ok(speed) = self.keyframes.value(index) else {
            return;
        };

        let direction = if self.random_direction {
            Vec3::new(ctx.rng.sign(), ctx.rng.sign(), ctx.rng.sign())
        } else {
            Vec3::ONE
        };

        if self.random_start_angle {
            let mut angle = |axis_speed: f32| {
                if axis_speed != 0.0 {
                    ctx.rng.range(0.0, TAU)
                } else {
                    0.0
                }
            };
            particle.angles = Vec3::new(angle(speed.x), angle(speed.y), angle(speed.z));
        }

        particle.slots.insert(
            slot,
            RotationData {
                step: self.keyframes.begin(index, particle.start_life),
                direction,
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
        let Some(data) = particle.slots.get_mut::<RotationData>(slot) else {
            return;
        };
        if let Some(speed) = self.keyframes.advance(&mut data.step, tpf) {
            particle.angles += speed.mul_elem(&data.direction) * tpf;
        }
    }

    fn reset_impl(&self, particle: &mut ParticleData, _slot: usize) {
        particle.angles = Vec3::ZERO;
    }
}
