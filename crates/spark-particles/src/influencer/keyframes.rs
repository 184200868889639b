//! Keyframed values and the per-particle step machine that walks them

use crate::curves::Lerp;
use crate::rand::ParticleRng;
use serde::{Deserialize, Serialize};
use spark_core::{Interpolation, Result, SparkError};

/// One step: a value and the curve used while blending away from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    #[serde(default)]
    pub interpolation: Interpolation,
    pub value: T,
}

/// Ordered keyframes shared by every particle of an influencer.
///
/// Each step lasts either `fixed_duration` (cycle mode) or the particle's
/// start life divided by `len() - 1`. Walking past the last step wraps to
/// the first, and the last step blends towards the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keyframes<T> {
    fixed_duration: f32,
    cycle: bool,
    steps: Vec<Keyframe<T>>,
}

impl<T> Default for Keyframes<T> {
    fn default() -> Self {
        Self {
            fixed_duration: 0.0,
            cycle: false,
            steps: Vec::new(),
        }
    }
}

/// Per-particle position within a [`Keyframes`] sequence
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepState {
    pub index: usize,
    /// Seconds spent in the current step
    pub interval: f32,
    /// Seconds per step for this particle
    pub duration: f32,
}

impl<T: Lerp> Keyframes<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        let mut keyframes = Self::new();
        for value in values {
            keyframes.push(value, Interpolation::Linear);
        }
        keyframes
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, value: T, interpolation: Interpolation) {
        self.steps.push(Keyframe {
            interpolation,
            value,
        });
    }

    pub fn value(&self, index: usize) -> Result<T> {
        self.step(index).map(|s| s.value)
    }

    pub fn interpolation(&self, index: usize) -> Result<Interpolation> {
        self.step(index).map(|s| s.interpolation)
    }

    pub fn set_value(&mut self, index: usize, value: T) -> Result<()> {
        self.step_mut(index)?.value = value;
        Ok(())
    }

    pub fn set_interpolation(&mut self, index: usize, interpolation: Interpolation) -> Result<()> {
        self.step_mut(index)?.interpolation = interpolation;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Keyframe<T>> {
        if index >= self.steps.len() {
            return Err(SparkError::index("keyframe", index, self.steps.len()));
        }
        Ok(self.steps.remove(index))
    }

    pub fn remove_last(&mut self) -> Option<Keyframe<T>> {
        self.steps.pop()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn steps(&self) -> &[Keyframe<T>] {
        &self.steps
    }

    pub fn fixed_duration(&self) -> f32 {
        self.fixed_duration
    }

    /// A non-zero duration switches to cycle mode; zero spreads the steps
    /// over each particle's life.
    pub fn set_fixed_duration(&mut self, duration: f32) {
        if duration != 0.0 {
            self.cycle = true;
            self.fixed_duration = duration;
        } else {
            self.cycle = false;
            self.fixed_duration = 0.0;
        }
    }

    pub fn is_cycle(&self) -> bool {
        self.cycle
    }

    /// Start index for a newly spawned particle
    pub fn start_index(&self, random: bool, rng: &mut ParticleRng) -> usize {
        if random && !self.steps.is_empty() {
            rng.range_inclusive(0, self.steps.len() - 1)
        } else {
            0
        }
    }

    /// Step state for a particle spawned with `start_life` seconds to live
    pub fn begin(&self, index: usize, start_life: f32) -> StepState {
        let duration = if self.cycle {
            self.fixed_duration
        } else {
            start_life / (self.steps.len() as f32 - 1.0)
        };
        StepState {
            index,
            interval: 0.0,
            duration,
        }
    }

    /// Advance `state` by `tpf` seconds and return the blended value.
    /// `None` only when there are no keyframes.
    pub fn advance(&self, state: &mut StepState, tpf: f32) -> Option<T> {
        let count = self.steps.len();
        if count == 0 {
            return None;
        }

        state.interval += tpf;
        if state.index >= count {
            state.index = 0;
        }
        if state.duration > 0.0 && state.interval >= state.duration {
            state.index = (state.index + 1) % count;
            state.interval -= state.duration;
        }

        let progress = if state.duration > 0.0 {
            (state.interval / state.duration).min(1.0)
        } else {
            1.0
        };
        let from = &self.steps[state.index];
        let to = &self.steps[(state.index + 1) % count];
        let blend = from.interpolation.apply(progress);
        Some(from.value.lerp(to.value, blend))
    }

    fn step(&self, index: usize) -> Result<&Keyframe<T>> {
        self.steps
            .get(index)
            .ok_or_else(|| SparkError::index("keyframe", index, self.steps.len()))
    }

    fn step_mut(&mut self, index: usize) -> Result<&mut Keyframe<T>> {
        let len = self.steps.len();
        self.steps
            .get_mut(index)
            .ok_or_else(|| SparkError::index("keyframe", index, len))
    }
}
