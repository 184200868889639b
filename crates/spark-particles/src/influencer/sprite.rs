//! Texture-atlas frame animation

use super::{InfluenceContext, ParticleInfluencer};
use crate::particle::ParticleData;
use serde::{Deserialize, Serialize};

/// Per-particle frame cursor
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpriteData {
    /// Position in the frame sequence
    pub frame: usize,
    pub interval: f32,
    /// Seconds per frame for this particle
    pub duration: f32,
}

/// Steps particles through the emitter's sprite grid.
///
/// Frames are numbered row-major. An empty `frame_sequence` plays every
/// frame in order; otherwise only the listed frames are played. With a zero
/// `fixed_duration` the sequence is spread over the particle's life.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteInfluencer {
    pub enabled: bool,
    pub animate: bool,
    pub random_start: bool,
    pub fixed_duration: f32,
    pub frame_sequence: Vec<u32>,
}

impl Default for SpriteInfluencer {
    fn default() -> Self {
        Self {
            enabled: true,
            animate: true,
            random_start: false,
            fixed_duration: 0.0,
            frame_sequence: Vec::new(),
        }
    }
}

impl SpriteInfluencer {
    fn sequence_len(&self, ctx: &InfluenceContext<'_>) -> usize {
        if self.frame_sequence.is_empty() {
            grid_cells(ctx)
        } else {
            self.frame_sequence.len()
        }
    }

    fn apply_frame(&self, particle: &mut ParticleData, frame: usize, ctx: &InfluenceContext<'_>) {
        let cols = ctx.sprite_cols.max(1);
        let total = grid_cells(ctx);
        let cell = match self.frame_sequence.get(frame) {
            Some(&cell) => cell as usize % total,
            None => frame % total,
        };
        let cell = cell as u32;
        particle.sprite_col = cell % cols;
        particle.sprite_row = cell / cols;
    }
}

/// Cells in the atlas grid. Huge grids saturate instead of wrapping.
fn grid_cells(ctx: &InfluenceContext<'_>) -> usize {
    ctx.sprite_cols
        .max(1)
        .saturating_mul(ctx.sprite_rows.max(1)) as usize
}

impl ParticleInfluencer for SpriteInfluencer {
    fn name(&self) -> &'static str {
        "sprite"
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
        particle.slots.insert(slot, SpriteData::default());
    }

    fn initialize_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        ctx: &mut InfluenceContext<'_>,
    ) {
        let len = self.sequence_len(ctx);
        let frame = if self.random_start {
            ctx.rng.range_inclusive(0, len - 1)
        } else {
            0
        };
        let duration = if self.fixed_duration > 0.0 {
            self.fixed_duration
        } else {
            particle.start_life / len as f32
        };
        self.apply_frame(particle, frame, ctx);
        particle.slots.insert(
            slot,
            SpriteData {
                frame,
                interval: 0.0,
                duration,
            },
        );
    }

    fn update_impl(
        &self,
        particle: &mut ParticleData,
        slot: usize,
        tpf: f32,
        ctx: &mut InfluenceContext<'_>,
    ) {
        if !self.animate {
            return;
        }
        let len = self.sequence_len(ctx);
        let Some(data) = particle.slots.get_mut::<SpriteData>(slot) else {
            return;
        };
        data.interval += tpf;
        if data.duration > 0.0 && data.interval >= data.duration {
            data.frame = (data.frame + 1) % len;
            data.interval -= data.duration;
        }
        let frame = data.frame;
        self.apply_frame(particle, frame, ctx);
    }

    fn reset_impl(&self, particle: &mut ParticleData, _slot: usize) {
        particle.sprite_col = 0;
        particle.sprite_row = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::EmitterConfig;
    use crate::influencer::Influencer;
    use crate::rand::ParticleRng;

    fn grid_config(cols: u32, rows: u32) -> EmitterConfig {
        EmitterConfig {
            sprite_cols: cols,
            sprite_rows: rows,
            ..Default::default()
        }
    }

    #[test]
    fn walks_grid_row_major() {
        let mut influencer = Influencer::from(SpriteInfluencer::default());
        let mut particle = ParticleData::new(0, 4);
        particle.start_life = 4.0;
        let mut rng = ParticleRng::new(1);
        let config = grid_config(2, 2);
        let mut ctx = InfluenceContext::new(&mut rng, &config);

        influencer.initialize(&mut particle, 0, &mut ctx);
        assert_eq!((particle.sprite_col, particle.sprite_row), (0, 0));

        let mut cells = Vec::new();
        for _ in 0..4 {
            influencer.update(&mut particle, 0, 1.0, &mut ctx);
            cells.push((particle.sprite_col, particle.sprite_row));
        }
        assert_eq!(cells, vec![(1, 0), (0, 1), (1, 1), (0, 0)]);
    }

    #[test]
    fn custom_sequence_and_fixed_duration() {
        let sprite = SpriteInfluencer {
            fixed_duration: 0.1,
            frame_sequence: vec![5, 2],
            ..Default::default()
        };
        let mut influencer = Influencer::from(sprite);
        let mut particle = ParticleData::new(0, 4);
        particle.start_life = 10.0;
        let mut rng = ParticleRng::new(1);
        let config = grid_config(3, 2);
        let mut ctx = InfluenceContext::new(&mut rng, &config);

        influencer.initialize(&mut particle, 0, &mut ctx);
        assert_eq!((particle.sprite_col, particle.sprite_row), (2, 1));
        influencer.update(&mut particle, 0, 0.1, &mut ctx);
        assert_eq!((particle.sprite_col, particle.sprite_row), (2, 0));
    }

    #[test]
    fn static_frame_when_not_animating() {
        let sprite = SpriteInfluencer {
            animate: false,
            ..Default::default()
        };
        let mut influencer = Influencer::from(sprite);
        let mut particle = ParticleData::new(0, 4);
        particle.start_life = 1.0;
        let mut rng = ParticleRng::new(1);
        let config = grid_config(4, 1);
        let mut ctx = InfluenceContext::new(&mut rng, &config);
        influencer.initialize(&mut particle, 0, &mut ctx);
        influencer.update(&mut particle, 0, 0.9, &mut ctx);
        assert_eq!(particle.sprite_col, 0);
    }

    #[test]
    fn oversized_grid_does_not_overflow() {
        let sprite = SpriteInfluencer {
            random_start: true,
            ..Default::default()
        };
        let mut influencer = Influencer::from(sprite);
        let mut particle = ParticleData::new(0, 4);
        particle.start_life = 1.0;
        let mut rng = ParticleRng::new(7);
        let config = grid_config(70_000, 70_000);
        let mut ctx = InfluenceContext::new(&mut rng, &config);

        influencer.initialize(&mut particle, 0, &mut ctx);
        influencer.update(&mut particle, 0, 0.5, &mut ctx);
        assert!(particle.sprite_col < 70_000);
        assert!(particle.sprite_row < 70_000);
    }
}
