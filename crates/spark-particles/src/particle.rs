//! Particle types: pooled simulation record and render instance data

use crate::emitter::{EmitterConfig, EmitterContext};
use crate::influencer::InfluenceContext;
use crate::shape::EmissionPoint;
use crate::slots::DataSlots;
use bytemuck::{Pod, Zeroable};
use spark_core::{Color, Vec3};

/// One pooled particle. Records are allocated with the pool and recycled in
/// place; spawning and dying only flip `active` and rewrite fields.
#[derive(Debug)]
pub struct ParticleData {
    /// Fixed slot number in the pool
    pub index: usize,
    /// Seconds remaining
    pub life: f32,
    /// Seconds total at spawn
    pub start_life: f32,
    /// Linear life progress in [0, 1]
    pub blend: f32,
    /// `blend` eased by the emitter's curve
    pub interp_blend: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub reversed_velocity: Vec3,
    /// Per-axis size
    pub size: Vec3,
    /// Per-axis rotation in radians
    pub angles: Vec3,
    pub up: Vec3,
    pub color: Color,
    pub alpha: f32,
    pub sprite_col: u32,
    pub sprite_row: u32,
    /// Shape sub-surface the particle spawned from
    pub triangle_index: usize,
    /// Emitter world translation at spawn
    pub initial_position: Vec3,
    pub random_offset: Vec3,
    /// Speed sampled at spawn
    pub force: f32,
    /// Velocity magnitude at spawn
    pub initial_length: f32,
    /// Working memory, valid only inside a single lifecycle call
    pub(crate) scratch: Vec3,
    pub(crate) slots: DataSlots,
    active: bool,
}

impl ParticleData {
    pub fn new(index: usize, data_size: usize) -> Self {
        Self {
            index,
            life: 0.0,
            start_life: 0.0,
            blend: 0.0,
            interp_blend: 0.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            reversed_velocity: Vec3::ZERO,
            size: Vec3::ONE,
            angles: Vec3::ZERO,
            up: Vec3::UP,
            color: Color::WHITE,
            alpha: 1.0,
            sprite_col: 0,
            sprite_row: 0,
            triangle_index: 0,
            initial_position: Vec3::ZERO,
            random_offset: Vec3::ZERO,
            force: 0.0,
            initial_length: 0.0,
            scratch: Vec3::ZERO,
            slots: DataSlots::new(data_size),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Influencer-private data, indexed by pipeline position
    pub fn slots(&self) -> &DataSlots {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut DataSlots {
        &mut self.slots
    }

    /// Normalized age in [0, 1]
    pub fn age_ratio(&self) -> f32 {
        self.blend
    }

    /// Activate this record: sample life, force and the emission shape, then
    /// run every influencer's spawn hook in pipeline order.
    pub(crate) fn initialize(&mut self, ctx: &mut EmitterContext<'_>) {
        let config = ctx.config;
        let Some(shape) = ctx.shape.as_deref_mut() else {
            return;
        };

        ctx.stats.activated();
        self.active = true;

        self.blend = 0.0;
        self.interp_blend = 0.0;
        self.size = Vec3::ONE;
        self.angles = Vec3::ZERO;
        self.up = Vec3::UP;
        self.color = Color::WHITE;
        self.alpha = 1.0;
        self.sprite_col = 0;
        self.sprite_row = 0;

        self.start_life = if config.life_min != config.life_max {
            ctx.rng.range(config.life_min, config.life_max)
        } else {
            config.life_max
        };
        self.life = self.start_life;

        self.force = if config.force_min != config.force_max {
            ctx.rng.range(config.force_min, config.force_max)
        } else {
            config.force_max
        };

        shape.select_next(config.selection_policy(), ctx.rng);
        self.triangle_index = shape.current_subsurface();

        let translation = shape.translation(config.emission_point);
        if config.random_emission_point {
            self.random_offset = shape.random_offset(ctx.rng);
            self.position = translation + self.random_offset;
        } else {
            self.random_offset = Vec3::ZERO;
            self.position = translation;
        }

        self.scratch = shape.direction(config.direction_type, ctx.rng).normalized();
        self.velocity = self.scratch * self.force;
        self.reversed_velocity = -self.velocity;
        self.initial_length = self.velocity.length();
        self.initial_position = ctx.world_translation;

        let mut influence = InfluenceContext::new(&mut *ctx.rng, config);
        for (slot, influencer) in ctx.influencers.iter_mut().enumerate() {
            influencer.initialize(self, slot, &mut influence);
        }

        let edge_offset = self.scratch * (self.size.y * 0.5);
        match config.emission_point {
            EmissionPoint::EdgeBottom => self.position += edge_offset,
            EmissionPoint::EdgeTop => self.position -= edge_offset,
            EmissionPoint::Center => {}
        }
    }

    /// Per-frame step. A particle whose life runs out resets itself and
    /// skips the rest of the frame.
    pub(crate) fn update(&mut self, ctx: &mut EmitterContext<'_>, tpf: f32) {
        let config = ctx.config;

        if !config.static_particles {
            self.life -= tpf;
            if self.life <= 0.0 {
                self.reset(ctx);
                return;
            }
            self.blend = (self.start_life - self.life) / self.start_life;
            self.interp_blend = config.interpolation.apply(self.blend);
        }

        let mut influence = InfluenceContext::new(&mut *ctx.rng, config);
        for (slot, influencer) in ctx.influencers.iter().enumerate() {
            influencer.update(self, slot, tpf, &mut influence);
        }

        if config.static_particles {
            if let Some(shape) = ctx.shape.as_deref_mut() {
                shape.select(self.triangle_index);
                let translation = shape.translation(config.emission_point);
                self.position = if config.random_emission_point {
                    translation + self.random_offset
                } else {
                    translation
                };
            }
        } else {
            self.scratch = self.velocity * tpf;
            self.position += self.scratch;
        }

        self.reversed_velocity = -self.velocity;
    }

    /// Return the record to the pool. No-op when already inactive.
    pub(crate) fn reset(&mut self, ctx: &mut EmitterContext<'_>) {
        if !self.active {
            return;
        }
        self.active = false;
        self.life = 0.0;
        ctx.stats.deactivated();

        for (slot, influencer) in ctx.influencers.iter().enumerate() {
            influencer.reset(self, slot);
        }

        ctx.stats.release(self.index);
    }
}

/// Render instance data for one active particle.
/// 80 bytes, 16-byte rows (5 × vec4).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ParticleInstance {
    /// xyz = position, w = size.x
    pub position_size_x: [f32; 4],
    /// rgb, a = color alpha × particle alpha
    pub color: [f32; 4],
    /// xyz = rotation angles, w = size.y
    pub angles_size_y: [f32; 4],
    /// xyz = stretch axis, w = stretch scale
    pub stretch: [f32; 4],
    /// x = sprite column, y = sprite row, z = columns, w = rows
    pub sprite: [f32; 4],
}

impl ParticleInstance {
    /// `origin` is added to the particle's shape-local position.
    pub fn from_particle(p: &ParticleData, config: &EmitterConfig, origin: Vec3) -> Self {
        let fallback = config.stretch_axis.unit();
        let (axis, scale) = if config.velocity_stretching {
            let speed = p.reversed_velocity.length();
            let axis = if speed > 0.0 {
                p.reversed_velocity * (1.0 / speed)
            } else {
                fallback
            };
            let ratio = if p.initial_length > 0.0 {
                speed / p.initial_length
            } else {
                0.0
            };
            (axis, 1.0 + config.velocity_stretch_factor * ratio)
        } else {
            (fallback, 1.0)
        };

        let position = origin + p.position;
        Self {
            position_size_x: [position.x, position.y, position.z, p.size.x],
            color: [p.color.r, p.color.g, p.color.b, p.color.a * p.alpha],
            angles_size_y: [p.angles.x, p.angles.y, p.angles.z, p.size.y],
            stretch: [axis.x, axis.y, axis.z, scale],
            sprite: [
                p.sprite_col as f32,
                p.sprite_row as f32,
                config.sprite_cols as f32,
                config.sprite_rows as f32,
            ],
        }
    }
}
