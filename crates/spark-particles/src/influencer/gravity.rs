//! Constant acceleration with optional damping

use super::{InfluenceContext, ParticleInfluencer};
use crate::particle::ParticleData;
use serde::{Deserialize, Serialize};
use spark_core::Vec3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityInfluencer {
    pub enabled: bool,
    /// Acceleration in units/s²
    pub gravity: Vec3,
    /// Fraction of velocity lost per second
    pub damping: f32,
}

impl Default for GravityInfluencer {
    fn default() -> Self {
        Self {
            enabled: true,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            damping: 0.0,
        }
    }
}

impl ParticleInfluencer for GravityInfluencer {
    fn name(&self) -> &'static str {
        "gravity"
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
        tpf: f32,
        _ctx: &mut InfluenceContext<'_>,
    ) {
        particle.velocity += self.gravity * tpf;
        if self.damping > 0.0 {
            particle.velocity = particle.velocity * (1.0 - self.damping * tpf).max(0.0);
        }
    }
}
