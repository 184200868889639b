//! Emitter configuration and the per-frame emission engine

use crate::influencer::{InfluenceContext, Influencer};
use crate::loader::EmitterDefinition;
use crate::particle::{ParticleData, ParticleInstance};
use crate::rand::ParticleRng;
use crate::shape::{DirectionType, EmissionPoint, EmitterShape, SelectionPolicy, ShapeDefinition};
use serde::{Deserialize, Serialize};
use spark_core::{Interpolation, Result, SparkError, Vec3};

/// Lowest accepted emission rate
pub const MIN_EMISSIONS_PER_SECOND: f32 = 0.1;

/// Axis particles stretch along when not following their velocity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedStretchAxis {
    X,
    #[default]
    Y,
    Z,
}

impl ForcedStretchAxis {
    pub fn unit(self) -> Vec3 {
        match self {
            ForcedStretchAxis::X => Vec3::RIGHT,
            ForcedStretchAxis::Y => Vec3::UP,
            ForcedStretchAxis::Z => Vec3::FORWARD,
        }
    }
}

/// Visual representation each particle is rendered with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParticleMeshType {
    #[default]
    Quad,
    Point,
    Impostor,
    /// Instances of an external mesh asset
    Template { mesh: String },
}

/// How particle quads are oriented by the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillboardMode {
    #[default]
    Camera,
    ParticleNormal,
    Velocity,
    VelocityZUp,
    VelocityZUpYLeft,
    UnitX,
    UnitY,
    UnitZ,
}

/// Emission parameters, loaded from the `[config]` table of a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    pub emissions_per_second: f32,
    pub particles_per_emission: u32,
    pub max_particles: usize,
    pub life_min: f32,
    pub life_max: f32,
    pub force_min: f32,
    pub force_max: f32,
    /// Seconds after enabling before the first emission
    pub emitter_delay: f32,
    /// Seconds the emitter keeps spawning; 0 = forever
    pub emitter_life: f32,
    /// Particles stay attached to their sub-surface and never age
    pub static_particles: bool,
    pub random_emission_point: bool,
    pub sequential_emission_face: bool,
    pub sequential_skip_pattern: bool,
    pub emission_point: EmissionPoint,
    pub direction_type: DirectionType,
    /// Curve easing each particle's life blend
    pub interpolation: Interpolation,
    pub velocity_stretching: bool,
    pub velocity_stretch_factor: f32,
    pub stretch_axis: ForcedStretchAxis,
    /// Render particles relative to the emitter's current position rather
    /// than where they spawned
    pub particles_follow_emitter: bool,
    pub billboard_mode: BillboardMode,
    pub sprite_cols: u32,
    pub sprite_rows: u32,
    /// Initial size of each particle's influencer data store
    pub particle_data_size: usize,
    pub material: Option<String>,
    pub seed: u32,
    pub mesh_type: ParticleMeshType,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            emissions_per_second: 100.0,
            particles_per_emission: 1,
            max_particles: 100,
            life_min: 0.999,
            life_max: 0.999,
            force_min: 0.15,
            force_max: 0.5,
            emitter_delay: 0.0,
            emitter_life: 0.0,
            static_particles: false,
            random_emission_point: false,
            sequential_emission_face: false,
            sequential_skip_pattern: false,
            emission_point: EmissionPoint::Center,
            direction_type: DirectionType::Random,
            interpolation: Interpolation::Linear,
            velocity_stretching: false,
            velocity_stretch_factor: 0.35,
            stretch_axis: ForcedStretchAxis::Y,
            particles_follow_emitter: false,
            billboard_mode: BillboardMode::Camera,
            sprite_cols: 1,
            sprite_rows: 1,
            particle_data_size: 4,
            material: None,
            seed: 0xDEAD_BEEF,
            mesh_type: ParticleMeshType::Quad,
        }
    }
}

impl EmitterConfig {
    /// Check every range the per-frame path relies on.
    pub fn validate(&self) -> Result<()> {
        at_least(
            "emissions_per_second",
            self.emissions_per_second,
            MIN_EMISSIONS_PER_SECOND,
        )?;
        at_least("sprite_cols", self.sprite_cols as f32, 1.0)?;
        at_least("sprite_rows", self.sprite_rows as f32, 1.0)?;
        at_least("life_min", self.life_min, 0.0)?;
        at_least("life_max", self.life_max, self.life_min)?;
        at_least("force_min", self.force_min, 0.0)?;
        at_least("force_max", self.force_max, self.force_min)?;
        at_least("emitter_delay", self.emitter_delay, 0.0)?;
        at_least("emitter_life", self.emitter_life, 0.0)?;
        Ok(())
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        match (self.sequential_emission_face, self.sequential_skip_pattern) {
            (false, _) => SelectionPolicy::Random,
            (true, false) => SelectionPolicy::Sequential,
            (true, true) => SelectionPolicy::SequentialSkip,
        }
    }

    pub fn target_interval(&self) -> f32 {
        1.0 / self.emissions_per_second
    }
}

fn at_least(field: &str, value: f32, min: f32) -> Result<()> {
    if value >= min {
        Ok(())
    } else {
        Err(SparkError::ValueOutOfRange {
            field: field.to_string(),
            min: min as f64,
            value: value as f64,
        })
    }
}

/// Live-count bookkeeping and the free-slot hint
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    pub active_count: usize,
    /// Some inactive slot, or `None` when the pool is exhausted
    pub next_index: Option<usize>,
}

impl PoolStats {
    pub fn activated(&mut self) {
        self.active_count += 1;
    }

    pub fn deactivated(&mut self) {
        self.active_count = self.active_count.saturating_sub(1);
    }

    /// A slot was freed; keep the lowest free index as the hint.
    pub fn release(&mut self, index: usize) {
        match self.next_index {
            Some(next) if index >= next => {}
            _ => self.next_index = Some(index),
        }
    }
}

/// Borrowed emitter state handed to particle lifecycle calls
pub(crate) struct EmitterContext<'a> {
    pub config: &'a EmitterConfig,
    pub shape: Option<&'a mut (dyn EmitterShape + 'static)>,
    pub influencers: &'a mut [Influencer],
    pub rng: &'a mut ParticleRng,
    pub stats: &'a mut PoolStats,
    pub world_translation: Vec3,
}

/// A pool of particles plus the timing state that decides when to spawn
#[derive(Debug)]
pub struct ParticleEmitter {
    config: EmitterConfig,
    shape: Option<Box<dyn EmitterShape>>,
    shape_definition: Option<ShapeDefinition>,
    influencers: Vec<Influencer>,
    particles: Vec<ParticleData>,
    instances: Vec<ParticleInstance>,
    rng: ParticleRng,
    stats: PoolStats,
    enabled: bool,
    initialized: bool,
    target_interval: f32,
    current_interval: f32,
    emitted_time: f32,
    world_translation: Vec3,
    geometry_dirty: bool,
}

impl ParticleEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self {
            rng: ParticleRng::new(config.seed),
            target_interval: config.target_interval(),
            config,
            shape: None,
            shape_definition: None,
            influencers: Vec::new(),
            particles: Vec::new(),
            instances: Vec::new(),
            stats: PoolStats::default(),
            enabled: true,
            initialized: false,
            current_interval: 0.0,
            emitted_time: 0.0,
            world_translation: Vec3::ZERO,
            geometry_dirty: false,
        }
    }

    /// Build an emitter from a loaded definition. The config is validated
    /// and the shape, if any, is built.
    pub fn from_definition(definition: &EmitterDefinition) -> Result<Self> {
        definition.config.validate()?;
        let mut emitter = Self::new(definition.config.clone());
        if let Some(shape) = &definition.shape {
            emitter.set_shape_definition(shape.clone())?;
        }
        for influencer in &definition.influencers {
            emitter.add_influencer(Influencer::new(influencer.kind().clone()));
        }
        Ok(emitter)
    }

    pub fn to_definition(&self) -> EmitterDefinition {
        EmitterDefinition {
            config: self.config.clone(),
            shape: self.shape_definition.clone(),
            influencers: self.influencers.clone(),
        }
    }

    /// Allocate the pool. Fails when a required binding is missing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.shape.is_none() {
            return Err(SparkError::MissingBinding("emission shape".to_string()));
        }
        if let ParticleMeshType::Template { mesh } = &self.config.mesh_type {
            if mesh.is_empty() {
                return Err(SparkError::MissingBinding(
                    "particle mesh template".to_string(),
                ));
            }
        }

        self.allocate_particles();
        self.initialized = true;
        log::debug!(
            "[particles] Emitter initialized with {} particle slot(s)",
            self.particles.len()
        );
        Ok(())
    }

    /// Advance the simulation by `tpf` seconds.
    ///
    /// Only a failed lazy initialization is reported; the emitter disables
    /// itself in that case.
    pub fn advance(&mut self, tpf: f32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if !self.initialized {
            if let Err(err) = self.initialize() {
                self.enabled = false;
                log::warn!("[particles] Emitter disabled, initialization failed: {err}");
                return Err(err);
            }
        }

        self.emitted_time += tpf;

        let (particles, mut ctx) = self.split();
        for particle in particles.iter_mut() {
            if particle.is_active() {
                particle.update(&mut ctx, tpf);
            }
        }

        // one interval of progress per frame at most, so a stall can't burst
        self.current_interval += tpf.min(self.target_interval);
        if self.current_interval <= self.target_interval {
            return Ok(());
        }

        let delay_ready =
            self.config.emitter_delay == 0.0 || self.emitted_time >= self.config.emitter_delay;
        if delay_ready && self.is_alive() {
            let count = (self.current_interval / self.target_interval
                * self.config.particles_per_emission as f32) as usize;
            for _ in 0..count {
                self.emit_next();
            }
        }

        self.current_interval -= self.target_interval;
        Ok(())
    }

    /// Spawn one particle at the free-slot hint, then move the hint to the
    /// next inactive slot.
    pub fn emit_next(&mut self) {
        let Some(index) = self.stats.next_index else {
            return;
        };
        if index >= self.particles.len() {
            return;
        }

        let (particles, mut ctx) = self.split();
        let particle = &mut particles[index];
        if !particle.is_active() {
            particle.initialize(&mut ctx);
        }

        self.stats.next_index = self.find_free_from(index);
    }

    /// Spawn every inactive particle.
    pub fn emit_all(&mut self) {
        let (particles, mut ctx) = self.split();
        for particle in particles.iter_mut() {
            if !particle.is_active() {
                particle.initialize(&mut ctx);
            }
        }
        self.stats.next_index = self.find_free_from(0);
        self.geometry_dirty = true;
    }

    /// Spawn up to `count` particles into the lowest free slots.
    pub fn emit_count(&mut self, count: usize) {
        let (particles, mut ctx) = self.split();
        for particle in particles.iter_mut().filter(|p| !p.is_active()).take(count) {
            particle.initialize(&mut ctx);
        }
        self.stats.next_index = self.find_free_from(0);
        self.geometry_dirty = true;
    }

    pub fn kill_all(&mut self) {
        let (particles, mut ctx) = self.split();
        for particle in particles.iter_mut() {
            particle.reset(&mut ctx);
        }
        self.geometry_dirty = true;
    }

    /// Kill the particle in slot `index`. Returns whether a live particle
    /// was killed; inactive or out-of-range slots are left alone.
    pub fn kill(&mut self, index: usize) -> bool {
        self.geometry_dirty = true;
        let (particles, mut ctx) = self.split();
        match particles.get_mut(index) {
            Some(particle) if particle.is_active() => {
                particle.reset(&mut ctx);
                true
            }
            _ => false,
        }
    }

    /// Kill every live particle matching `predicate`, returning how many died.
    pub fn kill_matching(&mut self, mut predicate: impl FnMut(&ParticleData) -> bool) -> usize {
        self.geometry_dirty = true;
        let (particles, mut ctx) = self.split();
        let mut killed = 0;
        for particle in particles.iter_mut() {
            if particle.is_active() && predicate(particle) {
                particle.reset(&mut ctx);
                killed += 1;
            }
        }
        killed
    }

    /// Kill everything and restart emission timing.
    pub fn reset(&mut self) {
        self.kill_all();
        self.reset_interval();
        self.emitted_time = 0.0;
    }

    /// Prime the accumulator so the next frame emits immediately.
    pub fn reset_interval(&mut self) {
        self.current_interval = self.target_interval;
    }

    /// Still within `emitter_life` (always true when it is 0)
    pub fn is_alive(&self) -> bool {
        self.config.emitter_life == 0.0 || self.emitted_time < self.config.emitter_life
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabling restarts the emitter clock. Disabling only stops `advance`;
    /// live particles are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.emitted_time = 0.0;
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn active_count(&self) -> usize {
        self.stats.active_count
    }

    pub fn next_index(&self) -> Option<usize> {
        self.stats.next_index
    }

    pub fn particles(&self) -> &[ParticleData] {
        &self.particles
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn emitted_time(&self) -> f32 {
        self.emitted_time
    }

    pub fn current_interval(&self) -> f32 {
        self.current_interval
    }

    pub fn target_interval(&self) -> f32 {
        self.target_interval
    }

    pub fn world_translation(&self) -> Vec3 {
        self.world_translation
    }

    pub fn set_world_translation(&mut self, translation: Vec3) {
        self.world_translation = translation;
    }

    /// Returns true once after any bulk change that needs the renderer to
    /// refresh bounds or geometry.
    pub fn take_geometry_refresh(&mut self) -> bool {
        std::mem::take(&mut self.geometry_dirty)
    }

    // ── Configuration ──

    /// Resize the pool. An initialized emitter kills every particle and
    /// reallocates.
    pub fn set_max_particles(&mut self, max_particles: usize) {
        self.config.max_particles = max_particles;
        if self.initialized {
            self.reallocate();
        }
    }

    pub fn set_emissions_per_second(&mut self, emissions_per_second: f32) -> Result<()> {
        at_least(
            "emissions_per_second",
            emissions_per_second,
            MIN_EMISSIONS_PER_SECOND,
        )?;
        self.config.emissions_per_second = emissions_per_second;
        self.target_interval = self.config.target_interval();
        self.reset_interval();
        Ok(())
    }

    pub fn set_particles_per_emission(&mut self, particles_per_emission: u32) {
        self.config.particles_per_emission = particles_per_emission;
    }

    pub fn set_sprite_count(&mut self, cols: u32, rows: u32) -> Result<()> {
        at_least("sprite_cols", cols as f32, 1.0)?;
        at_least("sprite_rows", rows as f32, 1.0)?;
        self.config.sprite_cols = cols;
        self.config.sprite_rows = rows;
        self.geometry_dirty = true;
        Ok(())
    }

    pub fn set_life_range(&mut self, life_min: f32, life_max: f32) -> Result<()> {
        at_least("life_min", life_min, 0.0)?;
        at_least("life_max", life_max, life_min)?;
        self.config.life_min = life_min;
        self.config.life_max = life_max;
        Ok(())
    }

    pub fn set_life(&mut self, life: f32) -> Result<()> {
        self.set_life_range(life, life)
    }

    pub fn set_force_range(&mut self, force_min: f32, force_max: f32) -> Result<()> {
        at_least("force_min", force_min, 0.0)?;
        at_least("force_max", force_max, force_min)?;
        self.config.force_min = force_min;
        self.config.force_max = force_max;
        Ok(())
    }

    pub fn set_force(&mut self, force: f32) -> Result<()> {
        self.set_force_range(force, force)
    }

    pub fn set_emitter_delay(&mut self, delay: f32) -> Result<()> {
        at_least("emitter_delay", delay, 0.0)?;
        self.config.emitter_delay = delay;
        Ok(())
    }

    pub fn set_emitter_life(&mut self, life: f32) -> Result<()> {
        at_least("emitter_life", life, 0.0)?;
        self.config.emitter_life = life;
        Ok(())
    }

    /// Change the remaining flags and settings through a closure. The
    /// result is validated as a whole and rolled back on failure; a changed
    /// pool size or data-slot size reallocates an initialized pool.
    pub fn update_config(&mut self, update: impl FnOnce(&mut EmitterConfig)) -> Result<()> {
        let previous = self.config.clone();
        update(&mut self.config);
        if let Err(err) = self.config.validate() {
            self.config = previous;
            return Err(err);
        }

        if self.config.emissions_per_second != previous.emissions_per_second {
            self.target_interval = self.config.target_interval();
            self.reset_interval();
        }
        let needs_realloc = self.config.max_particles != previous.max_particles
            || self.config.particle_data_size != previous.particle_data_size
            || self.config.mesh_type != previous.mesh_type;
        if self.initialized && needs_realloc {
            self.reallocate();
        }
        self.geometry_dirty = true;
        Ok(())
    }

    /// Switch the visual representation. An initialized emitter reallocates.
    pub fn set_mesh_type(&mut self, mesh_type: ParticleMeshType) {
        self.config.mesh_type = mesh_type;
        if self.initialized {
            self.reallocate();
        }
    }

    pub fn set_shape(&mut self, shape: impl EmitterShape + 'static) {
        self.shape_definition = None;
        self.bind_shape(Box::new(shape));
    }

    pub fn set_shape_definition(&mut self, definition: ShapeDefinition) -> Result<()> {
        let mesh = definition.build()?;
        self.bind_shape(Box::new(mesh));
        self.shape_definition = Some(definition);
        Ok(())
    }

    pub fn shape(&self) -> Option<&dyn EmitterShape> {
        self.shape.as_deref()
    }

    /// The bound shape, for changes that keep its sub-surface ids valid
    pub fn shape_mut(&mut self) -> Option<&mut (dyn EmitterShape + 'static)> {
        self.shape.as_deref_mut()
    }

    /// Move the bound shape's vertices without touching live particles.
    /// Static particles pick up the new geometry on their next update. The
    /// stored definition keeps the shape as it was bound.
    pub fn set_shape_positions(&mut self, positions: Vec<Vec3>) -> Result<()> {
        let shape = self
            .shape
            .as_deref_mut()
            .ok_or_else(|| SparkError::MissingBinding("emission shape".to_string()))?;
        shape.set_positions(positions)?;
        self.geometry_dirty = true;
        Ok(())
    }

    /// Live particles hold sub-surface ids of the old shape, so they die.
    fn bind_shape(&mut self, shape: Box<dyn EmitterShape>) {
        if self.initialized {
            self.kill_all();
        }
        self.shape = Some(shape);
        self.geometry_dirty = true;
    }

    // ── Influencer pipeline ──

    pub fn influencers(&self) -> &[Influencer] {
        &self.influencers
    }

    pub fn influencer_mut(&mut self, index: usize) -> Result<&mut Influencer> {
        let len = self.influencers.len();
        self.influencers
            .get_mut(index)
            .ok_or_else(|| SparkError::index("influencer", index, len))
    }

    pub fn add_influencer(&mut self, influencer: impl Into<Influencer>) {
        self.influencers.push(influencer.into());
        self.prepare_influencer(self.influencers.len() - 1);
    }

    /// Insert at `index`, shifting every particle's data for later
    /// influencers up one slot.
    pub fn insert_influencer(&mut self, index: usize, influencer: impl Into<Influencer>) -> Result<()> {
        let count = self.influencers.len();
        if index > count {
            return Err(SparkError::index("influencer insert position", index, count + 1));
        }
        for particle in &mut self.particles {
            particle.slots.shift_up(index, count);
        }
        self.influencers.insert(index, influencer.into());
        self.prepare_influencer(index);
        Ok(())
    }

    /// Remove the influencer at `index`, shifting every particle's data for
    /// later influencers down one slot.
    pub fn remove_influencer(&mut self, index: usize) -> Result<Influencer> {
        let count = self.influencers.len();
        if index >= count {
            return Err(SparkError::index("influencer", index, count));
        }
        for particle in &mut self.particles {
            particle.slots.shift_down(index, count);
        }
        self.geometry_dirty = true;
        Ok(self.influencers.remove(index))
    }

    pub fn remove_all_influencers(&mut self) {
        for particle in &mut self.particles {
            particle.slots.clear();
        }
        self.influencers.clear();
        self.geometry_dirty = true;
    }

    /// Give every particle data for the influencer at `slot` and set it up
    /// on particles that are already alive.
    fn prepare_influencer(&mut self, slot: usize) {
        let influencer = &mut self.influencers[slot];
        let mut ctx = InfluenceContext::new(&mut self.rng, &self.config);
        for particle in &mut self.particles {
            influencer.create_data(particle, slot);
            if particle.is_active() {
                influencer.initialize(particle, slot, &mut ctx);
            }
        }
        self.geometry_dirty = true;
    }

    // ── Render snapshot ──

    /// Pack every live particle for rendering.
    pub fn pack_instances(&mut self) -> &[ParticleInstance] {
        self.instances.clear();
        let config = &self.config;
        let follow = config.particles_follow_emitter;
        let world = self.world_translation;
        self.instances.extend(
            self.particles
                .iter()
                .filter(|p| p.is_active())
                .map(|p| {
                    let origin = if follow { world } else { p.initial_position };
                    ParticleInstance::from_particle(p, config, origin)
                }),
        );
        &self.instances
    }

    /// Instances from the last `pack_instances` call
    pub fn instances(&self) -> &[ParticleInstance] {
        &self.instances
    }

    /// Instances as raw bytes for upload
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.instances.as_slice())
    }

    // ── Internals ──

    fn split(&mut self) -> (&mut [ParticleData], EmitterContext<'_>) {
        (
            &mut self.particles,
            EmitterContext {
                config: &self.config,
                shape: self.shape.as_deref_mut(),
                influencers: &mut self.influencers,
                rng: &mut self.rng,
                stats: &mut self.stats,
                world_translation: self.world_translation,
            },
        )
    }

    fn find_free_from(&self, start: usize) -> Option<usize> {
        let len = self.particles.len();
        (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&i| !self.particles[i].is_active())
    }

    fn allocate_particles(&mut self) {
        let max = self.config.max_particles;
        let data_size = self.config.particle_data_size;
        self.particles = (0..max).map(|i| ParticleData::new(i, data_size)).collect();
        for (slot, influencer) in self.influencers.iter().enumerate() {
            for particle in &mut self.particles {
                influencer.create_data(particle, slot);
            }
        }
        self.stats = PoolStats {
            active_count: 0,
            next_index: if max > 0 { Some(0) } else { None },
        };
        self.instances.clear();
        self.geometry_dirty = true;
    }

    fn reallocate(&mut self) {
        self.kill_all();
        self.allocate_particles();
        log::debug!(
            "[particles] Reallocated particle pool with {} slot(s)",
            self.particles.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::influencer::{
        AlphaInfluencer, ColorInfluencer, Keyframes, SizeData, SizeInfluencer, StepState,
    };
    use crate::shape::TriangleMesh;

    fn ready(config: EmitterConfig) -> ParticleEmitter {
        let mut emitter = ParticleEmitter::new(config);
        emitter.set_shape(TriangleMesh::point());
        emitter.initialize().unwrap();
        emitter
    }

    fn live_records(emitter: &ParticleEmitter) -> usize {
        emitter.particles().iter().filter(|p| p.is_active()).count()
    }

    #[test]
    fn pool_matches_max_particles() {
        for n in [0, 1, 7, 100] {
            let emitter = ready(EmitterConfig {
                max_particles: n,
                ..Default::default()
            });
            assert_eq!(emitter.particles().len(), n);
            assert!(emitter.particles().iter().all(|p| !p.is_active()));
            assert_eq!(emitter.active_count(), 0);
        }
    }

    #[test]
    fn missing_shape_disables_emitter() {
        let mut emitter = ParticleEmitter::new(EmitterConfig::default());
        let err = emitter.advance(0.016).unwrap_err();
        assert!(matches!(err, SparkError::MissingBinding(_)));
        assert!(!emitter.is_enabled());
        assert!(emitter.advance(0.016).is_ok());
    }

    #[test]
    fn empty_template_is_a_missing_binding() {
        let mut emitter = ParticleEmitter::new(EmitterConfig {
            mesh_type: ParticleMeshType::Template {
                mesh: String::new(),
            },
            ..Default::default()
        });
        emitter.set_shape(TriangleMesh::point());
        assert!(matches!(
            emitter.initialize(),
            Err(SparkError::MissingBinding(_))
        ));
    }

    #[test]
    fn life_stays_within_bounds() {
        let mut emitter = ready(EmitterConfig {
            life_min: 0.5,
            life_max: 1.5,
            ..Default::default()
        });
        for _ in 0..200 {
            emitter.advance(0.016).unwrap();
            for p in emitter.particles().iter().filter(|p| p.is_active()) {
                assert!(p.life >= 0.0 && p.life <= p.start_life);
                assert!(p.start_life >= 0.5 && p.start_life <= 1.5);
            }
        }
        assert!(emitter.active_count() > 0);
    }

    #[test]
    fn equal_life_bounds_use_exact_value() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.set_life(2.0).unwrap();
        emitter.emit_count(5);
        for p in emitter.particles().iter().filter(|p| p.is_active()) {
            assert_eq!(p.start_life, 2.0);
        }
    }

    #[test]
    fn active_count_tracks_records() {
        let mut emitter = ready(EmitterConfig {
            max_particles: 20,
            life_min: 0.1,
            life_max: 0.3,
            ..Default::default()
        });
        emitter.emit_count(5);
        assert_eq!(emitter.active_count(), 5);
        for _ in 0..30 {
            emitter.advance(0.02).unwrap();
            assert_eq!(emitter.active_count(), live_records(&emitter));
        }
        emitter.kill_matching(|p| p.index % 2 == 0);
        assert_eq!(emitter.active_count(), live_records(&emitter));
        emitter.emit_all();
        assert_eq!(emitter.active_count(), 20);
        emitter.kill_all();
        assert_eq!(emitter.active_count(), 0);
        assert_eq!(live_records(&emitter), 0);
    }

    #[test]
    fn killed_slot_is_reused() {
        let mut emitter = ready(EmitterConfig {
            max_particles: 3,
            ..Default::default()
        });
        emitter.emit_all();
        assert_eq!(emitter.next_index(), None);
        emitter.emit_next();
        assert_eq!(emitter.active_count(), 3);

        assert!(emitter.kill(1));
        assert_eq!(emitter.next_index(), Some(1));
        emitter.emit_next();
        assert!(emitter.particles()[1].is_active());
        assert_eq!(emitter.active_count(), 3);
        assert_eq!(emitter.next_index(), None);
    }

    #[test]
    fn hint_moves_to_lowest_freed_slot() {
        let mut emitter = ready(EmitterConfig {
            max_particles: 5,
            ..Default::default()
        });
        emitter.emit_count(3);
        assert_eq!(emitter.next_index(), Some(3));
        emitter.kill(2);
        assert_eq!(emitter.next_index(), Some(2));
        emitter.kill(0);
        assert_eq!(emitter.next_index(), Some(0));
        emitter.kill(1);
        assert_eq!(emitter.next_index(), Some(0));
    }

    #[test]
    fn kill_is_idempotent() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.emit_count(2);
        assert!(emitter.kill(0));
        assert!(!emitter.kill(0));
        assert!(!emitter.kill(10_000));
        assert_eq!(emitter.active_count(), 1);
    }

    #[test]
    fn stall_emits_by_leaky_bucket() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.set_emissions_per_second(10.0).unwrap();
        // primed accumulator: 0.1 + min(1.0, 0.1) = 0.2 → floor(0.2 / 0.1 * 1)
        emitter.advance(1.0).unwrap();
        assert_eq!(emitter.active_count(), 2);
        assert!((emitter.current_interval() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn fresh_accumulator_waits_one_interval() {
        let mut emitter = ready(EmitterConfig {
            emissions_per_second: 10.0,
            particles_per_emission: 3,
            life_min: 10.0,
            life_max: 10.0,
            ..Default::default()
        });
        emitter.advance(1.0).unwrap();
        assert_eq!(emitter.active_count(), 0);
        emitter.advance(1.0).unwrap();
        assert_eq!(emitter.active_count(), 6);
    }

    #[test]
    fn interval_is_consumed_even_while_delayed() {
        let mut emitter = ready(EmitterConfig {
            emitter_delay: 100.0,
            ..Default::default()
        });
        emitter.set_emissions_per_second(10.0).unwrap();
        emitter.advance(1.0).unwrap();
        assert_eq!(emitter.active_count(), 0);
        assert!((emitter.current_interval() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn expired_emitter_stops_spawning() {
        let mut emitter = ready(EmitterConfig {
            emitter_life: 0.5,
            life_min: 5.0,
            life_max: 5.0,
            ..Default::default()
        });
        for _ in 0..30 {
            emitter.advance(0.02).unwrap();
        }
        assert!(!emitter.is_alive());
        let spawned = emitter.active_count();
        assert!(spawned > 0);
        for _ in 0..10 {
            emitter.advance(0.02).unwrap();
        }
        assert_eq!(emitter.active_count(), spawned);

        emitter.set_enabled(true);
        assert!(emitter.is_alive());
    }

    #[test]
    fn disabled_emitter_keeps_particles() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.emit_count(4);
        emitter.set_enabled(false);
        emitter.advance(10.0).unwrap();
        assert_eq!(emitter.active_count(), 4);
    }

    #[test]
    fn alpha_fades_over_life() {
        let mut emitter = ready(EmitterConfig {
            emitter_delay: 1000.0,
            ..Default::default()
        });
        emitter.set_life(2.0).unwrap();
        emitter.add_influencer(AlphaInfluencer::new(Keyframes::from_values([1.0, 0.0])));
        emitter.emit_next();
        assert!((emitter.particles()[0].alpha - 1.0).abs() < 1e-6);

        let mut last = 1.0;
        for _ in 0..19 {
            emitter.advance(0.1).unwrap();
            let alpha = emitter.particles()[0].alpha;
            assert!(alpha < last);
            last = alpha;
        }
        assert!(last < 0.06);

        emitter.advance(0.2).unwrap();
        assert!(!emitter.particles()[0].is_active());
        assert_eq!(emitter.particles()[0].alpha, 0.0);
    }

    #[test]
    fn insert_keeps_existing_slot_data() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.add_influencer(AlphaInfluencer::default());
        emitter.add_influencer(SizeInfluencer {
            random_size: true,
            ..Default::default()
        });
        emitter.emit_next();
        emitter.advance(0.1).unwrap();

        let p = &emitter.particles()[0];
        let alpha_state = *p.slots().get::<StepState>(0).unwrap();
        let size_data = *p.slots().get::<SizeData>(1).unwrap();

        emitter
            .insert_influencer(0, ColorInfluencer::default())
            .unwrap();
        let p = &emitter.particles()[0];
        assert_eq!(p.slots().get::<StepState>(1), Some(&alpha_state));
        assert_eq!(p.slots().get::<SizeData>(2), Some(&size_data));
        assert!(p.slots().has(0));
        assert_eq!(emitter.influencers()[0].name(), "color");

        emitter.remove_influencer(0).unwrap();
        let p = &emitter.particles()[0];
        assert_eq!(p.slots().get::<StepState>(0), Some(&alpha_state));
        assert_eq!(p.slots().get::<SizeData>(1), Some(&size_data));
        assert!(!p.slots().has(2));
    }

    #[test]
    fn reindexing_covers_inactive_records() {
        let mut emitter = ready(EmitterConfig {
            max_particles: 4,
            ..Default::default()
        });
        emitter.add_influencer(SizeInfluencer::default());
        emitter.insert_influencer(0, AlphaInfluencer::default()).unwrap();
        for p in emitter.particles() {
            assert!(p.slots().get::<SizeData>(1).is_some());
            assert!(p.slots().get::<StepState>(0).is_some());
        }
    }

    #[test]
    fn bad_pipeline_positions_are_errors() {
        let mut emitter = ready(EmitterConfig::default());
        assert!(emitter
            .insert_influencer(1, AlphaInfluencer::default())
            .is_err());
        assert!(matches!(
            emitter.remove_influencer(0),
            Err(SparkError::IndexOutOfRange { .. })
        ));
        assert!(emitter.influencer_mut(3).is_err());
    }

    #[test]
    fn rejected_settings_keep_previous_values() {
        let mut emitter = ready(EmitterConfig::default());
        assert!(matches!(
            emitter.set_emissions_per_second(0.05),
            Err(SparkError::ValueOutOfRange { .. })
        ));
        assert_eq!(emitter.config().emissions_per_second, 100.0);
        assert!(emitter.set_sprite_count(0, 2).is_err());
        assert_eq!(emitter.config().sprite_cols, 1);
        assert!(emitter.set_life_range(2.0, 1.0).is_err());
        assert!(emitter
            .update_config(|c| c.emissions_per_second = 0.0)
            .is_err());
        assert_eq!(emitter.config().emissions_per_second, 100.0);
    }

    #[test]
    fn resizing_reallocates_pool() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.emit_count(10);
        emitter.set_max_particles(8);
        assert_eq!(emitter.particles().len(), 8);
        assert_eq!(emitter.active_count(), 0);
        assert_eq!(emitter.next_index(), Some(0));

        emitter.update_config(|c| c.max_particles = 3).unwrap();
        assert_eq!(emitter.particles().len(), 3);
    }

    #[test]
    fn bulk_operations_request_refresh() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.take_geometry_refresh();
        emitter.emit_all();
        assert!(emitter.take_geometry_refresh());
        assert!(!emitter.take_geometry_refresh());
        emitter.kill(0);
        assert!(emitter.take_geometry_refresh());
    }

    #[test]
    fn edge_emission_offsets_by_half_size() {
        let mut emitter = ParticleEmitter::new(EmitterConfig {
            emission_point: EmissionPoint::EdgeBottom,
            direction_type: DirectionType::Normal,
            sequential_emission_face: true,
            ..Default::default()
        });
        emitter.set_shape(TriangleMesh::quad(2.0, 2.0));
        emitter.initialize().unwrap();
        emitter.emit_next();

        let p = &emitter.particles()[0];
        let shape = emitter.shape().unwrap();
        assert_eq!(shape.subsurface_count(), 2);
        // first edge of the first triangle runs from (-1, 0, -1) to (-1, 0, 1)
        assert!((p.position.y - 0.5).abs() < 1e-6);
        assert!((p.position.x + 1.0).abs() < 1e-6);
    }

    #[test]
    fn static_particles_track_shape_without_aging() {
        let mut emitter = ParticleEmitter::new(EmitterConfig {
            static_particles: true,
            sequential_emission_face: true,
            emitter_delay: 1000.0,
            ..Default::default()
        });
        emitter.set_shape(TriangleMesh::quad(2.0, 2.0));
        emitter.initialize().unwrap();
        emitter.emit_count(2);

        let start = emitter.particles()[1].position;
        for _ in 0..10 {
            emitter.advance(0.5).unwrap();
        }
        let p = &emitter.particles()[1];
        assert!(p.is_active());
        assert_eq!(p.life, p.start_life);
        assert_eq!(p.triangle_index, 1);
        assert_eq!(p.position, start);
    }

    #[test]
    fn static_particles_follow_moved_shape() {
        let mut bare = ParticleEmitter::new(EmitterConfig::default());
        assert!(matches!(
            bare.set_shape_positions(Vec::new()),
            Err(SparkError::MissingBinding(_))
        ));

        for jitter in [false, true] {
            let mut emitter = ParticleEmitter::new(EmitterConfig {
                static_particles: true,
                sequential_emission_face: true,
                random_emission_point: jitter,
                emitter_delay: 1000.0,
                ..Default::default()
            });
            let quad = TriangleMesh::quad(2.0, 2.0);
            let offset = Vec3::new(0.5, 2.0, -1.0);
            let moved: Vec<Vec3> = quad.positions().iter().map(|&p| p + offset).collect();
            emitter.set_shape(quad);
            emitter.initialize().unwrap();
            emitter.emit_count(2);
            let before: Vec<Vec3> = emitter.particles()[..2]
                .iter()
                .map(|p| p.position)
                .collect();

            emitter.set_shape_positions(moved).unwrap();
            assert_eq!(emitter.active_count(), 2);
            assert!(emitter.take_geometry_refresh());
            emitter.advance(0.016).unwrap();

            for (p, start) in emitter.particles()[..2].iter().zip(&before) {
                assert!(p.is_active());
                assert!((p.position - *start - offset).length() < 1e-5);
            }
            assert_eq!(emitter.shape_mut().map(|s| s.subsurface_count()), Some(2));
        }
    }

    #[test]
    fn reset_primes_interval_and_clock() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.emit_count(3);
        emitter.advance(0.004).unwrap();
        emitter.reset();
        assert_eq!(emitter.active_count(), 0);
        assert_eq!(emitter.emitted_time(), 0.0);
        assert!((emitter.current_interval() - emitter.target_interval()).abs() < 1e-9);
    }

    #[test]
    fn pack_only_live_particles() {
        let mut emitter = ready(EmitterConfig::default());
        emitter.emit_count(6);
        emitter.kill(2);
        assert_eq!(emitter.pack_instances().len(), 5);
        assert_eq!(
            emitter.instance_bytes().len(),
            5 * std::mem::size_of::<ParticleInstance>()
        );
    }

    #[test]
    fn same_seed_same_simulation() {
        let run = || {
            let mut emitter = ready(EmitterConfig {
                life_min: 0.2,
                life_max: 0.8,
                ..Default::default()
            });
            emitter.add_influencer(SizeInfluencer::default());
            for _ in 0..50 {
                emitter.advance(0.016).unwrap();
            }
            emitter
                .particles()
                .iter()
                .map(|p| (p.is_active(), p.position, p.size))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
