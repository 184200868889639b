//! Multi-emitter host: owns emitters, steps them each frame and packs their
//! live particles for the renderer

use crate::emitter::{BillboardMode, ParticleEmitter, ParticleMeshType};
use crate::loader::EmitterDefinition;
use crate::particle::ParticleInstance;
use spark_core::{ContentHash, EmitterId, Result, SparkError};
use spark_runtime::RuntimeSystem;
use std::collections::BTreeMap;

/// Draw data for one emitter, consumed by the renderer
pub struct ParticleDrawData<'a> {
    pub emitter_id: EmitterId,
    pub instances: &'a [ParticleInstance],
    pub mesh_type: &'a ParticleMeshType,
    pub billboard_mode: BillboardMode,
    pub material: Option<&'a str>,
    pub sprite_cols: u32,
    pub sprite_rows: u32,
    /// Bounds or geometry changed in bulk since the last pack
    pub refresh_geometry: bool,
}

struct ManagedEmitter {
    emitter: ParticleEmitter,
    /// Hash of the definition this emitter was last built from
    definition_hash: Option<ContentHash>,
}

struct InstanceRange {
    emitter_id: EmitterId,
    start: usize,
    count: usize,
    refresh_geometry: bool,
}

/// The particle system. Implements [`RuntimeSystem`] for the frame loop.
pub struct ParticleSystem {
    emitters: BTreeMap<EmitterId, ManagedEmitter>,
    next_id: EmitterId,
    /// Pre-allocated instance buffer for packing live particles
    instance_buffer: Vec<ParticleInstance>,
    instance_ranges: Vec<InstanceRange>,
    /// Emitters that failed during the last frame-loop update
    last_failures: Vec<(EmitterId, SparkError)>,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self {
            emitters: BTreeMap::new(),
            next_id: EmitterId::from_raw(1),
            instance_buffer: Vec::new(),
            instance_ranges: Vec::new(),
            last_failures: Vec::new(),
        }
    }

    /// Take ownership of an emitter
    pub fn add_emitter(&mut self, emitter: ParticleEmitter) -> EmitterId {
        self.insert(emitter, None)
    }

    /// Build an emitter from a definition and take ownership of it
    pub fn spawn_from_definition(&mut self, definition: &EmitterDefinition) -> Result<EmitterId> {
        let hash = definition.content_hash()?;
        let emitter = ParticleEmitter::from_definition(definition)?;
        Ok(self.insert(emitter, Some(hash)))
    }

    /// Rebuild emitter `id` from `definition`, keeping its world position.
    /// Returns `false` without touching the emitter when the definition is
    /// unchanged since it was last applied.
    pub fn apply_definition(&mut self, id: EmitterId, definition: &EmitterDefinition) -> Result<bool> {
        let hash = definition.content_hash()?;
        let managed = self
            .emitters
            .get_mut(&id)
            .ok_or_else(|| SparkError::EmitterNotFound(id.to_string()))?;
        if managed.definition_hash == Some(hash) {
            return Ok(false);
        }

        let mut emitter = ParticleEmitter::from_definition(definition)?;
        emitter.set_world_translation(managed.emitter.world_translation());
        managed.emitter = emitter;
        managed.definition_hash = Some(hash);
        log::info!("[particles] Applied definition {hash} to emitter {id}");
        Ok(true)
    }

    pub fn remove(&mut self, id: EmitterId) -> Option<ParticleEmitter> {
        self.emitters.remove(&id).map(|m| m.emitter)
    }

    pub fn get(&self, id: EmitterId) -> Option<&ParticleEmitter> {
        self.emitters.get(&id).map(|m| &m.emitter)
    }

    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut ParticleEmitter> {
        self.emitters.get_mut(&id).map(|m| &mut m.emitter)
    }

    pub fn emitter_mut(&mut self, id: EmitterId) -> Result<&mut ParticleEmitter> {
        self.get_mut(id)
            .ok_or_else(|| SparkError::EmitterNotFound(id.to_string()))
    }

    /// Clear all emitters and instance buffers
    pub fn clear(&mut self) {
        self.emitters.clear();
        self.instance_buffer.clear();
        self.instance_ranges.clear();
        self.last_failures.clear();
    }

    /// Advance every emitter. An emitter that fails to initialize disables
    /// itself and is reported here; the others still run.
    pub fn update(&mut self, dt: f32) -> Vec<(EmitterId, SparkError)> {
        let mut failures = Vec::new();
        for (&id, managed) in &mut self.emitters {
            if let Err(err) = managed.emitter.advance(dt) {
                failures.push((id, err));
            }
        }
        failures
    }

    /// Pack live particles into the instance buffer. Call after `update()`.
    pub fn pack_instances(&mut self) {
        self.instance_buffer.clear();
        self.instance_ranges.clear();

        for (&emitter_id, managed) in &mut self.emitters {
            let refresh_geometry = managed.emitter.take_geometry_refresh();
            let instances = managed.emitter.pack_instances();
            if instances.is_empty() && !refresh_geometry {
                continue;
            }
            let start = self.instance_buffer.len();
            self.instance_buffer.extend_from_slice(instances);
            self.instance_ranges.push(InstanceRange {
                emitter_id,
                start,
                count: instances.len(),
                refresh_geometry,
            });
        }
    }

    /// Failures reported by the most recent `RuntimeSystem::update`
    pub fn last_failures(&self) -> &[(EmitterId, SparkError)] {
        &self.last_failures
    }

    /// Get the packed instance data
    pub fn instance_data(&self) -> &[ParticleInstance] {
        &self.instance_buffer
    }

    /// Draw data for each emitter packed by the last `pack_instances`
    pub fn draw_data(&self) -> Vec<ParticleDrawData<'_>> {
        self.instance_ranges
            .iter()
            .filter_map(|range| {
                let config = self.emitters.get(&range.emitter_id)?.emitter.config();
                Some(ParticleDrawData {
                    emitter_id: range.emitter_id,
                    instances: &self.instance_buffer[range.start..range.start + range.count],
                    mesh_type: &config.mesh_type,
                    billboard_mode: config.billboard_mode,
                    material: config.material.as_deref(),
                    sprite_cols: config.sprite_cols,
                    sprite_rows: config.sprite_rows,
                    refresh_geometry: range.refresh_geometry,
                })
            })
            .collect()
    }

    /// Number of owned emitters
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Total live particles across all emitters
    pub fn total_alive(&self) -> usize {
        self.emitters.values().map(|m| m.emitter.active_count()).sum()
    }

    fn insert(&mut self, emitter: ParticleEmitter, definition_hash: Option<ContentHash>) -> EmitterId {
        let id = self.next_id;
        self.next_id = id.next();
        self.emitters.insert(
            id,
            ManagedEmitter {
                emitter,
                definition_hash,
            },
        );
        id
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeSystem for ParticleSystem {
    fn initialize(&mut self) -> Result<()> {
        let count = self.emitter_count();
        if count > 0 {
            log::info!("[particles] Managing {count} emitter(s)");
        }
        Ok(())
    }

    fn update(&mut self, dt: f64) -> Result<()> {
        // failed emitters are already disabled; keep them for the host
        self.last_failures = ParticleSystem::update(self, dt as f32);
        for (id, err) in &self.last_failures {
            log::warn!("[particles] Emitter {id} skipped this frame: {err}");
        }
        self.pack_instances();
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "particles"
    }
}
