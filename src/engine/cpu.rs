//! CPU reference particle engine.
//!
//! Implements [`ParticleEngine`] against an [`EffectResource`] with fixed
//! capacity pools, the same shape as the engine the viewer was built around:
//! one resource, a pool of emitter set instances, a pool of emitters and a
//! pool of particles.
//!
//! Particles are double buffered. After [`swap_buffers`](ParticleEngine::swap_buffers)
//! the previous frame's particles are read from one buffer while the updated
//! particles are written to the other, which is also the one rendered.

use glam::{Affine3A, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::resource::{EffectResource, EmitterDef};
use super::{
    DrawList, EmitterInstanceId, EmitterSetHandle, ParticleEngine, RenderParams, SpriteInstance,
};
use crate::error::EngineError;
use crate::render_target::NativeTexture;

fn default_emitter_set_num() -> u32 {
    128
}

fn default_emitter_num() -> u32 {
    256
}

fn default_particle_num() -> u32 {
    2048
}

fn default_seed() -> u64 {
    0x5eed
}

/// Pool sizes for the engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_emitter_set_num")]
    pub emitter_set_num: u32,
    #[serde(default = "default_emitter_num")]
    pub emitter_num: u32,
    #[serde(default = "default_particle_num")]
    pub particle_num: u32,
    /// Seed for particle velocity spread.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            emitter_set_num: default_emitter_set_num(),
            emitter_num: default_emitter_num(),
            particle_num: default_particle_num(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    emitter: EmitterInstanceId,
    position: Vec3,
    velocity: Vec3,
    gravity: Vec3,
    size: f32,
    age: u32,
    life: u32,
}

#[derive(Debug)]
struct EmitterState {
    owner: u32,
    def: EmitterDef,
    frame: u32,
    carry: f32,
    emitting: bool,
    live_particles: u32,
}

#[derive(Debug)]
struct SetInstance {
    emitter_set: u32,
    transform: Affine3A,
    emitters: Vec<EmitterInstanceId>,
    finished: bool,
}

#[derive(Debug, Default)]
struct SetSlot {
    generation: u32,
    instance: Option<SetInstance>,
}

/// Particle engine simulating on the CPU.
pub struct CpuParticleEngine {
    config: EngineConfig,
    resource: Option<EffectResource>,
    sets: Vec<SetSlot>,
    emitters: Vec<Option<EmitterState>>,
    buffers: [Vec<Particle>; 2],
    current: usize,
    spawned: Vec<Particle>,
    rng: StdRng,
    frame: u64,
    draw: DrawList,
    rendering: bool,
    frame_buffer_texture: Option<NativeTexture>,
    depth_texture: Option<NativeTexture>,
}

impl CpuParticleEngine {
    pub fn new(config: EngineConfig) -> Self {
        let sets = (0..config.emitter_set_num).map(|_| SetSlot::default()).collect();
        let emitters = (0..config.emitter_num).map(|_| None).collect();
        let particle_num = config.particle_num as usize;
        let rng = StdRng::seed_from_u64(config.seed);

        Self {
            config,
            resource: None,
            sets,
            emitters,
            buffers: [Vec::with_capacity(particle_num), Vec::with_capacity(particle_num)],
            current: 0,
            spawned: Vec::new(),
            rng,
            frame: 0,
            draw: DrawList::default(),
            rendering: false,
            frame_buffer_texture: None,
            depth_texture: None,
        }
    }

    /// Register the resource instances are created from, replacing any
    /// previous one.
    pub fn entry_resource(&mut self, resource: EffectResource) {
        self.clear_resource();
        log::info!("effect resource registered: {} emitter sets", resource.len());
        self.resource = Some(resource);
    }

    pub fn resource(&self) -> Option<&EffectResource> {
        self.resource.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Particles in the current (rendered) buffer.
    pub fn particle_count(&self) -> usize {
        self.buffers[self.current].len()
    }

    /// Frames begun so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn frame_buffer_texture(&self) -> Option<NativeTexture> {
        self.frame_buffer_texture
    }

    pub fn depth_texture(&self) -> Option<NativeTexture> {
        self.depth_texture
    }

    fn instance(&self, handle: EmitterSetHandle) -> Option<&SetInstance> {
        let slot = self.sets.get(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.instance.as_ref()
    }

    fn instance_mut(&mut self, handle: EmitterSetHandle) -> Option<&mut SetInstance> {
        let slot = self.sets.get_mut(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.instance.as_mut()
    }

    fn release_emitters(&mut self, ids: &[EmitterInstanceId]) {
        for id in ids {
            if let Some(slot) = self.emitters.get_mut(id.0 as usize) {
                *slot = None;
            }
        }
        let owned = |p: &Particle| !ids.contains(&p.emitter);
        self.buffers[0].retain(owned);
        self.buffers[1].retain(owned);
        self.spawned.retain(owned);
    }

    fn particle_room(&self) -> usize {
        let used = self.buffers[self.current ^ 1].len() + self.spawned.len();
        (self.config.particle_num as usize).saturating_sub(used)
    }

    fn spread(&mut self, amount: f32) -> Vec3 {
        if !amount.is_finite() || amount <= 0.0 {
            return Vec3::ZERO;
        }
        Vec3::new(
            self.rng.gen_range(-amount..=amount),
            self.rng.gen_range(-amount..=amount),
            self.rng.gen_range(-amount..=amount),
        )
    }
}

impl ParticleEngine for CpuParticleEngine {
    fn begin_frame(&mut self) {
        self.frame += 1;
        self.spawned.clear();
    }

    fn swap_buffers(&mut self) {
        self.current ^= 1;
        self.buffers[self.current].clear();
    }

    fn calc_emitters(&mut self) {
        for index in 0..self.emitters.len() {
            let (owner, count) = match self.emitters[index].as_mut() {
                Some(state) if state.emitting => {
                    state.carry += state.def.rate.max(0.0);
                    let count = state.carry.floor();
                    state.carry -= count;
                    state.frame += 1;
                    if state.def.emit_frames > 0 && state.frame >= state.def.emit_frames {
                        state.emitting = false;
                    }
                    (state.owner, count as usize)
                }
                _ => continue,
            };

            let transform = match self.sets[owner as usize].instance.as_ref() {
                Some(instance) => instance.transform,
                None => continue,
            };
            let scale = transform.matrix3.x_axis.length();

            let count = count.min(self.particle_room());
            for _ in 0..count {
                let Some(state) = self.emitters[index].as_ref() else {
                    break;
                };
                let def = &state.def;
                let offset = Vec3::from_array(def.offset);
                let velocity = Vec3::from_array(def.velocity);
                let gravity = Vec3::from_array(def.gravity);
                let (size, spread, life) = (def.size, def.spread, def.particle_life.max(1));
                let jitter = self.spread(spread);
                self.spawned.push(Particle {
                    emitter: EmitterInstanceId(index as u32),
                    position: transform.transform_point3(offset),
                    velocity: transform.transform_vector3(velocity + jitter),
                    gravity: transform.transform_vector3(gravity),
                    size: size * scale,
                    age: 0,
                    life,
                });
            }
        }
    }

    fn calc_particles(&mut self, _flush_cache: bool) {
        for state in self.emitters.iter_mut().flatten() {
            state.live_particles = 0;
        }

        let previous = std::mem::take(&mut self.buffers[self.current ^ 1]);
        let spawned = std::mem::take(&mut self.spawned);

        for particle in previous.iter().chain(spawned.iter()) {
            let Some(state) = self
                .emitters
                .get_mut(particle.emitter.0 as usize)
                .and_then(Option::as_mut)
            else {
                continue;
            };
            let mut p = *particle;
            p.velocity += p.gravity;
            p.position += p.velocity;
            p.age += 1;
            if p.age < p.life {
                state.live_particles += 1;
                self.buffers[self.current].push(p);
            }
        }

        self.buffers[self.current ^ 1] = previous;
        self.spawned = spawned;
        self.spawned.clear();
    }

    fn calc_all(&mut self, _flush_cache: bool) {
        let mut finished = Vec::new();
        for (slot_index, slot) in self.sets.iter_mut().enumerate() {
            let Some(instance) = slot.instance.as_mut() else { continue };
            if instance.finished {
                continue;
            }
            let active = instance.emitters.iter().any(|id| {
                self.emitters[id.0 as usize]
                    .as_ref()
                    .is_some_and(|e| e.emitting || e.live_particles > 0)
            });
            if !active {
                instance.finished = true;
                finished.push((slot_index, std::mem::take(&mut instance.emitters)));
            }
        }
        for (slot_index, emitters) in finished {
            log::trace!("emitter set instance in slot {} finished", slot_index);
            self.release_emitters(&emitters);
        }
    }

    fn set_frame_buffer_texture(&mut self, texture: NativeTexture) {
        self.frame_buffer_texture = Some(texture);
    }

    fn set_depth_texture(&mut self, texture: NativeTexture) {
        self.depth_texture = Some(texture);
    }

    fn begin_render(&mut self, params: &RenderParams) {
        self.draw.sprites.clear();
        self.draw.view_proj = params.view_proj();
        self.rendering = true;
    }

    fn render_emitter(&mut self, emitter: EmitterInstanceId, _flush_cache: bool) {
        if !self.rendering {
            return;
        }
        let Some(state) = self.emitters.get(emitter.0 as usize).and_then(Option::as_ref) else {
            return;
        };
        let start = Vec4::from_array(state.def.color_start);
        let end = Vec4::from_array(state.def.color_end);

        let sprites = self.buffers[self.current]
            .iter()
            .filter(|p| p.emitter == emitter)
            .map(|p| {
                let t = p.age as f32 / p.life as f32;
                SpriteInstance {
                    position: p.position.to_array(),
                    size: p.size,
                    color: start.lerp(end, t).to_array(),
                }
            });
        self.draw.sprites.extend(sprites);
    }

    fn end_render(&mut self) -> DrawList {
        self.rendering = false;
        std::mem::take(&mut self.draw)
    }

    fn live_emitters(&self) -> Vec<EmitterInstanceId> {
        self.emitters
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(i, _)| EmitterInstanceId(i as u32))
            .collect()
    }

    fn check_instance(
        &self,
        emitter_set: u32,
        releasing: Option<EmitterSetHandle>,
    ) -> Result<(), EngineError> {
        let resource = self.resource.as_ref().ok_or(EngineError::NoResource)?;
        let def = resource
            .emitter_set(emitter_set)
            .ok_or(EngineError::UnknownEmitterSet(emitter_set))?;

        let released = releasing.and_then(|h| self.instance(h));
        let free_sets = self.sets.iter().filter(|s| s.instance.is_none()).count()
            + usize::from(released.is_some());
        if free_sets == 0 {
            return Err(EngineError::Exhausted {
                pool: "emitter set",
                capacity: self.config.emitter_set_num,
            });
        }

        // Finished instances have already returned their emitters.
        let free_emitters = self.emitters.iter().filter(|e| e.is_none()).count()
            + released.map_or(0, |i| i.emitters.len());
        if free_emitters < def.emitters.len() {
            return Err(EngineError::Exhausted {
                pool: "emitter",
                capacity: self.config.emitter_num,
            });
        }
        Ok(())
    }

    fn create_instance(
        &mut self,
        emitter_set: u32,
        transform: Affine3A,
    ) -> Result<EmitterSetHandle, EngineError> {
        let resource = self.resource.as_ref().ok_or(EngineError::NoResource)?;
        let def = resource
            .emitter_set(emitter_set)
            .ok_or(EngineError::UnknownEmitterSet(emitter_set))?;

        let slot_index = self
            .sets
            .iter()
            .position(|s| s.instance.is_none())
            .ok_or(EngineError::Exhausted {
                pool: "emitter set",
                capacity: self.config.emitter_set_num,
            })?;

        let free: Vec<usize> = self
            .emitters
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_none())
            .map(|(i, _)| i)
            .take(def.emitters.len())
            .collect();
        if free.len() < def.emitters.len() {
            return Err(EngineError::Exhausted {
                pool: "emitter",
                capacity: self.config.emitter_num,
            });
        }

        let mut ids = Vec::with_capacity(free.len());
        for (index, emitter_def) in free.into_iter().zip(def.emitters.iter()) {
            self.emitters[index] = Some(EmitterState {
                owner: slot_index as u32,
                def: emitter_def.clone(),
                frame: 0,
                carry: 0.0,
                emitting: true,
                live_particles: 0,
            });
            ids.push(EmitterInstanceId(index as u32));
        }

        let slot = &mut self.sets[slot_index];
        slot.instance = Some(SetInstance {
            emitter_set,
            transform,
            emitters: ids,
            finished: false,
        });

        Ok(EmitterSetHandle {
            slot: slot_index as u32,
            generation: slot.generation,
        })
    }

    fn set_transform(&mut self, handle: EmitterSetHandle, transform: Affine3A) {
        if let Some(instance) = self.instance_mut(handle) {
            instance.transform = transform;
        }
    }

    fn kill(&mut self, handle: EmitterSetHandle) {
        let Some(slot) = self.sets.get_mut(handle.slot as usize) else { return };
        if slot.generation != handle.generation {
            return;
        }
        let Some(instance) = slot.instance.take() else { return };
        slot.generation = slot.generation.wrapping_add(1);
        log::trace!("killed emitter set {} in slot {}", instance.emitter_set, handle.slot);
        self.release_emitters(&instance.emitters);
    }

    fn fade(&mut self, handle: EmitterSetHandle) {
        let Some(ids) = self.instance(handle).map(|i| i.emitters.clone()) else { return };
        for id in ids {
            if let Some(state) = self.emitters[id.0 as usize].as_mut() {
                state.emitting = false;
            }
        }
    }

    fn is_alive(&self, handle: EmitterSetHandle) -> bool {
        self.instance(handle).is_some_and(|i| !i.finished)
    }

    /// Instances occupying a slot, finished or not.
    fn live_instance_count(&self) -> u32 {
        self.sets.iter().filter(|s| s.instance.is_some()).count() as u32
    }

    fn instance_capacity(&self) -> u32 {
        self.config.emitter_set_num
    }

    fn emitter_set_count(&self) -> u32 {
        self.resource.as_ref().map_or(0, EffectResource::len)
    }

    fn emitter_set_name(&self, emitter_set: u32) -> Option<&str> {
        self.resource
            .as_ref()?
            .emitter_set(emitter_set)
            .map(|s| s.name.as_str())
    }

    fn emitter_count(&self, emitter_set: u32) -> u32 {
        self.resource
            .as_ref()
            .and_then(|r| r.emitter_set(emitter_set))
            .map_or(0, |s| s.emitters.len() as u32)
    }

    fn emitter_name(&self, emitter_set: u32, emitter: u32) -> Option<&str> {
        self.resource
            .as_ref()?
            .emitter_set(emitter_set)?
            .emitters
            .get(emitter as usize)
            .map(|e| e.name.as_str())
    }

    fn clear_resource(&mut self) {
        for slot in &mut self.sets {
            if slot.instance.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        for emitter in &mut self.emitters {
            *emitter = None;
        }
        self.buffers[0].clear();
        self.buffers[1].clear();
        self.spawned.clear();
        self.draw.sprites.clear();
        self.resource = None;
    }
}
