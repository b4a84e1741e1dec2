//! Seam to the particle engine.
//!
//! The viewer never simulates particles itself. It drives an engine through
//! [`ParticleEngine`], which mirrors the engine's own calling convention:
//! frame lifecycle, instance lifecycle, rendering and resource introspection.
//! Implementations hold no viewer logic, which keeps the controller testable
//! against a scripted fake.
//!
//! [`cpu::CpuParticleEngine`] is the bundled implementation used by the
//! editor binary.

pub mod cpu;
pub mod resource;

use bytemuck::{Pod, Zeroable};
use glam::{Affine3A, Mat4, Vec3};

use crate::error::EngineError;
use crate::render_target::NativeTexture;

pub use cpu::{CpuParticleEngine, EngineConfig};
pub use resource::{EffectResource, EmitterDef, EmitterSetDef};

/// Reference to one live instantiation of an emitter set.
///
/// The generation distinguishes reuses of the same slot, so a handle to a
/// killed instance never aliases a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterSetHandle {
    pub slot: u32,
    pub generation: u32,
}

/// Reference to one live emitter belonging to an emitter set instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterInstanceId(pub u32);

/// Camera parameters passed to [`ParticleEngine::begin_render`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub projection: Mat4,
    pub view: Mat4,
    pub camera_position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl RenderParams {
    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// One camera-facing quad emitted by the engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
}

/// Geometry produced by one render pass of the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub view_proj: Mat4,
    pub sprites: Vec<SpriteInstance>,
}

impl DrawList {
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// Operations the viewer consumes from a particle engine.
pub trait ParticleEngine {
    // Frame lifecycle
    fn begin_frame(&mut self);
    fn swap_buffers(&mut self);
    fn calc_emitters(&mut self);
    fn calc_particles(&mut self, flush_cache: bool);
    /// Full calc pass; retires instances that have finished.
    fn calc_all(&mut self, flush_cache: bool);

    // Rendering
    fn set_frame_buffer_texture(&mut self, texture: NativeTexture);
    fn set_depth_texture(&mut self, texture: NativeTexture);
    fn begin_render(&mut self, params: &RenderParams);
    fn render_emitter(&mut self, emitter: EmitterInstanceId, flush_cache: bool);
    fn end_render(&mut self) -> DrawList;
    /// Live emitters in draw order.
    fn live_emitters(&self) -> Vec<EmitterInstanceId>;

    // Instance lifecycle
    fn create_instance(
        &mut self,
        emitter_set: u32,
        transform: Affine3A,
    ) -> Result<EmitterSetHandle, EngineError>;
    /// Whether `create_instance(emitter_set, ..)` would succeed once
    /// `releasing` has been killed. Checks every pool the instance needs.
    fn check_instance(
        &self,
        emitter_set: u32,
        releasing: Option<EmitterSetHandle>,
    ) -> Result<(), EngineError>;
    fn set_transform(&mut self, handle: EmitterSetHandle, transform: Affine3A);
    fn kill(&mut self, handle: EmitterSetHandle);
    fn fade(&mut self, handle: EmitterSetHandle);
    fn is_alive(&self, handle: EmitterSetHandle) -> bool;
    fn live_instance_count(&self) -> u32;
    fn instance_capacity(&self) -> u32;

    // Resource introspection
    fn emitter_set_count(&self) -> u32;
    fn emitter_set_name(&self, emitter_set: u32) -> Option<&str>;
    fn emitter_count(&self, emitter_set: u32) -> u32;
    fn emitter_name(&self, emitter_set: u32, emitter: u32) -> Option<&str>;
    /// Release the resource table and every instance created from it.
    fn clear_resource(&mut self);
}
