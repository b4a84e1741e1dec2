//! Scripted fakes shared by the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use glam::{Affine3A, Mat4, Vec2};
use ptcl_editor::{
    AllocationError, DebugSphere, DrawList, EmitterInstanceId, EmitterSetHandle, EngineError,
    NativeTexture, PanelReport, ParticleEngine, PixelRect, RenderBackend, RenderParams, RenderState,
    SpriteInstance, Swizzle, UiFrontend, Viewport,
};

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GfxCall {
    CreateColor(u32, u32),
    CreateDepth(u32, u32),
    Bind { color: u64, depth: u64 },
    Viewport(PixelRect),
    Scissor(PixelRect),
    Swizzle(u64, Swizzle),
    Clear(Option<[f32; 4]>, bool),
    ClearDepth(u64),
    Invalidate(u64),
    RestoreWindow,
    State(RenderState),
    Sphere,
    Sprites(usize),
}

pub struct FakeTexture {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    live: Rc<Cell<i64>>,
}

impl Drop for FakeTexture {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub calls: Vec<GfxCall>,
    pub fail_color: bool,
    pub fail_depth: bool,
    next_id: u64,
    live: Rc<Cell<i64>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared counter of textures currently allocated.
    pub fn live_textures(&self) -> Rc<Cell<i64>> {
        Rc::clone(&self.live)
    }

    fn texture(&mut self, width: u32, height: u32) -> FakeTexture {
        self.next_id += 1;
        self.live.set(self.live.get() + 1);
        FakeTexture {
            id: self.next_id,
            width,
            height,
            live: Rc::clone(&self.live),
        }
    }

    /// Calls recorded after the last bind.
    pub fn calls_since_bind(&self) -> &[GfxCall] {
        let start = self
            .calls
            .iter()
            .rposition(|c| matches!(c, GfxCall::Bind { .. }))
            .unwrap_or(0);
        &self.calls[start..]
    }

    pub fn count(&self, pred: impl Fn(&GfxCall) -> bool) -> usize {
        self.calls.iter().filter(|&c| pred(c)).count()
    }
}

impl RenderBackend for FakeBackend {
    type Texture = FakeTexture;

    fn create_color_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<FakeTexture, AllocationError> {
        self.calls.push(GfxCall::CreateColor(width, height));
        if self.fail_color {
            return Err(AllocationError::OutOfMemory {
                what: "viewport color",
                width,
                height,
                reason: "scripted".into(),
            });
        }
        Ok(self.texture(width, height))
    }

    fn create_depth_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<FakeTexture, AllocationError> {
        self.calls.push(GfxCall::CreateDepth(width, height));
        if self.fail_depth {
            return Err(AllocationError::OutOfMemory {
                what: "viewport depth",
                width,
                height,
                reason: "scripted".into(),
            });
        }
        Ok(self.texture(width, height))
    }

    fn native_handle(&self, texture: &FakeTexture) -> NativeTexture {
        NativeTexture(texture.id)
    }

    fn bind_targets(&mut self, color: &FakeTexture, depth: &FakeTexture) {
        self.calls.push(GfxCall::Bind {
            color: color.id,
            depth: depth.id,
        });
    }

    fn set_viewport(&mut self, rect: PixelRect) {
        self.calls.push(GfxCall::Viewport(rect));
    }

    fn set_scissor(&mut self, rect: PixelRect) {
        self.calls.push(GfxCall::Scissor(rect));
    }

    fn set_swizzle(&mut self, color: &FakeTexture, swizzle: Swizzle) {
        self.calls.push(GfxCall::Swizzle(color.id, swizzle));
    }

    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool) {
        self.calls.push(GfxCall::Clear(color, depth));
    }

    fn clear_depth_texture(&mut self, depth: &FakeTexture) {
        self.calls.push(GfxCall::ClearDepth(depth.id));
    }

    fn invalidate_color(&mut self, color: &FakeTexture) {
        self.calls.push(GfxCall::Invalidate(color.id));
    }

    fn restore_window_target(&mut self) {
        self.calls.push(GfxCall::RestoreWindow);
    }

    fn apply_render_state(&mut self, state: RenderState) {
        self.calls.push(GfxCall::State(state));
    }

    fn draw_sphere(&mut self, _view_proj: Mat4, _sphere: &DebugSphere) {
        self.calls.push(GfxCall::Sphere);
    }

    fn draw_sprites(&mut self, list: &DrawList) {
        self.calls.push(GfxCall::Sprites(list.sprites.len()));
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    BeginFrame,
    SwapBuffers,
    CalcEmitters,
    CalcParticles(bool),
    CalcAll(bool),
    SetFrameBuffer(NativeTexture),
    SetDepth(NativeTexture),
    BeginRender,
    RenderEmitter(EmitterInstanceId),
    EndRender,
    Create(u32),
    SetTransform(Affine3A),
    Kill(EmitterSetHandle),
    Fade(EmitterSetHandle),
    ClearResource,
}

#[derive(Debug, Clone, Copy)]
struct Instance {
    emitter_set: u32,
    alive: bool,
    ticks_left: Option<u32>,
}

/// Engine whose instances live for a scripted number of `calc_all` calls.
pub struct FakeEngine {
    pub calls: Vec<EngineCall>,
    pub names: Vec<String>,
    /// `calc_all` calls an instance survives. `None` lives until killed.
    pub lifetime: Option<u32>,
    /// Error returned by the next `create_instance`.
    pub fail_create: Option<EngineError>,
    /// Error returned by every `check_instance` while set.
    pub reject_instance: Option<EngineError>,
    /// Slots held by instances the controller does not own.
    pub foreign_instances: u32,
    capacity: u32,
    slots: Vec<(u32, Option<Instance>)>,
    rendering: Vec<EmitterInstanceId>,
}

impl FakeEngine {
    pub fn new(emitter_sets: u32) -> Self {
        Self::with_capacity(emitter_sets, 4)
    }

    pub fn with_capacity(emitter_sets: u32, capacity: u32) -> Self {
        Self {
            calls: Vec::new(),
            names: (0..emitter_sets).map(|i| format!("Set{}", i)).collect(),
            lifetime: None,
            fail_create: None,
            reject_instance: None,
            foreign_instances: 0,
            capacity,
            slots: (0..capacity).map(|_| (0, None)).collect(),
            rendering: Vec::new(),
        }
    }

    pub fn creates(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Create(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn kills(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, EngineCall::Kill(_))).count()
    }

    /// Instances the engine still simulates.
    pub fn alive_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|(_, i)| i.is_some_and(|i| i.alive))
            .count()
    }

    /// Report every instance as finished.
    pub fn finish_all(&mut self) {
        for (_, slot) in &mut self.slots {
            if let Some(instance) = slot {
                instance.alive = false;
            }
        }
    }

    /// Emitter set ids of the occupied slots.
    pub fn instances(&self) -> Vec<u32> {
        self.slots
            .iter()
            .filter_map(|(_, i)| i.map(|i| i.emitter_set))
            .collect()
    }

    fn lookup(&self, handle: EmitterSetHandle) -> Option<&Instance> {
        let (generation, slot) = self.slots.get(handle.slot as usize)?;
        if *generation != handle.generation {
            return None;
        }
        slot.as_ref()
    }
}

impl ParticleEngine for FakeEngine {
    fn begin_frame(&mut self) {
        self.calls.push(EngineCall::BeginFrame);
    }

    fn swap_buffers(&mut self) {
        self.calls.push(EngineCall::SwapBuffers);
    }

    fn calc_emitters(&mut self) {
        self.calls.push(EngineCall::CalcEmitters);
    }

    fn calc_particles(&mut self, flush_cache: bool) {
        self.calls.push(EngineCall::CalcParticles(flush_cache));
    }

    fn calc_all(&mut self, flush_cache: bool) {
        self.calls.push(EngineCall::CalcAll(flush_cache));
        for (_, slot) in &mut self.slots {
            if let Some(instance) = slot {
                if let Some(left) = instance.ticks_left.as_mut() {
                    *left = left.saturating_sub(1);
                    if *left == 0 {
                        instance.alive = false;
                    }
                }
            }
        }
    }

    fn set_frame_buffer_texture(&mut self, texture: NativeTexture) {
        self.calls.push(EngineCall::SetFrameBuffer(texture));
    }

    fn set_depth_texture(&mut self, texture: NativeTexture) {
        self.calls.push(EngineCall::SetDepth(texture));
    }

    fn begin_render(&mut self, _params: &RenderParams) {
        self.calls.push(EngineCall::BeginRender);
        self.rendering.clear();
    }

    fn render_emitter(&mut self, emitter: EmitterInstanceId, _flush_cache: bool) {
        self.calls.push(EngineCall::RenderEmitter(emitter));
        self.rendering.push(emitter);
    }

    fn end_render(&mut self) -> DrawList {
        self.calls.push(EngineCall::EndRender);
        let sprites = self
            .rendering
            .drain(..)
            .map(|_| SpriteInstance {
                position: [0.0; 3],
                size: 1.0,
                color: [1.0; 4],
            })
            .collect();
        DrawList {
            view_proj: Mat4::IDENTITY,
            sprites,
        }
    }

    fn live_emitters(&self) -> Vec<EmitterInstanceId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, (_, i))| i.is_some_and(|i| i.alive))
            .map(|(slot, _)| EmitterInstanceId(slot as u32))
            .collect()
    }

    fn check_instance(
        &self,
        emitter_set: u32,
        releasing: Option<EmitterSetHandle>,
    ) -> Result<(), EngineError> {
        if let Some(err) = &self.reject_instance {
            return Err(err.clone());
        }
        if emitter_set as usize >= self.names.len() {
            return Err(EngineError::UnknownEmitterSet(emitter_set));
        }
        let usable = self.capacity.saturating_sub(self.foreign_instances) as usize;
        let released = releasing.filter(|h| self.lookup(*h).is_some());
        let free = self
            .slots
            .iter()
            .take(usable)
            .enumerate()
            .filter(|(slot, (_, i))| {
                i.is_none() || released.is_some_and(|h| h.slot as usize == *slot)
            })
            .count();
        if free == 0 {
            return Err(EngineError::Exhausted {
                pool: "emitter set",
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn create_instance(
        &mut self,
        emitter_set: u32,
        _transform: Affine3A,
    ) -> Result<EmitterSetHandle, EngineError> {
        self.calls.push(EngineCall::Create(emitter_set));
        if let Some(err) = self.fail_create.take() {
            return Err(err);
        }
        if emitter_set as usize >= self.names.len() {
            return Err(EngineError::UnknownEmitterSet(emitter_set));
        }
        let usable = self.capacity.saturating_sub(self.foreign_instances) as usize;
        let slot = self
            .slots
            .iter()
            .take(usable)
            .position(|(_, i)| i.is_none())
            .ok_or(EngineError::Exhausted {
                pool: "emitter set",
                capacity: self.capacity,
            })?;
        let lifetime = self.lifetime;
        let (generation, instance) = &mut self.slots[slot];
        *instance = Some(Instance {
            emitter_set,
            alive: true,
            ticks_left: lifetime,
        });
        Ok(EmitterSetHandle {
            slot: slot as u32,
            generation: *generation,
        })
    }

    fn set_transform(&mut self, _handle: EmitterSetHandle, transform: Affine3A) {
        self.calls.push(EngineCall::SetTransform(transform));
    }

    fn kill(&mut self, handle: EmitterSetHandle) {
        self.calls.push(EngineCall::Kill(handle));
        if self.lookup(handle).is_some() {
            let (generation, instance) = &mut self.slots[handle.slot as usize];
            *instance = None;
            *generation += 1;
        }
    }

    fn fade(&mut self, handle: EmitterSetHandle) {
        self.calls.push(EngineCall::Fade(handle));
    }

    fn is_alive(&self, handle: EmitterSetHandle) -> bool {
        self.lookup(handle).is_some_and(|i| i.alive)
    }

    fn live_instance_count(&self) -> u32 {
        self.foreign_instances + self.slots.iter().filter(|(_, i)| i.is_some()).count() as u32
    }

    fn instance_capacity(&self) -> u32 {
        self.capacity
    }

    fn emitter_set_count(&self) -> u32 {
        self.names.len() as u32
    }

    fn emitter_set_name(&self, emitter_set: u32) -> Option<&str> {
        self.names.get(emitter_set as usize).map(String::as_str)
    }

    fn emitter_count(&self, emitter_set: u32) -> u32 {
        u32::from((emitter_set as usize) < self.names.len())
    }

    fn emitter_name(&self, emitter_set: u32, emitter: u32) -> Option<&str> {
        if emitter != 0 {
            return None;
        }
        self.emitter_set_name(emitter_set)
    }

    fn clear_resource(&mut self) {
        self.calls.push(EngineCall::ClearResource);
        self.names.clear();
        for (generation, instance) in &mut self.slots {
            if instance.take().is_some() {
                *generation += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// UI
// ---------------------------------------------------------------------------

/// UI reporting a scripted viewport panel.
pub struct FakeUi {
    pub window: (u32, u32),
    pub panel: PanelReport,
    pub frames: u32,
    /// `(texture id, generation, viewport size)` per composite.
    pub composites: Vec<(u64, u64, (u32, u32))>,
}

impl FakeUi {
    pub fn new(window: (u32, u32), panel_size: (f32, f32)) -> Self {
        Self {
            window,
            panel: PanelReport::new(Vec2::new(10.0, 20.0), Vec2::new(panel_size.0, panel_size.1)),
            frames: 0,
            composites: Vec::new(),
        }
    }

    pub fn set_panel_size(&mut self, width: f32, height: f32) {
        self.panel.size = Vec2::new(width, height);
    }
}

impl UiFrontend<FakeTexture> for FakeUi {
    fn new_frame(&mut self) {
        self.frames += 1;
    }

    fn window_size(&self) -> (u32, u32) {
        self.window
    }

    fn viewport_panel(&mut self) -> PanelReport {
        self.panel
    }

    fn composite(&mut self, color: &FakeTexture, generation: u64, viewport: &Viewport) {
        self.composites.push((color.id, generation, viewport.size()));
    }
}
