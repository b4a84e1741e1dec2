//! Offscreen color + depth render target for the viewport.
//!
//! [`RenderTargetSet`] owns one generation of textures sized to the viewport.
//! Resizing allocates the next generation before the current one is released,
//! so a failed allocation leaves the viewport rendering into the old images.
//!
//! Binding is scoped: [`RenderTargetSet::bind`] returns a [`BoundTarget`]
//! guard and dropping it performs the unbind, restoring the window-sized
//! viewport and scissor the UI compositor expects. The restore runs on every
//! exit path out of the scene pass, including early returns and unwinding.
//!
//! The set is generic over a [`RenderBackend`], which hides the graphics API.
//! Textures are released by dropping them.

use glam::{Mat4, Vec3};

use crate::camera::OrthoProjection;
use crate::engine::DrawList;
use crate::error::AllocationError;

/// Integer pixel rectangle used for viewport and scissor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Rectangle at the origin.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Source for one output channel of a texture component remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    R,
    G,
    B,
    A,
    Zero,
    One,
}

/// Texture component remap applied to the color target.
///
/// The color image is written as a render target and later sampled as a UI
/// image; the two uses need different remaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle(pub [Component; 4]);

impl Swizzle {
    /// Identity remap used while rendering into the target.
    pub const RENDER_TARGET: Swizzle =
        Swizzle([Component::R, Component::G, Component::B, Component::A]);
    /// Remap used while the UI samples the target: alpha forced opaque so
    /// blended particles do not punch holes into the panel.
    pub const UI_IMAGE: Swizzle =
        Swizzle([Component::R, Component::G, Component::B, Component::One]);
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Fixed-function state applied before a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: bool,
    pub cull: CullMode,
}

impl RenderState {
    /// State for the particle pass: no depth, no blending.
    pub const PARTICLES: RenderState = RenderState {
        depth_test: false,
        depth_write: false,
        blend: false,
        cull: CullMode::None,
    };

    /// State for background primitives: depth on, culling disabled.
    pub const PRIMITIVES: RenderState = RenderState {
        depth_test: true,
        depth_write: true,
        blend: false,
        cull: CullMode::None,
    };
}

impl Default for RenderState {
    fn default() -> Self {
        Self::PRIMITIVES
    }
}

/// API-neutral handle to a backend texture, handed to the particle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeTexture(pub u64);

/// Sphere drawn behind the particles as a depth/orientation reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugSphere {
    pub center: Vec3,
    pub radius: f32,
    /// Color at the north pole.
    pub top_color: [f32; 4],
    /// Color at the south pole.
    pub bottom_color: [f32; 4],
}

/// Graphics API seam used by [`RenderTargetSet`] and the scene pass.
pub trait RenderBackend {
    /// Owned GPU image. Dropping it frees the GPU memory.
    type Texture;

    /// Allocate a color image usable both as render target and sampled image.
    fn create_color_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Self::Texture, AllocationError>;

    /// Allocate a depth image.
    fn create_depth_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Self::Texture, AllocationError>;

    /// Opaque handle the particle engine can sample from.
    fn native_handle(&self, texture: &Self::Texture) -> NativeTexture;

    /// Redirect subsequent draws into the given color + depth images.
    fn bind_targets(&mut self, color: &Self::Texture, depth: &Self::Texture);

    fn set_viewport(&mut self, rect: PixelRect);

    fn set_scissor(&mut self, rect: PixelRect);

    fn set_swizzle(&mut self, color: &Self::Texture, swizzle: Swizzle);

    /// Clear the bound targets.
    fn clear(&mut self, color: Option<[f32; 4]>, depth: bool);

    /// Clear a depth image outside of a bind, used after reallocation.
    fn clear_depth_texture(&mut self, depth: &Self::Texture);

    /// Flush any GPU-side caching of the color image so it can be sampled.
    fn invalidate_color(&mut self, color: &Self::Texture);

    /// Hand drawing back to the window surface.
    fn restore_window_target(&mut self);

    fn apply_render_state(&mut self, state: RenderState);

    fn draw_sphere(&mut self, view_proj: Mat4, sphere: &DebugSphere);

    fn draw_sprites(&mut self, list: &DrawList);
}

/// Counters for bind/unbind symmetry and resize history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetStats {
    pub binds: u64,
    pub unbinds: u64,
    pub resizes: u64,
    pub failed_resizes: u64,
}

struct Generation<T> {
    color: T,
    depth: T,
    width: u32,
    height: u32,
}

/// Exclusively owned color + depth target pair for the viewport.
pub struct RenderTargetSet<B: RenderBackend> {
    backend: B,
    current: Generation<B::Texture>,
    generation: u64,
    projection: OrthoProjection,
    window_size: (u32, u32),
    stats: TargetStats,
}

fn clamp_dimension(value: i32) -> u32 {
    value.max(1) as u32
}

impl<B: RenderBackend> RenderTargetSet<B> {
    /// Create the first generation of targets.
    pub fn new(mut backend: B, width: i32, height: i32) -> Result<Self, AllocationError> {
        let (width, height) = (clamp_dimension(width), clamp_dimension(height));
        let current = Self::allocate(&mut backend, width, height)?;
        backend.clear_depth_texture(&current.depth);
        backend.set_swizzle(&current.color, Swizzle::UI_IMAGE);

        let projection = OrthoProjection::from_size(current.width, current.height);
        let window_size = (current.width, current.height);

        Ok(Self {
            backend,
            current,
            generation: 0,
            projection,
            window_size,
            stats: TargetStats::default(),
        })
    }

    fn allocate(
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<Generation<B::Texture>, AllocationError> {
        let color = backend.create_color_texture(width, height)?;
        // `color` drops here if the depth allocation fails.
        let depth = backend.create_depth_texture(width, height)?;
        Ok(Generation {
            color,
            depth,
            width,
            height,
        })
    }

    /// Reallocate both targets at a new size.
    ///
    /// Sizes below one are clamped to one. On failure the current generation,
    /// size and projection are left untouched.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<(), AllocationError> {
        let (width, height) = (clamp_dimension(width), clamp_dimension(height));

        let next = match Self::allocate(&mut self.backend, width, height) {
            Ok(next) => next,
            Err(e) => {
                self.stats.failed_resizes += 1;
                return Err(e);
            }
        };

        let previous = std::mem::replace(&mut self.current, next);
        drop(previous);

        self.generation += 1;
        self.stats.resizes += 1;
        self.projection.set_size(width, height);
        self.backend.clear_depth_texture(&self.current.depth);
        self.backend.set_swizzle(&self.current.color, Swizzle::UI_IMAGE);

        log::debug!(
            "viewport render target resized to {}x{} (generation {})",
            width,
            height,
            self.generation
        );
        Ok(())
    }

    /// Bind the targets for drawing. Dropping the guard unbinds.
    pub fn bind(&mut self) -> BoundTarget<'_, B> {
        let rect = PixelRect::sized(self.current.width, self.current.height);
        self.backend.set_swizzle(&self.current.color, Swizzle::RENDER_TARGET);
        self.backend.bind_targets(&self.current.color, &self.current.depth);
        self.backend.set_viewport(rect);
        self.backend.set_scissor(rect);
        self.stats.binds += 1;
        BoundTarget { set: self }
    }

    fn unbind(&mut self) {
        let (w, h) = self.window_size;
        let window = PixelRect::sized(w, h);
        self.backend.invalidate_color(&self.current.color);
        self.backend.restore_window_target();
        self.backend.set_viewport(window);
        self.backend.set_scissor(window);
        self.backend.set_swizzle(&self.current.color, Swizzle::UI_IMAGE);
        self.stats.unbinds += 1;
    }

    /// Current target size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.current.width, self.current.height)
    }

    pub fn projection(&self) -> &OrthoProjection {
        &self.projection
    }

    /// Number of reallocations so far. Changes whenever the textures do.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn color_texture(&self) -> &B::Texture {
        &self.current.color
    }

    pub fn depth_texture(&self) -> &B::Texture {
        &self.current.depth
    }

    /// Native `(color, depth)` handles of the current generation.
    pub fn native_targets(&self) -> (NativeTexture, NativeTexture) {
        (
            self.backend.native_handle(&self.current.color),
            self.backend.native_handle(&self.current.depth),
        )
    }

    /// Record the window size restored on unbind.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width.max(1), height.max(1));
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    pub fn stats(&self) -> TargetStats {
        self.stats
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Free both textures and return the backend.
    pub fn into_backend(self) -> B {
        let Self { backend, current, .. } = self;
        drop(current);
        backend
    }
}

/// Scope during which draws land in the viewport targets.
pub struct BoundTarget<'a, B: RenderBackend> {
    set: &'a mut RenderTargetSet<B>,
}

impl<B: RenderBackend> BoundTarget<'_, B> {
    pub fn backend(&mut self) -> &mut B {
        &mut self.set.backend
    }

    pub fn projection(&self) -> &OrthoProjection {
        &self.set.projection
    }

    pub fn size(&self) -> (u32, u32) {
        self.set.size()
    }

    pub fn native_targets(&self) -> (NativeTexture, NativeTexture) {
        self.set.native_targets()
    }
}

impl<B: RenderBackend> Drop for BoundTarget<'_, B> {
    fn drop(&mut self) {
        self.set.unbind();
    }
}
