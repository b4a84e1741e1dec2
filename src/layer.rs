//! Render layers drawn into the viewport target.
//!
//! Two layers are registered by default: `Background` (priority 1, cleared
//! to the configured color plus depth) and `Foreground` (priority 0, no
//! clear). Layers run from the highest priority down, so the background is
//! drawn first and the particles end up on top.

use crate::camera::{OrthoProjection, SceneCamera};
use crate::controller::EmitterSetController;
use crate::engine::{ParticleEngine, RenderParams};
use crate::render_target::{DebugSphere, NativeTexture, RenderBackend, RenderState};

/// Which draw method of a [`Drawable`] a layer invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Background,
    Foreground,
}

/// One render step with its clear settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    /// Higher priorities are drawn first.
    pub priority: i32,
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: bool,
    pub kind: LayerKind,
}

impl Layer {
    pub fn foreground() -> Self {
        Self {
            name: "Foreground".into(),
            priority: 0,
            clear_color: None,
            clear_depth: false,
            kind: LayerKind::Foreground,
        }
    }

    pub fn background(clear_color: [f32; 4]) -> Self {
        Self {
            name: "Background".into(),
            priority: 1,
            clear_color: Some(clear_color),
            clear_depth: true,
            kind: LayerKind::Background,
        }
    }

    fn clears(&self) -> bool {
        self.clear_color.is_some() || self.clear_depth
    }
}

/// Layers ordered by descending priority.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The background + foreground pair used by the viewer.
    pub fn viewer(clear_color: [f32; 4]) -> Self {
        let mut stack = Self::new();
        stack.add(Layer::foreground());
        stack.add(Layer::background(clear_color));
        stack
    }

    /// Insert a layer. Equal priorities keep insertion order.
    pub fn add(&mut self, layer: Layer) {
        let at = self
            .layers
            .iter()
            .position(|l| l.priority < layer.priority)
            .unwrap_or(self.layers.len());
        self.layers.insert(at, layer);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run every layer against `scene`: clear as configured, then draw.
    pub fn draw<B, D>(&self, ctx: &mut DrawContext<'_, B>, scene: &mut D)
    where
        B: RenderBackend,
        D: Drawable<B>,
    {
        for layer in &self.layers {
            if layer.clears() {
                ctx.backend.clear(layer.clear_color, layer.clear_depth);
            }
            match layer.kind {
                LayerKind::Background => scene.render_background(ctx),
                LayerKind::Foreground => scene.render_foreground(ctx),
            }
        }
    }
}

/// Everything a layer draw method may touch.
pub struct DrawContext<'a, B: RenderBackend> {
    pub backend: &'a mut B,
    pub projection: OrthoProjection,
    pub camera: SceneCamera,
    /// Native `(color, depth)` handles of the bound target.
    pub targets: (NativeTexture, NativeTexture),
}

impl<B: RenderBackend> DrawContext<'_, B> {
    pub fn render_params(&self) -> RenderParams {
        RenderParams {
            projection: self.projection.matrix(),
            view: self.camera.view_matrix(),
            camera_position: self.camera.position,
            near: self.projection.near,
            far: self.projection.far,
        }
    }
}

/// Something the layer stack can draw.
pub trait Drawable<B: RenderBackend> {
    fn render_background(&mut self, ctx: &mut DrawContext<'_, B>);
    fn render_foreground(&mut self, ctx: &mut DrawContext<'_, B>);
}

/// The viewer scene: a reference sphere behind the active emitter set.
pub struct EffectScene<E: ParticleEngine> {
    controller: EmitterSetController<E>,
    camera: SceneCamera,
    sphere: Option<DebugSphere>,
}

impl<E: ParticleEngine> EffectScene<E> {
    pub fn new(controller: EmitterSetController<E>, sphere: Option<DebugSphere>) -> Self {
        Self {
            controller,
            camera: SceneCamera::new(),
            sphere,
        }
    }

    pub fn controller(&self) -> &EmitterSetController<E> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut EmitterSetController<E> {
        &mut self.controller
    }

    pub fn camera(&self) -> &SceneCamera {
        &self.camera
    }

    pub fn sphere(&self) -> Option<&DebugSphere> {
        self.sphere.as_ref()
    }

    pub fn set_sphere(&mut self, sphere: Option<DebugSphere>) {
        self.sphere = sphere;
    }

    pub fn into_controller(self) -> EmitterSetController<E> {
        self.controller
    }
}

impl<B: RenderBackend, E: ParticleEngine> Drawable<B> for EffectScene<E> {
    fn render_background(&mut self, ctx: &mut DrawContext<'_, B>) {
        ctx.backend.apply_render_state(RenderState::PRIMITIVES);
        if let Some(sphere) = &self.sphere {
            let view_proj = ctx.projection.matrix() * ctx.camera.view_matrix();
            ctx.backend.draw_sphere(view_proj, sphere);
        }
    }

    fn render_foreground(&mut self, ctx: &mut DrawContext<'_, B>) {
        ctx.backend.apply_render_state(RenderState::PARTICLES);

        let params = ctx.render_params();
        let (color, depth) = ctx.targets;
        let engine = self.controller.engine_mut();
        engine.set_frame_buffer_texture(color);
        engine.set_depth_texture(depth);
        engine.begin_render(&params);
        for emitter in engine.live_emitters() {
            engine.render_emitter(emitter, true);
        }
        let list = engine.end_render();

        if !list.is_empty() {
            ctx.backend.draw_sprites(&list);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_layers_run_background_first() {
        let stack = LayerStack::viewer([0.25, 0.25, 0.25, 1.0]);
        let names: Vec<_> = stack.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Background", "Foreground"]);
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let mut stack = LayerStack::new();
        let mut a = Layer::foreground();
        a.name = "A".into();
        let mut b = Layer::foreground();
        b.name = "B".into();
        stack.add(a);
        stack.add(b);
        stack.add(Layer::background([0.0; 4]));
        let names: Vec<_> = stack.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Background", "A", "B"]);
    }

    #[test]
    fn test_only_background_clears() {
        let stack = LayerStack::viewer([0.1, 0.2, 0.3, 1.0]);
        let clears: Vec<_> = stack.iter().map(Layer::clears).collect();
        assert_eq!(clears, [true, false]);
    }
}
