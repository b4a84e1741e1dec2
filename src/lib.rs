//! # ptcl-editor
//!
//! Offscreen viewport rendering and emitter set lifecycle control for a
//! particle effect viewer.
//!
//! The crate glues a resizable editor viewport to a continuously simulated
//! particle system:
//!
//! - [`RenderTargetSet`] owns the color + depth targets the scene is drawn
//!   into and reallocates them when the viewport changes size.
//! - [`ViewportTracker`] turns the UI's per-frame panel report into resize,
//!   move, hover and focus state.
//! - [`EmitterSetController`] owns the single active emitter set instance:
//!   create, fade, kill, replace, and advance through the resource table.
//! - [`FrameDriver`] runs one frame in a fixed order: simulate, tick the
//!   controller, bind the target, draw, unbind, composite.
//! - [`ParticleEngine`] is the seam to the particle engine.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ptcl_editor::prelude::*;
//!
//! let config = EditorConfig::default();
//! let resource = EffectResource::load(&config.resource_path)?;
//! let mut driver = FrameDriver::from_config(backend, &config, resource)?;
//!
//! // once per host main-loop iteration
//! let report = driver.run_frame(&mut ui);
//!
//! // at exit
//! let (backend, engine) = driver.shutdown();
//! ```
//!
//! ## Graphics
//!
//! The core is written against [`RenderBackend`]. The `gpu` module provides
//! a `wgpu` implementation. With the `egui` feature (on by default) the `ui`
//! module provides the eframe editor used by the `ptcl-editor` binary.
//!
//! ## Scoped binding
//!
//! [`RenderTargetSet::bind`] returns a guard. Everything drawn while the
//! guard lives lands in the viewport target, and dropping it restores the
//! window-sized viewport and scissor:
//!
//! ```ignore
//! {
//!     let mut bound = targets.bind();
//!     bound.backend().clear(Some([0.25, 0.25, 0.25, 1.0]), true);
//! } // unbound here
//! ```

pub mod camera;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod layer;
pub mod render_target;
#[cfg(feature = "egui")]
pub mod ui;
pub mod viewport;

pub use camera::{OrthoProjection, SceneCamera};
pub use config::{DebugSphereConfig, EditorConfig};
pub use controller::{
    EmitterSetController, FadePolicy, HandleState, LoopEnd, LoopPolicy, Selection, TickOutcome,
};
pub use engine::{
    CpuParticleEngine, DrawList, EffectResource, EmitterInstanceId, EmitterSetHandle, EngineConfig,
    ParticleEngine, RenderParams, SpriteInstance,
};
pub use error::{
    AllocationError, ConfigError, ControllerError, EngineError, ResourceError, ViewerError,
};
pub use frame::{FrameDriver, FrameReport, UiFrontend};
pub use glam::{Vec2, Vec3, Vec4};
pub use gpu::{WgpuBackend, WgpuTexture};
pub use layer::{DrawContext, Drawable, EffectScene, Layer, LayerKind, LayerStack};
pub use render_target::{
    BoundTarget, Component, CullMode, DebugSphere, NativeTexture, PixelRect, RenderBackend,
    RenderState, RenderTargetSet, Swizzle, TargetStats,
};
#[cfg(feature = "egui")]
pub use ui::EditorApp;
pub use viewport::{PanelReport, Viewport, ViewportTracker};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::camera::{OrthoProjection, SceneCamera};
    pub use crate::config::EditorConfig;
    pub use crate::controller::{
        EmitterSetController, FadePolicy, HandleState, LoopEnd, LoopPolicy, Selection, TickOutcome,
    };
    pub use crate::engine::{CpuParticleEngine, EffectResource, EngineConfig, ParticleEngine};
    pub use crate::error::ViewerError;
    pub use crate::frame::{FrameDriver, FrameReport, UiFrontend};
    pub use crate::gpu::{WgpuBackend, WgpuTexture};
    pub use crate::layer::{EffectScene, LayerStack};
    pub use crate::render_target::{RenderBackend, RenderTargetSet};
    pub use crate::viewport::{PanelReport, Viewport, ViewportTracker};
    pub use crate::{Vec2, Vec3, Vec4};
    #[cfg(feature = "egui")]
    pub use crate::ui::EditorApp;
    #[cfg(feature = "egui")]
    pub use egui;
}
