//! Per-frame orchestration.
//!
//! [`FrameDriver::run_frame`] is called exactly once per host main-loop
//! iteration and runs, in order:
//!
//! 1. UI frame start and window size
//! 2. viewport refresh, then at most one render target resize
//! 3. particle simulation
//! 4. emitter set lifecycle tick, then the engine's full calc pass
//! 5. the scene pass into the bound viewport target
//! 6. UI composite of the color target
//!
//! Failures in steps 2 and 4 do not abort the frame. They are reported in the
//! returned [`FrameReport`] and logged once.

use std::fmt::Display;

use crate::config::EditorConfig;
use crate::controller::{EmitterSetController, TickOutcome};
use crate::engine::{CpuParticleEngine, EffectResource, ParticleEngine};
use crate::error::{AllocationError, ControllerError, ViewerError};
use crate::layer::{DrawContext, EffectScene, LayerStack};
use crate::render_target::{RenderBackend, RenderTargetSet};
use crate::viewport::{PanelReport, Viewport, ViewportTracker};

/// The UI toolkit as seen by the frame driver.
///
/// `T` is the backend texture type the UI displays.
pub trait UiFrontend<T> {
    /// Start a new UI frame.
    fn new_frame(&mut self);

    /// Current window size in pixels.
    fn window_size(&self) -> (u32, u32);

    /// Lay out the viewport panel and report its content region.
    fn viewport_panel(&mut self) -> PanelReport;

    /// Show the color target inside the viewport panel.
    ///
    /// `generation` changes whenever `color` was reallocated.
    fn composite(&mut self, color: &T, generation: u64, viewport: &Viewport);
}

/// What happened during one [`FrameDriver::run_frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub viewport: Viewport,
    /// New target size if a resize succeeded this frame.
    pub resized: Option<(u32, u32)>,
    pub resize_error: Option<AllocationError>,
    /// `None` when the driver is stopped.
    pub tick: Option<TickOutcome>,
    pub tick_error: Option<ControllerError>,
    /// The scene pass ran.
    pub rendered: bool,
}

impl FrameReport {
    fn new(frame: u64, viewport: Viewport) -> Self {
        Self {
            frame,
            viewport,
            resized: None,
            resize_error: None,
            tick: None,
            tick_error: None,
            rendered: false,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.resize_error.is_some() || self.tick_error.is_some()
    }
}

/// Drives the viewport, the simulation and the scene pass.
pub struct FrameDriver<B: RenderBackend, E: ParticleEngine> {
    targets: RenderTargetSet<B>,
    tracker: ViewportTracker,
    layers: LayerStack,
    scene: EffectScene<E>,
    running: bool,
    frame: u64,
    last_error: Option<String>,
}

impl<B: RenderBackend, E: ParticleEngine> FrameDriver<B, E> {
    /// Create a running driver. The viewport starts at the target's size.
    pub fn new(targets: RenderTargetSet<B>, scene: EffectScene<E>, layers: LayerStack) -> Self {
        let (width, height) = targets.size();
        Self {
            targets,
            tracker: ViewportTracker::new(width, height),
            layers,
            scene,
            running: true,
            frame: 0,
            last_error: None,
        }
    }

    /// Run one frame. See the module docs for the ordering.
    ///
    /// When the driver is stopped, simulation and the scene pass are skipped
    /// (nothing is bound) but the UI still composites the last image.
    pub fn run_frame<U>(&mut self, ui: &mut U) -> FrameReport
    where
        U: UiFrontend<B::Texture>,
    {
        self.frame += 1;

        ui.new_frame();
        let (window_w, window_h) = ui.window_size();
        self.targets.set_window_size(window_w, window_h);

        let viewport = *self.tracker.refresh(ui.viewport_panel());
        let mut report = FrameReport::new(self.frame, viewport);

        if let Some((width, height)) = self.tracker.take_resize() {
            let w = i32::try_from(width).unwrap_or(i32::MAX);
            let h = i32::try_from(height).unwrap_or(i32::MAX);
            match self.targets.resize(w, h) {
                Ok(()) => report.resized = Some(self.targets.size()),
                Err(e) => {
                    self.log_failure(&e);
                    report.resize_error = Some(e);
                }
            }
        }

        if self.running {
            self.simulate();

            match self.scene.controller_mut().tick() {
                Ok(outcome) => report.tick = Some(outcome),
                Err(e) => {
                    self.log_failure(&e);
                    report.tick_error = Some(e);
                }
            }
            self.scene.controller_mut().engine_mut().calc_all(true);

            self.draw_scene();
            report.rendered = true;
        }

        ui.composite(
            self.targets.color_texture(),
            self.targets.generation(),
            self.tracker.viewport(),
        );
        report
    }

    fn simulate(&mut self) {
        let engine = self.scene.controller_mut().engine_mut();
        engine.begin_frame();
        engine.swap_buffers();
        engine.calc_emitters();
        engine.calc_particles(true);
    }

    fn draw_scene(&mut self) {
        let projection = *self.targets.projection();
        let camera = *self.scene.camera();

        let mut bound = self.targets.bind();
        let targets = bound.native_targets();
        let mut ctx = DrawContext {
            backend: bound.backend(),
            projection,
            camera,
            targets,
        };
        self.layers.draw(&mut ctx, &mut self.scene);
    }

    fn log_failure(&mut self, err: &impl Display) {
        let message = err.to_string();
        if self.last_error.as_deref() != Some(message.as_str()) {
            log::warn!("{}", message);
            self.last_error = Some(message);
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn viewport(&self) -> &Viewport {
        self.tracker.viewport()
    }

    pub fn targets(&self) -> &RenderTargetSet<B> {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut RenderTargetSet<B> {
        &mut self.targets
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn scene(&self) -> &EffectScene<E> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut EffectScene<E> {
        &mut self.scene
    }

    pub fn controller(&self) -> &EmitterSetController<E> {
        self.scene.controller()
    }

    pub fn controller_mut(&mut self) -> &mut EmitterSetController<E> {
        self.scene.controller_mut()
    }

    /// Tear everything down: kill the active handle, release the resource
    /// table and free both render targets.
    pub fn shutdown(mut self) -> (B, E) {
        self.running = false;
        self.scene.controller_mut().shutdown();
        let backend = self.targets.into_backend();
        let engine = self.scene.into_controller().into_engine();
        log::info!("viewer shut down after {} frames", self.frame);
        (backend, engine)
    }
}

impl<B: RenderBackend> FrameDriver<B, CpuParticleEngine> {
    /// Assemble the viewer around the bundled CPU engine.
    ///
    /// Registers `resource`, instantiates the configured initial emitter set
    /// and allocates targets at the configured window size.
    pub fn from_config(
        backend: B,
        config: &EditorConfig,
        resource: EffectResource,
    ) -> Result<Self, ViewerError> {
        let mut engine = CpuParticleEngine::new(config.engine.clone());
        engine.entry_resource(resource);

        let mut controller = EmitterSetController::new(engine, config.display_scale())
            .with_loop_policy(config.loop_policy)
            .with_fade_policy(config.fade);
        controller.select_emitter_set(config.initial_emitter_set)?;

        let [width, height] = config.window_size;
        let targets = RenderTargetSet::new(
            backend,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        )?;

        let scene = EffectScene::new(controller, config.debug_sphere.sphere());
        Ok(Self::new(targets, scene, LayerStack::viewer(config.clear_color)))
    }
}
