//! eframe editor shell.
//!
//! Side panels list the resource's emitter sets and drive the controller;
//! the central panel is the viewport. The viewport image is the render
//! target's color texture, registered with the egui renderer as a native
//! texture and re-registered whenever the target is reallocated.

use glam::Vec2;

use crate::controller::{HandleState, LoopEnd, LoopPolicy};
use crate::engine::{CpuParticleEngine, EffectResource, ParticleEngine};
use crate::error::ViewerError;
use crate::frame::{FrameDriver, UiFrontend};
use crate::gpu::{WgpuBackend, WgpuTexture};
use crate::viewport::{PanelReport, Viewport};
use crate::EditorConfig;

type Driver = FrameDriver<WgpuBackend, CpuParticleEngine>;

/// egui texture slot showing the viewport target.
#[derive(Default)]
struct ViewportTexture {
    id: Option<egui::TextureId>,
    generation: Option<u64>,
}

impl ViewportTexture {
    fn sync(
        &mut self,
        render_state: &egui_wgpu::RenderState,
        color: &WgpuTexture,
        generation: u64,
    ) -> egui::TextureId {
        let mut renderer = render_state.renderer.write();
        match self.id {
            Some(id) if self.generation == Some(generation) => id,
            Some(id) => {
                renderer.update_egui_texture_from_wgpu_texture(
                    &render_state.device,
                    color.view(),
                    wgpu::FilterMode::Linear,
                    id,
                );
                self.generation = Some(generation);
                id
            }
            None => {
                let id = renderer.register_native_texture(
                    &render_state.device,
                    color.view(),
                    wgpu::FilterMode::Linear,
                );
                self.id = Some(id);
                self.generation = Some(generation);
                id
            }
        }
    }

    fn free(&mut self, render_state: &egui_wgpu::RenderState) {
        if let Some(id) = self.id.take() {
            render_state.renderer.write().free_texture(&id);
        }
        self.generation = None;
    }
}

/// [`UiFrontend`] over an egui frame.
struct EguiFrontend<'a> {
    ctx: &'a egui::Context,
    render_state: &'a egui_wgpu::RenderState,
    texture: &'a mut ViewportTexture,
    panel_rect: egui::Rect,
}

impl UiFrontend<WgpuTexture> for EguiFrontend<'_> {
    fn new_frame(&mut self) {
        // The simulation runs every frame, so keep repainting.
        self.ctx.request_repaint();
    }

    fn window_size(&self) -> (u32, u32) {
        let ppp = self.ctx.pixels_per_point();
        let size = self.ctx.screen_rect().size() * ppp;
        (size.x.max(1.0) as u32, size.y.max(1.0) as u32)
    }

    fn viewport_panel(&mut self) -> PanelReport {
        let response = egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(self.ctx, |ui| ui.allocate_rect(ui.max_rect(), egui::Sense::hover()));

        let rect = response.inner.rect;
        self.panel_rect = rect;

        // Render targets are sized in physical pixels.
        let ppp = self.ctx.pixels_per_point();
        PanelReport {
            position: Vec2::new(rect.min.x, rect.min.y) * ppp,
            size: Vec2::new(rect.width(), rect.height()) * ppp,
            hovered: response.inner.hovered(),
            window_focused: self.ctx.input(|i| i.focused),
        }
    }

    fn composite(&mut self, color: &WgpuTexture, generation: u64, _viewport: &Viewport) {
        let id = self.texture.sync(self.render_state, color, generation);
        let painter = self
            .ctx
            .layer_painter(egui::LayerId::new(
                egui::Order::Background,
                egui::Id::new("viewport_image"),
            ))
            .with_clip_rect(self.panel_rect);
        painter.image(
            id,
            self.panel_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }
}

/// User requests collected from the side panels, applied before the frame runs.
enum Action {
    Select(u32),
    Fade,
    Restart,
    Kill,
    SetLoop(LoopPolicy),
    SetRunning(bool),
}

/// The particle viewer application.
pub struct EditorApp {
    render_state: egui_wgpu::RenderState,
    driver: Option<Driver>,
    texture: ViewportTexture,
    status: Option<String>,
}

impl EditorApp {
    /// Build the viewer on eframe's wgpu device.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &EditorConfig,
        resource: EffectResource,
    ) -> Result<Self, ViewerError> {
        let render_state = cc.wgpu_render_state.clone().ok_or(ViewerError::NoGpu)?;

        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::dark();
        cc.egui_ctx.set_style(style);

        let backend = WgpuBackend::new(
            std::sync::Arc::new(render_state.device.clone()),
            std::sync::Arc::new(render_state.queue.clone()),
        );
        let driver = FrameDriver::from_config(backend, config, resource)?;

        Ok(Self {
            render_state,
            driver: Some(driver),
            texture: ViewportTexture::default(),
            status: None,
        })
    }

    fn emitter_set_panel(ui: &mut egui::Ui, driver: &Driver, actions: &mut Vec<Action>) {
        ui.heading("Emitter Sets");
        ui.separator();

        let controller = driver.controller();
        let engine = controller.engine();
        let current = controller.current_id();

        egui::ScrollArea::vertical().show(ui, |ui| {
            for id in 0..engine.emitter_set_count() {
                let name = engine.emitter_set_name(id).unwrap_or("<unnamed>");
                let label = format!("#{}: {}", id, name);
                if ui.selectable_label(current == Some(id), label).clicked() {
                    actions.push(Action::Select(id));
                }
            }
        });
    }

    fn inspector_panel(&self, ui: &mut egui::Ui, driver: &Driver, actions: &mut Vec<Action>) {
        let controller = driver.controller();
        let engine = controller.engine();

        ui.heading("Info");
        match controller.current_id() {
            Some(id) => {
                ui.label(format!(
                    "Emitter Set #{}: {}",
                    id,
                    controller.current_name().unwrap_or("<unnamed>")
                ));
            }
            None => {
                ui.label("No emitter set");
            }
        }
        ui.label(format!("State: {:?}", controller.state()));
        ui.label(format!("Particles: {}", engine.particle_count()));

        let viewport = driver.viewport();
        ui.label(format!("Viewport X: {:.0}", viewport.position.x));
        ui.label(format!("Viewport Y: {:.0}", viewport.position.y));
        ui.label(format!("Viewport Width: {}", viewport.width));
        ui.label(format!("Viewport Height: {}", viewport.height));
        ui.label(format!("Target generation: {}", driver.targets().generation()));

        ui.separator();
        ui.heading("Playback");

        let mut running = driver.is_running();
        if ui.checkbox(&mut running, "Running").changed() {
            actions.push(Action::SetRunning(running));
        }

        let mut policy = controller.loop_policy();
        let mut changed = ui.checkbox(&mut policy.enabled, "Loop emitter sets").changed();
        ui.horizontal(|ui| {
            ui.label("At end:");
            changed |= ui.radio_value(&mut policy.at_end, LoopEnd::Wrap, "Wrap").changed();
            changed |= ui.radio_value(&mut policy.at_end, LoopEnd::Stop, "Stop").changed();
        });
        if changed {
            actions.push(Action::SetLoop(policy));
        }

        ui.horizontal(|ui| {
            let alive = controller.state() == HandleState::Alive;
            if ui.add_enabled(alive, egui::Button::new("Fade")).clicked() {
                actions.push(Action::Fade);
            }
            if ui.button("Restart").clicked() {
                actions.push(Action::Restart);
            }
            if ui.button("Kill").clicked() {
                actions.push(Action::Kill);
            }
        });

        if let Some(id) = controller.current_id() {
            ui.separator();
            ui.heading("Emitters");
            for j in 0..engine.emitter_count(id) {
                ui.label(format!("{}: {}", j, engine.emitter_name(id, j).unwrap_or("<unnamed>")));
            }
        }

        if let Some(status) = &self.status {
            ui.separator();
            ui.colored_label(egui::Color32::LIGHT_RED, status);
        }
    }

    fn apply(&mut self, actions: Vec<Action>) {
        let Some(driver) = self.driver.as_mut() else {
            return;
        };

        for action in actions {
            let result = match action {
                Action::Select(id) => driver.controller_mut().select_emitter_set(id).map(|_| ()),
                Action::Fade => {
                    driver.controller_mut().request_fade();
                    Ok(())
                }
                Action::Restart => driver.controller_mut().restart(),
                Action::Kill => {
                    driver.controller_mut().kill_current();
                    Ok(())
                }
                Action::SetLoop(policy) => {
                    driver.controller_mut().set_loop_policy(policy);
                    Ok(())
                }
                Action::SetRunning(true) => {
                    driver.start();
                    Ok(())
                }
                Action::SetRunning(false) => {
                    driver.stop();
                    Ok(())
                }
            };

            match result {
                Ok(()) => self.status = None,
                Err(e) => {
                    log::warn!("{}", e);
                    self.status = Some(e.to_string());
                }
            }
        }
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut actions = Vec::new();

        if let Some(driver) = self.driver.as_ref() {
            egui::SidePanel::left("emitter_sets")
                .default_width(220.0)
                .show(ctx, |ui| Self::emitter_set_panel(ui, driver, &mut actions));

            egui::SidePanel::right("inspector")
                .default_width(260.0)
                .show(ctx, |ui| self.inspector_panel(ui, driver, &mut actions));
        }

        self.apply(actions);

        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        let mut frontend = EguiFrontend {
            ctx,
            render_state: &self.render_state,
            texture: &mut self.texture,
            panel_rect: egui::Rect::NOTHING,
        };
        let report = driver.run_frame(&mut frontend);
        if let Some(e) = &report.resize_error {
            self.status = Some(e.to_string());
        } else if let Some(e) = &report.tick_error {
            self.status = Some(e.to_string());
        }
    }
}

impl Drop for EditorApp {
    fn drop(&mut self) {
        self.texture.free(&self.render_state);
        if let Some(driver) = self.driver.take() {
            let frames = driver.frame();
            let (_backend, _engine) = driver.shutdown();
            log::debug!("editor closed after {} frames", frames);
        }
    }
}
