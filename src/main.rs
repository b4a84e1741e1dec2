//! ptcl-editor - particle effect viewer
//!
//! Usage: `ptcl-editor [config.json]`. Without a config file the defaults
//! are used, which load `assets/effects.json`.

use eframe::egui;
use ptcl_editor::{EditorApp, EditorConfig, EffectResource, ViewerError};

fn load_config() -> Result<EditorConfig, ViewerError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("loading config from {}", path);
            Ok(EditorConfig::load(path)?)
        }
        None => Ok(EditorConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    // A missing or corrupt resource is fatal before any window opens.
    let resource = EffectResource::load(&config.resource_path).map_err(ViewerError::from)?;

    let [width, height] = config.window_size;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width as f32, height as f32])
            .with_title(config.title.clone()),
        renderer: eframe::Renderer::Wgpu,
        wgpu_options: eframe::egui_wgpu::WgpuConfiguration::default(),
        ..Default::default()
    };

    let title = config.title.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            let app = EditorApp::new(cc, &config, resource)?;
            Ok(Box::new(app))
        }),
    )?;
    Ok(())
}
