//! Editor configuration.
//!
//! Serialized as JSON. Every field has a default, so a partial file (or none
//! at all) yields a working editor.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::controller::{FadePolicy, LoopPolicy};
use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::render_target::DebugSphere;

fn default_resource_path() -> PathBuf {
    PathBuf::from("assets/effects.json")
}

fn default_display_scale() -> [f32; 3] {
    // Base scale of 4, stretched 1.5x on x and y.
    [6.0, 6.0, 4.0]
}

fn default_clear_color() -> [f32; 4] {
    [0.25, 0.25, 0.25, 1.0]
}

fn default_window_size() -> [u32; 2] {
    [1280, 720]
}

fn default_title() -> String {
    "ptcl-editor".into()
}

/// Reference sphere drawn in the background layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DebugSphereConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sphere_center")]
    pub center: [f32; 3],
    #[serde(default = "default_sphere_radius")]
    pub radius: f32,
    #[serde(default = "default_sphere_top")]
    pub top_color: [f32; 4],
    #[serde(default = "default_sphere_bottom")]
    pub bottom_color: [f32; 4],
}

fn default_true() -> bool {
    true
}

fn default_sphere_center() -> [f32; 3] {
    [-128.0, 16.0, -600.0]
}

fn default_sphere_radius() -> f32 {
    128.0
}

fn default_sphere_top() -> [f32; 4] {
    [1.0, 0.0, 0.0, 1.0]
}

fn default_sphere_bottom() -> [f32; 4] {
    [0.0, 0.0, 1.0, 1.0]
}

impl Default for DebugSphereConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            center: default_sphere_center(),
            radius: default_sphere_radius(),
            top_color: default_sphere_top(),
            bottom_color: default_sphere_bottom(),
        }
    }
}

impl DebugSphereConfig {
    /// The sphere to draw, if enabled.
    pub fn sphere(&self) -> Option<DebugSphere> {
        self.enabled.then(|| DebugSphere {
            center: Vec3::from_array(self.center),
            radius: self.radius,
            top_color: self.top_color,
            bottom_color: self.bottom_color,
        })
    }
}

/// Complete editor configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EditorConfig {
    /// Effect resource loaded at startup.
    #[serde(default = "default_resource_path")]
    pub resource_path: PathBuf,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Emitter set instantiated at startup.
    #[serde(default)]
    pub initial_emitter_set: u32,
    #[serde(default, rename = "loop")]
    pub loop_policy: LoopPolicy,
    #[serde(default)]
    pub fade: FadePolicy,
    /// Scale applied to every emitter set instance.
    #[serde(default = "default_display_scale")]
    pub display_scale: [f32; 3],
    /// Background layer clear color.
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],
    #[serde(default)]
    pub debug_sphere: DebugSphereConfig,
    #[serde(default = "default_window_size")]
    pub window_size: [u32; 2],
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            resource_path: default_resource_path(),
            engine: EngineConfig::default(),
            initial_emitter_set: 0,
            loop_policy: LoopPolicy::default(),
            fade: FadePolicy::default(),
            display_scale: default_display_scale(),
            clear_color: default_clear_color(),
            debug_sphere: DebugSphereConfig::default(),
            window_size: default_window_size(),
            title: default_title(),
        }
    }
}

impl EditorConfig {
    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    pub fn display_scale(&self) -> Vec3 {
        Vec3::from_array(self.display_scale)
    }
}
