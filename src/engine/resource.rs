//! Effect resource: the table of emitter sets an engine instantiates from.
//!
//! Stored as JSON. The viewer loads one resource at startup and releases it
//! at shutdown.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ResourceError;

fn default_rate() -> f32 {
    4.0
}

fn default_emit_frames() -> u32 {
    60
}

fn default_particle_life() -> u32 {
    45
}

fn default_size() -> f32 {
    4.0
}

fn default_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

/// One emitter inside an emitter set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmitterDef {
    pub name: String,
    /// Particles spawned per frame. Fractional rates accumulate.
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Frames the emitter keeps spawning. 0 emits forever until faded.
    #[serde(default = "default_emit_frames")]
    pub emit_frames: u32,
    /// Particle lifetime in frames.
    #[serde(default = "default_particle_life")]
    pub particle_life: u32,
    /// Local-space offset of the emitter.
    #[serde(default)]
    pub offset: [f32; 3],
    /// Base velocity in local units per frame.
    #[serde(default)]
    pub velocity: [f32; 3],
    /// Random velocity added on each axis, in `[-spread, spread]`.
    #[serde(default)]
    pub spread: f32,
    /// Acceleration per frame.
    #[serde(default)]
    pub gravity: [f32; 3],
    /// Sprite half-size in local units.
    #[serde(default = "default_size")]
    pub size: f32,
    #[serde(default = "default_color")]
    pub color_start: [f32; 4],
    #[serde(default = "default_color")]
    pub color_end: [f32; 4],
}

impl Default for EmitterDef {
    fn default() -> Self {
        Self {
            name: "Emitter".into(),
            rate: default_rate(),
            emit_frames: default_emit_frames(),
            particle_life: default_particle_life(),
            offset: [0.0; 3],
            velocity: [0.0; 3],
            spread: 0.0,
            gravity: [0.0; 3],
            size: default_size(),
            color_start: default_color(),
            color_end: default_color(),
        }
    }
}

impl EmitterDef {
    /// First numeric field that is not finite, or negative where only
    /// magnitudes make sense.
    fn invalid_field(&self) -> Option<&'static str> {
        let magnitudes = [("rate", self.rate), ("spread", self.spread), ("size", self.size)];
        for (field, value) in magnitudes {
            if !value.is_finite() || value < 0.0 {
                return Some(field);
            }
        }
        let vectors: [(&'static str, &[f32]); 5] = [
            ("offset", &self.offset),
            ("velocity", &self.velocity),
            ("gravity", &self.gravity),
            ("color_start", &self.color_start),
            ("color_end", &self.color_end),
        ];
        vectors
            .into_iter()
            .find(|(_, values)| values.iter().any(|v| !v.is_finite()))
            .map(|(field, _)| field)
    }
}

/// A named group of emitters instantiated together.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmitterSetDef {
    pub name: String,
    #[serde(default)]
    pub emitters: Vec<EmitterDef>,
}

/// Emitter set table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct EffectResource {
    pub emitter_sets: Vec<EmitterSetDef>,
}

impl EffectResource {
    /// Parse a resource from its raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ResourceError> {
        let resource: Self = serde_json::from_slice(bytes)?;
        if resource.emitter_sets.is_empty() {
            return Err(ResourceError::Empty);
        }
        for set in &resource.emitter_sets {
            for emitter in &set.emitters {
                if let Some(field) = emitter.invalid_field() {
                    return Err(ResourceError::Invalid {
                        emitter_set: set.name.clone(),
                        emitter: emitter.name.clone(),
                        field,
                    });
                }
            }
        }
        Ok(resource)
    }

    /// Read and parse a resource file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("effect resource {}: {} bytes", path.display(), bytes.len());
        Self::from_slice(&bytes)
    }

    pub fn emitter_set(&self, id: u32) -> Option<&EmitterSetDef> {
        self.emitter_sets.get(id as usize)
    }

    pub fn len(&self) -> u32 {
        self.emitter_sets.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.emitter_sets.is_empty()
    }
}
