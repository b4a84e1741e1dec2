//! Error types for the particle viewer.
//!
//! Every fallible operation reports synchronously to its caller; nothing here
//! is retried automatically. [`ViewerError`] is the umbrella type used at
//! startup, the narrower enums are returned by the component that fails.

use std::path::PathBuf;

use thiserror::Error;

/// GPU texture or render target creation failed.
///
/// Returned by [`RenderTargetSet::resize`](crate::RenderTargetSet::resize).
/// The previous render target generation stays bound when this is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The requested size is larger than the device supports.
    #[error("{what} texture of {width}x{height} exceeds device limit of {limit}")]
    TooLarge {
        what: &'static str,
        width: u32,
        height: u32,
        limit: u32,
    },
    /// The backend could not obtain memory for the texture.
    #[error("failed to allocate {what} texture of {width}x{height}: {reason}")]
    OutOfMemory {
        what: &'static str,
        width: u32,
        height: u32,
        reason: String,
    },
}

/// Errors loading or parsing the effect resource blob.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Failed to read the resource from disk.
    #[error("failed to read effect resource {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The resource bytes are not a valid effect resource.
    #[error("effect resource is corrupt: {0}")]
    Parse(#[from] serde_json::Error),
    /// The resource parsed but defines no emitter sets.
    #[error("effect resource contains no emitter sets")]
    Empty,
    /// A numeric emitter field is not finite or is out of range.
    #[error("emitter {emitter_set}/{emitter} has an invalid {field}")]
    Invalid {
        emitter_set: String,
        emitter: String,
        field: &'static str,
    },
}

/// Errors reported by a [`ParticleEngine`](crate::engine::ParticleEngine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A fixed-capacity pool inside the engine is full.
    #[error("{pool} capacity of {capacity} reached")]
    Exhausted { pool: &'static str, capacity: u32 },
    /// The emitter set id is not in the resource table.
    #[error("emitter set {0} does not exist")]
    UnknownEmitterSet(u32),
    /// No resource has been registered with the engine.
    #[error("no effect resource is loaded")]
    NoResource,
}

/// Errors reported by the [`EmitterSetController`](crate::EmitterSetController).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The selected id is outside the resource's emitter set table.
    #[error("emitter set {id} is out of range (resource has {count})")]
    InvalidSelection { id: u32, count: u32 },
    /// The engine could not create another instance.
    #[error("cannot instantiate emitter set {id}: {source}")]
    ResourceExhausted {
        id: u32,
        #[source]
        source: EngineError,
    },
}

/// Errors reading or writing [`EditorConfig`](crate::EditorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error for viewer startup and frame processing.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The effect resource is missing or corrupt. Fatal at startup.
    #[error("resource load failure: {0}")]
    ResourceLoadFailure(#[from] ResourceError),
    /// Render target allocation failed.
    #[error("render target allocation failed: {0}")]
    Allocation(#[from] AllocationError),
    /// Emitter set selection failed.
    #[error(transparent)]
    Controller(#[from] ControllerError),
    /// The engine rejected an operation.
    #[error("particle engine error: {0}")]
    Engine(#[from] EngineError),
    /// Configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// No usable GPU device was provided by the host.
    #[error("no wgpu render state available; the viewer requires the wgpu renderer")]
    NoGpu,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selection_message() {
        let err = ControllerError::InvalidSelection { id: 9, count: 4 };
        assert_eq!(err.to_string(), "emitter set 9 is out of range (resource has 4)");
    }

    #[test]
    fn test_exhausted_keeps_source() {
        use std::error::Error as _;

        let err = ControllerError::ResourceExhausted {
            id: 2,
            source: EngineError::Exhausted {
                pool: "emitter set",
                capacity: 1,
            },
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("emitter set capacity of 1 reached"));
    }

    #[test]
    fn test_viewer_error_from_resource() {
        let err: ViewerError = ResourceError::Empty.into();
        assert!(matches!(err, ViewerError::ResourceLoadFailure(_)));
    }
}
