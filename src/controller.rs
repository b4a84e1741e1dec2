//! Lifecycle of the single active emitter set instance.
//!
//! The controller owns the engine and at most one [`EmitterSetHandle`]. It
//! creates, fades, kills and replaces that handle, and advances through the
//! resource's emitter set table when the current instance finishes and
//! looping is enabled.

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::engine::{EmitterSetHandle, ParticleEngine};
use crate::error::ControllerError;

/// Controller-side view of the current handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleState {
    #[default]
    Uninstantiated,
    Alive,
    Fading,
    Dead,
}

impl HandleState {
    /// Alive or fading: the engine still simulates the instance.
    pub fn is_live(self) -> bool {
        matches!(self, HandleState::Alive | HandleState::Fading)
    }
}

/// What happens when looping runs past the last emitter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopEnd {
    /// Start over at emitter set 0.
    #[default]
    Wrap,
    /// Leave the last instance dead and switch looping off.
    Stop,
}

/// Automatic advance to the next emitter set once the current one dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopPolicy {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub at_end: LoopEnd,
}

fn default_true() -> bool {
    true
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            at_end: LoopEnd::Wrap,
        }
    }
}

/// When a fade is requested without user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FadePolicy {
    /// Only [`EmitterSetController::request_fade`] fades.
    #[default]
    Manual,
    /// Fade once the instance has been alive for this many ticks.
    AfterFrames(u32),
}

/// Result of [`EmitterSetController::select_emitter_set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The id was already applied; nothing was restarted.
    Unchanged,
    /// The previous handle was killed and a new one created.
    Replaced,
}

/// What [`EmitterSetController::tick`] did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No handle is held.
    Idle,
    /// The handle is alive or fading.
    Running,
    /// The fade policy requested a fade this tick.
    Faded,
    /// The handle is dead and looping is off.
    Dead,
    /// The dead handle was replaced by the next emitter set.
    Advanced { from: u32, to: u32 },
    /// The last emitter set died with [`LoopEnd::Stop`]; looping is now off.
    LoopEnded,
}

/// Owns the particle engine and the single active emitter set handle.
pub struct EmitterSetController<E: ParticleEngine> {
    engine: E,
    handle: Option<EmitterSetHandle>,
    state: HandleState,
    applied: Option<u32>,
    display_transform: Affine3A,
    loop_policy: LoopPolicy,
    fade_policy: FadePolicy,
    frames_alive: u32,
}

impl<E: ParticleEngine> EmitterSetController<E> {
    /// Wrap an engine. Every created instance gets `display_scale` applied.
    pub fn new(engine: E, display_scale: Vec3) -> Self {
        Self {
            engine,
            handle: None,
            state: HandleState::Uninstantiated,
            applied: None,
            display_transform: Affine3A::from_scale(display_scale),
            loop_policy: LoopPolicy::default(),
            fade_policy: FadePolicy::default(),
            frames_alive: 0,
        }
    }

    pub fn with_loop_policy(mut self, policy: LoopPolicy) -> Self {
        self.loop_policy = policy;
        self
    }

    pub fn with_fade_policy(mut self, policy: FadePolicy) -> Self {
        self.fade_policy = policy;
        self
    }

    /// Make `id` the active emitter set.
    ///
    /// Re-selecting the applied id is a no-op. Out-of-range ids are rejected
    /// before the engine is touched.
    pub fn select_emitter_set(&mut self, id: u32) -> Result<Selection, ControllerError> {
        let count = self.engine.emitter_set_count();
        if id >= count {
            return Err(ControllerError::InvalidSelection { id, count });
        }
        if self.applied == Some(id) {
            return Ok(Selection::Unchanged);
        }
        self.replace(id)?;
        Ok(Selection::Replaced)
    }

    fn replace(&mut self, id: u32) -> Result<(), ControllerError> {
        // Nothing is killed unless the new instance is known to fit.
        self.engine
            .check_instance(id, self.handle)
            .map_err(|source| ControllerError::ResourceExhausted { id, source })?;

        self.release_handle();

        match self.engine.create_instance(id, Affine3A::IDENTITY) {
            Ok(handle) => {
                self.engine.set_transform(handle, self.display_transform);
                self.handle = Some(handle);
                self.state = HandleState::Alive;
                self.applied = Some(id);
                self.frames_alive = 0;
                log::info!(
                    "emitter set #{}: {}",
                    id,
                    self.engine.emitter_set_name(id).unwrap_or("<unnamed>")
                );
                Ok(())
            }
            Err(source) => {
                self.applied = None;
                Err(ControllerError::ResourceExhausted { id, source })
            }
        }
    }

    fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine.kill(handle);
        }
        self.state = HandleState::Uninstantiated;
    }

    /// Per-frame lifecycle step. Call after the engine has simulated the
    /// frame and before anything is drawn.
    pub fn tick(&mut self) -> Result<TickOutcome, ControllerError> {
        let Some(handle) = self.handle else {
            return Ok(TickOutcome::Idle);
        };

        if self.state.is_live() && !self.engine.is_alive(handle) {
            log::debug!("emitter set #{} finished", self.applied.unwrap_or_default());
            self.state = HandleState::Dead;
        }

        if self.state == HandleState::Dead {
            if !self.loop_policy.enabled {
                return Ok(TickOutcome::Dead);
            }
            return self.advance();
        }

        self.frames_alive = self.frames_alive.saturating_add(1);
        if let FadePolicy::AfterFrames(frames) = self.fade_policy {
            if self.state == HandleState::Alive && self.frames_alive >= frames {
                self.request_fade();
                return Ok(TickOutcome::Faded);
            }
        }
        Ok(TickOutcome::Running)
    }

    fn advance(&mut self) -> Result<TickOutcome, ControllerError> {
        let from = self.applied.unwrap_or_default();
        let count = self.engine.emitter_set_count();
        let next = from + 1;

        let to = if next < count {
            next
        } else {
            match self.loop_policy.at_end {
                LoopEnd::Wrap => 0,
                LoopEnd::Stop => {
                    log::info!("reached the end of the emitter set table, looping stopped");
                    self.loop_policy.enabled = false;
                    return Ok(TickOutcome::LoopEnded);
                }
            }
        };

        log::debug!("next emitter set id: {}", to);
        self.replace(to)?;
        Ok(TickOutcome::Advanced { from, to })
    }

    /// Start fading the current instance. Returns whether a fade was issued.
    pub fn request_fade(&mut self) -> bool {
        match (self.handle, self.state) {
            (Some(handle), HandleState::Alive) => {
                self.engine.fade(handle);
                self.state = HandleState::Fading;
                true
            }
            _ => false,
        }
    }

    /// Kill and re-create the applied emitter set.
    pub fn restart(&mut self) -> Result<(), ControllerError> {
        match self.applied {
            Some(id) => self.replace(id),
            None => Ok(()),
        }
    }

    /// Kill the current handle, leaving no emitter set applied.
    pub fn kill_current(&mut self) {
        self.release_handle();
        self.applied = None;
    }

    /// Kill the active handle and release the engine's resource table.
    pub fn shutdown(&mut self) {
        self.kill_current();
        self.engine.clear_resource();
        log::info!("effect resource released");
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn handle(&self) -> Option<EmitterSetHandle> {
        self.handle
    }

    /// Id of the emitter set the current handle was created from.
    pub fn current_id(&self) -> Option<u32> {
        self.applied
    }

    pub fn current_name(&self) -> Option<&str> {
        self.engine.emitter_set_name(self.applied?)
    }

    pub fn loop_policy(&self) -> LoopPolicy {
        self.loop_policy
    }

    pub fn set_loop_policy(&mut self, policy: LoopPolicy) {
        self.loop_policy = policy;
    }

    pub fn fade_policy(&self) -> FadePolicy {
        self.fade_policy
    }

    pub fn set_fade_policy(&mut self, policy: FadePolicy) {
        self.fade_policy = policy;
    }

    pub fn display_transform(&self) -> Affine3A {
        self.display_transform
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}
