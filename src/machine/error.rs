//! Errors returned by engines and instances.

use crate::checkpoint::CheckpointError;
use crate::config::{ConfigError, Level};
use crate::machine::hooks::{HookFailure, HookPhase};
use thiserror::Error;

/// Errors that can occur when creating instances or applying transitions.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot create instance '{instance_id}': state '{state}' is not declared in '{source_id}'")]
    InstanceCreation {
        instance_id: String,
        state: String,
        source_id: String,
    },

    #[error("Instance '{instance_id}' rejected {level} trigger '{event}': expected '{expected}'")]
    TransitionRejected {
        instance_id: String,
        event: String,
        expected: String,
        level: Level,
    },

    #[error("{phase} hook of state '{state}' failed for instance '{instance_id}': {error}")]
    Hook {
        instance_id: String,
        state: String,
        phase: HookPhase,
        #[source]
        error: HookFailure,
    },

    #[error("Instance '{instance_id}' refers to unknown state '{state}'")]
    UnknownState { instance_id: String, state: String },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl MachineError {
    /// Whether the instance was left untouched by the failed call.
    ///
    /// Only an entry-hook failure happens after the new state is committed.
    pub fn left_unchanged(&self) -> bool {
        !matches!(
            self,
            Self::Hook {
                phase: HookPhase::Entry,
                ..
            }
        )
    }
}
