//! Snapshot and restore of instance state.
//!
//! A snapshot captures everything an `Instance` mutates so a registry can
//! store it wherever it keeps node records and rebuild the instance later
//! with `StateMachine::restore_instance`. Hooks and observers are not part
//! of a snapshot; they belong to the engine that restores it.

use crate::core::EventHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::{CheckpointError, Format};

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable copy of one instance's runtime state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: String,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Config source the instance's graph was loaded from
    pub source: String,

    pub instance_id: String,
    pub state: String,
    pub substate: String,
    pub expected_events: Vec<String>,

    /// Timeout in seconds declared by the last transition that fired
    pub pending_timeout: Option<u64>,

    /// When the instance last changed state
    pub entered_at: DateTime<Utc>,

    pub history: EventHistory,
}

impl InstanceSnapshot {
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string(self).map_err(|e| self.encode_error(Format::Json, e))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| decode_error(Format::Json, e))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| self.encode_error(Format::Binary, e))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let snapshot: Self =
            bincode::deserialize(bytes).map_err(|e| decode_error(Format::Binary, e))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Reject snapshots written by a different format version.
    pub fn check_version(&self) -> Result<(), CheckpointError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                instance_id: self.instance_id.clone(),
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }

    fn encode_error(&self, format: Format, error: impl std::fmt::Display) -> CheckpointError {
        CheckpointError::Encode {
            instance_id: self.instance_id.clone(),
            format,
            reason: error.to_string(),
        }
    }
}

fn decode_error(format: Format, error: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Decode {
        format,
        reason: error.to_string(),
    }
}
