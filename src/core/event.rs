//! Audit record emitted after every committed transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event name used for administrative overrides.
pub const MANUAL_TRANSITION: &str = "manual_transition";

/// What happened to one instance, as seen by observers.
///
/// An event is produced even when the trigger matched nothing, in which
/// case the old and new fields are equal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub instance_id: String,
    pub old_state: String,
    pub new_state: String,
    pub old_substate: String,
    pub new_substate: String,
}

impl Event {
    /// True when neither the main state nor the sub-state moved.
    pub fn is_noop(&self) -> bool {
        self.old_state == self.new_state && self.old_substate == self.new_substate
    }

    pub fn is_manual(&self) -> bool {
        self.name == MANUAL_TRANSITION
    }
}
