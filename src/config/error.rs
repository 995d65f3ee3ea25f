//! Config loading and validation errors.

use std::fmt;
use std::io;
use thiserror::Error;

/// Which transition table a violation was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    State,
    Substate,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State => f.write_str("state"),
            Self::Substate => f.write_str("substate"),
        }
    }
}

/// A single broken invariant in a state graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphViolation {
    #[error("{level} '{state}' trigger '{trigger}' targets undeclared state '{to_state}'")]
    UnknownTarget {
        state: String,
        trigger: String,
        to_state: String,
        level: Level,
    },

    #[error("{level} '{state}' has transition on '{trigger}' which is not a declared event")]
    UndeclaredTrigger {
        state: String,
        trigger: String,
        level: Level,
    },

    #[error("{level} '{state}' declares event '{event}' more than once")]
    DuplicateEvent {
        state: String,
        event: String,
        level: Level,
    },
}

/// Errors that can occur while loading a state graph.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{source_id}': {error}")]
    Read {
        source_id: String,
        #[source]
        error: io::Error,
    },

    #[error("Failed to parse config '{source_id}': {error}")]
    Parse {
        source_id: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("Config '{source_id}' failed validation: {}", join(.violations))]
    Validation {
        source_id: String,
        violations: Vec<GraphViolation>,
    },
}

impl ConfigError {
    /// Violations carried by a validation failure; empty otherwise.
    pub fn violations(&self) -> &[GraphViolation] {
        match self {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}

fn join(violations: &[GraphViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
