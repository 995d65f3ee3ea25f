//! Failures while storing or rebuilding an instance snapshot.

use std::fmt;
use thiserror::Error;

/// Wire format a snapshot is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Binary,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("JSON"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("cannot encode snapshot of instance {instance_id} as {format}: {reason}")]
    Encode {
        instance_id: String,
        format: Format,
        reason: String,
    },

    /// The bytes are not a snapshot at all, so no instance id is known.
    #[error("cannot decode {format} instance snapshot: {reason}")]
    Decode { format: Format, reason: String },

    #[error(
        "snapshot of instance {instance_id} uses format version {found}, this build reads version {supported}"
    )]
    UnsupportedVersion {
        instance_id: String,
        found: u32,
        supported: u32,
    },
}
