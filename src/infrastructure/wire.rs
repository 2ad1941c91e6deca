//! Wire frame for graph diffs
//!
//! A [`DiffEnvelope`] carries one [`GraphDiff`] between processes together
//! with its origin, send time and a blake3 checksum of the diff's JSON form.
//! Receivers decode the frame and hand the diff to
//! [`GraphStateManager::merge_change`](crate::aggregate::GraphStateManager::merge_change).

use crate::events::GraphDiff;
use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const WIRE_FORMAT_VERSION: u16 = 1;

const CHECKSUM_DOMAIN: &[u8] = b"graph-diff:";

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("Malformed diff frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Unsupported wire format version {0}")]
    UnsupportedVersion(u16),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEnvelope {
    pub format_version: u16,
    /// Source graph of the diff
    pub origin: Uuid,
    pub sent_at: DateTime<Utc>,
    /// Hex blake3 of the diff's JSON encoding
    pub checksum: String,
    pub diff: GraphDiff,
}

impl DiffEnvelope {
    pub fn new(origin: Uuid, diff: GraphDiff) -> Result<Self, WireError> {
        Ok(Self {
            format_version: WIRE_FORMAT_VERSION,
            origin,
            sent_at: Utc::now(),
            checksum: checksum(&diff)?,
            diff,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a frame, rejecting unknown versions and corrupted diffs
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let envelope: DiffEnvelope = serde_json::from_slice(bytes)?;
        if envelope.format_version != WIRE_FORMAT_VERSION {
            return Err(WireError::UnsupportedVersion(envelope.format_version));
        }

        let actual = checksum(&envelope.diff)?;
        if actual != envelope.checksum {
            return Err(WireError::ChecksumMismatch {
                expected: envelope.checksum,
                actual,
            });
        }
        Ok(envelope)
    }

    pub fn into_diff(self) -> GraphDiff {
        self.diff
    }
}

fn checksum(diff: &GraphDiff) -> Result<String, WireError> {
    let mut hasher = Hasher::new();
    hasher.update(CHECKSUM_DOMAIN);
    hasher.update(&serde_json::to_vec(diff)?);
    Ok(hasher.finalize().to_hex().to_string())
}
