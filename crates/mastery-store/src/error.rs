//! Store error types.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use mastery_core::MasteryError;

/// Errors from the storage layer and ingestion.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The engine rejected the input or the stored state.
    #[error(transparent)]
    Core(#[from] MasteryError),

    /// A compare-and-swap write found a different version than expected.
    #[error("version conflict for user {user_id} topic '{topic}': expected {expected:?}, found {found:?}")]
    Conflict {
        user_id: Uuid,
        topic: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns `true` if re-reading and recomputing may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
