//! Mastery engine error types.
//!
//! The engine is pure and deterministic, so every error here points at a
//! caller or data problem. Nothing is retried or silently corrected.

use thiserror::Error;

/// Errors raised by the mastery engine and its policies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MasteryError {
    /// A difficulty label (or other static table key) is unknown.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stored state is outside its invariants (corrupted upstream).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A request or attempt payload is malformed.
    #[error("validation error: {0}")]
    Validation(String),
}

impl MasteryError {
    /// Returns `true` if the error signals corrupted stored state rather
    /// than a bad request.
    pub fn is_corruption(&self) -> bool {
        matches!(self, MasteryError::InvariantViolation(_))
    }

    /// Suggested HTTP status for a handler translating this error.
    pub fn http_status(&self) -> u16 {
        match self {
            MasteryError::Validation(_) => 400,
            MasteryError::Configuration(_) | MasteryError::InvariantViolation(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, MasteryError>;
