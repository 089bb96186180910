//! Cross-cutting error types for Tally.
//!
//! Domain-specific errors (`DatabaseError`, `WorkerError`, `ConfigError`) live
//! in their own crates. The CLI converges everything into `anyhow`.

use thiserror::Error;

/// Errors that can be raised while building or checking core records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An event violates the kind/value-map invariants.
    #[error("Invalid audit event {id}: {reason}")]
    InvalidEvent { id: String, reason: String },

    /// A timestamp string matched none of the accepted formats.
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
