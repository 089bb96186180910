//! Worker-side error taxonomy.
//!
//! Only [`WorkerError::RescueWrite`] is fatal for a running worker. Every
//! other variant is logged and recovered from locally.

use thiserror::Error;

use tally_db::DatabaseError;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// A popped item is not a valid event payload. Discarded.
    #[error("Invalid payload {preview:?}: {source}")]
    Serialization {
        preview: String,
        #[source]
        source: serde_json::Error,
    },

    /// Enqueue or direct insert failed at the producer boundary. Event dropped.
    #[error("Dispatch of event {id} failed: {reason}")]
    Dispatch { id: String, reason: String },

    /// Bulk insert of a batch failed. The batch goes to a rescue file.
    #[error("Flush of {count} events failed: {source}")]
    Flush {
        count: usize,
        #[source]
        source: DatabaseError,
    },

    /// Re-insert of a rescue file failed. The file is kept.
    #[error("Failed to restore {file}: {reason}")]
    Recovery { file: String, reason: String },

    /// Unexpected per-iteration fault in the worker loop.
    #[error("Worker error: {source}")]
    Transient {
        #[source]
        source: DatabaseError,
    },

    /// The rescue file could not be written. There is no further fallback.
    #[error("Rescue write to {dir} failed: {reason}")]
    RescueWrite { dir: String, reason: String },

    /// The retention window puts the prune cutoff outside the supported
    /// date range.
    #[error("Retention of {days} days is out of range")]
    InvalidRetention { days: u32 },

    /// Store failure outside the worker loop (e.g. prune).
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Glob(#[from] globset::Error),
}

impl WorkerError {
    /// Whether a running worker must stop on this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::RescueWrite { .. })
    }
}
