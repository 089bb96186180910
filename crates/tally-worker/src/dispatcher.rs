//! Producer-side dispatcher.
//!
//! Hands a finished event either straight to the store (`direct`) or to the
//! queue tail (`queued`). Failures never reach the caller: an audit problem
//! must not break the business operation that produced the event.

use serde::Serialize;
use tally_core::{AuditEvent, DispatchMode};
use tally_db::{AuditQueue, AuditStore};
use tracing::{debug, error};

use crate::error::WorkerError;

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Written to the store immediately.
    Inserted,
    /// Appended to the queue tail.
    Enqueued,
    /// Invalid or undeliverable. Logged and discarded.
    Dropped,
}

pub struct Dispatcher<Q, S> {
    mode: DispatchMode,
    queue: Q,
    store: S,
}

impl<Q: AuditQueue, S: AuditStore> Dispatcher<Q, S> {
    pub const fn new(mode: DispatchMode, queue: Q, store: S) -> Self {
        Self { mode, queue, store }
    }

    #[must_use]
    pub const fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Deliver one event according to the configured mode.
    ///
    /// Returns [`DispatchOutcome::Dropped`] instead of an error when the
    /// event is invalid or the backend fails.
    pub async fn push(&self, event: &AuditEvent) -> DispatchOutcome {
        match self.try_push(event).await {
            Ok(outcome) => {
                debug!(id = %event.id, mode = %self.mode, ?outcome, "audit event dispatched");
                outcome
            }
            Err(error) => {
                error!(%error, mode = %self.mode, "audit event dropped");
                DispatchOutcome::Dropped
            }
        }
    }

    async fn try_push(&self, event: &AuditEvent) -> Result<DispatchOutcome, WorkerError> {
        let dispatch_error = |reason: String| WorkerError::Dispatch {
            id: event.id.clone(),
            reason,
        };

        event.validate().map_err(|e| dispatch_error(e.to_string()))?;

        match self.mode {
            DispatchMode::Direct => {
                self.store
                    .bulk_insert(std::slice::from_ref(event))
                    .await
                    .map_err(|e| dispatch_error(e.to_string()))?;
                Ok(DispatchOutcome::Inserted)
            }
            DispatchMode::Queued => {
                let payload = event.to_wire().map_err(|e| dispatch_error(e.to_string()))?;
                self.queue
                    .push(&payload)
                    .await
                    .map_err(|e| dispatch_error(e.to_string()))?;
                Ok(DispatchOutcome::Enqueued)
            }
        }
    }
}
