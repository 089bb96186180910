//! Retention pruning.

use chrono::{DateTime, TimeDelta, Utc};
use tally_core::reports::PruneReport;
use tally_core::timestamp;
use tally_db::AuditStore;
use tracing::info;

use crate::error::WorkerError;

/// Delete events older than `retention_days` before now.
///
/// # Errors
///
/// Returns `WorkerError::InvalidRetention` if the cutoff is not a
/// representable date, or `WorkerError::Database` if the delete fails.
pub async fn prune<S: AuditStore>(store: &S, retention_days: u32) -> Result<PruneReport, WorkerError> {
    prune_at(store, retention_days, timestamp::now()).await
}

/// Delete events created strictly before `now - retention_days`.
///
/// # Errors
///
/// Returns `WorkerError::InvalidRetention` if the cutoff is not a
/// representable date, or `WorkerError::Database` if the delete fails.
pub async fn prune_at<S: AuditStore>(
    store: &S,
    retention_days: u32,
    now: DateTime<Utc>,
) -> Result<PruneReport, WorkerError> {
    let cutoff = TimeDelta::try_days(i64::from(retention_days))
        .and_then(|window| now.checked_sub_signed(window))
        .map(timestamp::truncate)
        .ok_or(WorkerError::InvalidRetention {
            days: retention_days,
        })?;
    info!(cutoff = %timestamp::format(&cutoff), "Pruning audits older than {retention_days} days...");

    let deleted = store.delete_before(cutoff).await?;
    info!(deleted, "Deleted {deleted} old audit records.");

    Ok(PruneReport {
        retention_days,
        cutoff,
        deleted,
    })
}
