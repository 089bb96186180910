//! Audit store.
//!
//! Append-only `audits` table. Writes are batch-shaped: a bulk insert either
//! stores every row or none of them.

use std::future::Future;

use chrono::{DateTime, Utc};
use tally_core::{AuditEvent, timestamp};

use crate::TallyDb;
use crate::error::DatabaseError;
use crate::helpers::{EVENT_COLUMNS, event_from_row};

const INSERT_EVENT: &str = "INSERT INTO audits (id, event, subject_type, subject_id, actor_id, url, ip_address, user_agent, old_values, new_values, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

/// Relational persistence for audit events.
pub trait AuditStore {
    /// Insert every event, or none of them.
    ///
    /// Fails as a whole on any constraint violation (e.g. a duplicate id).
    fn bulk_insert(
        &self,
        events: &[AuditEvent],
    ) -> impl Future<Output = Result<(), DatabaseError>>;

    /// Delete events created strictly before `cutoff`. Returns the number removed.
    fn delete_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DatabaseError>>;
}

impl<T: AuditStore> AuditStore for &T {
    fn bulk_insert(
        &self,
        events: &[AuditEvent],
    ) -> impl Future<Output = Result<(), DatabaseError>> {
        (**self).bulk_insert(events)
    }

    fn delete_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DatabaseError>> {
        (**self).delete_before(cutoff)
    }
}

impl AuditStore for TallyDb {
    async fn bulk_insert(&self, events: &[AuditEvent]) -> Result<(), DatabaseError> {
        if events.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction().await?;
        match insert_all(&tx, events).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(%rollback_error, "audit bulk insert rollback failed");
                }
                Err(error)
            }
        }
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM audits WHERE created_at < ?1",
                [timestamp::format(&cutoff)],
            )
            .await?;
        Ok(deleted)
    }
}

async fn insert_all(tx: &libsql::Transaction, events: &[AuditEvent]) -> Result<(), DatabaseError> {
    for event in events {
        let old_values = serde_json::to_string(&event.old_values)?;
        let new_values = serde_json::to_string(&event.new_values)?;
        tx.execute(
            INSERT_EVENT,
            libsql::params![
                event.id.as_str(),
                event.event.as_str(),
                event.subject_type.as_str(),
                event.subject_id.as_str(),
                event.actor_id.as_deref(),
                event.context.url.as_deref(),
                event.context.ip_address.as_deref(),
                event.context.user_agent.as_deref(),
                old_values,
                new_values,
                timestamp::format(&event.created_at)
            ],
        )
        .await?;
    }
    Ok(())
}

impl TallyDb {
    /// Number of stored events.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count(&self) -> Result<u64, DatabaseError> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM audits", ()).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        u64::try_from(row.get::<i64>(0)?).map_err(|e| DatabaseError::Query(e.to_string()))
    }

    /// Fetch a single event by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or the row is malformed.
    pub async fn get_event(&self, id: &str) -> Result<Option<AuditEvent>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM audits WHERE id = ?1"),
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(event_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// History of one subject, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row is malformed.
    pub async fn events_for_subject(
        &self,
        subject_type: &str,
        subject_id: &str,
    ) -> Result<Vec<AuditEvent>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM audits
                     WHERE subject_type = ?1 AND subject_id = ?2
                     ORDER BY created_at DESC, rowid DESC"
                ),
                [subject_type, subject_id],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(event_from_row(&row)?);
        }
        Ok(events)
    }
}
