//! Durable FIFO queue on the `audit_queue` table.
//!
//! Push appends a row; pop deletes the oldest row for the queue key and
//! returns its payload in one statement. `SQLite` runs each statement
//! atomically under the database write lock, so two workers sharing the
//! database file can never pop the same item.

use std::future::Future;

use tally_core::timestamp;

use crate::TallyDb;
use crate::error::DatabaseError;

const POP_HEAD: &str = "DELETE FROM audit_queue
     WHERE seq = (SELECT seq FROM audit_queue WHERE queue_key = ?1 ORDER BY seq LIMIT 1)
     RETURNING payload";

/// Durable FIFO of serialized events.
pub trait AuditQueue {
    /// Append a payload at the tail.
    fn push(&self, payload: &str) -> impl Future<Output = Result<(), DatabaseError>>;

    /// Atomically remove and return the head, or `None` when empty.
    fn pop(&self) -> impl Future<Output = Result<Option<String>, DatabaseError>>;
}

impl<T: AuditQueue> AuditQueue for &T {
    fn push(&self, payload: &str) -> impl Future<Output = Result<(), DatabaseError>> {
        (**self).push(payload)
    }

    fn pop(&self) -> impl Future<Output = Result<Option<String>, DatabaseError>> {
        (**self).pop()
    }
}

/// libSQL-backed queue scoped to one queue key.
pub struct SqlQueue {
    conn: libsql::Connection,
    key: String,
    // Keeps a separately opened queue database alive.
    _owned: Option<TallyDb>,
}

impl SqlQueue {
    /// Queue living in the store database.
    #[must_use]
    pub fn shared(db: &TallyDb, key: impl Into<String>) -> Self {
        Self {
            conn: db.conn().clone(),
            key: key.into(),
            _owned: None,
        }
    }

    /// Queue living in its own database file.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn open(path: &str, key: impl Into<String>) -> Result<Self, DatabaseError> {
        let db = TallyDb::open_local(path).await?;
        Ok(Self {
            conn: db.conn().clone(),
            key: key.into(),
            _owned: Some(db),
        })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of items waiting under this key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn len(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM audit_queue WHERE queue_key = ?1",
                [self.key.as_str()],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        u64::try_from(row.get::<i64>(0)?).map_err(|e| DatabaseError::Query(e.to_string()))
    }

    /// Whether no items are waiting under this key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn is_empty(&self) -> Result<bool, DatabaseError> {
        Ok(self.len().await? == 0)
    }
}

impl AuditQueue for SqlQueue {
    async fn push(&self, payload: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO audit_queue (queue_key, payload, enqueued_at) VALUES (?1, ?2, ?3)",
                libsql::params![
                    self.key.as_str(),
                    payload,
                    timestamp::format(&timestamp::now())
                ],
            )
            .await?;
        Ok(())
    }

    async fn pop(&self) -> Result<Option<String>, DatabaseError> {
        let mut rows = self.conn.query(POP_HEAD, [self.key.as_str()]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }
}
