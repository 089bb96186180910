//! # tally-db
//!
//! libSQL-backed primitives for Tally.
//!
//! - The `audits` table behind the [`AuditStore`] trait: all-or-nothing bulk
//!   insert, range delete, and subject lookups.
//! - The `audit_queue` table behind the [`AuditQueue`] trait: a durable FIFO
//!   whose pop is a single `DELETE … RETURNING`, so concurrent workers never
//!   receive the same item.
//!
//! Uses the `libsql` crate (C `SQLite` fork) in local mode.

pub mod error;
pub mod helpers;
mod migrations;
pub mod queue;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::DatabaseError;
pub use queue::{AuditQueue, SqlQueue};
pub use store::AuditStore;

use libsql::Builder;

/// How long a connection waits on a locked database file before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Database handle for the audit store.
pub struct TallyDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl TallyDb {
    /// Open a local database at the given path (`":memory:"` for tests).
    ///
    /// Runs migrations automatically.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && path != ":memory:"
        {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Other(e.into()))?;
        }

        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Several workers may share one file; wait on locks instead of failing.
        let mut rows = conn
            .query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"), ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}")))?;
        rows.next()
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}")))?;
        drop(rows);

        let tally_db = Self { db, conn };
        tally_db.run_migrations().await?;
        Ok(tally_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}
