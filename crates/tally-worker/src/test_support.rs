//! Shared test utilities for tally-worker tests.

pub(crate) mod helpers {
    use serde_json::json;
    use tally_core::AuditEvent;
    use tally_db::{AuditQueue, DatabaseError, SqlQueue, TallyDb};

    /// Fresh in-memory database with migrations applied.
    pub async fn test_db() -> TallyDb {
        TallyDb::open_local(":memory:").await.unwrap()
    }

    /// Queue sharing the test database.
    pub fn test_queue(db: &TallyDb) -> SqlQueue {
        SqlQueue::shared(db, "audit_pkg:buffer")
    }

    /// A valid `created` event for `User/{subject_id}`.
    pub fn sample_event(subject_id: &str) -> AuditEvent {
        let attrs = json!({"name": format!("user {subject_id}")});
        AuditEvent::created("User", subject_id, attrs.as_object().unwrap())
    }

    /// Queue whose every operation fails, as if the backend went away.
    pub struct BrokenQueue;

    impl AuditQueue for BrokenQueue {
        async fn push(&self, _payload: &str) -> Result<(), DatabaseError> {
            Err(DatabaseError::Query("connection reset by peer".into()))
        }

        async fn pop(&self) -> Result<Option<String>, DatabaseError> {
            Err(DatabaseError::Query("connection reset by peer".into()))
        }
    }
}
