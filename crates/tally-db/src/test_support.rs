//! Shared test utilities for tally-db tests.

pub(crate) mod helpers {
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use tally_core::AuditEvent;

    use crate::TallyDb;

    /// Fresh in-memory database with migrations applied.
    pub async fn test_db() -> TallyDb {
        TallyDb::open_local(":memory:").await.unwrap()
    }

    /// A valid `created` event for `User/{subject_id}`.
    pub fn sample_event(subject_id: &str) -> AuditEvent {
        let attrs = json!({"name": format!("user {subject_id}")});
        AuditEvent::created("User", subject_id, attrs.as_object().unwrap())
    }

    /// A sample event stamped at `created_at`.
    pub fn event_at(created_at: DateTime<Utc>) -> AuditEvent {
        let mut event = sample_event("1");
        event.created_at = tally_core::timestamp::truncate(created_at);
        event
    }
}
