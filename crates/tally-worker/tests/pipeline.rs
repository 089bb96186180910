//! Producer → queue → worker → store, across real database files.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tally_core::{AuditEvent, DispatchMode, ValueMap};
use tally_db::{AuditQueue, AuditStore, SqlQueue, TallyDb};
use tally_worker::{DispatchOutcome, Dispatcher, Recovery, RescueStore, Worker, WorkerSettings};
use tokio_util::sync::CancellationToken;

fn attrs(value: serde_json::Value) -> ValueMap {
    value.as_object().cloned().unwrap()
}

fn settings(batch_size: usize, max_loops: u64) -> WorkerSettings {
    WorkerSettings {
        batch_size,
        flush_interval: Duration::from_secs(5),
        idle_sleep: Duration::from_millis(1),
        error_pause: Duration::from_millis(1),
        max_loops,
        memory_limit_bytes: 0,
    }
}

#[tokio::test]
async fn queued_events_reach_store_through_separate_queue_database() {
    let dir = tempfile::tempdir().unwrap();
    let store = TallyDb::open_local(&dir.path().join("audit.db").to_string_lossy())
        .await
        .unwrap();
    let queue = SqlQueue::open(&dir.path().join("queue.db").to_string_lossy(), "audit_pkg:buffer")
        .await
        .unwrap();

    let dispatcher = Dispatcher::new(DispatchMode::Queued, &queue, &store);
    let created = AuditEvent::created("User", "1", &attrs(json!({"name": "John"})));
    let updated = AuditEvent::updated(
        "User",
        "1",
        &attrs(json!({"name": "John", "updated_at": "2026-01-01 00:00:00"})),
        &attrs(json!({"name": "Jane", "updated_at": "2026-01-01 00:00:05"})),
    )
    .unwrap()
    .with_actor("42");
    let deleted = AuditEvent::deleted("User", "1", &attrs(json!({"name": "Jane"})));

    for event in [&created, &updated, &deleted] {
        assert_eq!(dispatcher.push(event).await, DispatchOutcome::Enqueued);
    }
    queue.push("garbage").await.unwrap();

    let worker = Worker::new(
        &queue,
        &store,
        RescueStore::new(dir.path().join("rescue")).unwrap(),
        settings(2, 6),
        CancellationToken::new(),
    );
    let summary = worker.run().await.unwrap();

    assert_eq!(summary.received, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.events_flushed, 3);
    assert_eq!(summary.rescues, 0);
    assert!(queue.is_empty().await.unwrap());

    let history = store.events_for_subject("User", "1").await.unwrap();
    assert_eq!(history.len(), 3);
    let stored_update = store.get_event(&updated.id).await.unwrap().unwrap();
    assert_eq!(stored_update.actor_id.as_deref(), Some("42"));
    assert_eq!(stored_update.old_values, attrs(json!({"name": "John"})));
    assert_eq!(stored_update.new_values, attrs(json!({"name": "Jane"})));
}

#[tokio::test]
async fn rescued_batch_is_recovered_once_store_accepts_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = TallyDb::open_local(&dir.path().join("audit.db").to_string_lossy())
        .await
        .unwrap();
    let queue = SqlQueue::shared(&store, "audit_pkg:buffer");
    let rescue = RescueStore::new(dir.path().join("rescue")).unwrap();

    // A duplicate id makes the whole batch fail.
    let first = AuditEvent::created("Post", "7", &attrs(json!({"title": "hello"})));
    let second = AuditEvent::created("Post", "8", &attrs(json!({"title": "world"})));
    store.bulk_insert(std::slice::from_ref(&first)).await.unwrap();
    for event in [&second, &first] {
        queue.push(&event.to_wire().unwrap()).await.unwrap();
    }

    let worker = Worker::new(
        &queue,
        &store,
        rescue.clone(),
        settings(2, 2),
        CancellationToken::new(),
    );
    let summary = worker.run().await.unwrap();
    assert_eq!(summary.events_rescued, 2);
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(rescue.list().unwrap().len(), 1);

    // The conflict still exists, so recovery keeps the file.
    let blocked = Recovery::run(&store, &rescue).await.unwrap();
    assert_eq!(blocked.files_failed, 1);
    assert_eq!(rescue.list().unwrap().len(), 1);

    // Once the conflicting row is pruned, recovery succeeds and is idempotent.
    store
        .conn()
        .execute("DELETE FROM audits WHERE id = ?1", [first.id.as_str()])
        .await
        .unwrap();
    let restored = Recovery::run(&store, &rescue).await.unwrap();
    assert_eq!(restored.files_restored, 1);
    assert_eq!(restored.events_restored, 2);
    assert!(rescue.list().unwrap().is_empty());
    assert_eq!(store.count().await.unwrap(), 2);

    let again = Recovery::run(&store, &rescue).await.unwrap();
    assert!(again.is_empty());
}
