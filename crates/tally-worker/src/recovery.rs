//! Re-insert rescued batches.
//!
//! Each rescue file is restored as one all-or-nothing bulk insert and
//! deleted only after that insert succeeds. Files that cannot be read or
//! restored stay on disk for the next run.

use std::path::Path;

use serde::Deserialize;
use tally_core::AuditEvent;
use tally_core::reports::RecoveryReport;
use tally_db::AuditStore;
use tracing::{error, info, warn};

use crate::error::WorkerError;
use crate::rescue::RescueStore;

/// Loose view of a rescue file. Only `data` matters for recovery.
#[derive(Deserialize)]
struct RescueFile {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
}

/// What reading one rescue file produced.
enum Loaded {
    Events(Vec<AuditEvent>),
    /// Unparsable, or no `data` to restore.
    Skip(String),
}

pub struct Recovery;

impl Recovery {
    /// Restore every rescue file in `rescue`, in file-name order.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Io` only if the rescue directory cannot be
    /// listed. Per-file problems are logged and counted in the report.
    pub async fn run<S: AuditStore>(
        store: &S,
        rescue: &RescueStore,
    ) -> Result<RecoveryReport, WorkerError> {
        let files = rescue.list()?;
        let mut report = RecoveryReport {
            files_found: u32::try_from(files.len()).unwrap_or(u32::MAX),
            ..RecoveryReport::default()
        };

        if files.is_empty() {
            info!(dir = %rescue.dir().display(), "No rescue files found.");
            return Ok(report);
        }
        info!("Found {} rescue files. Starting recovery...", files.len());

        for path in &files {
            let file = display_name(path);

            let events = match load(path, &file) {
                Ok(Loaded::Events(events)) => events,
                Ok(Loaded::Skip(reason)) => {
                    warn!(%file, %reason, "Skipping empty/invalid file");
                    report.files_skipped += 1;
                    continue;
                }
                Err(error) => {
                    error!(%error, "Recovery failed");
                    report.files_failed += 1;
                    continue;
                }
            };

            if let Err(source) = store.bulk_insert(&events).await {
                let error = WorkerError::Recovery {
                    file,
                    reason: source.to_string(),
                };
                error!(%error, "Recovery failed");
                report.files_failed += 1;
                continue;
            }

            let count = events.len();
            report.files_restored += 1;
            report.events_restored += count as u64;
            info!(%file, count, "Restored {count} logs from {file}");

            if let Err(error) = rescue.remove(path) {
                error!(%file, %error, "Restored file could not be deleted, its events may be restored twice");
            }
        }

        info!(
            files_restored = report.files_restored,
            files_skipped = report.files_skipped,
            files_failed = report.files_failed,
            "Recovery complete. Total restored: {}",
            report.events_restored
        );
        Ok(report)
    }
}

fn load(path: &Path, file: &str) -> Result<Loaded, WorkerError> {
    let content = std::fs::read_to_string(path).map_err(|e| WorkerError::Recovery {
        file: file.to_string(),
        reason: e.to_string(),
    })?;

    let records = match serde_json::from_str::<RescueFile>(&content) {
        Ok(RescueFile {
            data: Some(records),
        }) if !records.is_empty() => records,
        Ok(_) => return Ok(Loaded::Skip("no data to restore".into())),
        Err(e) => return Ok(Loaded::Skip(e.to_string())),
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value::<AuditEvent>(record).map_err(|e| WorkerError::Recovery {
                file: file.to_string(),
                reason: format!("record {index}: {e}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Loaded::Events)
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{sample_event, test_db};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn rescue_store() -> (TempDir, RescueStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RescueStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn write_raw(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn nothing_to_recover() {
        let db = test_db().await;
        let (_dir, rescue) = rescue_store();

        let report = Recovery::run(&db, &rescue).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(report, RecoveryReport::default());
    }

    #[tokio::test]
    async fn restores_and_deletes_file() {
        let db = test_db().await;
        let (_dir, rescue) = rescue_store();
        let batch = vec![sample_event("1"), sample_event("2")];
        let path = rescue.write("database is locked", &batch).unwrap();

        let report = Recovery::run(&db, &rescue).await.unwrap();

        assert_eq!(report.files_found, 1);
        assert_eq!(report.files_restored, 1);
        assert_eq!(report.events_restored, 2);
        assert!(!path.exists());
        for event in &batch {
            assert_eq!(db.get_event(&event.id).await.unwrap().as_ref(), Some(event));
        }
    }

    #[tokio::test]
    async fn second_run_is_a_noop() {
        let db = test_db().await;
        let (_dir, rescue) = rescue_store();
        rescue.write("boom", &[sample_event("1")]).unwrap();

        Recovery::run(&db, &rescue).await.unwrap();
        let again = Recovery::run(&db, &rescue).await.unwrap();

        assert!(again.is_empty());
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_and_unparsable_files_are_skipped_and_kept() {
        let db = test_db().await;
        let (dir, rescue) = rescue_store();
        let empty = write_raw(
            &dir,
            "audit_rescue_2026-01-01_00-00-00_00000001.json",
            r#"{"error":"x","failed_at":"2026-01-01 00:00:00","data":[]}"#,
        );
        let no_data = write_raw(
            &dir,
            "audit_rescue_2026-01-01_00-00-00_00000002.json",
            r#"{"error":"x"}"#,
        );
        let garbage = write_raw(
            &dir,
            "audit_rescue_2026-01-01_00-00-00_00000003.json",
            "{ truncated",
        );

        let report = Recovery::run(&db, &rescue).await.unwrap();

        assert_eq!(report.files_found, 3);
        assert_eq!(report.files_skipped, 3);
        assert_eq!(report.files_restored, 0);
        assert!(empty.exists() && no_data.exists() && garbage.exists());
    }

    #[tokio::test]
    async fn undecodable_record_fails_whole_file() {
        let db = test_db().await;
        let (dir, rescue) = rescue_store();
        let good = serde_json::to_value(sample_event("1")).unwrap();
        let content = serde_json::json!({
            "error": "x",
            "failed_at": "2026-01-01 00:00:00",
            "data": [good, {"id": "broken"}],
        });
        let path = write_raw(
            &dir,
            "audit_rescue_2026-01-01_00-00-00_0000000a.json",
            &content.to_string(),
        );

        let report = Recovery::run(&db, &rescue).await.unwrap();

        assert_eq!(report.files_failed, 1);
        assert!(path.exists());
        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_insert_keeps_file_and_continues() {
        let db = test_db().await;
        let (_dir, rescue) = rescue_store();

        let stored = sample_event("1");
        db.bulk_insert(std::slice::from_ref(&stored)).await.unwrap();
        let conflicting = rescue.write("boom", &[sample_event("2"), stored]).unwrap();
        let fine = rescue.write("boom", &[sample_event("3")]).unwrap();

        let report = Recovery::run(&db, &rescue).await.unwrap();

        assert_eq!(report.files_found, 2);
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.files_restored, 1);
        assert_eq!(report.events_restored, 1);
        assert!(conflicting.exists());
        assert!(!fine.exists());
        assert_eq!(db.count().await.unwrap(), 2);
    }
}
