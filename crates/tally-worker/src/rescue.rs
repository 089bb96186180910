//! Rescue file store.
//!
//! A batch that cannot be written to the store is persisted as one
//! `audit_rescue_{YYYY-mm-dd_HH-MM-SS}_{8 hex}.json` file. Files appear
//! atomically: the document is written to a hidden temp file in the same
//! directory, fsynced, then renamed without clobbering an existing file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use tally_core::AuditEvent;
use tally_core::rescue::{RESCUE_FILE_PATTERN, RESCUE_FILE_PREFIX};
use tally_core::timestamp;

use crate::error::WorkerError;

/// Name collisions are retried with a fresh suffix this many times.
const PERSIST_ATTEMPTS: usize = 5;

/// Borrowed view of a `RescueDocument`, so writing never clones the batch.
#[derive(Serialize)]
struct RescueDocumentRef<'a> {
    error: &'a str,
    #[serde(with = "timestamp::seconds")]
    failed_at: DateTime<Utc>,
    data: &'a [AuditEvent],
}

/// The directory holding rescue files.
#[derive(Debug, Clone)]
pub struct RescueStore {
    dir: PathBuf,
    matcher: GlobMatcher,
}

impl RescueStore {
    /// Point at a rescue directory. The directory is created on first write.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Glob` if the file pattern fails to compile.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, WorkerError> {
        Ok(Self {
            dir: dir.into(),
            matcher: Glob::new(RESCUE_FILE_PATTERN)?.compile_matcher(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a failed batch together with the store error that caused it.
    ///
    /// Returns the path of the new file.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::RescueWrite` if any step of the write fails.
    pub fn write(&self, error: &str, events: &[AuditEvent]) -> Result<PathBuf, WorkerError> {
        let failed_at = timestamp::now();
        let document = RescueDocumentRef {
            error,
            failed_at,
            data: events,
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| self.write_error(&e))?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".audit_rescue-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| self.write_error(&e))?;
        serde_json::to_writer_pretty(&mut tmp, &document).map_err(|e| self.write_error(&e))?;
        tmp.flush().map_err(|e| self.write_error(&e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_error(&e))?;

        let stamp = failed_at.format("%Y-%m-%d_%H-%M-%S");
        for _ in 0..PERSIST_ATTEMPTS {
            let suffix = random_suffix().map_err(|e| self.write_error(&e))?;
            let path = self
                .dir
                .join(format!("{RESCUE_FILE_PREFIX}{stamp}_{suffix}.json"));
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    tmp = err.file;
                }
                Err(err) => return Err(self.write_error(&err.error)),
            }
        }
        Err(self.write_error(&"no free rescue file name"))
    }

    /// Rescue files currently on disk, sorted by name.
    ///
    /// A missing directory means there is nothing to recover.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Io` if the directory cannot be read.
    pub fn list(&self) -> Result<Vec<PathBuf>, WorkerError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if self.matcher.is_match(entry.file_name()) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Delete a rescue file after its contents were restored.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Io` if the file cannot be removed.
    pub fn remove(&self, path: &Path) -> Result<(), WorkerError> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn write_error(&self, reason: &dyn std::fmt::Display) -> WorkerError {
        WorkerError::RescueWrite {
            dir: self.dir.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

fn random_suffix() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes)?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
