//! Report types returned by `tally work`, `tally recover` and `tally prune`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp;

/// Counters accumulated over one worker run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct WorkSummary {
    pub loops: u64,
    /// Items popped that parsed as events.
    pub received: u64,
    /// Items popped that failed to parse and were discarded.
    pub skipped: u64,
    pub flushes: u64,
    pub events_flushed: u64,
    pub rescues: u64,
    pub events_rescued: u64,
    pub transient_errors: u64,
}

/// Outcome of one recovery pass over the rescue directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RecoveryReport {
    pub files_found: u32,
    pub files_restored: u32,
    /// Unparsable or empty files, left in place.
    pub files_skipped: u32,
    /// Files whose re-insert failed, left in place.
    pub files_failed: u32,
    pub events_restored: u64,
}

impl RecoveryReport {
    /// True when nothing was found to recover.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.files_found == 0
    }
}

/// Outcome of one prune run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PruneReport {
    pub retention_days: u32,
    #[serde(with = "timestamp::seconds")]
    #[schemars(with = "String")]
    pub cutoff: DateTime<Utc>,
    pub deleted: u64,
}
