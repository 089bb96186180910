//! On-disk rescue document.
//!
//! When a batch cannot be written to the store, the worker writes the whole
//! batch and the insert error into one `audit_rescue_*.json` file. The
//! recovery tool reads the same shape back.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::AuditEvent;
use crate::timestamp;

/// Filename prefix shared by every rescue file.
pub const RESCUE_FILE_PREFIX: &str = "audit_rescue_";

/// Glob matched by the recovery tool.
pub const RESCUE_FILE_PATTERN: &str = "audit_rescue_*.json";

/// A failed batch persisted for deferred recovery.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RescueDocument {
    /// Store error captured when the flush failed.
    pub error: String,
    #[serde(with = "timestamp::seconds")]
    #[schemars(with = "String")]
    pub failed_at: DateTime<Utc>,
    /// The batch, in arrival order.
    pub data: Vec<AuditEvent>,
}

impl RescueDocument {
    #[must_use]
    pub fn new(error: impl Into<String>, data: Vec<AuditEvent>) -> Self {
        Self {
            error: error.into(),
            failed_at: timestamp::now(),
            data,
        }
    }
}
