//! The audit event record.
//!
//! One `AuditEvent` describes a single entity mutation. It is the unit that
//! travels through the queue, sits in a worker batch, lands in the store, and
//! is written to rescue files, always in the same JSON shape.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::changes::{diff_changes, is_bookkeeping, without_bookkeeping};
use crate::enums::EventKind;
use crate::errors::CoreError;
use crate::timestamp;

/// Ordered field name → value mapping for old/new payloads.
///
/// The set of fields varies per subject type, so values stay opaque JSON.
pub type ValueMap = serde_json::Map<String, serde_json::Value>;

/// Where a mutation came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RequestContext {
    pub url: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Marker used when a mutation does not originate from an interactive request.
    #[must_use]
    pub fn non_interactive() -> Self {
        Self {
            url: Some("console".to_string()),
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: Some("CLI".to_string()),
        }
    }
}

/// A single recorded entity mutation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuditEvent {
    /// UUID v4, generated when the event is built.
    pub id: String,
    pub event: EventKind,
    pub subject_type: String,
    pub subject_id: String,
    pub actor_id: Option<String>,
    #[serde(flatten)]
    pub context: RequestContext,
    #[serde(default)]
    pub old_values: ValueMap,
    #[serde(default)]
    pub new_values: ValueMap,
    #[serde(with = "timestamp::seconds")]
    #[schemars(with = "String")]
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Build an event with a fresh id, the current second, no actor, and the
    /// non-interactive request context.
    #[must_use]
    pub fn new(
        event: EventKind,
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        old_values: ValueMap,
        new_values: ValueMap,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event,
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
            actor_id: None,
            context: RequestContext::non_interactive(),
            old_values,
            new_values,
            created_at: timestamp::now(),
        }
    }

    /// Event for a newly created entity. `attributes` is its full state.
    #[must_use]
    pub fn created(
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        attributes: &ValueMap,
    ) -> Self {
        Self::new(
            EventKind::Created,
            subject_type,
            subject_id,
            ValueMap::new(),
            without_bookkeeping(attributes),
        )
    }

    /// Event for an updated entity, or `None` when only bookkeeping fields
    /// (or nothing at all) changed.
    #[must_use]
    pub fn updated(
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        before: &ValueMap,
        after: &ValueMap,
    ) -> Option<Self> {
        let (old_values, new_values) = diff_changes(before, after);
        if new_values.is_empty() {
            return None;
        }
        Some(Self::new(
            EventKind::Updated,
            subject_type,
            subject_id,
            old_values,
            new_values,
        ))
    }

    /// Event for a deleted entity. `attributes` is its last known state.
    #[must_use]
    pub fn deleted(
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        attributes: &ValueMap,
    ) -> Self {
        Self::new(
            EventKind::Deleted,
            subject_type,
            subject_id,
            without_bookkeeping(attributes),
            ValueMap::new(),
        )
    }

    #[must_use]
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Check the kind-specific shape of the old/new payloads.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidEvent` describing the first violation.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason: &str| {
            Err(CoreError::InvalidEvent {
                id: self.id.clone(),
                reason: reason.to_string(),
            })
        };

        if self.id.is_empty() {
            return invalid("id is empty");
        }
        if self.subject_type.is_empty() {
            return invalid("subject_type is empty");
        }

        match self.event {
            EventKind::Created if !self.old_values.is_empty() => {
                invalid("created event carries old_values")
            }
            EventKind::Deleted if !self.new_values.is_empty() => {
                invalid("deleted event carries new_values")
            }
            EventKind::Updated => {
                if self.new_values.is_empty() {
                    return invalid("updated event has no changed fields");
                }
                let same_keys = self.old_values.len() == self.new_values.len()
                    && self.old_values.keys().all(|k| self.new_values.contains_key(k));
                if !same_keys {
                    return invalid("old_values and new_values key sets differ");
                }
                if self.new_values.keys().any(|k| is_bookkeeping(k)) {
                    return invalid("bookkeeping timestamp recorded as a change");
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Serialize to the queue wire format.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a queue payload.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed or
    /// incomplete payloads.
    pub fn from_wire(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
