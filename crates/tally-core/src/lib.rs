//! # tally-core
//!
//! Core types shared across all Tally crates.
//!
//! This crate provides:
//! - The `AuditEvent` record and its JSON wire format
//! - Producer-side builders and the changed-field diff
//! - Event kind and dispatch mode enums
//! - The on-disk rescue document shape
//! - Second-precision timestamp serde helpers
//! - Report types returned by the worker, recovery and prune tools
//! - Cross-cutting error types

pub mod changes;
pub mod enums;
pub mod errors;
pub mod event;
pub mod reports;
pub mod rescue;
pub mod timestamp;

pub use enums::{DispatchMode, EventKind};
pub use errors::CoreError;
pub use event::{AuditEvent, RequestContext, ValueMap};
pub use rescue::RescueDocument;
