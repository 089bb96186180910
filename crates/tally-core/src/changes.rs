//! Changed-field extraction for the producer contract.
//!
//! Producers hand over the full attribute maps of an entity before and after
//! a mutation. Only fields whose value changed are recorded, and bookkeeping
//! timestamps are never part of an audit payload.

use serde_json::Value;

use crate::event::ValueMap;

/// Attribute names excluded from every audit payload.
pub const BOOKKEEPING_FIELDS: [&str; 2] = ["created_at", "updated_at"];

/// Whether `field` is a bookkeeping timestamp.
#[must_use]
pub fn is_bookkeeping(field: &str) -> bool {
    BOOKKEEPING_FIELDS.contains(&field)
}

/// Copy of `attributes` without bookkeeping fields, preserving order.
#[must_use]
pub fn without_bookkeeping(attributes: &ValueMap) -> ValueMap {
    attributes
        .iter()
        .filter(|(key, _)| !is_bookkeeping(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Compute `(old_values, new_values)` for the fields that differ.
///
/// Iterates `after` in its own order. A field missing from `before` is
/// recorded with an old value of `null`. Both maps always share the same key
/// set.
#[must_use]
pub fn diff_changes(before: &ValueMap, after: &ValueMap) -> (ValueMap, ValueMap) {
    let mut old_values = ValueMap::new();
    let mut new_values = ValueMap::new();

    for (key, new_value) in after {
        if is_bookkeeping(key) {
            continue;
        }
        let old_value = before.get(key).cloned().unwrap_or(Value::Null);
        if old_value != *new_value {
            old_values.insert(key.clone(), old_value);
            new_values.insert(key.clone(), new_value.clone());
        }
    }

    (old_values, new_values)
}
