//! Row-to-event parsing helpers.
//!
//! `libsql::Row` is column-indexed; these helpers isolate the conversion of
//! an `audits` row back into an [`AuditEvent`].

use tally_core::{AuditEvent, EventKind, RequestContext, ValueMap, timestamp};

use crate::error::DatabaseError;

/// Column list shared by every `SELECT` that builds an `AuditEvent`.
pub const EVENT_COLUMNS: &str = "id, event, subject_type, subject_id, actor_id, url, ip_address, user_agent, old_values, new_values, created_at";

/// Parse a stored event kind.
///
/// # Errors
///
/// Returns `DatabaseError::Query` for values outside `created|updated|deleted`.
pub fn parse_event_kind(s: &str) -> Result<EventKind, DatabaseError> {
    EventKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == s)
        .ok_or_else(|| DatabaseError::Query(format!("Unknown event kind '{s}'")))
}

/// Decode a serialized value map column.
///
/// NULL, the empty string, and an empty JSON array all decode to an empty map.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the text is not a JSON object.
pub fn parse_value_map(s: Option<&str>) -> Result<ValueMap, DatabaseError> {
    let Some(raw) = s.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(ValueMap::new());
    };
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Array(items) if items.is_empty() => Ok(ValueMap::new()),
        other => Err(DatabaseError::Query(format!(
            "Expected JSON object in value map column, found {other}"
        ))),
    }
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Build an event from a row selected with [`EVENT_COLUMNS`].
///
/// # Errors
///
/// Returns `DatabaseError` if any column is missing or malformed.
pub fn event_from_row(row: &libsql::Row) -> Result<AuditEvent, DatabaseError> {
    let created_at = row.get::<String>(10)?;
    Ok(AuditEvent {
        id: row.get::<String>(0)?,
        event: parse_event_kind(&row.get::<String>(1)?)?,
        subject_type: row.get::<String>(2)?,
        subject_id: row.get::<String>(3)?,
        actor_id: get_opt_string(row, 4)?,
        context: RequestContext {
            url: get_opt_string(row, 5)?,
            ip_address: get_opt_string(row, 6)?,
            user_agent: get_opt_string(row, 7)?,
        },
        old_values: parse_value_map(get_opt_string(row, 8)?.as_deref())?,
        new_values: parse_value_map(get_opt_string(row, 9)?.as_deref())?,
        created_at: timestamp::parse(&created_at)
            .map_err(|e| DatabaseError::Query(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("[]"))]
    #[case(Some("{}"))]
    fn empty_value_maps(#[case] raw: Option<&str>) {
        assert!(parse_value_map(raw).unwrap().is_empty());
    }

    #[test]
    fn value_map_keeps_order() {
        let map = parse_value_map(Some(r#"{"b":1,"a":2}"#)).unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn value_map_rejects_scalars() {
        assert!(parse_value_map(Some("42")).is_err());
        assert!(parse_value_map(Some("{broken")).is_err());
    }

    #[test]
    fn event_kind_parsing() {
        assert_eq!(parse_event_kind("updated").unwrap(), EventKind::Updated);
        assert!(parse_event_kind("archived").is_err());
    }
}
