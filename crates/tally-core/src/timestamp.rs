//! Second-precision UTC timestamps.
//!
//! Audit timestamps are stored and transmitted as `"YYYY-MM-DD HH:MM:SS"` in
//! UTC. The fixed-width format sorts lexically in time order, which the prune
//! query relies on. Parsing also accepts RFC 3339 so hand-written rescue files
//! stay recoverable.
//!
//! # Example
//! ```ignore
//! use tally_core::timestamp;
//! use chrono::{DateTime, Utc};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Record {
//!     #[serde(with = "timestamp::seconds")]
//!     pub created_at: DateTime<Utc>,
//! }
//! ```

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::errors::CoreError;

/// Storage and wire format.
pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current time truncated to whole seconds.
#[must_use]
pub fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}

/// Drop sub-second precision.
#[must_use]
pub fn truncate(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(0)
}

/// Render in the storage format.
#[must_use]
pub fn format(dt: &DateTime<Utc>) -> String {
    dt.format(FORMAT).to_string()
}

/// Parse either the storage format or RFC 3339.
///
/// # Errors
///
/// Returns `CoreError::InvalidTimestamp` if the string matches neither format.
pub fn parse(s: &str) -> Result<DateTime<Utc>, CoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(truncate(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(s, FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| CoreError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })
}

/// Serde adapter for `DateTime<Utc>` fields in the storage format.
pub mod seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse(&raw).map_err(serde::de::Error::custom)
    }
}
