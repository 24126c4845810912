//! Lenient decoding of the `createdAt` leaf on persisted records.
//!
//! The creation timestamp is bookkeeping, not identity: a record whose
//! `createdAt` is missing or unreadable keeps its data and gets a fresh
//! timestamp instead of being dropped. Only genuinely mandatory fields
//! (id, name, addresses, ports) cause a record to be rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Deserializes an ISO-8601 timestamp, falling back to now when the leaf
/// is not a string or does not parse. Used with `#[serde(default =
/// "Utc::now")]` so a missing leaf defaults the same way.
pub(crate) fn lenient<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_else(Utc::now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(default = "Utc::now", deserialize_with = "lenient")]
        created_at: DateTime<Utc>,
    }

    #[test]
    fn valid_timestamp_parses_exactly() {
        let stamped: Stamped =
            serde_json::from_value(json!({ "created_at": "2024-01-02T03:04:05Z" })).unwrap();
        assert_eq!(stamped.created_at.to_rfc3339(), "2024-01-02T03:04:05+00:00");
    }

    #[test]
    fn missing_and_malformed_timestamps_default() {
        let missing: Stamped = serde_json::from_value(json!({})).unwrap();
        let garbage: Stamped =
            serde_json::from_value(json!({ "created_at": "yesterday" })).unwrap();
        let wrong_type: Stamped = serde_json::from_value(json!({ "created_at": 42 })).unwrap();

        let now = Utc::now();
        for stamped in [missing, garbage, wrong_type] {
            assert!((now - stamped.created_at).num_seconds().abs() < 60);
        }
    }
}
