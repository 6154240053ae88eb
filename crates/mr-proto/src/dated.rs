//! ISO-8601-with-microseconds datetime handling.
//!
//! Every stored `created` timestamp is formatted as
//! `%Y-%m-%dT%H:%M:%S.%f` on encode and parsed back with the matching
//! format on decode. Two things depend on that exact format: the typed
//! `created` field on [`crate::Job`], and ad hoc command payloads that may
//! carry a datetime anywhere in the tree, handled generically by
//! [`DatedValue`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// `#[serde(with = "dated::iso8601_micros")]` for typed `DateTime<Utc>`
/// fields that must round-trip through this exact timestamp format.
pub mod iso8601_micros {
    use super::*;

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Format as `YYYY-MM-DDTHH:MM:SS.ffffff`.
    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.format(FORMAT).to_string()
    }

    /// Parse the same format. Tolerates a trailing `Z` for inputs that
    /// aren't produced by `format` itself.
    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        let trimmed = s.strip_suffix('Z').unwrap_or(s);
        let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")?;
        Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }
}

/// A JSON value that additionally recognizes ISO-8601-with-microseconds
/// strings as datetimes on decode, upgrading matching strings in place
/// anywhere in the tree. Two independently-built `DatedValue`s compare
/// equal regardless of JSON key order, so command payloads exchanged over
/// the broker can be matched by logical equality rather than
/// byte-identical serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum DatedValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    DateTime(DateTime<Utc>),
    Array(Vec<DatedValue>),
    Object(BTreeMap<String, DatedValue>),
}

impl DatedValue {
    pub fn decode(json: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::from_json(value))
    }

    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::Null => DatedValue::Null,
            Value::Bool(b) => DatedValue::Bool(b),
            Value::Number(n) => DatedValue::Number(n),
            Value::String(s) => match iso8601_micros::parse(&s) {
                Ok(dt) => DatedValue::DateTime(dt),
                Err(_) => DatedValue::String(s),
            },
            Value::Array(items) => {
                DatedValue::Array(items.into_iter().map(Self::from_json).collect())
            }
            Value::Object(map) => DatedValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            DatedValue::Null => Value::Null,
            DatedValue::Bool(b) => Value::Bool(*b),
            DatedValue::Number(n) => Value::Number(n.clone()),
            DatedValue::String(s) => Value::String(s.clone()),
            DatedValue::DateTime(dt) => Value::String(iso8601_micros::format(dt)),
            DatedValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            DatedValue::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_matches_python_strftime_shape() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 7, 9, 30, 5).unwrap()
            + chrono::Duration::microseconds(123456);
        assert_eq!(iso8601_micros::format(&dt), "2024-03-07T09:30:05.123456");
    }

    #[test]
    fn parse_round_trips_through_format() {
        let original = "2024-03-07T09:30:05.123456";
        let dt = iso8601_micros::parse(original).unwrap();
        assert_eq!(iso8601_micros::format(&dt), original);
    }

    #[test]
    fn dated_value_round_trips_nested_datetimes() {
        let dt = iso8601_micros::parse("2024-01-01T00:00:00.000001").unwrap();
        let mut obj = BTreeMap::new();
        obj.insert("created".to_string(), DatedValue::DateTime(dt));
        obj.insert("command".to_string(), DatedValue::String("PROCESS_JOB".to_string()));
        obj.insert(
            "nested".to_string(),
            DatedValue::Array(vec![DatedValue::DateTime(dt), DatedValue::Null]),
        );
        let original = DatedValue::Object(obj);

        let encoded = original.encode();
        let decoded = DatedValue::decode(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn plain_strings_are_not_mistaken_for_datetimes() {
        let decoded = DatedValue::decode(r#"{"model": "sequencer"}"#).unwrap();
        match decoded {
            DatedValue::Object(map) => {
                assert_eq!(map["model"], DatedValue::String("sequencer".to_string()));
            }
            _ => panic!("expected object"),
        }
    }
}
