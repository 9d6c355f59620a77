use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage format for [`FieldValue::DateTime`].
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored field value.
///
/// Serialized externally tagged (`{"text": "..."}`) so the SQL backend can
/// round-trip the variant through a JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// Convert an extracted API value. `null` yields `None`.
    ///
    /// Non-integral numbers and nested objects or arrays are kept as their
    /// JSON text.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Text(n.to_string()),
            }),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Some(Self::Text(value.to_string())),
        }
    }

    /// Loose truthiness used for override flags: `false`, `0`, `""` and
    /// `"0"` are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty() && s != "0",
            Self::Integer(n) => *n != 0,
            Self::Boolean(b) => *b,
            Self::DateTime(_) => true,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn from_json_maps_scalars_and_treats_null_as_absent() {
        assert_eq!(FieldValue::from_json(&json!(null)), None);
        assert_eq!(FieldValue::from_json(&json!(42)), Some(FieldValue::Integer(42)));
        assert_eq!(FieldValue::from_json(&json!(true)), Some(FieldValue::Boolean(true)));
        assert_eq!(FieldValue::from_json(&json!("MIT")), Some("MIT".into()));
        assert_eq!(FieldValue::from_json(&json!(1.5)), Some("1.5".into()));
        assert_eq!(
            FieldValue::from_json(&json!(["a", "b"])),
            Some(r#"["a","b"]"#.into())
        );
    }

    #[test]
    fn truthiness_follows_loose_flag_rules() {
        for falsy in [
            FieldValue::from(""),
            FieldValue::from("0"),
            FieldValue::from(0_i64),
            FieldValue::from(false),
        ] {
            assert!(!falsy.is_truthy(), "{falsy:?}");
        }
        for truthy in [
            FieldValue::from("1"),
            FieldValue::from("yes"),
            FieldValue::from(-1_i64),
            FieldValue::from(true),
        ] {
            assert!(truthy.is_truthy(), "{truthy:?}");
        }
    }

    #[test]
    fn display_formats_datetime_in_storage_format() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, 0))
            .expect("valid datetime");
        assert_eq!(FieldValue::from(dt).to_string(), "2024-03-09 07:05:00");
        assert_eq!(FieldValue::from(17_i64).to_string(), "17");
    }

    #[test]
    fn serializes_externally_tagged() {
        assert_eq!(
            serde_json::to_value(FieldValue::from("x")).expect("serialize"),
            json!({"text": "x"})
        );
        let back: FieldValue =
            serde_json::from_value(json!({"integer": 7})).expect("deserialize");
        assert_eq!(back, FieldValue::Integer(7));
    }
}
