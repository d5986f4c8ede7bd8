//! Tagged field values and the per-kind coercion table.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::schema::{FieldDescriptor, FieldKind};

/// A field value in transit between an entity and a property bag.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Enum(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Null, or a string/enum that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) | FieldValue::Enum(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// True when the value equals the default of `kind`, or is blank.
    pub fn is_default(&self, kind: FieldKind) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.trim().is_empty(),
            FieldValue::Integer(i) => *i == 0,
            FieldValue::Float(f) => *f == 0.0,
            FieldValue::Boolean(b) => !*b,
            FieldValue::DateTime(dt) => *dt == DateTime::<Utc>::UNIX_EPOCH,
            FieldValue::Enum(v) => {
                v.trim().is_empty()
                    || matches!(kind, FieldKind::Enum(variants)
                        if variants.first().is_some_and(|first| first.eq_ignore_ascii_case(v)))
            }
            FieldValue::List(items) => items.is_empty(),
        }
    }

    /// JSON form used as a Cypher parameter. Timestamps are RFC 3339 strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::String(s) | FieldValue::Enum(s) => JsonValue::String(s.clone()),
            FieldValue::Integer(i) => JsonValue::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            FieldValue::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        FieldValue::List(value.into_iter().map(Into::into).collect())
    }
}

/// Coerces a stored value to the declared kind of `field`.
///
/// Null is preserved for nullable fields and rejected otherwise.
pub fn coerce(field: &FieldDescriptor, raw: &JsonValue) -> Result<FieldValue, AppError> {
    if raw.is_null() {
        return if field.nullable {
            Ok(FieldValue::Null)
        } else {
            Err(AppError::conversion(&field.name, "null for non-nullable field"))
        };
    }
    coerce_kind(field.kind, raw).map_err(|message| AppError::conversion(&field.name, message))
}

/// Coerces a raw JSON value to `kind`.
pub fn coerce_kind(kind: FieldKind, raw: &JsonValue) -> Result<FieldValue, String> {
    match kind {
        FieldKind::String => match raw {
            JsonValue::String(s) => Ok(FieldValue::String(s.clone())),
            JsonValue::Number(n) => Ok(FieldValue::String(n.to_string())),
            JsonValue::Bool(b) => Ok(FieldValue::String(b.to_string())),
            other => Err(format!("expected string, got {}", other)),
        },
        FieldKind::Integer => match raw {
            JsonValue::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
                .map(FieldValue::Integer)
                .ok_or_else(|| format!("integer out of range: {}", n)),
            JsonValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|e| format!("invalid integer '{}': {}", s, e)),
            JsonValue::Bool(b) => Ok(FieldValue::Integer(i64::from(*b))),
            other => Err(format!("expected integer, got {}", other)),
        },
        FieldKind::Float => match raw {
            JsonValue::Number(n) => n
                .as_f64()
                .map(FieldValue::Float)
                .ok_or_else(|| format!("invalid float: {}", n)),
            JsonValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|e| format!("invalid float '{}': {}", s, e)),
            JsonValue::Bool(b) => Ok(FieldValue::Float(if *b { 1.0 } else { 0.0 })),
            other => Err(format!("expected float, got {}", other)),
        },
        FieldKind::Boolean => match raw {
            JsonValue::Bool(b) => Ok(FieldValue::Boolean(*b)),
            JsonValue::String(s) if s.trim().eq_ignore_ascii_case("true") => {
                Ok(FieldValue::Boolean(true))
            }
            JsonValue::String(s) if s.trim().eq_ignore_ascii_case("false") => {
                Ok(FieldValue::Boolean(false))
            }
            JsonValue::Number(n) => Ok(FieldValue::Boolean(n.as_f64() != Some(0.0))),
            other => Err(format!("expected boolean, got {}", other)),
        },
        FieldKind::DateTime => match raw {
            JsonValue::String(s) => parse_datetime(s)
                .map(FieldValue::DateTime)
                .ok_or_else(|| format!("invalid datetime '{}'", s)),
            other => Err(format!("expected datetime, got {}", other)),
        },
        FieldKind::Enum(variants) => {
            let text = match raw {
                JsonValue::String(s) => s.trim().to_string(),
                JsonValue::Number(n) => {
                    let index = n
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .ok_or_else(|| format!("invalid enum index {}", n))?;
                    return variants
                        .get(index)
                        .map(|v| FieldValue::Enum(v.to_string()))
                        .ok_or_else(|| format!("enum index {} out of range", index));
                }
                other => return Err(format!("expected enum name, got {}", other)),
            };
            variants
                .iter()
                .find(|v| v.eq_ignore_ascii_case(&text))
                .map(|v| FieldValue::Enum(v.to_string()))
                .ok_or_else(|| format!("unknown variant '{}'", text))
        }
        FieldKind::List(inner) => match raw {
            JsonValue::Array(items) => Ok(FieldValue::List(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .filter_map(|item| coerce_kind(*inner, item).ok())
                    .collect(),
            )),
            other => Err(format!("expected list, got {}", other)),
        },
    }
}

/// Parses a timestamp leniently.
///
/// Accepts RFC 3339 (optionally followed by a bracketed zone name, as Neo4j
/// renders zoned datetimes), naive date-times assumed UTC, and bare dates.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let text = text.split_once('[').map_or(text, |(head, _)| head);

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads a timestamp property that may be absent or malformed.
pub fn parse_datetime_value(raw: Option<&JsonValue>) -> Option<DateTime<Utc>> {
    raw.and_then(JsonValue::as_str).and_then(parse_datetime)
}
