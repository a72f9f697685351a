//! # Value Type System
//!
//! Core cell types for tabular datasets, supporting typed columns with
//! integer, float, string, boolean, datetime, and null values.
//!
//! ## Design Decisions
//!
//! - **Closed type tag**: `DataType` is the closed set the query executor
//!   dispatches on; there is no runtime introspection beyond this tag
//! - **Deterministic ordering**: `Value` implements a total order (floats via
//!   `partial_cmp` with a NaN fallback, fixed cross-type precedence) so group
//!   keys and result rows sort reproducibly
//! - **Null-safe serialization**: `to_json` is the single normalization
//!   point; NaN/Infinity and nulls become JSON null, datetimes become
//!   RFC 3339 strings, so no floating-point sentinel ever reaches a caller

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Supported column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// UTF-8 string
    String,
    /// Boolean value
    Boolean,
    /// Point in time, stored as Unix milliseconds
    Datetime,
    /// Column with no declared type (all-null)
    Null,
}

impl DataType {
    /// Whether values of this type coerce to f64 for aggregation.
    ///
    /// Datetimes count as numeric: they participate in correlation and
    /// trend arithmetic as their millisecond values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float | DataType::Datetime)
    }

    /// Check if a value matches this type (null matches every type)
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::Integer, Value::Integer(_)) => true,
            (DataType::Float, Value::Float(_)) => true,
            (DataType::Float, Value::Integer(_)) => true,
            (DataType::String, Value::String(_)) => true,
            (DataType::Boolean, Value::Boolean(_)) => true,
            (DataType::Datetime, Value::Datetime(_)) => true,
            (DataType::Datetime, Value::Integer(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "integer"),
            DataType::Float => write!(f, "float"),
            DataType::String => write!(f, "string"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Datetime => write!(f, "datetime"),
            DataType::Null => write!(f, "null"),
        }
    }
}

/// A dynamically-typed cell value
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string (reference counted for efficient cloning)
    String(Arc<str>),
    /// Boolean value
    Boolean(bool),
    /// Unix timestamp in milliseconds since epoch (1970-01-01 00:00:00 UTC)
    Datetime(i64),
    /// Null/missing value
    Null,
}

impl Value {
    /// Get the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::String(_) => DataType::String,
            Value::Boolean(_) => DataType::Boolean,
            Value::Datetime(_) => DataType::Datetime,
            Value::Null => DataType::Null,
        }
    }

    /// Create a string value from a &str
    pub fn string(s: &str) -> Self {
        Value::String(Arc::from(s))
    }

    /// Create a datetime value from milliseconds since Unix epoch
    pub fn datetime(ms: i64) -> Self {
        Value::Datetime(ms)
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Datetime(t) => Some(*t),
            _ => None,
        }
    }

    /// Try to get as f64.
    ///
    /// Returns None for non-numeric types and for NaN/Infinity, so every
    /// downstream fold sees finite input only.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) if v.is_finite() => Some(*v),
            Value::Datetime(t) => Some(*t as f64),
            _ => None,
        }
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to interpret as a timestamp (milliseconds since Unix epoch).
    ///
    /// Datetimes return their stored value, integers are taken as
    /// milliseconds, and strings are parsed (RFC 3339, `%Y-%m-%d %H:%M:%S`,
    /// or `%Y-%m-%d`). Everything else is None.
    pub fn as_datetime_ms(&self) -> Option<i64> {
        match self {
            Value::Datetime(t) => Some(*t),
            Value::Integer(v) => Some(*v),
            Value::String(s) => parse_datetime_ms(s),
            _ => None,
        }
    }

    /// Plain display form used by `contains` matching and categorical
    /// statistics: no quoting, datetimes as RFC 3339, null as empty.
    pub fn coerce_string(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(s) => s.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Datetime(t) => format_datetime_ms(*t),
            Value::Null => String::new(),
        }
    }

    /// Convert into a serializable JSON value.
    ///
    /// The single normalization point: NaN/Infinity floats collapse to JSON
    /// null rather than serializing a sentinel, datetimes render as RFC 3339.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::from(s.as_ref()),
            Value::Boolean(b) => serde_json::Value::from(*b),
            Value::Datetime(t) => serde_json::Value::from(format_datetime_ms(*t)),
            Value::Null => serde_json::Value::Null,
        }
    }
}

/// Parse a datetime string into Unix milliseconds.
///
/// Accepts RFC 3339 first, then the common bare formats.
pub fn parse_datetime_ms(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}

/// Render Unix milliseconds as an RFC 3339 UTC string.
///
/// Out-of-range timestamps fall back to the raw millisecond count rather
/// than panicking.
pub fn format_datetime_ms(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map_or_else(|| ms.to_string(), |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Datetime(t) => write!(f, "{}", format_datetime_ms(*t)),
            Value::Null => write!(f, "NULL"),
        }
    }
}

// Implement PartialEq manually to handle f64 comparison
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Datetime(a), Value::Datetime(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

// Implement Hash manually to handle f64
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Integer(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::Datetime(t) => t.hash(state),
            Value::Null => {}
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Total order so group keys and output rows sort deterministically
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            // Mixed numerics compare by magnitude; equal magnitudes order
            // Integer before Float so cmp stays consistent with Eq
            (Value::Integer(a), Value::Float(b)) => (*a as f64)
                .partial_cmp(b)
                .unwrap_or(Ordering::Equal)
                .then(Ordering::Less),
            (Value::Float(a), Value::Integer(b)) => a
                .partial_cmp(&(*b as f64))
                .unwrap_or(Ordering::Equal)
                .then(Ordering::Greater),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Datetime(a), Value::Datetime(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            // Cross-type ordering: Null < Boolean < Integer/Float < Datetime < String
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Boolean(_), _) => Ordering::Less,
            (_, Value::Boolean(_)) => Ordering::Greater,
            (Value::Integer(_) | Value::Float(_), _) => Ordering::Less,
            (_, Value::Integer(_) | Value::Float(_)) => Ordering::Greater,
            (Value::Datetime(_), _) => Ordering::Less,
            (_, Value::Datetime(_)) => Ordering::Greater,
        }
    }
}

// Convenience conversions
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s.as_str()))
    }
}
