//! The polymorphic value.
//!
//! [`Value`] is a tagged variant over the primitive column types plus an
//! explicit "no value" marker. Mixed cells store a `Value` directly and
//! dispatch on its tag; positional `add` calls describe a whole row as a
//! slice of `Value`s.

use crate::data_type::ColumnType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No value. Stored in a Mixed cell that was never assigned, and used
    /// as the explicit null marker at the API boundary.
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    /// Millisecond-precision UTC timestamp.
    Date(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The column type this value's tag corresponds to. `None` for null.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Int(_) => Some(ColumnType::Integer),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Double(_) => Some(ColumnType::Double),
            Value::String(_) => Some(ColumnType::String),
            Value::Binary(_) => Some(ColumnType::Binary),
            Value::Date(_) => Some(ColumnType::Date),
        }
    }

    /// Builds a `Date` value from a millisecond UTC timestamp. Out-of-range
    /// timestamps clamp to the epoch.
    pub fn date_from_millis(millis: i64) -> Value {
        Value::Date(DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Millisecond timestamp of a `Date` value.
    pub fn as_date_millis(&self) -> Option<i64> {
        self.as_date().map(|d| d.timestamp_millis())
    }

    /// Total order used by sorted views and index-key comparison.
    ///
    /// Null sorts first; same-tag values compare by their natural per-type
    /// order (floats by total order, so NaN has a defined position); values
    /// with different tags fall back to a fixed tag rank. Within one column
    /// only one tag ever appears, so the rank branch is reachable only for
    /// Mixed cells.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Binary(a), Value::Binary(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.timestamp_millis().cmp(&b.timestamp_millis()),
            _ => self.tag_rank().cmp(&other.tag_rank()),
        }
    }

    fn tag_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Double(_) => 4,
            Value::String(_) => 5,
            Value::Binary(_) => 6,
            Value::Date(_) => 7,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Binary(b) => write!(f, "{} bytes", b.len()),
            Value::Date(d) => write!(f, "{}", d.timestamp_millis()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_match_column_types() {
        assert_eq!(Value::Null.column_type(), None);
        assert_eq!(Value::Bool(true).column_type(), Some(ColumnType::Boolean));
        assert_eq!(Value::Int(1).column_type(), Some(ColumnType::Integer));
        assert_eq!(Value::Float(1.0).column_type(), Some(ColumnType::Float));
        assert_eq!(Value::Double(1.0).column_type(), Some(ColumnType::Double));
        assert_eq!(
            Value::String("x".into()).column_type(),
            Some(ColumnType::String)
        );
        assert_eq!(
            Value::Binary(vec![1]).column_type(),
            Some(ColumnType::Binary)
        );
        assert_eq!(
            Value::date_from_millis(0).column_type(),
            Some(ColumnType::Date)
        );
    }

    #[test]
    fn test_date_millis_round_trip() {
        let v = Value::date_from_millis(1384423149761);
        assert_eq!(v.as_date_millis(), Some(1384423149761));
    }

    #[test]
    fn test_natural_order() {
        assert_eq!(
            Value::Null.natural_cmp(&Value::Int(i64::MIN)),
            Ordering::Less
        );
        assert_eq!(Value::Int(1).natural_cmp(&Value::Int(2)), Ordering::Less);
        assert_eq!(
            Value::Bool(false).natural_cmp(&Value::Bool(true)),
            Ordering::Less
        );
        assert_eq!(
            Value::String("s".into()).natural_cmp(&Value::String("ss".into())),
            Ordering::Less
        );
        assert_eq!(
            Value::date_from_millis(0).natural_cmp(&Value::date_from_millis(1000)),
            Ordering::Less
        );
        assert_eq!(
            Value::Double(10.0).natural_cmp(&Value::Double(100.0)),
            Ordering::Less
        );
    }

    #[test]
    fn test_typed_accessors() {
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Int(42).as_double(), None);
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::Binary(vec![1, 2, 3]).as_binary(), Some(&[1u8, 2, 3][..]));
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(false).is_null());
    }
}
