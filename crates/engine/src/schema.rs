//! Column descriptors and typed columnar cell storage.
//!
//! Each column stores its cells in one typed vector; `Option<T>` carries the
//! explicit null marker, which is distinct from the type's default value
//! (an empty string is not null). Non-nullable columns uphold the invariant
//! that no cell is ever `None`.

use crate::table::SharedCore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Weak;
use tablecore_value::{ColumnType, Value};

/// A named, typed slot repeated across all rows of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Whether the column carries a search index. The index contents live
    /// beside the table data and are rebuilt on load.
    pub(crate) has_index: bool,
    /// Target table name for Link / LinkList columns.
    pub(crate) target_name: Option<String>,
    /// Live handle to the target table's storage. Not persisted; rebound by
    /// name when a group is loaded or snapshot-cloned.
    #[serde(skip)]
    pub(crate) target: Weak<RwLock<crate::table::TableCore>>,
}

impl Column {
    pub(crate) fn new(ty: ColumnType, name: &str, nullable: bool) -> Self {
        Column {
            name: name.to_owned(),
            ty,
            nullable,
            has_index: false,
            target_name: None,
            target: Weak::new(),
        }
    }
}

/// Cell storage for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum ColumnData {
    Bool(Vec<Option<bool>>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f32>>),
    Double(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Binary(Vec<Option<Vec<u8>>>),
    /// Millisecond UTC timestamps.
    Date(Vec<Option<i64>>),
    Mixed(Vec<Value>),
    Table(Vec<SharedCore>),
    Link(Vec<Option<usize>>),
    LinkList(Vec<Vec<usize>>),
}

impl ColumnData {
    pub(crate) fn new(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Boolean => ColumnData::Bool(Vec::new()),
            ColumnType::Integer => ColumnData::Int(Vec::new()),
            ColumnType::Float => ColumnData::Float(Vec::new()),
            ColumnType::Double => ColumnData::Double(Vec::new()),
            ColumnType::String => ColumnData::Str(Vec::new()),
            ColumnType::Binary => ColumnData::Binary(Vec::new()),
            ColumnType::Date => ColumnData::Date(Vec::new()),
            ColumnType::Mixed => ColumnData::Mixed(Vec::new()),
            ColumnType::Table => ColumnData::Table(Vec::new()),
            ColumnType::Link => ColumnData::Link(Vec::new()),
            ColumnType::LinkList => ColumnData::LinkList(Vec::new()),
        }
    }

    /// Appends the column type's default value: zero for numerics, false for
    /// booleans, empty string/binary, epoch for dates, no value for Mixed,
    /// an empty sub-table, a null link, an empty link list.
    pub(crate) fn push_default(&mut self) {
        match self {
            ColumnData::Bool(v) => v.push(Some(false)),
            ColumnData::Int(v) => v.push(Some(0)),
            ColumnData::Float(v) => v.push(Some(0.0)),
            ColumnData::Double(v) => v.push(Some(0.0)),
            ColumnData::Str(v) => v.push(Some(String::new())),
            ColumnData::Binary(v) => v.push(Some(Vec::new())),
            ColumnData::Date(v) => v.push(Some(0)),
            ColumnData::Mixed(v) => v.push(Value::Null),
            ColumnData::Table(v) => v.push(SharedCore::new_empty()),
            ColumnData::Link(v) => v.push(None),
            ColumnData::LinkList(v) => v.push(Vec::new()),
        }
    }

    pub(crate) fn remove(&mut self, row: usize) {
        match self {
            ColumnData::Bool(v) => {
                v.remove(row);
            }
            ColumnData::Int(v) => {
                v.remove(row);
            }
            ColumnData::Float(v) => {
                v.remove(row);
            }
            ColumnData::Double(v) => {
                v.remove(row);
            }
            ColumnData::Str(v) => {
                v.remove(row);
            }
            ColumnData::Binary(v) => {
                v.remove(row);
            }
            ColumnData::Date(v) => {
                v.remove(row);
            }
            ColumnData::Mixed(v) => {
                v.remove(row);
            }
            ColumnData::Table(v) => {
                v.remove(row);
            }
            ColumnData::Link(v) => {
                v.remove(row);
            }
            ColumnData::LinkList(v) => {
                v.remove(row);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        match self {
            ColumnData::Bool(v) => v.clear(),
            ColumnData::Int(v) => v.clear(),
            ColumnData::Float(v) => v.clear(),
            ColumnData::Double(v) => v.clear(),
            ColumnData::Str(v) => v.clear(),
            ColumnData::Binary(v) => v.clear(),
            ColumnData::Date(v) => v.clear(),
            ColumnData::Mixed(v) => v.clear(),
            ColumnData::Table(v) => v.clear(),
            ColumnData::Link(v) => v.clear(),
            ColumnData::LinkList(v) => v.clear(),
        }
    }

    /// Materializes a cell as a [`Value`]. Null markers come back as
    /// `Value::Null`; sub-table, link and link-list cells have no value
    /// rendition and also come back as `Value::Null`.
    pub(crate) fn value_at(&self, row: usize) -> Value {
        match self {
            ColumnData::Bool(v) => v[row].map(Value::Bool).unwrap_or(Value::Null),
            ColumnData::Int(v) => v[row].map(Value::Int).unwrap_or(Value::Null),
            ColumnData::Float(v) => v[row].map(Value::Float).unwrap_or(Value::Null),
            ColumnData::Double(v) => v[row].map(Value::Double).unwrap_or(Value::Null),
            ColumnData::Str(v) => v[row]
                .as_ref()
                .map(|s| Value::String(s.clone()))
                .unwrap_or(Value::Null),
            ColumnData::Binary(v) => v[row]
                .as_ref()
                .map(|b| Value::Binary(b.clone()))
                .unwrap_or(Value::Null),
            ColumnData::Date(v) => v[row].map(Value::date_from_millis).unwrap_or(Value::Null),
            ColumnData::Mixed(v) => v[row].clone(),
            ColumnData::Table(_) | ColumnData::Link(_) | ColumnData::LinkList(_) => Value::Null,
        }
    }

    pub(crate) fn is_null_at(&self, row: usize) -> bool {
        match self {
            ColumnData::Bool(v) => v[row].is_none(),
            ColumnData::Int(v) => v[row].is_none(),
            ColumnData::Float(v) => v[row].is_none(),
            ColumnData::Double(v) => v[row].is_none(),
            ColumnData::Str(v) => v[row].is_none(),
            ColumnData::Binary(v) => v[row].is_none(),
            ColumnData::Date(v) => v[row].is_none(),
            ColumnData::Mixed(v) => v[row].is_null(),
            ColumnData::Link(v) => v[row].is_none(),
            ColumnData::Table(_) | ColumnData::LinkList(_) => false,
        }
    }

    /// Assigns the null marker. The caller has already verified the column
    /// is nullable.
    pub(crate) fn set_null_at(&mut self, row: usize) {
        match self {
            ColumnData::Bool(v) => v[row] = None,
            ColumnData::Int(v) => v[row] = None,
            ColumnData::Float(v) => v[row] = None,
            ColumnData::Double(v) => v[row] = None,
            ColumnData::Str(v) => v[row] = None,
            ColumnData::Binary(v) => v[row] = None,
            ColumnData::Date(v) => v[row] = None,
            ColumnData::Mixed(v) => v[row] = Value::Null,
            ColumnData::Link(v) => v[row] = None,
            ColumnData::Table(_) | ColumnData::LinkList(_) => {}
        }
    }

    /// Rewrites every null marker to the type's default value. Used by
    /// not-nullable conversion.
    pub(crate) fn coerce_nulls_to_default(&mut self) {
        match self {
            ColumnData::Bool(v) => v.iter_mut().for_each(|c| *c = Some(c.unwrap_or(false))),
            ColumnData::Int(v) => v.iter_mut().for_each(|c| *c = Some(c.unwrap_or(0))),
            ColumnData::Float(v) => v.iter_mut().for_each(|c| *c = Some(c.unwrap_or(0.0))),
            ColumnData::Double(v) => v.iter_mut().for_each(|c| *c = Some(c.unwrap_or(0.0))),
            ColumnData::Str(v) => v
                .iter_mut()
                .for_each(|c| *c = Some(c.take().unwrap_or_default())),
            ColumnData::Binary(v) => v
                .iter_mut()
                .for_each(|c| *c = Some(c.take().unwrap_or_default())),
            ColumnData::Date(v) => v.iter_mut().for_each(|c| *c = Some(c.unwrap_or(0))),
            _ => {}
        }
    }

    /// Deep clone: sub-table cells get fresh storage instead of sharing.
    pub(crate) fn deep_clone(&self) -> Self {
        match self {
            ColumnData::Table(v) => {
                ColumnData::Table(v.iter().map(SharedCore::deep_clone).collect())
            }
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cells_are_not_null() {
        for ty in [
            ColumnType::Boolean,
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Double,
            ColumnType::String,
            ColumnType::Binary,
            ColumnType::Date,
        ] {
            let mut data = ColumnData::new(ty);
            data.push_default();
            assert!(!data.is_null_at(0), "{ty} default cell must not be null");
        }

        // A Mixed cell defaults to "no value".
        let mut mixed = ColumnData::new(ColumnType::Mixed);
        mixed.push_default();
        assert!(mixed.is_null_at(0));
    }

    #[test]
    fn test_coerce_nulls_to_default() {
        let mut data = ColumnData::new(ColumnType::String);
        data.push_default();
        data.set_null_at(0);
        assert!(data.is_null_at(0));

        data.coerce_nulls_to_default();
        assert!(!data.is_null_at(0));
        assert_eq!(data.value_at(0), Value::String(String::new()));
    }
}
