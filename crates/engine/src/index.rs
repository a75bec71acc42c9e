//! Search indexes.
//!
//! A search index is an auxiliary equality-lookup structure for one eligible
//! column (Integer, Boolean, String or Date), mapping each distinct value to
//! the row positions holding it. Value writes maintain the index in place;
//! row removal shifts positions, so the owning table rebuilds affected
//! indexes instead.

use crate::schema::ColumnData;
use std::collections::HashMap;
use tablecore_value::Value;

/// Hashable key form of an indexable value. The null marker indexes like any
/// other distinct value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    /// Millisecond UTC timestamp.
    Date(i64),
}

impl IndexKey {
    /// `None` for value tags that cannot be indexed.
    pub(crate) fn from_value(value: &Value) -> Option<IndexKey> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Int(i) => Some(IndexKey::Int(*i)),
            Value::String(s) => Some(IndexKey::Str(s.clone())),
            Value::Date(d) => Some(IndexKey::Date(d.timestamp_millis())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SearchIndex {
    entries: HashMap<IndexKey, Vec<usize>>,
}

impl SearchIndex {
    /// Builds the index over every row of an eligible column.
    pub(crate) fn build(data: &ColumnData, row_count: usize) -> SearchIndex {
        let mut index = SearchIndex::default();
        for row in 0..row_count {
            if let Some(key) = IndexKey::from_value(&data.value_at(row)) {
                index.insert(key, row);
            }
        }
        index
    }

    pub(crate) fn insert(&mut self, key: IndexKey, row: usize) {
        self.entries.entry(key).or_default().push(row);
    }

    pub(crate) fn remove(&mut self, key: &IndexKey, row: usize) {
        if let Some(rows) = self.entries.get_mut(key) {
            rows.retain(|&r| r != row);
            if rows.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    /// First (lowest) row position holding the key.
    pub(crate) fn first(&self, key: &IndexKey) -> Option<usize> {
        self.entries.get(key).and_then(|rows| rows.iter().min().copied())
    }

    /// All row positions holding the key, in ascending order.
    pub(crate) fn all(&self, key: &IndexKey) -> Vec<usize> {
        let mut rows = self.entries.get(key).cloned().unwrap_or_default();
        rows.sort_unstable();
        rows
    }

    pub(crate) fn count(&self, key: &IndexKey) -> usize {
        self.entries.get(key).map_or(0, |rows| rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablecore_value::ColumnType;

    #[test]
    fn test_build_and_lookup() {
        let mut data = ColumnData::new(ColumnType::Integer);
        for _ in 0..4 {
            data.push_default();
        }
        // rows: [7, 0, 7, 3]
        if let ColumnData::Int(cells) = &mut data {
            cells[0] = Some(7);
            cells[2] = Some(7);
            cells[3] = Some(3);
        }

        let index = SearchIndex::build(&data, 4);
        assert_eq!(index.first(&IndexKey::Int(7)), Some(0));
        assert_eq!(index.all(&IndexKey::Int(7)), vec![0, 2]);
        assert_eq!(index.count(&IndexKey::Int(7)), 2);
        assert_eq!(index.first(&IndexKey::Int(42)), None);
    }

    #[test]
    fn test_insert_remove_keeps_entries_tight() {
        let mut index = SearchIndex::default();
        index.insert(IndexKey::Str("a".into()), 5);
        index.insert(IndexKey::Str("a".into()), 2);
        assert_eq!(index.first(&IndexKey::Str("a".into())), Some(2));

        index.remove(&IndexKey::Str("a".into()), 2);
        assert_eq!(index.first(&IndexKey::Str("a".into())), Some(5));
        index.remove(&IndexKey::Str("a".into()), 5);
        assert_eq!(index.count(&IndexKey::Str("a".into())), 0);
    }

    #[test]
    fn test_null_marker_indexes_as_distinct_value() {
        let mut index = SearchIndex::default();
        index.insert(IndexKey::Null, 1);
        index.insert(IndexKey::Str(String::new()), 0);
        // Empty string and null are distinct keys.
        assert_eq!(index.first(&IndexKey::Null), Some(1));
        assert_eq!(index.first(&IndexKey::Str(String::new())), Some(0));
    }
}
