//! Column data types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    Double,
    String,
    Binary,
    Date,
    /// Dynamically typed cell; holds any primitive [`crate::Value`].
    Mixed,
    /// Nested sub-table.
    Table,
    /// Single optional reference to a row in another table.
    Link,
    /// Ordered list of references to rows in another table.
    LinkList,
}

impl ColumnType {
    /// Whether a search index may be created on a column of this type.
    pub fn is_indexable(self) -> bool {
        matches!(
            self,
            ColumnType::String | ColumnType::Integer | ColumnType::Boolean | ColumnType::Date
        )
    }

    /// Whether the column can be rewritten between nullable and not-nullable.
    ///
    /// Mixed has no single null notion to convert; links, link lists and
    /// sub-tables carry their own empty/absent states.
    pub fn supports_nullability_conversion(self) -> bool {
        !matches!(
            self,
            ColumnType::Mixed | ColumnType::Table | ColumnType::Link | ColumnType::LinkList
        )
    }

    /// Whether a sorted view can be produced on a column of this type.
    pub fn is_sortable(self) -> bool {
        matches!(
            self,
            ColumnType::Boolean
                | ColumnType::Integer
                | ColumnType::Float
                | ColumnType::Double
                | ColumnType::String
                | ColumnType::Date
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::String => "STRING",
            ColumnType::Binary => "BINARY",
            ColumnType::Date => "DATE",
            ColumnType::Mixed => "MIXED",
            ColumnType::Table => "TABLE",
            ColumnType::Link => "LINK",
            ColumnType::LinkList => "LINKLIST",
        };
        write!(f, "{}", name)
    }
}
