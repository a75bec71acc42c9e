//! Tables: ordered typed columns over ordered rows.
//!
//! `TableCore` is the plain storage (schema, cell vectors, search indexes,
//! mutation version); `Table` is the public handle, a cheaply cloneable
//! reference that carries the read-only flag of the transaction it came
//! from. Row cursors and views hold weak handles to the same core and use
//! the mutation version to detect staleness: the version bumps whenever
//! positions shift — row removal, clear, or column removal — never on value
//! writes or column addition.

use crate::error::{Error, Result};
use crate::index::{IndexKey, SearchIndex};
use crate::link::LinkView;
use crate::row::Row;
use crate::schema::{Column, ColumnData};
use crate::view::{Order, TableView};
use crate::MAX_COLUMN_NAME_LENGTH;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tablecore_value::{ColumnType, Value};
use tracing::debug;

/// Shared ownership of one table's storage. Sub-table cells and group
/// members both hold their `TableCore` through this wrapper so that handles
/// can alias it and serde can persist it.
#[derive(Debug, Clone)]
pub(crate) struct SharedCore(pub(crate) Arc<RwLock<TableCore>>);

impl SharedCore {
    pub(crate) fn new_empty() -> Self {
        SharedCore(Arc::new(RwLock::new(TableCore::new(None))))
    }

    pub(crate) fn new(core: TableCore) -> Self {
        SharedCore(Arc::new(RwLock::new(core)))
    }

    /// Fresh storage with the same contents; nothing is aliased with `self`.
    pub(crate) fn deep_clone(&self) -> Self {
        SharedCore::new(self.0.read().deep_clone())
    }
}

impl Serialize for SharedCore {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SharedCore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut core = TableCore::deserialize(deserializer)?;
        core.rebuild_indexes();
        Ok(SharedCore::new(core))
    }
}

/// Storage and operations for one table.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TableCore {
    pub(crate) name: Option<String>,
    pub(crate) columns: Vec<Column>,
    pub(crate) data: Vec<ColumnData>,
    pub(crate) row_count: usize,
    /// Bumped whenever row or column positions shift. Cursors and views
    /// compare this against the value they captured at bind time.
    #[serde(skip)]
    pub(crate) version: u64,
    /// Parallel to `columns`; contents are rebuilt on load.
    #[serde(skip)]
    pub(crate) indexes: Vec<Option<SearchIndex>>,
}

impl TableCore {
    pub(crate) fn new(name: Option<String>) -> Self {
        TableCore {
            name,
            columns: Vec::new(),
            data: Vec::new(),
            row_count: 0,
            version: 0,
            indexes: Vec::new(),
        }
    }

    pub(crate) fn deep_clone(&self) -> TableCore {
        TableCore {
            name: self.name.clone(),
            columns: self.columns.clone(),
            data: self.data.iter().map(ColumnData::deep_clone).collect(),
            row_count: self.row_count,
            version: self.version,
            indexes: self.indexes.clone(),
        }
    }

    /// Restores the `indexes` vector from the `has_index` flags, e.g. after
    /// deserialization left it empty.
    pub(crate) fn rebuild_indexes(&mut self) {
        self.indexes = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                c.has_index
                    .then(|| SearchIndex::build(&self.data[i], self.row_count))
            })
            .collect();
    }

    // ---- bounds and type checks ------------------------------------------

    fn check_col(&self, col: usize) -> Result<&Column> {
        self.columns.get(col).ok_or_else(|| {
            Error::OutOfRange(format!(
                "column index {} out of range (column count {})",
                col,
                self.columns.len()
            ))
        })
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.row_count {
            return Err(Error::OutOfRange(format!(
                "row index {} out of range (row count {})",
                row, self.row_count
            )));
        }
        Ok(())
    }

    fn type_mismatch(&self, col: usize, accessor: ColumnType) -> Error {
        Error::TypeMismatch {
            expected: accessor.to_string(),
            found: self.columns[col].ty.to_string(),
        }
    }

    fn null_not_allowed(&self, col: usize) -> Error {
        Error::InvalidArgument(format!(
            "null is not allowed for non-nullable column '{}'",
            self.columns[col].name
        ))
    }

    fn check_name(&self, name: &str, renamed: Option<usize>) -> Result<()> {
        if name.len() > MAX_COLUMN_NAME_LENGTH {
            return Err(Error::InvalidName(format!(
                "'{}' exceeds {} bytes",
                name, MAX_COLUMN_NAME_LENGTH
            )));
        }
        let duplicate = self
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| c.name == name && renamed != Some(i));
        if duplicate {
            return Err(Error::InvalidName(format!("'{}' already exists", name)));
        }
        Ok(())
    }

    fn ensure_columns(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::OutOfRange("table has no columns".into()));
        }
        Ok(())
    }

    // ---- schema mutation -------------------------------------------------

    pub(crate) fn add_column(
        &mut self,
        ty: ColumnType,
        name: &str,
        nullable: bool,
    ) -> Result<usize> {
        if nullable && !ty.supports_nullability_conversion() {
            return Err(Error::UnsupportedColumnType(format!(
                "{} columns cannot be nullable",
                ty
            )));
        }
        self.check_name(name, None)?;
        let mut data = ColumnData::new(ty);
        for _ in 0..self.row_count {
            data.push_default();
        }
        self.columns.push(Column::new(ty, name, nullable));
        self.data.push(data);
        self.indexes.push(None);
        debug!(column = name, %ty, nullable, "added column");
        Ok(self.columns.len() - 1)
    }

    pub(crate) fn add_column_link(
        &mut self,
        ty: ColumnType,
        name: &str,
        target_name: Option<String>,
        target: std::sync::Weak<RwLock<TableCore>>,
    ) -> Result<usize> {
        if !matches!(ty, ColumnType::Link | ColumnType::LinkList) {
            return Err(Error::InvalidArgument(format!(
                "{} is not a link column type",
                ty
            )));
        }
        let col = self.add_column(ty, name, false)?;
        self.columns[col].target_name = target_name;
        self.columns[col].target = target;
        Ok(col)
    }

    pub(crate) fn remove_column(&mut self, col: usize) -> Result<()> {
        self.check_col(col)?;
        let removed = self.columns.remove(col);
        self.data.remove(col);
        self.indexes.remove(col);
        // Higher column indexes shift; detach cursors and views rather than
        // letting them read the wrong slot.
        self.version += 1;
        debug!(column = %removed.name, "removed column");
        Ok(())
    }

    pub(crate) fn rename_column(&mut self, col: usize, new_name: &str) -> Result<()> {
        self.check_col(col)?;
        self.check_name(new_name, Some(col))?;
        self.columns[col].name = new_name.to_owned();
        Ok(())
    }

    pub(crate) fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub(crate) fn convert_column_to_nullable(&mut self, col: usize) -> Result<()> {
        let column = self.check_col(col)?;
        if !column.ty.supports_nullability_conversion() {
            return Err(Error::UnsupportedColumnType(format!(
                "{} columns cannot be converted to nullable",
                column.ty
            )));
        }
        if column.nullable {
            return Ok(());
        }
        self.columns[col].nullable = true;
        debug!(column = %self.columns[col].name, "converted column to nullable");
        Ok(())
    }

    pub(crate) fn convert_column_to_not_nullable(&mut self, col: usize) -> Result<()> {
        let column = self.check_col(col)?;
        if !column.ty.supports_nullability_conversion() {
            return Err(Error::UnsupportedColumnType(format!(
                "{} columns cannot be converted to not-nullable",
                column.ty
            )));
        }
        if !column.nullable {
            return Ok(());
        }
        self.data[col].coerce_nulls_to_default();
        self.columns[col].nullable = false;
        if self.columns[col].has_index {
            self.indexes[col] = Some(SearchIndex::build(&self.data[col], self.row_count));
        }
        debug!(
            column = %self.columns[col].name,
            "converted column to not-nullable"
        );
        Ok(())
    }

    // ---- search indexes --------------------------------------------------

    pub(crate) fn add_search_index(&mut self, col: usize) -> Result<()> {
        let column = self.check_col(col)?;
        if !column.ty.is_indexable() {
            return Err(Error::UnsupportedColumnType(format!(
                "{} columns cannot be indexed",
                column.ty
            )));
        }
        if column.has_index {
            return Ok(());
        }
        self.columns[col].has_index = true;
        self.indexes[col] = Some(SearchIndex::build(&self.data[col], self.row_count));
        debug!(column = %self.columns[col].name, "added search index");
        Ok(())
    }

    /// Removing an index from an eligible column that has none is a no-op.
    pub(crate) fn remove_search_index(&mut self, col: usize) -> Result<()> {
        let column = self.check_col(col)?;
        if !column.ty.is_indexable() {
            return Err(Error::UnsupportedColumnType(format!(
                "{} columns cannot be indexed",
                column.ty
            )));
        }
        self.columns[col].has_index = false;
        self.indexes[col] = None;
        Ok(())
    }

    pub(crate) fn has_search_index(&self, col: usize) -> Result<bool> {
        Ok(self.check_col(col)?.has_index)
    }

    // ---- row mutation ----------------------------------------------------

    fn index_new_row(&mut self, row: usize) {
        for col in 0..self.columns.len() {
            if self.indexes[col].is_some() {
                let key = IndexKey::from_value(&self.data[col].value_at(row));
                if let (Some(index), Some(key)) = (self.indexes[col].as_mut(), key) {
                    index.insert(key, row);
                }
            }
        }
    }

    pub(crate) fn add_empty_row(&mut self) -> Result<usize> {
        self.ensure_columns()?;
        let row = self.row_count;
        for data in &mut self.data {
            data.push_default();
        }
        self.row_count += 1;
        self.index_new_row(row);
        Ok(row)
    }

    pub(crate) fn add_empty_rows(&mut self, n: usize) -> Result<usize> {
        self.ensure_columns()?;
        let first = self.row_count;
        for _ in 0..n {
            self.add_empty_row()?;
        }
        Ok(first)
    }

    fn validate_add_value(&self, col: usize, value: &Value) -> Result<()> {
        let column = &self.columns[col];
        match value.column_type() {
            None => {
                // Null: fine for containers and Mixed, otherwise the column
                // must be nullable.
                let container = matches!(
                    column.ty,
                    ColumnType::Mixed | ColumnType::Table | ColumnType::Link | ColumnType::LinkList
                );
                if !container && !column.nullable {
                    return Err(self.null_not_allowed(col));
                }
            }
            Some(value_ty) => {
                let ok = match column.ty {
                    ColumnType::Mixed => true,
                    ColumnType::Link => value_ty == ColumnType::Integer,
                    declared => value_ty == declared,
                };
                if !ok {
                    return Err(Error::TypeMismatch {
                        expected: column.ty.to_string(),
                        found: value_ty.to_string(),
                    });
                }
                if column.ty == ColumnType::Link {
                    if let Value::Int(v) = value {
                        if *v < 0 {
                            return Err(Error::InvalidArgument(format!(
                                "link target row must not be negative, got {}",
                                v
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Positionally appends one row; values match the declared column order.
    pub(crate) fn add(&mut self, values: &[Value]) -> Result<usize> {
        self.ensure_columns()?;
        if values.len() != self.columns.len() {
            return Err(Error::InvalidArgument(format!(
                "row has {} values, table has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        for (col, value) in values.iter().enumerate() {
            self.validate_add_value(col, value)?;
        }

        let row = self.row_count;
        for (col, value) in values.iter().enumerate() {
            self.data[col].push_default();
            match (&mut self.data[col], value) {
                (_, Value::Null) => {
                    if self.columns[col].nullable {
                        self.data[col].set_null_at(row);
                    }
                }
                (ColumnData::Bool(c), Value::Bool(v)) => c[row] = Some(*v),
                (ColumnData::Int(c), Value::Int(v)) => c[row] = Some(*v),
                (ColumnData::Float(c), Value::Float(v)) => c[row] = Some(*v),
                (ColumnData::Double(c), Value::Double(v)) => c[row] = Some(*v),
                (ColumnData::Str(c), Value::String(v)) => c[row] = Some(v.clone()),
                (ColumnData::Binary(c), Value::Binary(v)) => c[row] = Some(v.clone()),
                (ColumnData::Date(c), Value::Date(v)) => c[row] = Some(v.timestamp_millis()),
                (ColumnData::Mixed(c), v) => c[row] = v.clone(),
                (ColumnData::Link(c), Value::Int(v)) => c[row] = Some(*v as usize),
                _ => {}
            }
        }
        self.row_count += 1;
        self.index_new_row(row);
        Ok(row)
    }

    pub(crate) fn remove(&mut self, row: usize) -> Result<()> {
        self.check_row(row)?;
        for data in &mut self.data {
            data.remove(row);
        }
        self.row_count -= 1;
        self.version += 1;
        self.rebuild_indexes();
        Ok(())
    }

    pub(crate) fn remove_last(&mut self) -> Result<()> {
        if self.row_count == 0 {
            return Err(Error::OutOfRange("table has no rows".into()));
        }
        self.remove(self.row_count - 1)
    }

    pub(crate) fn clear(&mut self) {
        for data in &mut self.data {
            data.clear();
        }
        self.row_count = 0;
        self.version += 1;
        self.rebuild_indexes();
    }

    // ---- typed cell access -----------------------------------------------

    /// Runs a cell mutation and keeps the column's search index (if any)
    /// consistent with it.
    fn reindex_cell<F: FnOnce(&mut ColumnData)>(&mut self, col: usize, row: usize, mutate: F) {
        let old = if self.indexes[col].is_some() {
            IndexKey::from_value(&self.data[col].value_at(row))
        } else {
            None
        };
        mutate(&mut self.data[col]);
        let new = if self.indexes[col].is_some() {
            IndexKey::from_value(&self.data[col].value_at(row))
        } else {
            None
        };
        if let Some(index) = self.indexes[col].as_mut() {
            if let Some(key) = old {
                index.remove(&key, row);
            }
            if let Some(key) = new {
                index.insert(key, row);
            }
        }
    }

    pub(crate) fn get_long(&self, col: usize, row: usize) -> Result<i64> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Int(cells) => {
                self.check_row(row)?;
                Ok(cells[row].unwrap_or(0))
            }
            _ => Err(self.type_mismatch(col, ColumnType::Integer)),
        }
    }

    pub(crate) fn set_long(&mut self, col: usize, row: usize, value: i64) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Int(_)) {
            return Err(self.type_mismatch(col, ColumnType::Integer));
        }
        self.check_row(row)?;
        self.reindex_cell(col, row, |d| {
            if let ColumnData::Int(cells) = d {
                cells[row] = Some(value);
            }
        });
        Ok(())
    }

    pub(crate) fn get_boolean(&self, col: usize, row: usize) -> Result<bool> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Bool(cells) => {
                self.check_row(row)?;
                Ok(cells[row].unwrap_or(false))
            }
            _ => Err(self.type_mismatch(col, ColumnType::Boolean)),
        }
    }

    pub(crate) fn set_boolean(&mut self, col: usize, row: usize, value: bool) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Bool(_)) {
            return Err(self.type_mismatch(col, ColumnType::Boolean));
        }
        self.check_row(row)?;
        self.reindex_cell(col, row, |d| {
            if let ColumnData::Bool(cells) = d {
                cells[row] = Some(value);
            }
        });
        Ok(())
    }

    pub(crate) fn get_float(&self, col: usize, row: usize) -> Result<f32> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Float(cells) => {
                self.check_row(row)?;
                Ok(cells[row].unwrap_or(0.0))
            }
            _ => Err(self.type_mismatch(col, ColumnType::Float)),
        }
    }

    pub(crate) fn set_float(&mut self, col: usize, row: usize, value: f32) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Float(_)) {
            return Err(self.type_mismatch(col, ColumnType::Float));
        }
        self.check_row(row)?;
        if let ColumnData::Float(cells) = &mut self.data[col] {
            cells[row] = Some(value);
        }
        Ok(())
    }

    pub(crate) fn get_double(&self, col: usize, row: usize) -> Result<f64> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Double(cells) => {
                self.check_row(row)?;
                Ok(cells[row].unwrap_or(0.0))
            }
            _ => Err(self.type_mismatch(col, ColumnType::Double)),
        }
    }

    pub(crate) fn set_double(&mut self, col: usize, row: usize, value: f64) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Double(_)) {
            return Err(self.type_mismatch(col, ColumnType::Double));
        }
        self.check_row(row)?;
        if let ColumnData::Double(cells) = &mut self.data[col] {
            cells[row] = Some(value);
        }
        Ok(())
    }

    pub(crate) fn get_string(&self, col: usize, row: usize) -> Result<Option<String>> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Str(cells) => {
                self.check_row(row)?;
                Ok(cells[row].clone())
            }
            _ => Err(self.type_mismatch(col, ColumnType::String)),
        }
    }

    pub(crate) fn set_string(&mut self, col: usize, row: usize, value: Option<&str>) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Str(_)) {
            return Err(self.type_mismatch(col, ColumnType::String));
        }
        self.check_row(row)?;
        if value.is_none() && !self.columns[col].nullable {
            return Err(self.null_not_allowed(col));
        }
        let owned = value.map(str::to_owned);
        self.reindex_cell(col, row, |d| {
            if let ColumnData::Str(cells) = d {
                cells[row] = owned;
            }
        });
        Ok(())
    }

    pub(crate) fn get_binary(&self, col: usize, row: usize) -> Result<Option<Vec<u8>>> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Binary(cells) => {
                self.check_row(row)?;
                Ok(cells[row].clone())
            }
            _ => Err(self.type_mismatch(col, ColumnType::Binary)),
        }
    }

    pub(crate) fn set_binary(&mut self, col: usize, row: usize, value: Option<&[u8]>) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Binary(_)) {
            return Err(self.type_mismatch(col, ColumnType::Binary));
        }
        self.check_row(row)?;
        if value.is_none() && !self.columns[col].nullable {
            return Err(self.null_not_allowed(col));
        }
        if let ColumnData::Binary(cells) = &mut self.data[col] {
            cells[row] = value.map(<[u8]>::to_vec);
        }
        Ok(())
    }

    pub(crate) fn get_date(&self, col: usize, row: usize) -> Result<Option<DateTime<Utc>>> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Date(cells) => {
                self.check_row(row)?;
                Ok(cells[row]
                    .map(|m| DateTime::<Utc>::from_timestamp_millis(m).unwrap_or_default()))
            }
            _ => Err(self.type_mismatch(col, ColumnType::Date)),
        }
    }

    pub(crate) fn set_date(
        &mut self,
        col: usize,
        row: usize,
        value: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Date(_)) {
            return Err(self.type_mismatch(col, ColumnType::Date));
        }
        self.check_row(row)?;
        if value.is_none() && !self.columns[col].nullable {
            return Err(self.null_not_allowed(col));
        }
        let millis = value.map(|d| d.timestamp_millis());
        self.reindex_cell(col, row, |d| {
            if let ColumnData::Date(cells) = d {
                cells[row] = millis;
            }
        });
        Ok(())
    }

    pub(crate) fn get_mixed(&self, col: usize, row: usize) -> Result<Value> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Mixed(cells) => {
                self.check_row(row)?;
                Ok(cells[row].clone())
            }
            _ => Err(self.type_mismatch(col, ColumnType::Mixed)),
        }
    }

    pub(crate) fn get_mixed_type(&self, col: usize, row: usize) -> Result<Option<ColumnType>> {
        Ok(self.get_mixed(col, row)?.column_type())
    }

    pub(crate) fn set_mixed(&mut self, col: usize, row: usize, value: Option<Value>) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Mixed(_)) {
            return Err(self.type_mismatch(col, ColumnType::Mixed));
        }
        self.check_row(row)?;
        let value = value.ok_or_else(|| self.null_not_allowed(col))?;
        if let ColumnData::Mixed(cells) = &mut self.data[col] {
            cells[row] = value;
        }
        Ok(())
    }

    pub(crate) fn get_subtable(&self, col: usize, row: usize) -> Result<SharedCore> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Table(cells) => {
                self.check_row(row)?;
                Ok(cells[row].clone())
            }
            _ => Err(self.type_mismatch(col, ColumnType::Table)),
        }
    }

    pub(crate) fn is_null(&self, col: usize, row: usize) -> Result<bool> {
        self.check_col(col)?;
        self.check_row(row)?;
        Ok(self.data[col].is_null_at(row))
    }

    pub(crate) fn set_null(&mut self, col: usize, row: usize) -> Result<()> {
        self.check_col(col)?;
        self.check_row(row)?;
        if !self.columns[col].nullable {
            return Err(self.null_not_allowed(col));
        }
        self.reindex_cell(col, row, |d| d.set_null_at(row));
        Ok(())
    }

    // ---- links -----------------------------------------------------------

    /// Bounds-checks a link target against its target table when the handle
    /// is resolvable. `try_read` so a self-referencing table (whose core the
    /// caller already holds) skips the check instead of deadlocking.
    fn check_link_target(&self, col: usize, target_row: usize) -> Result<()> {
        if let Some(target) = self.columns[col].target.upgrade() {
            if let Some(core) = target.try_read() {
                if target_row >= core.row_count {
                    return Err(Error::OutOfRange(format!(
                        "link target row {} out of range (target row count {})",
                        target_row, core.row_count
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn get_link(&self, col: usize, row: usize) -> Result<Option<usize>> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Link(cells) => {
                self.check_row(row)?;
                Ok(cells[row])
            }
            _ => Err(self.type_mismatch(col, ColumnType::Link)),
        }
    }

    pub(crate) fn set_link(&mut self, col: usize, row: usize, target_row: usize) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Link(_)) {
            return Err(self.type_mismatch(col, ColumnType::Link));
        }
        self.check_row(row)?;
        self.check_link_target(col, target_row)?;
        if let ColumnData::Link(cells) = &mut self.data[col] {
            cells[row] = Some(target_row);
        }
        Ok(())
    }

    pub(crate) fn nullify_link(&mut self, col: usize, row: usize) -> Result<()> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::Link(_)) {
            return Err(self.type_mismatch(col, ColumnType::Link));
        }
        self.check_row(row)?;
        if let ColumnData::Link(cells) = &mut self.data[col] {
            cells[row] = None;
        }
        Ok(())
    }

    pub(crate) fn is_null_link(&self, col: usize, row: usize) -> Result<bool> {
        Ok(self.get_link(col, row)?.is_none())
    }

    fn link_list_cells(&self, col: usize, row: usize) -> Result<&Vec<usize>> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::LinkList(cells) => {
                self.check_row(row)?;
                Ok(&cells[row])
            }
            _ => Err(self.type_mismatch(col, ColumnType::LinkList)),
        }
    }

    fn link_list_cells_mut(&mut self, col: usize, row: usize) -> Result<&mut Vec<usize>> {
        self.check_col(col)?;
        if !matches!(self.data[col], ColumnData::LinkList(_)) {
            return Err(self.type_mismatch(col, ColumnType::LinkList));
        }
        self.check_row(row)?;
        match &mut self.data[col] {
            ColumnData::LinkList(cells) => Ok(&mut cells[row]),
            _ => Err(Error::IllegalState("link list storage changed type".into())),
        }
    }

    pub(crate) fn link_list_len(&self, col: usize, row: usize) -> Result<usize> {
        Ok(self.link_list_cells(col, row)?.len())
    }

    pub(crate) fn link_list_get(&self, col: usize, row: usize, pos: usize) -> Result<usize> {
        let links = self.link_list_cells(col, row)?;
        links.get(pos).copied().ok_or_else(|| {
            Error::OutOfRange(format!(
                "link position {} out of range (list length {})",
                pos,
                links.len()
            ))
        })
    }

    pub(crate) fn link_list_add(&mut self, col: usize, row: usize, target_row: usize) -> Result<()> {
        self.check_col(col)?;
        self.check_link_target(col, target_row)?;
        self.link_list_cells_mut(col, row)?.push(target_row);
        Ok(())
    }

    pub(crate) fn link_list_insert(
        &mut self,
        col: usize,
        row: usize,
        pos: usize,
        target_row: usize,
    ) -> Result<()> {
        self.check_col(col)?;
        self.check_link_target(col, target_row)?;
        let links = self.link_list_cells_mut(col, row)?;
        if pos > links.len() {
            return Err(Error::OutOfRange(format!(
                "link position {} out of range (list length {})",
                pos,
                links.len()
            )));
        }
        links.insert(pos, target_row);
        Ok(())
    }

    pub(crate) fn link_list_set(
        &mut self,
        col: usize,
        row: usize,
        pos: usize,
        target_row: usize,
    ) -> Result<()> {
        self.check_col(col)?;
        self.check_link_target(col, target_row)?;
        let links = self.link_list_cells_mut(col, row)?;
        match links.get_mut(pos) {
            Some(slot) => {
                *slot = target_row;
                Ok(())
            }
            None => Err(Error::OutOfRange(format!(
                "link position {} out of range (list length {})",
                pos,
                links.len()
            ))),
        }
    }

    pub(crate) fn link_list_remove(&mut self, col: usize, row: usize, pos: usize) -> Result<()> {
        let links = self.link_list_cells_mut(col, row)?;
        if pos >= links.len() {
            return Err(Error::OutOfRange(format!(
                "link position {} out of range (list length {})",
                pos,
                links.len()
            )));
        }
        links.remove(pos);
        Ok(())
    }

    pub(crate) fn link_list_clear(&mut self, col: usize, row: usize) -> Result<()> {
        self.link_list_cells_mut(col, row)?.clear();
        Ok(())
    }

    // ---- search ----------------------------------------------------------

    fn find_first_value(&self, col: usize, target: &Value) -> Option<usize> {
        if let Some(index) = &self.indexes[col] {
            if let Some(key) = IndexKey::from_value(target) {
                return index.first(&key);
            }
        }
        (0..self.row_count).find(|&row| self.data[col].value_at(row) == *target)
    }

    fn find_all_values(&self, col: usize, target: &Value) -> Vec<usize> {
        if let Some(index) = &self.indexes[col] {
            if let Some(key) = IndexKey::from_value(target) {
                return index.all(&key);
            }
        }
        (0..self.row_count)
            .filter(|&row| self.data[col].value_at(row) == *target)
            .collect()
    }

    fn check_search_col(&self, col: usize, accessor: ColumnType) -> Result<()> {
        let column = self.check_col(col)?;
        if column.ty != accessor {
            return Err(self.type_mismatch(col, accessor));
        }
        Ok(())
    }

    /// Resolves an optional search argument for a nullable-capable column:
    /// `None` searches for the stored null marker on a nullable column and
    /// is rejected on a non-nullable one.
    fn null_search_target(&self, col: usize, value: Option<Value>) -> Result<Value> {
        match value {
            Some(v) => Ok(v),
            None => {
                if self.columns[col].nullable {
                    Ok(Value::Null)
                } else {
                    Err(Error::InvalidArgument(format!(
                        "null search value for non-nullable column '{}'",
                        self.columns[col].name
                    )))
                }
            }
        }
    }

    pub(crate) fn find_first_long(&self, col: usize, value: i64) -> Result<Option<usize>> {
        self.check_search_col(col, ColumnType::Integer)?;
        Ok(self.find_first_value(col, &Value::Int(value)))
    }

    pub(crate) fn find_first_boolean(&self, col: usize, value: bool) -> Result<Option<usize>> {
        self.check_search_col(col, ColumnType::Boolean)?;
        Ok(self.find_first_value(col, &Value::Bool(value)))
    }

    pub(crate) fn find_first_float(&self, col: usize, value: f32) -> Result<Option<usize>> {
        self.check_search_col(col, ColumnType::Float)?;
        Ok(self.find_first_value(col, &Value::Float(value)))
    }

    pub(crate) fn find_first_double(&self, col: usize, value: f64) -> Result<Option<usize>> {
        self.check_search_col(col, ColumnType::Double)?;
        Ok(self.find_first_value(col, &Value::Double(value)))
    }

    pub(crate) fn find_first_string(
        &self,
        col: usize,
        value: Option<&str>,
    ) -> Result<Option<usize>> {
        self.check_search_col(col, ColumnType::String)?;
        let target = self.null_search_target(col, value.map(Value::from))?;
        Ok(self.find_first_value(col, &target))
    }

    pub(crate) fn find_first_date(
        &self,
        col: usize,
        value: Option<DateTime<Utc>>,
    ) -> Result<Option<usize>> {
        self.check_search_col(col, ColumnType::Date)?;
        let target = self.null_search_target(col, value.map(Value::Date))?;
        Ok(self.find_first_value(col, &target))
    }

    pub(crate) fn find_all(&self, col: usize, accessor: ColumnType, target: &Value) -> Result<Vec<usize>> {
        self.check_search_col(col, accessor)?;
        Ok(self.find_all_values(col, target))
    }

    // ---- aggregates ------------------------------------------------------

    pub(crate) fn count(&self, col: usize, value: &Value) -> Result<usize> {
        let column = self.check_col(col)?;
        if let Some(value_ty) = value.column_type() {
            if column.ty != ColumnType::Mixed && column.ty != value_ty {
                return Err(self.type_mismatch(col, value_ty));
            }
        }
        if let Some(index) = &self.indexes[col] {
            if let Some(key) = IndexKey::from_value(value) {
                return Ok(index.count(&key));
            }
        }
        Ok((0..self.row_count)
            .filter(|&row| self.data[col].value_at(row) == *value)
            .count())
    }

    fn int_cells(&self, col: usize) -> Result<&[Option<i64>]> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Int(cells) => Ok(cells),
            _ => Err(self.type_mismatch(col, ColumnType::Integer)),
        }
    }

    fn float_cells(&self, col: usize) -> Result<&[Option<f32>]> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Float(cells) => Ok(cells),
            _ => Err(self.type_mismatch(col, ColumnType::Float)),
        }
    }

    fn double_cells(&self, col: usize) -> Result<&[Option<f64>]> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Double(cells) => Ok(cells),
            _ => Err(self.type_mismatch(col, ColumnType::Double)),
        }
    }

    fn date_cells(&self, col: usize) -> Result<&[Option<i64>]> {
        self.check_col(col)?;
        match &self.data[col] {
            ColumnData::Date(cells) => Ok(cells),
            _ => Err(self.type_mismatch(col, ColumnType::Date)),
        }
    }

    pub(crate) fn maximum_long(&self, col: usize) -> Result<Option<i64>> {
        Ok(self.int_cells(col)?.iter().flatten().max().copied())
    }

    pub(crate) fn minimum_long(&self, col: usize) -> Result<Option<i64>> {
        Ok(self.int_cells(col)?.iter().flatten().min().copied())
    }

    pub(crate) fn maximum_float(&self, col: usize) -> Result<Option<f32>> {
        Ok(self.float_cells(col)?.iter().flatten().copied().reduce(f32::max))
    }

    pub(crate) fn minimum_float(&self, col: usize) -> Result<Option<f32>> {
        Ok(self.float_cells(col)?.iter().flatten().copied().reduce(f32::min))
    }

    pub(crate) fn maximum_double(&self, col: usize) -> Result<Option<f64>> {
        Ok(self.double_cells(col)?.iter().flatten().copied().reduce(f64::max))
    }

    pub(crate) fn minimum_double(&self, col: usize) -> Result<Option<f64>> {
        Ok(self.double_cells(col)?.iter().flatten().copied().reduce(f64::min))
    }

    /// Maximum by underlying timestamp ordering.
    pub(crate) fn maximum_date(&self, col: usize) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .date_cells(col)?
            .iter()
            .flatten()
            .max()
            .map(|&m| DateTime::<Utc>::from_timestamp_millis(m).unwrap_or_default()))
    }

    pub(crate) fn minimum_date(&self, col: usize) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .date_cells(col)?
            .iter()
            .flatten()
            .min()
            .map(|&m| DateTime::<Utc>::from_timestamp_millis(m).unwrap_or_default()))
    }

    pub(crate) fn sum_long(&self, col: usize) -> Result<i64> {
        Ok(self.int_cells(col)?.iter().flatten().sum())
    }

    pub(crate) fn sum_float(&self, col: usize) -> Result<f64> {
        Ok(self.float_cells(col)?.iter().flatten().map(|&v| v as f64).sum())
    }

    pub(crate) fn sum_double(&self, col: usize) -> Result<f64> {
        Ok(self.double_cells(col)?.iter().flatten().sum())
    }

    pub(crate) fn average_long(&self, col: usize) -> Result<Option<f64>> {
        let cells = self.int_cells(col)?;
        let values: Vec<i64> = cells.iter().flatten().copied().collect();
        Ok(average(values.iter().map(|&v| v as f64)))
    }

    pub(crate) fn average_float(&self, col: usize) -> Result<Option<f64>> {
        let cells = self.float_cells(col)?;
        let values: Vec<f32> = cells.iter().flatten().copied().collect();
        Ok(average(values.iter().map(|&v| v as f64)))
    }

    pub(crate) fn average_double(&self, col: usize) -> Result<Option<f64>> {
        let cells = self.double_cells(col)?;
        let values: Vec<f64> = cells.iter().flatten().copied().collect();
        Ok(average(values.iter().copied()))
    }

    // ---- sorting ---------------------------------------------------------

    /// Stable permutation of all row positions ordered by one column.
    pub(crate) fn sorted_rows(&self, col: usize, order: Order) -> Result<Vec<usize>> {
        let column = self.check_col(col)?;
        if !column.ty.is_sortable() {
            return Err(Error::UnsupportedColumnType(format!(
                "{} columns cannot be sorted",
                column.ty
            )));
        }
        let mut rows: Vec<usize> = (0..self.row_count).collect();
        rows.sort_by(|&a, &b| {
            let ordering = self.data[col]
                .value_at(a)
                .natural_cmp(&self.data[col].value_at(b));
            match order {
                Order::Ascending => ordering,
                Order::Descending => ordering.reverse(),
            }
        });
        Ok(rows)
    }

    // ---- display ---------------------------------------------------------

    fn cell_text(&self, col: usize, row: usize) -> String {
        match &self.data[col] {
            ColumnData::Table(_) => "[table]".to_owned(),
            ColumnData::Link(cells) => cells[row]
                .map(|t| format!("-> {}", t))
                .unwrap_or_else(|| "null".to_owned()),
            ColumnData::LinkList(cells) => format!("{} links", cells[row].len()),
            data => data.value_at(row).to_string(),
        }
    }

    fn right_aligned(&self, col: usize) -> bool {
        matches!(
            self.columns[col].ty,
            ColumnType::Boolean
                | ColumnType::Integer
                | ColumnType::Float
                | ColumnType::Double
                | ColumnType::Date
        )
    }
}

/// The public table handle. Cloning produces another handle to the same
/// storage; handles from a read transaction are flagged read-only and refuse
/// every mutating call.
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) core: Arc<RwLock<TableCore>>,
    pub(crate) read_only: bool,
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

impl Table {
    /// A free-standing, in-memory, writable table.
    pub fn new() -> Table {
        Table {
            core: Arc::new(RwLock::new(TableCore::new(None))),
            read_only: false,
        }
    }

    pub(crate) fn from_core(core: Arc<RwLock<TableCore>>, read_only: bool) -> Table {
        Table { core, read_only }
    }

    fn read(&self) -> parking_lot::RwLockReadGuard<'_, TableCore> {
        self.core.read()
    }

    fn write(&self) -> Result<parking_lot::RwLockWriteGuard<'_, TableCore>> {
        if self.read_only {
            return Err(Error::IllegalState(
                "cannot modify a table in a read transaction".into(),
            ));
        }
        Ok(self.core.write())
    }

    // ---- schema ----------------------------------------------------------

    /// Appends a non-nullable column; existing rows receive the type's
    /// default value. Returns the new column index.
    pub fn add_column(&self, ty: ColumnType, name: &str) -> Result<usize> {
        self.write()?.add_column(ty, name, false)
    }

    pub fn add_column_nullable(&self, ty: ColumnType, name: &str, nullable: bool) -> Result<usize> {
        self.write()?.add_column(ty, name, nullable)
    }

    /// Appends a Link or LinkList column referencing rows of `target`.
    pub fn add_column_link(&self, ty: ColumnType, name: &str, target: &Table) -> Result<usize> {
        let target_name = target.get_name();
        self.write()?
            .add_column_link(ty, name, target_name, Arc::downgrade(&target.core))
    }

    pub fn remove_column(&self, col: usize) -> Result<()> {
        self.write()?.remove_column(col)
    }

    pub fn rename_column(&self, col: usize, new_name: &str) -> Result<()> {
        self.write()?.rename_column(col, new_name)
    }

    pub fn get_column_count(&self) -> usize {
        self.read().columns.len()
    }

    pub fn get_column_name(&self, col: usize) -> Result<String> {
        Ok(self.read().check_col(col)?.name.clone())
    }

    /// Column index for a name, or `None` if absent.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.read().get_column_index(name)
    }

    pub fn get_column_type(&self, col: usize) -> Result<ColumnType> {
        Ok(self.read().check_col(col)?.ty)
    }

    pub fn is_column_nullable(&self, col: usize) -> Result<bool> {
        Ok(self.read().check_col(col)?.nullable)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }

    /// Rewrites the column in place to accept the explicit null marker.
    /// Values, column position and any search index are preserved. No-op if
    /// already nullable.
    pub fn convert_column_to_nullable(&self, col: usize) -> Result<()> {
        self.write()?.convert_column_to_nullable(col)
    }

    /// Rewrites the column to reject the null marker; stored nulls are
    /// coerced to the type's default value.
    pub fn convert_column_to_not_nullable(&self, col: usize) -> Result<()> {
        self.write()?.convert_column_to_not_nullable(col)
    }

    /// The table's name inside its group, if any.
    pub fn get_name(&self) -> Option<String> {
        self.read().name.clone()
    }

    // ---- search indexes --------------------------------------------------

    pub fn add_search_index(&self, col: usize) -> Result<()> {
        self.write()?.add_search_index(col)
    }

    pub fn remove_search_index(&self, col: usize) -> Result<()> {
        self.write()?.remove_search_index(col)
    }

    pub fn has_search_index(&self, col: usize) -> Result<bool> {
        self.read().has_search_index(col)
    }

    // ---- rows ------------------------------------------------------------

    pub fn size(&self) -> usize {
        self.read().row_count
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn add_empty_row(&self) -> Result<usize> {
        self.write()?.add_empty_row()
    }

    /// Appends `n` default rows; returns the index of the first one. With
    /// `n == 0` nothing is appended and the returned index is the current
    /// row count, one past the last row.
    pub fn add_empty_rows(&self, n: usize) -> Result<usize> {
        self.write()?.add_empty_rows(n)
    }

    /// Appends one row from positional values matching the column order.
    pub fn add(&self, values: &[Value]) -> Result<usize> {
        self.write()?.add(values)
    }

    pub fn remove(&self, row: usize) -> Result<()> {
        self.write()?.remove(row)
    }

    pub fn remove_last(&self) -> Result<()> {
        self.write()?.remove_last()
    }

    pub fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    /// A positioned cursor over one existing row.
    pub fn get_row(&self, row: usize) -> Result<Row> {
        let core = self.read();
        core.check_row(row)?;
        Ok(Row::bound(
            Arc::downgrade(&self.core),
            self.read_only,
            row,
            core.version,
        ))
    }

    // ---- typed accessors -------------------------------------------------

    pub fn get_long(&self, col: usize, row: usize) -> Result<i64> {
        self.read().get_long(col, row)
    }

    pub fn set_long(&self, col: usize, row: usize, value: i64) -> Result<()> {
        self.write()?.set_long(col, row, value)
    }

    pub fn get_boolean(&self, col: usize, row: usize) -> Result<bool> {
        self.read().get_boolean(col, row)
    }

    pub fn set_boolean(&self, col: usize, row: usize, value: bool) -> Result<()> {
        self.write()?.set_boolean(col, row, value)
    }

    pub fn get_float(&self, col: usize, row: usize) -> Result<f32> {
        self.read().get_float(col, row)
    }

    pub fn set_float(&self, col: usize, row: usize, value: f32) -> Result<()> {
        self.write()?.set_float(col, row, value)
    }

    pub fn get_double(&self, col: usize, row: usize) -> Result<f64> {
        self.read().get_double(col, row)
    }

    pub fn set_double(&self, col: usize, row: usize, value: f64) -> Result<()> {
        self.write()?.set_double(col, row, value)
    }

    /// `None` when the cell holds the null marker.
    pub fn get_string(&self, col: usize, row: usize) -> Result<Option<String>> {
        self.read().get_string(col, row)
    }

    /// `None` stores the null marker on a nullable column and fails on a
    /// non-nullable one.
    pub fn set_string(&self, col: usize, row: usize, value: Option<&str>) -> Result<()> {
        self.write()?.set_string(col, row, value)
    }

    pub fn get_binary(&self, col: usize, row: usize) -> Result<Option<Vec<u8>>> {
        self.read().get_binary(col, row)
    }

    pub fn set_binary(&self, col: usize, row: usize, value: Option<&[u8]>) -> Result<()> {
        self.write()?.set_binary(col, row, value)
    }

    pub fn get_date(&self, col: usize, row: usize) -> Result<Option<DateTime<Utc>>> {
        self.read().get_date(col, row)
    }

    pub fn set_date(&self, col: usize, row: usize, value: Option<DateTime<Utc>>) -> Result<()> {
        self.write()?.set_date(col, row, value)
    }

    pub fn get_mixed(&self, col: usize, row: usize) -> Result<Value> {
        self.read().get_mixed(col, row)
    }

    /// Tag of the value currently held by a Mixed cell.
    pub fn get_mixed_type(&self, col: usize, row: usize) -> Result<Option<ColumnType>> {
        self.read().get_mixed_type(col, row)
    }

    pub fn set_mixed(&self, col: usize, row: usize, value: Option<Value>) -> Result<()> {
        self.write()?.set_mixed(col, row, value)
    }

    /// The nested table held by a Table-typed cell. The returned handle
    /// shares storage with the cell and inherits this table's mutability.
    pub fn get_subtable(&self, col: usize, row: usize) -> Result<Table> {
        let shared = self.read().get_subtable(col, row)?;
        Ok(Table::from_core(shared.0, self.read_only))
    }

    pub fn is_null(&self, col: usize, row: usize) -> Result<bool> {
        self.read().is_null(col, row)
    }

    pub fn set_null(&self, col: usize, row: usize) -> Result<()> {
        self.write()?.set_null(col, row)
    }

    // ---- links -----------------------------------------------------------

    pub fn get_link(&self, col: usize, row: usize) -> Result<Option<usize>> {
        self.read().get_link(col, row)
    }

    pub fn set_link(&self, col: usize, row: usize, target_row: usize) -> Result<()> {
        self.write()?.set_link(col, row, target_row)
    }

    pub fn nullify_link(&self, col: usize, row: usize) -> Result<()> {
        self.write()?.nullify_link(col, row)
    }

    pub fn is_null_link(&self, col: usize, row: usize) -> Result<bool> {
        self.read().is_null_link(col, row)
    }

    /// The ordered, mutable list of links held by one LinkList cell.
    pub fn get_link_list(&self, col: usize, row: usize) -> Result<LinkView> {
        let core = self.read();
        // Validate eagerly so a bad column or row fails here, not on first use.
        core.link_list_len(col, row)?;
        Ok(LinkView::bound(
            Arc::downgrade(&self.core),
            self.read_only,
            col,
            row,
            core.version,
        ))
    }

    // ---- search ----------------------------------------------------------

    pub fn find_first_long(&self, col: usize, value: i64) -> Result<Option<usize>> {
        self.read().find_first_long(col, value)
    }

    pub fn find_first_boolean(&self, col: usize, value: bool) -> Result<Option<usize>> {
        self.read().find_first_boolean(col, value)
    }

    pub fn find_first_float(&self, col: usize, value: f32) -> Result<Option<usize>> {
        self.read().find_first_float(col, value)
    }

    pub fn find_first_double(&self, col: usize, value: f64) -> Result<Option<usize>> {
        self.read().find_first_double(col, value)
    }

    pub fn find_first_string(&self, col: usize, value: Option<&str>) -> Result<Option<usize>> {
        self.read().find_first_string(col, value)
    }

    pub fn find_first_date(&self, col: usize, value: Option<DateTime<Utc>>) -> Result<Option<usize>> {
        self.read().find_first_date(col, value)
    }

    fn view_of(&self, rows: Vec<usize>) -> TableView {
        TableView::bound(Arc::downgrade(&self.core), rows, self.read().version)
    }

    pub fn find_all_long(&self, col: usize, value: i64) -> Result<TableView> {
        let rows = self.read().find_all(col, ColumnType::Integer, &Value::Int(value))?;
        Ok(self.view_of(rows))
    }

    pub fn find_all_boolean(&self, col: usize, value: bool) -> Result<TableView> {
        let rows = self.read().find_all(col, ColumnType::Boolean, &Value::Bool(value))?;
        Ok(self.view_of(rows))
    }

    pub fn find_all_float(&self, col: usize, value: f32) -> Result<TableView> {
        let rows = self.read().find_all(col, ColumnType::Float, &Value::Float(value))?;
        Ok(self.view_of(rows))
    }

    pub fn find_all_double(&self, col: usize, value: f64) -> Result<TableView> {
        let rows = self.read().find_all(col, ColumnType::Double, &Value::Double(value))?;
        Ok(self.view_of(rows))
    }

    pub fn find_all_string(&self, col: usize, value: &str) -> Result<TableView> {
        let rows = self.read().find_all(col, ColumnType::String, &Value::from(value))?;
        Ok(self.view_of(rows))
    }

    pub fn find_all_date(&self, col: usize, value: DateTime<Utc>) -> Result<TableView> {
        let rows = self.read().find_all(col, ColumnType::Date, &Value::Date(value))?;
        Ok(self.view_of(rows))
    }

    // ---- aggregates ------------------------------------------------------

    /// Number of rows holding exactly `value` in the column.
    pub fn count(&self, col: usize, value: &Value) -> Result<usize> {
        self.read().count(col, value)
    }

    pub fn maximum_long(&self, col: usize) -> Result<Option<i64>> {
        self.read().maximum_long(col)
    }

    pub fn minimum_long(&self, col: usize) -> Result<Option<i64>> {
        self.read().minimum_long(col)
    }

    pub fn maximum_float(&self, col: usize) -> Result<Option<f32>> {
        self.read().maximum_float(col)
    }

    pub fn minimum_float(&self, col: usize) -> Result<Option<f32>> {
        self.read().minimum_float(col)
    }

    pub fn maximum_double(&self, col: usize) -> Result<Option<f64>> {
        self.read().maximum_double(col)
    }

    pub fn minimum_double(&self, col: usize) -> Result<Option<f64>> {
        self.read().minimum_double(col)
    }

    pub fn maximum_date(&self, col: usize) -> Result<Option<DateTime<Utc>>> {
        self.read().maximum_date(col)
    }

    pub fn minimum_date(&self, col: usize) -> Result<Option<DateTime<Utc>>> {
        self.read().minimum_date(col)
    }

    pub fn sum_long(&self, col: usize) -> Result<i64> {
        self.read().sum_long(col)
    }

    pub fn sum_float(&self, col: usize) -> Result<f64> {
        self.read().sum_float(col)
    }

    pub fn sum_double(&self, col: usize) -> Result<f64> {
        self.read().sum_double(col)
    }

    pub fn average_long(&self, col: usize) -> Result<Option<f64>> {
        self.read().average_long(col)
    }

    pub fn average_float(&self, col: usize) -> Result<Option<f64>> {
        self.read().average_float(col)
    }

    pub fn average_double(&self, col: usize) -> Result<Option<f64>> {
        self.read().average_double(col)
    }

    // ---- views -----------------------------------------------------------

    /// Rows ordered ascending by one column; a snapshot of positions, not a
    /// live query.
    pub fn get_sorted_view(&self, col: usize) -> Result<TableView> {
        self.get_sorted_view_ordered(col, Order::Ascending)
    }

    pub fn get_sorted_view_ordered(&self, col: usize, order: Order) -> Result<TableView> {
        let rows = self.read().sorted_rows(col, order)?;
        Ok(self.view_of(rows))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.read();
        let mut widths: Vec<usize> = core.columns.iter().map(|c| c.name.len()).collect();
        let mut cells: Vec<Vec<String>> = Vec::with_capacity(core.row_count);
        for row in 0..core.row_count {
            let texts: Vec<String> = (0..core.columns.len())
                .map(|col| core.cell_text(col, row))
                .collect();
            for (col, text) in texts.iter().enumerate() {
                widths[col] = widths[col].max(text.len());
            }
            cells.push(texts);
        }

        write!(f, "    ")?;
        for (col, column) in core.columns.iter().enumerate() {
            if col > 0 {
                write!(f, "  ")?;
            }
            write!(f, "{:<width$}", column.name, width = widths[col])?;
        }
        writeln!(f)?;
        for (row, texts) in cells.iter().enumerate() {
            write!(f, "{:<4}", format!("{}:", row))?;
            for (col, text) in texts.iter().enumerate() {
                if col > 0 {
                    write!(f, "  ")?;
                }
                if core.right_aligned(col) {
                    write!(f, "{:>width$}", text, width = widths[col])?;
                } else {
                    write!(f, "{:<width$}", text, width = widths[col])?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 { None } else { Some(sum / count as f64) }
}
