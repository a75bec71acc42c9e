//! Table views.
//!
//! A `TableView` is an ordered projection of row positions over one table,
//! produced by sorting or by a find-all search. It is a snapshot taken at
//! creation time, not a live query: it never re-evaluates, and once row or
//! column positions in the source table shift (removal, clear, column
//! removal) the view refuses further access rather than serving positions
//! that may now point at different cells.

use crate::error::{Error, Result};
use crate::table::TableCore;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Weak;
use tablecore_value::{ColumnType, Value};

/// Sort direction for [`Table::get_sorted_view_ordered`](crate::Table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct TableView {
    core: Weak<RwLock<TableCore>>,
    rows: Vec<usize>,
    version: u64,
}

impl TableView {
    pub(crate) fn bound(core: Weak<RwLock<TableCore>>, rows: Vec<usize>, version: u64) -> Self {
        TableView { core, rows, version }
    }

    fn detached_error() -> Error {
        Error::IllegalState("view is detached; row positions in its table have changed".into())
    }

    fn with_read<R>(&self, f: impl FnOnce(&TableCore) -> Result<R>) -> Result<R> {
        let core = self.core.upgrade().ok_or_else(Self::detached_error)?;
        let guard = core.read();
        if guard.version != self.version {
            return Err(Self::detached_error());
        }
        f(&guard)
    }

    /// Whether the view can still be read from.
    pub fn is_attached(&self) -> bool {
        self.with_read(|_| Ok(())).is_ok()
    }

    /// Number of rows in the projection.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The source-table row position behind view position `pos`.
    pub fn get_source_row_index(&self, pos: usize) -> Result<usize> {
        self.rows.get(pos).copied().ok_or_else(|| {
            Error::OutOfRange(format!(
                "view position {} out of range (view size {})",
                pos,
                self.rows.len()
            ))
        })
    }

    pub fn get_long(&self, col: usize, pos: usize) -> Result<i64> {
        let row = self.get_source_row_index(pos)?;
        self.with_read(|core| core.get_long(col, row))
    }

    pub fn get_boolean(&self, col: usize, pos: usize) -> Result<bool> {
        let row = self.get_source_row_index(pos)?;
        self.with_read(|core| core.get_boolean(col, row))
    }

    pub fn get_float(&self, col: usize, pos: usize) -> Result<f32> {
        let row = self.get_source_row_index(pos)?;
        self.with_read(|core| core.get_float(col, row))
    }

    pub fn get_double(&self, col: usize, pos: usize) -> Result<f64> {
        let row = self.get_source_row_index(pos)?;
        self.with_read(|core| core.get_double(col, row))
    }

    pub fn get_string(&self, col: usize, pos: usize) -> Result<Option<String>> {
        let row = self.get_source_row_index(pos)?;
        self.with_read(|core| core.get_string(col, row))
    }

    pub fn get_binary(&self, col: usize, pos: usize) -> Result<Option<Vec<u8>>> {
        let row = self.get_source_row_index(pos)?;
        self.with_read(|core| core.get_binary(col, row))
    }

    pub fn get_date(&self, col: usize, pos: usize) -> Result<Option<DateTime<Utc>>> {
        let row = self.get_source_row_index(pos)?;
        self.with_read(|core| core.get_date(col, row))
    }

    pub fn get_mixed(&self, col: usize, pos: usize) -> Result<Value> {
        let row = self.get_source_row_index(pos)?;
        self.with_read(|core| core.get_mixed(col, row))
    }

    pub fn get_mixed_type(&self, col: usize, pos: usize) -> Result<Option<ColumnType>> {
        Ok(self.get_mixed(col, pos)?.column_type())
    }
}
