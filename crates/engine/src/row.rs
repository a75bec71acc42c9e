//! Row cursors.
//!
//! A `Row` is a weak positional cursor: it remembers a row index plus the
//! table's mutation version at bind time, and holds the table core only
//! weakly. Any row removal, clear, or column removal bumps the version and
//! every outstanding cursor on that table reports [`Error::StaleRow`]. Plain
//! value writes and column addition do not detach cursors.
//!
//! [`Row::empty`] is the placeholder cursor: it is bound to nothing, reads
//! back each type's default value and refuses every mutation.

use crate::error::{Error, Result};
use crate::link::LinkView;
use crate::table::{Table, TableCore};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Weak;
use tablecore_value::{ColumnType, Value};

#[derive(Debug, Clone)]
struct RowInner {
    core: Weak<RwLock<TableCore>>,
    read_only: bool,
    index: usize,
    version: u64,
}

#[derive(Debug, Clone)]
pub struct Row {
    inner: Option<RowInner>,
}

impl Row {
    /// The placeholder cursor. Value getters return defaults, every mutator
    /// and null check fails with [`Error::IllegalState`].
    pub fn empty() -> Row {
        Row { inner: None }
    }

    pub(crate) fn bound(
        core: Weak<RwLock<TableCore>>,
        read_only: bool,
        index: usize,
        version: u64,
    ) -> Row {
        Row {
            inner: Some(RowInner {
                core,
                read_only,
                index,
                version,
            }),
        }
    }

    fn placeholder_error() -> Error {
        Error::IllegalState("row is a placeholder with no backing table".into())
    }

    /// Runs a read against the backing table, or `StaleRow` if the table is
    /// gone or row positions have shifted since bind time.
    fn with_read<R>(&self, f: impl FnOnce(&TableCore, usize) -> Result<R>) -> Result<R> {
        let inner = self.inner.as_ref().ok_or(Error::StaleRow)?;
        let core = inner.core.upgrade().ok_or(Error::StaleRow)?;
        let guard = core.read();
        if guard.version != inner.version || inner.index >= guard.row_count {
            return Err(Error::StaleRow);
        }
        f(&guard, inner.index)
    }

    fn with_write<R>(&self, f: impl FnOnce(&mut TableCore, usize) -> Result<R>) -> Result<R> {
        let inner = self.inner.as_ref().ok_or_else(Self::placeholder_error)?;
        if inner.read_only {
            return Err(Error::IllegalState(
                "cannot modify a row in a read transaction".into(),
            ));
        }
        let core = inner.core.upgrade().ok_or(Error::StaleRow)?;
        let mut guard = core.write();
        if guard.version != inner.version || inner.index >= guard.row_count {
            return Err(Error::StaleRow);
        }
        f(&mut guard, inner.index)
    }

    /// Whether the cursor still points at a live row.
    pub fn is_attached(&self) -> bool {
        self.with_read(|_, _| Ok(())).is_ok()
    }

    /// The bound row position, or 0 for the placeholder.
    pub fn get_index(&self) -> usize {
        self.inner.as_ref().map_or(0, |i| i.index)
    }

    /// A handle to the backing table, if the cursor is attached.
    pub fn get_table(&self) -> Option<Table> {
        let inner = self.inner.as_ref()?;
        let core = inner.core.upgrade()?;
        Some(Table::from_core(core, inner.read_only))
    }

    /// The backing table's group name, if it is attached and named.
    pub fn get_table_name(&self) -> Option<String> {
        self.with_read(|core, _| Ok(core.name.clone())).unwrap_or(None)
    }

    /// Column count of the backing table; 0 for the placeholder, `StaleRow`
    /// for a detached cursor.
    pub fn get_column_count(&self) -> Result<usize> {
        match &self.inner {
            None => Ok(0),
            Some(_) => self.with_read(|core, _| Ok(core.columns.len())),
        }
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.with_read(|core, _| Ok(core.get_column_index(name)))
            .unwrap_or(None)
    }

    pub fn get_column_name(&self, col: usize) -> Result<String> {
        self.with_read(|core, _| {
            core.columns
                .get(col)
                .map(|c| c.name.clone())
                .ok_or_else(|| {
                    Error::OutOfRange(format!(
                        "column index {} out of range (column count {})",
                        col,
                        core.columns.len()
                    ))
                })
        })
    }

    pub fn get_column_type(&self, col: usize) -> Result<ColumnType> {
        self.with_read(|core, _| {
            core.columns.get(col).map(|c| c.ty).ok_or_else(|| {
                Error::OutOfRange(format!(
                    "column index {} out of range (column count {})",
                    col,
                    core.columns.len()
                ))
            })
        })
    }

    // ---- value getters: the placeholder reads back defaults --------------

    pub fn get_long(&self, col: usize) -> Result<i64> {
        match &self.inner {
            None => Ok(0),
            Some(_) => self.with_read(|core, row| core.get_long(col, row)),
        }
    }

    pub fn get_boolean(&self, col: usize) -> Result<bool> {
        match &self.inner {
            None => Ok(false),
            Some(_) => self.with_read(|core, row| core.get_boolean(col, row)),
        }
    }

    pub fn get_float(&self, col: usize) -> Result<f32> {
        match &self.inner {
            None => Ok(0.0),
            Some(_) => self.with_read(|core, row| core.get_float(col, row)),
        }
    }

    pub fn get_double(&self, col: usize) -> Result<f64> {
        match &self.inner {
            None => Ok(0.0),
            Some(_) => self.with_read(|core, row| core.get_double(col, row)),
        }
    }

    pub fn get_string(&self, col: usize) -> Result<Option<String>> {
        match &self.inner {
            None => Ok(Some(String::new())),
            Some(_) => self.with_read(|core, row| core.get_string(col, row)),
        }
    }

    pub fn get_binary(&self, col: usize) -> Result<Option<Vec<u8>>> {
        match &self.inner {
            None => Ok(Some(Vec::new())),
            Some(_) => self.with_read(|core, row| core.get_binary(col, row)),
        }
    }

    pub fn get_date(&self, col: usize) -> Result<Option<DateTime<Utc>>> {
        match &self.inner {
            None => Ok(Some(DateTime::<Utc>::default())),
            Some(_) => self.with_read(|core, row| core.get_date(col, row)),
        }
    }

    pub fn get_mixed(&self, col: usize) -> Result<Value> {
        match &self.inner {
            None => Ok(Value::Null),
            Some(_) => self.with_read(|core, row| core.get_mixed(col, row)),
        }
    }

    pub fn get_mixed_type(&self, col: usize) -> Result<Option<ColumnType>> {
        Ok(self.get_mixed(col)?.column_type())
    }

    pub fn get_link(&self, col: usize) -> Result<Option<usize>> {
        match &self.inner {
            None => Ok(None),
            Some(_) => self.with_read(|core, row| core.get_link(col, row)),
        }
    }

    pub fn get_subtable(&self, col: usize) -> Result<Table> {
        let inner = self.inner.as_ref().ok_or_else(Self::placeholder_error)?;
        let read_only = inner.read_only;
        let shared = self.with_read(|core, row| core.get_subtable(col, row))?;
        Ok(Table::from_core(shared.0, read_only))
    }

    pub fn get_link_list(&self, col: usize) -> Result<LinkView> {
        let inner = self.inner.as_ref().ok_or_else(Self::placeholder_error)?;
        self.with_read(|core, row| core.link_list_len(col, row).map(|_| ()))?;
        Ok(LinkView::bound(
            inner.core.clone(),
            inner.read_only,
            col,
            inner.index,
            inner.version,
        ))
    }

    // ---- null checks: illegal on the placeholder --------------------------

    pub fn is_null(&self, col: usize) -> Result<bool> {
        if self.inner.is_none() {
            return Err(Self::placeholder_error());
        }
        self.with_read(|core, row| core.is_null(col, row))
    }

    pub fn is_null_link(&self, col: usize) -> Result<bool> {
        if self.inner.is_none() {
            return Err(Self::placeholder_error());
        }
        self.with_read(|core, row| core.is_null_link(col, row))
    }

    // ---- mutators ----------------------------------------------------------

    pub fn set_long(&self, col: usize, value: i64) -> Result<()> {
        self.with_write(|core, row| core.set_long(col, row, value))
    }

    pub fn set_boolean(&self, col: usize, value: bool) -> Result<()> {
        self.with_write(|core, row| core.set_boolean(col, row, value))
    }

    pub fn set_float(&self, col: usize, value: f32) -> Result<()> {
        self.with_write(|core, row| core.set_float(col, row, value))
    }

    pub fn set_double(&self, col: usize, value: f64) -> Result<()> {
        self.with_write(|core, row| core.set_double(col, row, value))
    }

    pub fn set_string(&self, col: usize, value: Option<&str>) -> Result<()> {
        self.with_write(|core, row| core.set_string(col, row, value))
    }

    pub fn set_binary(&self, col: usize, value: Option<&[u8]>) -> Result<()> {
        self.with_write(|core, row| core.set_binary(col, row, value))
    }

    pub fn set_date(&self, col: usize, value: Option<DateTime<Utc>>) -> Result<()> {
        self.with_write(|core, row| core.set_date(col, row, value))
    }

    pub fn set_mixed(&self, col: usize, value: Option<Value>) -> Result<()> {
        self.with_write(|core, row| core.set_mixed(col, row, value))
    }

    pub fn set_null(&self, col: usize) -> Result<()> {
        self.with_write(|core, row| core.set_null(col, row))
    }

    pub fn set_link(&self, col: usize, target_row: usize) -> Result<()> {
        self.with_write(|core, row| core.set_link(col, row, target_row))
    }

    pub fn nullify_link(&self, col: usize) -> Result<()> {
        self.with_write(|core, row| core.nullify_link(col, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn people() -> Table {
        let t = Table::new();
        t.add_column(ColumnType::String, "name").unwrap();
        t.add_column(ColumnType::Integer, "age").unwrap();
        t.add(&[Value::from("ann"), Value::Int(30)]).unwrap();
        t.add(&[Value::from("bob"), Value::Int(40)]).unwrap();
        t
    }

    #[test]
    fn test_cursor_reads_and_writes_through() {
        let t = people();
        let row = t.get_row(1).unwrap();
        assert!(row.is_attached());
        assert_eq!(row.get_index(), 1);
        assert_eq!(row.get_string(0).unwrap().as_deref(), Some("bob"));
        assert_eq!(row.get_long(1).unwrap(), 40);

        row.set_long(1, 41).unwrap();
        assert_eq!(t.get_long(1, 1).unwrap(), 41);
    }

    #[test]
    fn test_cursor_detaches_on_removal() {
        let t = people();
        let row = t.get_row(0).unwrap();
        t.remove(1).unwrap();
        assert!(!row.is_attached());
        assert_eq!(row.get_long(1), Err(Error::StaleRow));
        assert_eq!(row.set_long(1, 5), Err(Error::StaleRow));
    }

    #[test]
    fn test_cursor_detaches_on_column_removal() {
        let t = people();
        let row = t.get_row(0).unwrap();
        assert_eq!(row.get_long(1).unwrap(), 30);

        // Column "age" shifts from index 1 to 0; the cursor must not keep
        // reading index 1 as if nothing happened.
        t.remove_column(0).unwrap();
        assert!(!row.is_attached());
        assert_eq!(row.get_long(1), Err(Error::StaleRow));
        assert_eq!(row.get_column_count(), Err(Error::StaleRow));
    }

    #[test]
    fn test_cursor_survives_value_writes_and_new_columns() {
        let t = people();
        let row = t.get_row(0).unwrap();
        t.set_string(0, 0, Some("anna")).unwrap();
        t.add_column(ColumnType::Boolean, "active").unwrap();
        assert!(row.is_attached());
        assert_eq!(row.get_string(0).unwrap().as_deref(), Some("anna"));
        assert!(!row.get_boolean(2).unwrap());
    }

    #[test]
    fn test_cursor_detaches_on_clear() {
        let t = people();
        let row = t.get_row(0).unwrap();
        t.clear().unwrap();
        assert_eq!(row.get_string(0), Err(Error::StaleRow));
    }

    #[test]
    fn test_cursor_detaches_when_table_dropped() {
        let row = {
            let t = people();
            t.get_row(0).unwrap()
        };
        assert!(!row.is_attached());
        assert!(row.get_table().is_none());
        assert_eq!(row.get_long(1), Err(Error::StaleRow));
    }

    #[test]
    fn test_placeholder_reads_defaults() {
        let row = Row::empty();
        assert_eq!(row.get_column_count().unwrap(), 0);
        assert_eq!(row.get_index(), 0);
        assert_eq!(row.get_long(0).unwrap(), 0);
        assert!(!row.get_boolean(0).unwrap());
        assert_eq!(row.get_float(0).unwrap(), 0.0);
        assert_eq!(row.get_double(0).unwrap(), 0.0);
        assert_eq!(row.get_string(0).unwrap().as_deref(), Some(""));
        assert_eq!(row.get_binary(0).unwrap(), Some(Vec::new()));
        assert_eq!(
            row.get_date(0).unwrap(),
            Some(DateTime::<Utc>::default())
        );
        assert_eq!(row.get_mixed(0).unwrap(), Value::Null);
        assert_eq!(row.get_link(0).unwrap(), None);
        assert!(row.get_table().is_none());
    }

    #[test]
    fn test_placeholder_rejects_mutation_and_null_checks() {
        let row = Row::empty();
        assert!(matches!(row.set_long(0, 1), Err(Error::IllegalState(_))));
        assert!(matches!(
            row.set_string(0, Some("x")),
            Err(Error::IllegalState(_))
        ));
        assert!(matches!(row.set_null(0), Err(Error::IllegalState(_))));
        assert!(matches!(row.is_null(0), Err(Error::IllegalState(_))));
        assert!(matches!(row.is_null_link(0), Err(Error::IllegalState(_))));
        assert!(matches!(row.nullify_link(0), Err(Error::IllegalState(_))));
        assert!(matches!(row.get_link_list(0), Err(Error::IllegalState(_))));
    }

    #[test]
    fn test_read_only_cursor_rejects_writes() {
        let t = people();
        let ro = Table::from_core(t.core.clone(), true);
        let row = ro.get_row(0).unwrap();
        assert_eq!(row.get_long(1).unwrap(), 30);
        assert!(matches!(row.set_long(1, 99), Err(Error::IllegalState(_))));
    }
}
