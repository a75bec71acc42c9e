//! Link lists.
//!
//! A `LinkView` is a cursor over one LinkList cell: the ordered list of
//! target-row positions held by a single row of a LinkList column. Like a
//! row cursor it holds the table weakly and detaches when row positions in
//! the owning table shift.

use crate::error::{Error, Result};
use crate::table::TableCore;
use parking_lot::RwLock;
use std::sync::Weak;

#[derive(Debug, Clone)]
pub struct LinkView {
    core: Weak<RwLock<TableCore>>,
    read_only: bool,
    col: usize,
    row: usize,
    version: u64,
}

impl LinkView {
    pub(crate) fn bound(
        core: Weak<RwLock<TableCore>>,
        read_only: bool,
        col: usize,
        row: usize,
        version: u64,
    ) -> Self {
        LinkView {
            core,
            read_only,
            col,
            row,
            version,
        }
    }

    fn with_read<R>(&self, f: impl FnOnce(&TableCore) -> Result<R>) -> Result<R> {
        let core = self.core.upgrade().ok_or(Error::StaleRow)?;
        let guard = core.read();
        if guard.version != self.version || self.row >= guard.row_count {
            return Err(Error::StaleRow);
        }
        f(&guard)
    }

    fn with_write<R>(&self, f: impl FnOnce(&mut TableCore) -> Result<R>) -> Result<R> {
        if self.read_only {
            return Err(Error::IllegalState(
                "cannot modify a link list in a read transaction".into(),
            ));
        }
        let core = self.core.upgrade().ok_or(Error::StaleRow)?;
        let mut guard = core.write();
        if guard.version != self.version || self.row >= guard.row_count {
            return Err(Error::StaleRow);
        }
        f(&mut guard)
    }

    pub fn is_attached(&self) -> bool {
        self.with_read(|_| Ok(())).is_ok()
    }

    pub fn size(&self) -> Result<usize> {
        self.with_read(|core| core.link_list_len(self.col, self.row))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    /// Target-row position at list position `pos`.
    pub fn get(&self, pos: usize) -> Result<usize> {
        self.with_read(|core| core.link_list_get(self.col, self.row, pos))
    }

    /// Appends a link to `target_row`.
    pub fn add(&self, target_row: usize) -> Result<()> {
        self.with_write(|core| core.link_list_add(self.col, self.row, target_row))
    }

    pub fn insert(&self, pos: usize, target_row: usize) -> Result<()> {
        self.with_write(|core| core.link_list_insert(self.col, self.row, pos, target_row))
    }

    pub fn set(&self, pos: usize, target_row: usize) -> Result<()> {
        self.with_write(|core| core.link_list_set(self.col, self.row, pos, target_row))
    }

    pub fn remove(&self, pos: usize) -> Result<()> {
        self.with_write(|core| core.link_list_remove(self.col, self.row, pos))
    }

    pub fn clear(&self) -> Result<()> {
        self.with_write(|core| core.link_list_clear(self.col, self.row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use tablecore_value::{ColumnType, Value};

    fn linked_tables() -> (Table, Table) {
        let target = Table::new();
        target.add_column(ColumnType::String, "name").unwrap();
        for name in ["a", "b", "c"] {
            target.add(&[Value::from(name)]).unwrap();
        }

        let source = Table::new();
        source
            .add_column_link(ColumnType::LinkList, "links", &target)
            .unwrap();
        source.add_empty_row().unwrap();
        (source, target)
    }

    #[test]
    fn test_link_list_starts_empty() {
        let (source, _target) = linked_tables();
        let list = source.get_link_list(0, 0).unwrap();
        assert!(list.is_attached());
        assert_eq!(list.size().unwrap(), 0);
        assert!(list.is_empty().unwrap());
    }

    #[test]
    fn test_add_insert_set_remove() {
        let (source, _target) = linked_tables();
        let list = source.get_link_list(0, 0).unwrap();

        list.add(2).unwrap();
        list.add(0).unwrap();
        list.insert(1, 1).unwrap();
        assert_eq!(list.size().unwrap(), 3);
        assert_eq!(
            (0..3).map(|p| list.get(p).unwrap()).collect::<Vec<_>>(),
            vec![2, 1, 0]
        );

        list.set(0, 1).unwrap();
        assert_eq!(list.get(0).unwrap(), 1);

        list.remove(1).unwrap();
        assert_eq!(list.size().unwrap(), 2);

        list.clear().unwrap();
        assert!(list.is_empty().unwrap());
    }

    #[test]
    fn test_duplicate_links_allowed() {
        let (source, _target) = linked_tables();
        let list = source.get_link_list(0, 0).unwrap();
        list.add(1).unwrap();
        list.add(1).unwrap();
        assert_eq!(list.size().unwrap(), 2);
    }

    #[test]
    fn test_target_row_out_of_range() {
        let (source, _target) = linked_tables();
        let list = source.get_link_list(0, 0).unwrap();
        assert!(matches!(list.add(3), Err(Error::OutOfRange(_))));
        list.add(0).unwrap();
        assert!(matches!(list.set(0, 99), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_position_out_of_range() {
        let (source, _target) = linked_tables();
        let list = source.get_link_list(0, 0).unwrap();
        assert!(matches!(list.get(0), Err(Error::OutOfRange(_))));
        assert!(matches!(list.remove(0), Err(Error::OutOfRange(_))));
        assert!(matches!(list.insert(1, 0), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_detaches_when_rows_shift() {
        let (source, _target) = linked_tables();
        let list = source.get_link_list(0, 0).unwrap();
        list.add(0).unwrap();

        source.remove(0).unwrap();
        assert!(!list.is_attached());
        assert_eq!(list.get(0), Err(Error::StaleRow));
        assert_eq!(list.add(1), Err(Error::StaleRow));
    }

    #[test]
    fn test_wrong_column_rejected_at_creation() {
        let t = Table::new();
        t.add_column(ColumnType::Integer, "n").unwrap();
        t.add_empty_row().unwrap();
        assert!(matches!(
            t.get_link_list(0, 0),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
