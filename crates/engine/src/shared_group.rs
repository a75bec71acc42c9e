//! Transactions.
//!
//! A `SharedGroup` coordinates access to one group under a
//! single-writer / multi-reader discipline. The committed state is an
//! immutable snapshot behind an `Arc`; readers clone the `Arc` and see that
//! snapshot for the life of their transaction, unaffected by later commits.
//! The writer takes an exclusive slot, works on a deep copy of the snapshot
//! and, on commit, persists the copy and publishes it as the new snapshot.
//! Dropping a write transaction without committing discards the copy.

use crate::error::{Error, Result};
use crate::group::Group;
use crate::table::Table;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct SharedGroup {
    path: Option<PathBuf>,
    current: RwLock<Arc<Group>>,
    writer: Mutex<()>,
}

impl SharedGroup {
    /// Opens a file-backed shared group, loading the existing contents if
    /// the file is present.
    pub fn open(path: impl AsRef<Path>) -> Result<SharedGroup> {
        let path = path.as_ref().to_path_buf();
        let group = if path.exists() {
            Group::load(&path)?
        } else {
            Group::new()
        };
        Ok(SharedGroup {
            path: Some(path),
            current: RwLock::new(Arc::new(group)),
            writer: Mutex::new(()),
        })
    }

    /// A shared group with no backing file; commits only publish in memory.
    pub fn in_memory() -> SharedGroup {
        SharedGroup {
            path: None,
            current: RwLock::new(Arc::new(Group::new())),
            writer: Mutex::new(()),
        }
    }

    /// Starts a read transaction pinned to the current committed snapshot.
    /// Never blocks and never observes a concurrent writer's changes.
    pub fn begin_read(&self) -> ReadTransaction {
        ReadTransaction {
            snapshot: Arc::clone(&self.current.read()),
        }
    }

    /// Starts a write transaction, blocking until the writer slot is free.
    pub fn begin_write(&self) -> WriteTransaction<'_> {
        let slot = self.writer.lock();
        self.write_transaction(slot)
    }

    /// Starts a write transaction if the writer slot is free, otherwise
    /// fails with [`Error::WouldBlock`].
    pub fn try_begin_write(&self) -> Result<WriteTransaction<'_>> {
        match self.writer.try_lock() {
            Some(slot) => Ok(self.write_transaction(slot)),
            None => Err(Error::WouldBlock),
        }
    }

    fn write_transaction<'sg>(&'sg self, slot: MutexGuard<'sg, ()>) -> WriteTransaction<'sg> {
        let working = self.current.read().deep_clone();
        debug!("write transaction started");
        WriteTransaction {
            shared: self,
            _slot: slot,
            working,
            finished: false,
        }
    }
}

/// A snapshot-pinned read transaction. Tables fetched through it are
/// read-only handles; ending the transaction is dropping it.
pub struct ReadTransaction {
    snapshot: Arc<Group>,
}

impl ReadTransaction {
    pub fn has_table(&self, name: &str) -> bool {
        self.snapshot.has_table(name)
    }

    pub fn table_count(&self) -> usize {
        self.snapshot.table_count()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.snapshot.table_names()
    }

    pub fn get_table(&self, name: &str) -> Result<Table> {
        self.snapshot
            .get_table_with_mode(name, true)
            .ok_or_else(|| Error::TableNotFound(name.to_owned()))
    }

    pub fn end_read(self) {}
}

/// An exclusive write transaction over a private copy of the group.
pub struct WriteTransaction<'sg> {
    shared: &'sg SharedGroup,
    _slot: MutexGuard<'sg, ()>,
    working: Group,
    finished: bool,
}

impl WriteTransaction<'_> {
    pub fn has_table(&self, name: &str) -> bool {
        self.working.has_table(name)
    }

    pub fn table_count(&self) -> usize {
        self.working.table_count()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.working.table_names()
    }

    /// Fetches a writable table, creating it if absent. Handles are valid
    /// only until the transaction commits or rolls back.
    pub fn get_table(&mut self, name: &str) -> Result<Table> {
        self.working.get_or_create_table(name)
    }

    pub fn remove_table(&mut self, name: &str) -> Result<()> {
        self.working.remove_table(name)
    }

    /// Persists the working copy (for file-backed groups) and publishes it
    /// as the new committed snapshot. If persisting fails nothing is
    /// published and the previous snapshot stays current.
    pub fn commit(mut self) -> Result<()> {
        if let Some(path) = &self.shared.path {
            self.working.save(path)?;
        }
        // Publish an isolated copy so handles kept past the commit cannot
        // reach the committed snapshot.
        *self.shared.current.write() = Arc::new(self.working.deep_clone());
        self.finished = true;
        debug!("write transaction committed");
        Ok(())
    }

    /// Discards the working copy.
    pub fn rollback(mut self) {
        self.finished = true;
        debug!("write transaction rolled back");
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("write transaction dropped; discarding changes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablecore_value::{ColumnType, Value};

    fn seeded() -> SharedGroup {
        let sg = SharedGroup::in_memory();
        let mut txn = sg.begin_write();
        let t = txn.get_table("items").unwrap();
        t.add_column(ColumnType::String, "name").unwrap();
        t.add(&[Value::from("first")]).unwrap();
        txn.commit().unwrap();
        sg
    }

    #[test]
    fn test_commit_becomes_visible_to_new_readers() {
        let sg = seeded();
        let read = sg.begin_read();
        let t = read.get_table("items").unwrap();
        assert_eq!(t.size(), 1);
        assert_eq!(t.get_string(0, 0).unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn test_rollback_discards_changes() {
        let sg = seeded();
        {
            let mut txn = sg.begin_write();
            let t = txn.get_table("items").unwrap();
            t.add(&[Value::from("second")]).unwrap();
            txn.rollback();
        }
        assert_eq!(sg.begin_read().get_table("items").unwrap().size(), 1);
    }

    #[test]
    fn test_drop_without_commit_is_rollback() {
        let sg = seeded();
        {
            let mut txn = sg.begin_write();
            txn.get_table("extra").unwrap();
        }
        assert!(!sg.begin_read().has_table("extra"));
    }

    #[test]
    fn test_readers_keep_their_snapshot_across_commits() {
        let sg = seeded();
        let before = sg.begin_read();

        let mut txn = sg.begin_write();
        let t = txn.get_table("items").unwrap();
        t.add(&[Value::from("second")]).unwrap();
        txn.commit().unwrap();

        // The pinned reader still sees one row; a fresh reader sees two.
        assert_eq!(before.get_table("items").unwrap().size(), 1);
        assert_eq!(sg.begin_read().get_table("items").unwrap().size(), 2);
    }

    #[test]
    fn test_writer_copy_is_isolated_until_commit() {
        let sg = seeded();
        let mut txn = sg.begin_write();
        let t = txn.get_table("items").unwrap();
        t.set_string(0, 0, Some("changed")).unwrap();

        let read = sg.begin_read();
        assert_eq!(
            read.get_table("items").unwrap().get_string(0, 0).unwrap().as_deref(),
            Some("first")
        );
        txn.commit().unwrap();
    }

    #[test]
    fn test_try_begin_write_reports_busy_slot() {
        let sg = seeded();
        let txn = sg.begin_write();
        assert!(matches!(sg.try_begin_write(), Err(Error::WouldBlock)));
        drop(txn);
        assert!(sg.try_begin_write().is_ok());
    }

    #[test]
    fn test_read_transaction_tables_are_immutable() {
        let sg = seeded();
        let read = sg.begin_read();
        let t = read.get_table("items").unwrap();
        assert!(matches!(
            t.add(&[Value::from("nope")]),
            Err(Error::IllegalState(_))
        ));
        assert!(matches!(t.add_empty_row(), Err(Error::IllegalState(_))));
        assert!(matches!(t.clear(), Err(Error::IllegalState(_))));
        assert!(matches!(
            t.add_column(ColumnType::Integer, "n"),
            Err(Error::IllegalState(_))
        ));
    }

    #[test]
    fn test_missing_table_in_read_transaction() {
        let sg = seeded();
        assert_eq!(
            sg.begin_read().get_table("nope").map(|_| ()),
            Err(Error::TableNotFound("nope".into()))
        );
    }
}
