//! Groups: named collections of tables.
//!
//! A `Group` owns its tables and is the unit of persistence and of snapshot
//! isolation. Serialization covers schema and data; search index contents
//! and live link-target handles are rebuilt after load, the latter by
//! looking the persisted target name back up in the group.
//!
//! Saving writes the serialized group to a sibling temp file, syncs it and
//! renames it over the destination, so a crash mid-save leaves the previous
//! file intact.

use crate::error::{Error, Result};
use crate::table::{SharedCore, Table, TableCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Group {
    tables: BTreeMap<String, SharedCore>,
}

impl Group {
    pub fn new() -> Group {
        Group::default()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in lexicographic order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn get_table(&self, name: &str) -> Option<Table> {
        self.get_table_with_mode(name, false)
    }

    pub(crate) fn get_table_with_mode(&self, name: &str, read_only: bool) -> Option<Table> {
        self.tables
            .get(name)
            .map(|shared| Table::from_core(Arc::clone(&shared.0), read_only))
    }

    /// Fetches the named table, creating an empty one if absent.
    pub fn get_or_create_table(&mut self, name: &str) -> Result<Table> {
        if name.is_empty() {
            return Err(Error::InvalidName("table name must not be empty".into()));
        }
        if !self.tables.contains_key(name) {
            let core = TableCore::new(Some(name.to_owned()));
            self.tables.insert(name.to_owned(), SharedCore::new(core));
            debug!(table = name, "created table");
        }
        self.get_table_with_mode(name, false)
            .ok_or_else(|| Error::TableNotFound(name.to_owned()))
    }

    pub fn remove_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(Error::TableNotFound(name.to_owned()));
        }
        debug!(table = name, "removed table");
        Ok(())
    }

    /// An isolated copy: fresh storage for every table, links rebound to the
    /// copies. Mutating the copy never touches `self`.
    pub(crate) fn deep_clone(&self) -> Group {
        let mut group = Group {
            tables: self
                .tables
                .iter()
                .map(|(name, shared)| (name.clone(), shared.deep_clone()))
                .collect(),
        };
        group.rebind_link_targets();
        group
    }

    /// Points every link column's live target handle at the table currently
    /// registered under its persisted target name. Names that resolve to
    /// nothing leave a dangling handle, which link operations treat as
    /// unverifiable rather than broken.
    pub(crate) fn rebind_link_targets(&mut self) {
        let handles: BTreeMap<String, std::sync::Weak<parking_lot::RwLock<TableCore>>> = self
            .tables
            .iter()
            .map(|(name, shared)| (name.clone(), Arc::downgrade(&shared.0)))
            .collect();
        for shared in self.tables.values() {
            let mut core = shared.0.write();
            for column in &mut core.columns {
                if let Some(target_name) = &column.target_name {
                    column.target = handles.get(target_name).cloned().unwrap_or_default();
                }
            }
        }
    }

    /// Serializes the whole group to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        let tmp = path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved group");
        Ok(())
    }

    /// Loads a group previously written by [`Group::save`]. Indexes and link
    /// handles are rebuilt.
    pub fn load(path: &Path) -> Result<Group> {
        let bytes = fs::read(path)?;
        let mut group: Group = serde_json::from_slice(&bytes)?;
        group.rebind_link_targets();
        debug!(path = %path.display(), tables = group.table_count(), "loaded group");
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablecore_value::{ColumnType, Value};

    fn sample_group() -> Group {
        let mut group = Group::new();
        let people = group.get_or_create_table("people").unwrap();
        people.add_column(ColumnType::String, "name").unwrap();
        people
            .add_column_nullable(ColumnType::Integer, "age", true)
            .unwrap();
        people.add(&[Value::from("ann"), Value::Int(30)]).unwrap();
        people.add(&[Value::from("bob"), Value::Null]).unwrap();
        group
    }

    #[test]
    fn test_create_and_lookup() {
        let mut group = Group::new();
        assert_eq!(group.table_count(), 0);
        assert!(group.get_table("people").is_none());

        group.get_or_create_table("people").unwrap();
        group.get_or_create_table("pets").unwrap();
        // Idempotent.
        group.get_or_create_table("people").unwrap();

        assert_eq!(group.table_count(), 2);
        assert!(group.has_table("pets"));
        assert_eq!(group.table_names(), vec!["people", "pets"]);
        assert_eq!(
            group.get_table("people").unwrap().get_name().as_deref(),
            Some("people")
        );
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let mut group = Group::new();
        assert!(matches!(
            group.get_or_create_table(""),
            Err(Error::InvalidName(_))
        ));
    }

    #[test]
    fn test_remove_table() {
        let mut group = sample_group();
        group.remove_table("people").unwrap();
        assert!(!group.has_table("people"));
        assert_eq!(
            group.remove_table("people"),
            Err(Error::TableNotFound("people".into()))
        );
    }

    #[test]
    fn test_deep_clone_isolates_storage() {
        let group = sample_group();
        let clone = group.deep_clone();

        let original = group.get_table("people").unwrap();
        let copied = clone.get_table("people").unwrap();
        copied.set_string(0, 0, Some("zoe")).unwrap();

        assert_eq!(original.get_string(0, 0).unwrap().as_deref(), Some("ann"));
        assert_eq!(copied.get_string(0, 0).unwrap().as_deref(), Some("zoe"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.db");

        let group = sample_group();
        group.save(&path).unwrap();

        let loaded = Group::load(&path).unwrap();
        let people = loaded.get_table("people").unwrap();
        assert_eq!(people.size(), 2);
        assert_eq!(people.get_string(0, 0).unwrap().as_deref(), Some("ann"));
        assert_eq!(people.get_long(1, 0).unwrap(), 30);
        assert!(people.is_null(1, 1).unwrap());
    }

    #[test]
    fn test_search_index_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.db");

        let group = sample_group();
        let people = group.get_table("people").unwrap();
        people.add_search_index(0).unwrap();
        group.save(&path).unwrap();

        let loaded = Group::load(&path).unwrap();
        let people = loaded.get_table("people").unwrap();
        assert!(people.has_search_index(0).unwrap());
        assert_eq!(people.find_first_string(0, Some("bob")).unwrap(), Some(1));
    }

    #[test]
    fn test_links_rebound_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.db");

        let mut group = sample_group();
        let pets = group.get_or_create_table("pets").unwrap();
        pets.add_column(ColumnType::String, "name").unwrap();
        let people = group.get_table("people").unwrap();
        pets.add_column_link(ColumnType::Link, "owner", &people)
            .unwrap();
        pets.add_empty_row().unwrap();
        pets.set_link(1, 0, 1).unwrap();
        group.save(&path).unwrap();

        let loaded = Group::load(&path).unwrap();
        let pets = loaded.get_table("pets").unwrap();
        assert_eq!(pets.get_link(1, 0).unwrap(), Some(1));
        // Rebinding restored target bounds checking: "people" has 2 rows.
        assert!(matches!(pets.set_link(1, 0, 9), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_save_leaves_previous_file_on_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.db");

        let group = sample_group();
        group.save(&path).unwrap();
        let first = fs::read(&path).unwrap();

        let people = group.get_table("people").unwrap();
        people.add(&[Value::from("cid"), Value::Int(7)]).unwrap();
        group.save(&path).unwrap();
        let second = fs::read(&path).unwrap();

        assert_ne!(first, second);
        assert!(!path.with_extension("tmp").exists());
    }
}
