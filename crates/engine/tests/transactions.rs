//! End-to-end transaction tests against a file-backed shared group.

use std::sync::Arc;
use std::thread;
use tablecore_engine::{ColumnType, Error, SharedGroup, Value};

fn seed(sg: &SharedGroup) {
    let mut txn = sg.begin_write();
    let accounts = txn.get_table("accounts").unwrap();
    accounts.add_column(ColumnType::String, "owner").unwrap();
    accounts.add_column(ColumnType::Integer, "balance").unwrap();
    accounts.add(&[Value::from("ann"), Value::Int(100)]).unwrap();
    accounts.add(&[Value::from("bob"), Value::Int(250)]).unwrap();
    txn.commit().unwrap();
}

#[test]
fn committed_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let sg = SharedGroup::open(&path).unwrap();
        seed(&sg);
    }

    let sg = SharedGroup::open(&path).unwrap();
    let read = sg.begin_read();
    let accounts = read.get_table("accounts").unwrap();
    assert_eq!(accounts.size(), 2);
    assert_eq!(accounts.get_string(0, 1).unwrap().as_deref(), Some("bob"));
    assert_eq!(accounts.get_long(1, 1).unwrap(), 250);
}

#[test]
fn uncommitted_changes_never_reach_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let sg = SharedGroup::open(&path).unwrap();
        seed(&sg);
        let mut txn = sg.begin_write();
        let accounts = txn.get_table("accounts").unwrap();
        accounts.set_long(1, 0, 0).unwrap();
        accounts.add(&[Value::from("eve"), Value::Int(1)]).unwrap();
        txn.rollback();
    }

    let sg = SharedGroup::open(&path).unwrap();
    let read = sg.begin_read();
    let accounts = read.get_table("accounts").unwrap();
    assert_eq!(accounts.size(), 2);
    assert_eq!(accounts.get_long(1, 0).unwrap(), 100);
}

#[test]
fn search_index_and_nullability_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let sg = SharedGroup::open(&path).unwrap();
        let mut txn = sg.begin_write();
        let t = txn.get_table("tags").unwrap();
        t.add_column_nullable(ColumnType::String, "tag", true).unwrap();
        t.add_search_index(0).unwrap();
        t.add(&[Value::from("red")]).unwrap();
        t.add(&[Value::Null]).unwrap();
        txn.commit().unwrap();
    }

    let sg = SharedGroup::open(&path).unwrap();
    let read = sg.begin_read();
    let t = read.get_table("tags").unwrap();
    assert!(t.has_search_index(0).unwrap());
    assert!(t.is_column_nullable(0).unwrap());
    assert_eq!(t.find_first_string(0, Some("red")).unwrap(), Some(0));
    assert_eq!(t.find_first_string(0, None).unwrap(), Some(1));
}

#[test]
fn read_transaction_is_pinned_while_writer_commits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let sg = SharedGroup::open(&path).unwrap();
    seed(&sg);

    let pinned = sg.begin_read();

    let mut txn = sg.begin_write();
    let accounts = txn.get_table("accounts").unwrap();
    accounts.set_long(1, 0, 75).unwrap();
    txn.commit().unwrap();

    assert_eq!(pinned.get_table("accounts").unwrap().get_long(1, 0).unwrap(), 100);
    pinned.end_read();
    assert_eq!(
        sg.begin_read().get_table("accounts").unwrap().get_long(1, 0).unwrap(),
        75
    );
}

#[test]
fn read_handles_refuse_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let sg = SharedGroup::open(&path).unwrap();
    seed(&sg);

    let read = sg.begin_read();
    let accounts = read.get_table("accounts").unwrap();
    assert!(matches!(
        accounts.set_long(1, 0, 0),
        Err(Error::IllegalState(_))
    ));
    let row = accounts.get_row(0).unwrap();
    assert_eq!(row.get_table_name().as_deref(), Some("accounts"));
    assert_eq!(row.get_long(1).unwrap(), 100);
    assert!(matches!(row.set_long(1, 0), Err(Error::IllegalState(_))));
}

#[test]
fn concurrent_readers_during_a_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let sg = Arc::new(SharedGroup::open(&path).unwrap());
    seed(&sg);

    let mut txn = sg.begin_write();
    let accounts = txn.get_table("accounts").unwrap();
    accounts.set_long(1, 1, 999).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let sg = Arc::clone(&sg);
            thread::spawn(move || {
                let read = sg.begin_read();
                read.get_table("accounts").unwrap().get_long(1, 1).unwrap()
            })
        })
        .collect();
    for handle in handles {
        // Readers never observe the uncommitted write.
        assert_eq!(handle.join().unwrap(), 250);
    }
    txn.commit().unwrap();
}

#[test]
fn second_writer_is_reported_busy() {
    let sg = Arc::new(SharedGroup::in_memory());
    let txn = sg.begin_write();

    let sg2 = Arc::clone(&sg);
    let busy = thread::spawn(move || sg2.try_begin_write().err()).join().unwrap();
    assert_eq!(busy, Some(Error::WouldBlock));
    drop(txn);
    assert!(sg.try_begin_write().is_ok());
}

#[test]
fn table_removal_is_transactional() {
    let sg = SharedGroup::in_memory();
    seed(&sg);

    {
        let mut txn = sg.begin_write();
        txn.remove_table("accounts").unwrap();
        assert!(!txn.has_table("accounts"));
        txn.rollback();
    }
    assert!(sg.begin_read().has_table("accounts"));

    let mut txn = sg.begin_write();
    txn.remove_table("accounts").unwrap();
    txn.commit().unwrap();
    assert!(matches!(
        sg.begin_read().get_table("accounts"),
        Err(Error::TableNotFound(_))
    ));
}
