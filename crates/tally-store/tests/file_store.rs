//! Integration tests for the file-backed store.
//!
//! Each test writes to its own file under the system temp directory so
//! tests can run in parallel.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use tally_store::{FileStore, JsonStoreExt, KeyValueStore};

fn temp_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("tally-store-{}", uuid::Uuid::new_v4()))
        .join("store.json")
}

#[test]
fn missing_file_reads_as_empty() {
    let store = FileStore::open(temp_path());
    assert!(store.get("gc_user_id").unwrap().is_none());
}

#[test]
fn values_survive_reopen() {
    let path = temp_path();
    {
        let store = FileStore::open(&path);
        store.set("gc_user_id", "k3j2h1g0f9e8d").unwrap();
    }

    let reopened = FileStore::open(&path);
    assert_eq!(
        reopened.get("gc_user_id").unwrap().as_deref(),
        Some("k3j2h1g0f9e8d")
    );
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn two_handles_share_one_file() {
    let path = temp_path();
    let a = FileStore::open(&path);
    let b = FileStore::open(&path);

    a.set("x", "1").unwrap();
    b.set("y", "2").unwrap();

    assert_eq!(a.get("y").unwrap().as_deref(), Some("2"));
    assert_eq!(b.get("x").unwrap().as_deref(), Some("1"));

    b.set("x", "3").unwrap();
    assert_eq!(a.get("x").unwrap().as_deref(), Some("3"));
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn remove_deletes_key() {
    let path = temp_path();
    let store = FileStore::open(&path);
    store.set("k", "v").unwrap();
    store.remove("k").unwrap();
    assert!(store.get("k").unwrap().is_none());
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn json_helpers_work_on_file_store() {
    let path = temp_path();
    let store = FileStore::open(&path);
    store.set_json("list", &["a", "b"]).unwrap();
    let back: Option<Vec<String>> = store.get_json("list").unwrap();
    assert_eq!(back, Some(vec![String::from("a"), String::from("b")]));
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn corrupt_file_reads_as_empty() {
    let path = temp_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[1, 2").unwrap();

    let store = FileStore::open(&path);
    assert!(store.get("k").unwrap().is_none());
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn corrupt_file_is_replaced_on_write() {
    let path = temp_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[1,").unwrap();

    let store = FileStore::open(&path);
    store.set("gc_user_id", "k3j2h1g0f9e8d").unwrap();
    assert_eq!(
        store.get("gc_user_id").unwrap().as_deref(),
        Some("k3j2h1g0f9e8d")
    );

    let reopened = FileStore::open(&path);
    assert_eq!(
        reopened.get("gc_user_id").unwrap().as_deref(),
        Some("k3j2h1g0f9e8d")
    );
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}
