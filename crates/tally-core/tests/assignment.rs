//! Integration tests for anonymous identity and variant assignment.
//!
//! Covers stability of assignment, distribution across variants, and how
//! the assigner behaves when the local store misbehaves.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tally_core::{BucketAssigner, CoreError, ExperimentCatalog, assign_variant, hash_to_index};
use tally_store::{FileStore, KeyValueStore, MemoryStore, StoreError, keys};
use tally_types::AnonymousId;

/// Counts writes so tests can assert that nothing was rewritten.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

/// A store that refuses every operation.
struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable(String::from("storage disabled")))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(String::from("storage disabled")))
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(String::from("storage disabled")))
    }
}

/// Reads fine, but every write fails.
#[derive(Default)]
struct ReadOnlyStore {
    inner: MemoryStore,
}

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::QuotaExceeded {
            key: key.to_owned(),
            needed: 1,
            limit: 0,
        })
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

fn variants(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| (*l).to_owned()).collect()
}

#[test]
fn thousand_calls_agree() {
    let id = AnonymousId::parse("k3j2h1g0f9e8d").unwrap();
    let labels = variants(&["#00ff88", "#ff4500", "#1e90ff"]);
    let first = assign_variant(&id, "button-color", &labels).unwrap().to_owned();
    for _ in 0..1000 {
        assert_eq!(assign_variant(&id, "button-color", &labels).unwrap(), first);
    }
}

#[test]
fn distribution_is_roughly_uniform() {
    let labels = variants(&["a", "b", "c"]);
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for i in 0..10_000 {
        let id = AnonymousId::parse(&format!("user-{i}")).unwrap();
        let variant = assign_variant(&id, "button-color", &labels).unwrap();
        *counts.entry(variant.to_owned()).or_default() += 1;
    }

    assert_eq!(counts.len(), 3);
    for (variant, count) in &counts {
        // 33.3% +/- 5 points of 10,000.
        assert!(
            (2833..=3833).contains(count),
            "variant {variant} got {count} of 10000"
        );
    }
}

#[test]
fn distribution_holds_for_random_ids() {
    let labels = variants(&["a", "b", "c"]);
    let mut counts = [0u32; 3];
    for _ in 0..10_000 {
        let id = AnonymousId::generate();
        let variant = assign_variant(&id, "urgency-text", &labels).unwrap();
        let slot = labels.iter().position(|l| l == variant).unwrap();
        if let Some(count) = counts.get_mut(slot) {
            *count += 1;
        }
    }
    for count in counts {
        assert!((2833..=3833).contains(&count), "got {count} of 10000");
    }
}

#[test]
fn empty_variant_list_is_rejected() {
    let id = AnonymousId::parse("abc123").unwrap();
    let result = assign_variant(&id, "hero", &[]);
    assert!(matches!(result, Err(CoreError::InvalidConfiguration { .. })));
}

#[test]
fn hash_fixture() {
    assert_eq!(hash_to_index("abc123-button-color", 3).unwrap(), 2);
}

#[test]
fn existing_id_is_returned_without_rewrite() {
    let store = CountingStore::default();
    store.inner.set(keys::ANONYMOUS_ID, "k3j2h1g0f9e8d").unwrap();
    let assigner = BucketAssigner::new(&store, ExperimentCatalog::conversion_defaults());

    let first = assigner.get_or_create_anonymous_id();
    let second = assigner.get_or_create_anonymous_id();

    assert_eq!(first, second);
    assert_eq!(first.as_str(), "k3j2h1g0f9e8d");
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[test]
fn new_id_is_written_once() {
    let store = CountingStore::default();
    let assigner = BucketAssigner::new(&store, ExperimentCatalog::empty());

    let minted = assigner.get_or_create_anonymous_id();
    assert_eq!(assigner.get_or_create_anonymous_id(), minted);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}

#[test]
fn assignment_is_stable_across_assigner_instances() {
    let store = MemoryStore::new();
    let first = BucketAssigner::new(&store, ExperimentCatalog::conversion_defaults()).segment();
    let second = BucketAssigner::new(&store, ExperimentCatalog::conversion_defaults()).segment();
    assert_eq!(first, second);
}

#[test]
fn unavailable_store_degrades_to_ephemeral_id() {
    let assigner = BucketAssigner::new(UnavailableStore, ExperimentCatalog::conversion_defaults());
    let segment = assigner.segment();
    assert!(!segment.user_id.as_str().is_empty());
    assert_eq!(segment.variants.len(), 3);
}

#[test]
fn failed_write_still_returns_an_id() {
    let store = ReadOnlyStore::default();
    let assigner = BucketAssigner::new(&store, ExperimentCatalog::empty());
    let id = assigner.get_or_create_anonymous_id();
    assert!(!id.as_str().is_empty());
    assert!(store.inner.get(keys::ANONYMOUS_ID).unwrap().is_none());
}

#[test]
fn corrupt_store_file_keeps_id_stable() {
    let dir = std::env::temp_dir().join(format!("tally-core-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("store.json");
    std::fs::write(&path, "[1,").unwrap();

    let assigner = BucketAssigner::new(FileStore::open(&path), ExperimentCatalog::conversion_defaults());
    let first = assigner.segment();
    let second = assigner.segment();

    assert_eq!(first, second);
    assert_eq!(
        FileStore::open(&path).get(keys::ANONYMOUS_ID).unwrap().as_deref(),
        Some(first.user_id.as_str())
    );
    std::fs::remove_dir_all(&dir).ok();
}
