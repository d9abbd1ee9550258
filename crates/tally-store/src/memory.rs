//! In-process store with an optional byte quota.
//!
//! The quota models the browser's storage limit: once the total size of
//! keys and values would exceed it, writes fail with
//! [`StoreError::QuotaExceeded`] and the previous value is left intact.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// An in-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Create an empty store with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently held (keys plus values).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn used_bytes(&self) -> Result<usize, StoreError> {
        let entries = self.entries.read().map_err(|_poisoned| StoreError::Poisoned)?;
        Ok(total_bytes(&entries))
    }

    /// Number of keys currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        let entries = self.entries.read().map_err(|_poisoned| StoreError::Poisoned)?;
        Ok(entries.len())
    }

    /// Whether the store holds no keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_poisoned| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_poisoned| StoreError::Poisoned)?;

        if let Some(limit) = self.quota_bytes {
            let current = total_bytes(&entries);
            let replaced = entries
                .get(key)
                .map_or(0, |old| key.len().saturating_add(old.len()));
            let needed = current
                .saturating_sub(replaced)
                .saturating_add(key.len())
                .saturating_add(value.len());
            if needed > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_owned(),
                    needed,
                    limit,
                });
            }
        }

        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_poisoned| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

fn total_bytes(entries: &BTreeMap<String, String>) -> usize {
    entries
        .iter()
        .fold(0usize, |acc, (k, v)| acc.saturating_add(k.len()).saturating_add(v.len()))
}
