//! Error types for the local store.
//!
//! Callers in the core treat every variant as recoverable: a failing store
//! degrades to in-memory behavior and is logged, never surfaced to the UI.

/// Errors that can occur while reading or writing the local store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store cannot be accessed at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Writing the value would exceed the store's byte quota.
    #[error("quota exceeded writing {key}: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        /// The key being written.
        key: String,
        /// Total bytes the store would hold after the write.
        needed: usize,
        /// The configured quota in bytes.
        limit: usize,
    },

    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value is not valid JSON for the requested type.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal lock was poisoned by a panic in another thread.
    #[error("store lock poisoned")]
    Poisoned,
}
