//! Local persisted key-value store for tally.
//!
//! The browser scripts keep everything in `localStorage`: a flat
//! string-to-string map that survives across sessions on one device. This
//! crate provides the same contract behind the [`KeyValueStore`] trait so
//! the core never touches ambient globals.
//!
//! # Architecture
//!
//! ```text
//! BucketAssigner / EventLog / VisitTracker
//!     |
//!     +-- KeyValueStore (trait)
//!         |-- MemoryStore   (in-process, optional byte quota)
//!         +-- FileStore     (single JSON object file, survives restarts)
//! ```
//!
//! Access is read-modify-write and never atomic across contexts sharing
//! one backing store: the last writer wins.
//!
//! # Modules
//!
//! - [`store`] -- The [`KeyValueStore`] trait and JSON helpers
//! - [`memory`] -- [`MemoryStore`]
//! - [`file`] -- [`FileStore`]
//! - [`keys`] -- Fixed key names shared with the browser scripts
//! - [`error`] -- Shared error types

pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{JsonStoreExt, KeyValueStore};
