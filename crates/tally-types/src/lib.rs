//! Shared type definitions for tally.
//!
//! This crate is the single source of truth for the shapes that cross the
//! boundary between the Rust core and the browser glue. Types flow
//! downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- The persisted [`AnonymousId`] and its generator
//! - [`enums`] -- Well-known event names
//! - [`structs`] -- Events, payloads, variant assignments, and segments

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::EventKind;
pub use ids::AnonymousId;
pub use structs::{Event, Payload, Segment, VariantAssignment};
