//! Deterministic variant assignment and local event logging.
//!
//! A visitor is identified by a persisted [`AnonymousId`]. Every experiment
//! in the [`ExperimentCatalog`] maps that id to one variant through a pure
//! string hash, so assignments are stable across calls, sessions, and
//! devices sharing the id, with nothing stored per experiment. Events are
//! appended to a local log and forwarded to injected sinks; neither storage
//! nor sink failures ever reach the caller.
//!
//! # Modules
//!
//! - [`hash`] -- The 32-bit polynomial string hash and bucket reduction.
//! - [`catalog`] -- Validated experiment catalog.
//! - [`assigner`] -- [`BucketAssigner`]: anonymous id and variant assignment.
//! - [`event_log`] -- [`EventLog`]: persisted append-only event list.
//! - [`sink`] -- [`EventSink`] trait and the provided sinks.
//! - [`emitter`] -- [`Emitter`]: record then dispatch to sinks.
//! - [`visit`] -- First/last visit bookkeeping.
//! - [`attribution`] -- Traffic source from campaign parameters and referrer.
//! - [`tracker`] -- [`Tracker`]: impressions and clicks with variant data.
//! - [`config`] -- Configuration loading from `tally.yaml`.
//! - [`error`] -- Shared error types.
//!
//! [`AnonymousId`]: tally_types::AnonymousId

pub mod assigner;
pub mod attribution;
pub mod catalog;
pub mod config;
pub mod emitter;
pub mod error;
pub mod event_log;
pub mod hash;
pub mod sink;
pub mod tracker;
pub mod visit;

pub use assigner::{BucketAssigner, assign_all, assign_variant};
pub use attribution::{Attribution, CampaignParams, TrafficSource};
pub use catalog::ExperimentCatalog;
pub use config::{ConfigError, TallyConfig};
pub use emitter::{DispatchReport, Emitter, SinkOutcome};
pub use error::CoreError;
pub use event_log::EventLog;
pub use hash::{hash_code, hash_to_index};
pub use sink::{BeaconSink, CallbackSink, DataLayerEntry, DataLayerSink, EventSink, SinkError};
pub use tracker::Tracker;
pub use visit::{VisitSummary, VisitTracker};
