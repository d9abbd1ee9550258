//! The persisted, append-only event log.
//!
//! The log is stored as one JSON array under [`keys::EVENT_LOG`]. Each
//! [`EventLog::record`] call reads the whole list, appends, trims to the
//! retention cap, and writes the whole list back. That read-modify-write is
//! not atomic across contexts sharing a store: the last writer wins.
//!
//! A stored value that does not parse as a list of events is treated as
//! absent and replaced on the next write.
//!
//! Events that could not be written are kept as pending and merged into
//! every later append, so a full or read-only store never drops them from
//! the in-memory log. They reach the store with the first write that
//! succeeds.

use chrono::{DateTime, Utc};
use tally_store::{JsonStoreExt, KeyValueStore, StoreError, keys};
use tally_types::{Event, Payload};
use tracing::{debug, warn};

use crate::error::CoreError;

/// Default retention cap on persisted events.
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// Append-only event log persisted in a [`KeyValueStore`].
#[derive(Debug)]
pub struct EventLog<S> {
    store: S,
    max_events: usize,
    events: Vec<Event>,
    pending: Vec<Event>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl<S: KeyValueStore> EventLog<S> {
    /// Create a log over `store` with the default retention cap.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            max_events: DEFAULT_MAX_EVENTS,
            events: Vec::new(),
            pending: Vec::new(),
            last_timestamp: None,
        }
    }

    /// Set the retention cap. Zero disables the cap.
    #[must_use]
    pub const fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// The retention cap (zero means unlimited).
    pub const fn max_events(&self) -> usize {
        self.max_events
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Events that have not reached the store yet.
    pub fn pending(&self) -> &[Event] {
        &self.pending
    }

    /// The log as of the last [`record`](Self::record) call.
    ///
    /// When the store is healthy this matches what was persisted; when it is
    /// not, it holds the events that could not be written.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Append an event stamped with the current time and persist the log.
    ///
    /// Timestamps never go backwards relative to earlier events in the log,
    /// even if the wall clock does. Persistence failures are logged and
    /// swallowed; the event is still returned and kept in memory.
    pub fn record(&mut self, name: &str, payload: Payload) -> Event {
        let mut events = self.load_for_append();
        for event in &self.pending {
            if !events.contains(event) {
                events.push(event.clone());
            }
        }

        let now = Utc::now();
        let floor = events
            .last()
            .map(|e| e.timestamp)
            .into_iter()
            .chain(self.last_timestamp)
            .max();
        let timestamp = floor.map_or(now, |floor| floor.max(now));

        let event = Event::new(name, payload, timestamp);
        events.push(event.clone());
        self.apply_retention(&mut events);

        match self.store.set_json(keys::EVENT_LOG, &events) {
            Ok(()) => {
                if !self.pending.is_empty() {
                    debug!(flushed = self.pending.len(), "Persisted pending events");
                }
                self.pending.clear();
                debug!(event = name, len = events.len(), "Recorded event");
            }
            Err(e) => {
                warn!(
                    event = name,
                    error = %e,
                    "Failed to persist event log, keeping event in memory"
                );
                self.pending.clone_from(&events);
            }
        }

        self.last_timestamp = Some(event.timestamp);
        self.events = events;
        event
    }

    /// Read the persisted log without modifying it.
    ///
    /// Unlike [`record`](Self::record), this reports store failures. A
    /// corrupt log still reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the store cannot be read.
    pub fn persisted(&self) -> Result<Vec<Event>, CoreError> {
        match self.store.get_json::<Vec<Event>>(keys::EVENT_LOG) {
            Ok(events) => Ok(events.unwrap_or_default()),
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Event log is corrupt, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the persisted log and the in-memory copy.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the store cannot be written.
    pub fn clear(&mut self) -> Result<(), CoreError> {
        self.store.remove(keys::EVENT_LOG)?;
        self.events.clear();
        self.pending.clear();
        Ok(())
    }

    fn load_for_append(&mut self) -> Vec<Event> {
        match self.store.get_json::<Vec<Event>>(keys::EVENT_LOG) {
            Ok(Some(events)) => events,
            Ok(None) => Vec::new(),
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Event log is corrupt, resetting");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Event log unreadable, appending to in-memory copy");
                std::mem::take(&mut self.events)
            }
        }
    }

    fn apply_retention(&self, events: &mut Vec<Event>) {
        if self.max_events == 0 || events.len() <= self.max_events {
            return;
        }
        let drain_count = events.len().saturating_sub(self.max_events);
        events.drain(..drain_count);
        debug!(dropped = drain_count, "Dropped oldest events past retention cap");
    }
}
