//! Record-then-dispatch event emission.
//!
//! [`Emitter::emit`] appends the event to the local log first, then hands
//! `(name, payload)` to every injected sink. Each sink's outcome is
//! collected into a [`DispatchReport`]; failures, including panics, are
//! logged and never propagated. There are no retries.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tally_store::KeyValueStore;
use tally_types::{Event, Payload};
use tracing::warn;

use crate::event_log::EventLog;
use crate::sink::{EventSink, SinkError};

/// The result of delivering one event to one sink.
#[derive(Debug)]
pub struct SinkOutcome {
    /// Name of the sink.
    pub sink: String,
    /// Whether the hand-off succeeded.
    pub result: Result<(), SinkError>,
}

/// Everything that happened for one emitted event.
#[derive(Debug)]
pub struct DispatchReport {
    /// The event as recorded in the log.
    pub event: Event,
    /// One outcome per sink, in registration order.
    pub outcomes: Vec<SinkOutcome>,
}

impl DispatchReport {
    /// Number of sinks that accepted the event.
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of sinks that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Whether every sink accepted the event.
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Appends events to the local log and forwards them to sinks.
pub struct Emitter<S> {
    log: EventLog<S>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl<S: KeyValueStore> Emitter<S> {
    /// Create an emitter over `log` with the given sinks.
    pub fn new(log: EventLog<S>, sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self { log, sinks }
    }

    /// The underlying event log.
    pub const fn log(&self) -> &EventLog<S> {
        &self.log
    }

    /// Mutable access to the underlying event log.
    pub const fn log_mut(&mut self) -> &mut EventLog<S> {
        &mut self.log
    }

    /// Names of the registered sinks, in delivery order.
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Append an event to the local log without notifying sinks.
    pub fn record(&mut self, name: &str, payload: Payload) -> Event {
        self.log.record(name, payload)
    }

    /// Record the event, then deliver it to every sink.
    ///
    /// Never fails: the log append has already happened before any sink
    /// runs, and each sink is isolated from the others.
    pub fn emit(&mut self, name: &str, payload: Payload) -> DispatchReport {
        let event = self.log.record(name, payload);
        let outcomes = self
            .sinks
            .iter()
            .map(|sink| deliver_isolated(sink.as_ref(), &event))
            .collect();
        DispatchReport { event, outcomes }
    }
}

impl<S> core::fmt::Debug for Emitter<S>
where
    S: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Emitter")
            .field("log", &self.log)
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

fn deliver_isolated(sink: &dyn EventSink, event: &Event) -> SinkOutcome {
    let sink_name = sink.name().to_owned();
    let result = catch_unwind(AssertUnwindSafe(|| sink.deliver(&event.name, &event.payload)))
        .unwrap_or_else(|_panic| {
            Err(SinkError::Panicked {
                sink: sink_name.clone(),
            })
        });

    if let Err(e) = &result {
        warn!(sink = sink_name, event = event.name, error = %e, "Sink delivery failed");
    }

    SinkOutcome {
        sink: sink_name,
        result,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tally_store::{MemoryStore, keys};

    use super::*;
    use crate::sink::{CallbackSink, DataLayerSink};

    fn failing() -> Box<dyn EventSink> {
        Box::new(CallbackSink::new("broken", |_: &str, _: &Payload| {
            Err(SinkError::Rejected {
                message: String::from("nope"),
            })
        }))
    }

    fn panicking() -> Box<dyn EventSink> {
        Box::new(CallbackSink::new("explosive", |_: &str, _: &Payload| {
            panic!("sink blew up")
        }))
    }

    #[test]
    fn failing_sink_does_not_block_the_next() {
        let store = MemoryStore::new();
        let layer = DataLayerSink::new();
        let mut emitter = Emitter::new(
            EventLog::new(&store),
            vec![failing(), Box::new(layer.clone())],
        );

        let report = emitter.emit("page_view", Payload::new());

        assert_eq!(layer.entries().len(), 1);
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(emitter.log().persisted().unwrap().len(), 1);
    }

    #[test]
    fn panicking_sink_is_isolated() {
        let store = MemoryStore::new();
        let layer = DataLayerSink::new();
        let mut emitter = Emitter::new(
            EventLog::new(&store),
            vec![panicking(), Box::new(layer.clone())],
        );

        let report = emitter.emit("affiliate_click", Payload::new());

        assert_eq!(layer.entries().len(), 1);
        assert!(matches!(
            report.outcomes.first().map(|o| &o.result),
            Some(Err(SinkError::Panicked { .. }))
        ));
        assert_eq!(emitter.log().persisted().unwrap().len(), 1);
    }

    #[test]
    fn sinks_receive_name_and_payload() {
        let store = MemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_sink = Arc::clone(&seen);
        let sink = CallbackSink::new("gtag", move |name: &str, payload: &Payload| {
            seen_by_sink
                .lock()
                .unwrap()
                .push((name.to_owned(), payload.clone()));
            Ok(())
        });
        let mut emitter = Emitter::new(EventLog::new(&store), vec![Box::new(sink)]);

        let mut payload = Payload::new();
        payload.insert(String::from("page"), serde_json::json!("/gear"));
        let report = emitter.emit("page_view", payload.clone());

        assert!(report.all_delivered());
        assert_eq!(report.event.payload, payload);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), [(String::from("page_view"), payload)]);
    }

    #[test]
    fn no_sinks_still_records() {
        let store = MemoryStore::new();
        let mut emitter = Emitter::new(EventLog::new(&store), Vec::new());
        let report = emitter.emit("x", Payload::new());
        assert!(report.outcomes.is_empty());
        assert!(report.all_delivered());
        assert!(store.get(keys::EVENT_LOG).unwrap().is_some());
    }

    #[test]
    fn storage_failure_still_reaches_sinks() {
        let store = MemoryStore::with_quota(4);
        let layer = DataLayerSink::new();
        let mut emitter = Emitter::new(EventLog::new(&store), vec![Box::new(layer.clone())]);

        let report = emitter.emit("page_view", Payload::new());

        assert!(report.all_delivered());
        assert_eq!(layer.entries().len(), 1);
        assert!(store.get(keys::EVENT_LOG).unwrap().is_none());
        assert_eq!(emitter.log().events().len(), 1);
    }

    #[test]
    fn record_skips_sinks() {
        let store = MemoryStore::new();
        let layer = DataLayerSink::new();
        let mut emitter = Emitter::new(EventLog::new(&store), vec![Box::new(layer.clone())]);
        emitter.record("quiet", Payload::new());
        assert!(layer.entries().is_empty());
        assert_eq!(emitter.sink_names(), ["data_layer"]);
    }
}
