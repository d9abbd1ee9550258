//! External event sinks.
//!
//! A sink receives `(name, payload)` for every emitted event. Sinks are
//! injected into the [`Emitter`](crate::emitter::Emitter) when available;
//! the core never probes for them. Each delivery returns an explicit
//! result, and the emitter isolates failures so one sink can never prevent
//! another from running.
//!
//! Provided sinks:
//!
//! | Sink | Purpose |
//! |------|---------|
//! | [`CallbackSink`] | Named closure, e.g. an analytics tag function |
//! | [`DataLayerSink`] | In-memory `["event", name, params]` queue |
//! | [`BeaconSink`] | Fire-and-forget HTTP POST to a backend endpoint |

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tally_types::Payload;
use tokio::task::JoinHandle;
use tracing::debug;

/// Errors a sink can report for a single delivery.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink received the event but refused it.
    #[error("sink rejected event: {message}")]
    Rejected {
        /// Why the event was refused.
        message: String,
    },

    /// The sink cannot deliver right now.
    #[error("sink unavailable: {message}")]
    Unavailable {
        /// What is missing.
        message: String,
    },

    /// The sink panicked during delivery.
    #[error("sink {sink} panicked during delivery")]
    Panicked {
        /// Name of the sink that panicked.
        sink: String,
    },
}

/// A destination for emitted events.
pub trait EventSink: Send + Sync {
    /// Short name used in logs and dispatch reports.
    fn name(&self) -> &str;

    /// Hand the event to the sink.
    ///
    /// Network-facing sinks should only dispatch here and return without
    /// waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the event could not be handed off.
    fn deliver(&self, name: &str, payload: &Payload) -> Result<(), SinkError>;
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn deliver(&self, name: &str, payload: &Payload) -> Result<(), SinkError> {
        (**self).deliver(name, payload)
    }
}

// ---------------------------------------------------------------------------
// CallbackSink
// ---------------------------------------------------------------------------

type Callback = dyn Fn(&str, &Payload) -> Result<(), SinkError> + Send + Sync;

/// A sink backed by a closure.
pub struct CallbackSink {
    name: String,
    callback: Box<Callback>,
}

impl CallbackSink {
    /// Wrap `callback` as a sink called `name`.
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str, &Payload) -> Result<(), SinkError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Box::new(callback),
        }
    }
}

impl core::fmt::Debug for CallbackSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallbackSink")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl EventSink for CallbackSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, name: &str, payload: &Payload) -> Result<(), SinkError> {
        (self.callback)(name, payload)
    }
}

// ---------------------------------------------------------------------------
// DataLayerSink
// ---------------------------------------------------------------------------

/// One queued analytics command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataLayerEntry {
    /// Command verb; always `event` for emitted events.
    pub command: String,
    /// Event name.
    pub name: String,
    /// Event parameters.
    pub params: Payload,
}

impl DataLayerEntry {
    /// The positional form a tag manager consumes: `["event", name, params]`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!([self.command, self.name, self.params])
    }
}

/// Queues events in memory for a tag manager to consume.
///
/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct DataLayerSink {
    entries: Arc<Mutex<Vec<DataLayerEntry>>>,
}

impl DataLayerSink {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the queued entries.
    pub fn entries(&self) -> Vec<DataLayerEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Remove and return every queued entry.
    pub fn take(&self) -> Vec<DataLayerEntry> {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default()
    }
}

impl EventSink for DataLayerSink {
    fn name(&self) -> &str {
        "data_layer"
    }

    fn deliver(&self, name: &str, payload: &Payload) -> Result<(), SinkError> {
        let mut entries = self.entries.lock().map_err(|e| SinkError::Unavailable {
            message: format!("data layer lock poisoned: {e}"),
        })?;
        entries.push(DataLayerEntry {
            command: String::from("event"),
            name: name.to_owned(),
            params: payload.clone(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BeaconSink
// ---------------------------------------------------------------------------

/// Default request timeout for beacon delivery.
pub const DEFAULT_BEACON_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts `{"event": name, "data": payload}` to a backend endpoint.
///
/// Delivery is spawned on the ambient Tokio runtime and never awaited by
/// [`deliver`](EventSink::deliver). Each event gets at most one attempt;
/// the response is logged but not validated.
#[derive(Debug)]
pub struct BeaconSink {
    endpoint: String,
    client: reqwest::Client,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl BeaconSink {
    /// Create a beacon sink for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Unavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            in_flight: Mutex::new(Vec::new()),
        })
    }

    /// The endpoint events are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of deliveries spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .map(|tasks| tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    /// Wait for every spawned delivery to finish.
    ///
    /// Call before the process exits; otherwise pending requests are
    /// dropped, which is acceptable for best-effort delivery.
    pub async fn drain(&self) {
        let tasks = match self.in_flight.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(e) => {
                debug!(error = %e, "Beacon task list poisoned, nothing to drain");
                return;
            }
        };
        for task in tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "Beacon task aborted");
            }
        }
    }
}

impl EventSink for BeaconSink {
    fn name(&self) -> &str {
        "beacon"
    }

    fn deliver(&self, name: &str, payload: &Payload) -> Result<(), SinkError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| SinkError::Unavailable {
                message: format!("no async runtime for beacon delivery: {e}"),
            })?;

        let body = serde_json::json!({ "event": name, "data": payload });
        let request = self.client.post(&self.endpoint).json(&body);
        let endpoint = self.endpoint.clone();
        let event = name.to_owned();

        let task = runtime.spawn(async move {
            match request.send().await {
                Ok(response) => debug!(
                    endpoint,
                    event,
                    status = %response.status(),
                    "Beacon delivered"
                ),
                Err(e) => debug!(endpoint, event, error = %e, "Beacon delivery failed"),
            }
        });

        let mut in_flight = self.in_flight.lock().map_err(|e| SinkError::Unavailable {
            message: format!("beacon task list poisoned: {e}"),
        })?;
        in_flight.retain(|t| !t.is_finished());
        in_flight.push(task);
        Ok(())
    }
}
