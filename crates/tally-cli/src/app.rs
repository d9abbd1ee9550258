//! Wiring from configuration to a ready tracker, and command execution.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tally_core::attribution::dimensions;
use tally_core::config::StorageBackend;
use tally_core::{
    Attribution, BeaconSink, BucketAssigner, DataLayerSink, DispatchReport, Emitter, EventLog,
    EventSink, TallyConfig, TrafficSource, Tracker, VisitTracker,
};
use tally_store::{FileStore, KeyValueStore, MemoryStore};
use tally_types::Payload;
use tracing::{debug, info};

use crate::cli::{Command, LandingArgs};
use crate::error::CliError;

/// The store shared by every component of one run.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Everything a command needs.
pub struct App {
    tracker: Tracker<SharedStore, SharedStore>,
    visits: VisitTracker<SharedStore>,
    attribution: Attribution<SharedStore>,
    beacon: Option<Arc<BeaconSink>>,
    data_layer: Option<DataLayerSink>,
}

impl App {
    /// Build the store, sinks, and tracker described by `config`.
    pub fn build(config: &TallyConfig) -> Result<Self, CliError> {
        let store = open_store(config);

        let mut sinks: Vec<Box<dyn EventSink>> = Vec::new();

        let data_layer = config.sinks.data_layer.then(DataLayerSink::new);
        if let Some(layer) = &data_layer {
            sinks.push(Box::new(layer.clone()));
        }

        let beacon = config
            .sinks
            .beacon_url
            .as_deref()
            .map(|url| BeaconSink::new(url, config.sinks.beacon_timeout()).map(Arc::new))
            .transpose()?;
        if let Some(beacon) = &beacon {
            info!(endpoint = beacon.endpoint(), "Beacon sink enabled");
            sinks.push(Box::new(Arc::clone(beacon)));
        }

        let assigner = BucketAssigner::new(Arc::clone(&store), config.experiments.clone());
        let log = EventLog::new(Arc::clone(&store)).with_max_events(config.events.max_events);
        let emitter = Emitter::new(log, sinks);

        info!(
            experiments = assigner.catalog().len(),
            sinks = ?emitter.sink_names(),
            max_events = config.events.max_events,
            "Tracker assembled"
        );

        Ok(Self {
            tracker: Tracker::new(assigner, emitter),
            visits: VisitTracker::new(Arc::clone(&store)),
            attribution: Attribution::new(store),
            beacon,
            data_layer,
        })
    }

    /// Run one command, writing its result to stdout.
    pub async fn run(mut self, command: Command) -> Result<(), CliError> {
        let output = match command {
            Command::Segment => serde_json::to_value(self.tracker.assigner().segment())?,
            Command::Impression { page, landing } => {
                self.land(&landing);
                let (segment, report) = self.tracker.impression(&page);
                json!({ "segment": segment, "dispatch": summarize(&report)? })
            }
            Command::Click { product, url } => {
                summarize(&self.tracker.affiliate_click(&product, &url))?
            }
            Command::View { page, landing } => {
                self.land(&landing);
                summarize(&self.tracker.page_view(&page, Payload::new()))?
            }
            Command::Emit { name, payload } => summarize(
                &self
                    .tracker
                    .emitter_mut()
                    .emit(&name, payload.unwrap_or_default()),
            )?,
            Command::Events => serde_json::to_value(self.tracker.emitter().log().persisted()?)?,
            Command::Clear => {
                self.tracker.emitter_mut().log_mut().clear()?;
                json!({ "cleared": true })
            }
            Command::Visit { landing } => {
                let traffic = self.land(&landing);
                json!({ "visit": self.visits.touch(Utc::now()), "traffic": traffic })
            }
        };

        println!("{}", serde_json::to_string_pretty(&output)?);

        if let Some(layer) = &self.data_layer {
            for entry in layer.take() {
                info!(entry = %entry.to_json(), "dataLayer");
            }
        }
        if let Some(beacon) = &self.beacon {
            debug!(in_flight = beacon.in_flight(), "Waiting for beacon deliveries");
            beacon.drain().await;
        }
        Ok(())
    }

    /// Resolve the traffic source of this page load and attach it, with the
    /// visitor type, to later page views and impressions.
    fn land(&mut self, landing: &LandingArgs) -> TrafficSource {
        let traffic = self
            .attribution
            .land(&landing.campaign(), landing.referrer.as_deref());
        debug!(source = %traffic.source, "Resolved traffic source");
        self.tracker
            .set_dimensions(dimensions(&self.visits.user_type(), &traffic));
        traffic
    }
}

fn open_store(config: &TallyConfig) -> SharedStore {
    match config.storage.backend {
        StorageBackend::File => {
            info!(path = %config.storage.path.display(), "Using file store");
            Arc::new(FileStore::open(config.storage.path.clone()))
        }
        StorageBackend::Memory => {
            info!(quota_bytes = ?config.storage.quota_bytes, "Using memory store");
            Arc::new(
                config
                    .storage
                    .quota_bytes
                    .map_or_else(MemoryStore::new, MemoryStore::with_quota),
            )
        }
    }
}

fn summarize(report: &DispatchReport) -> Result<serde_json::Value, CliError> {
    let failures: Vec<serde_json::Value> = report
        .outcomes
        .iter()
        .filter_map(|o| {
            o.result
                .as_ref()
                .err()
                .map(|e| json!({ "sink": o.sink, "error": e.to_string() }))
        })
        .collect();
    Ok(json!({
        "event": serde_json::to_value(&report.event)?,
        "delivered": report.delivered(),
        "failed": failures,
    }))
}
