//! Traffic-source attribution.
//!
//! A landing URL tagged with `utm_source` pins the visitor's traffic
//! source, along with `utm_medium` and `utm_campaign`, in the local store.
//! Later pages resolve the source from that stored value, then from the
//! referrer, and finally fall back to `direct`.
//!
//! The resolved source and the visitor type travel with page views and
//! impressions as event dimensions (see [`dimensions`]).

use serde::Serialize;
use serde_json::json;
use tally_store::{KeyValueStore, keys};
use tally_types::Payload;
use tracing::{debug, warn};

/// Traffic source when there is neither a campaign nor a referrer.
pub const DIRECT: &str = "direct";

/// The `utm_*` parameters of a landing URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignParams {
    /// `utm_source`.
    pub source: Option<String>,
    /// `utm_medium`.
    pub medium: Option<String>,
    /// `utm_campaign`.
    pub campaign: Option<String>,
}

/// Where the visitor came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficSource {
    /// Campaign source, referrer, or `direct`.
    pub source: String,
    /// Campaign medium, when the source came from a campaign.
    pub medium: Option<String>,
    /// Campaign name, when the source came from a campaign.
    pub campaign: Option<String>,
}

impl TrafficSource {
    /// `traffic_source`, plus `utm_medium` and `utm_campaign` when known.
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert(String::from(keys::TRAFFIC_SOURCE), json!(self.source));
        if let Some(medium) = &self.medium {
            payload.insert(String::from(keys::UTM_MEDIUM), json!(medium));
        }
        if let Some(campaign) = &self.campaign {
            payload.insert(String::from(keys::UTM_CAMPAIGN), json!(campaign));
        }
        payload
    }
}

/// Event dimensions attached to page views and impressions.
pub fn dimensions(user_type: &str, source: &TrafficSource) -> Payload {
    let mut payload = source.to_payload();
    payload.insert(String::from(keys::USER_TYPE), json!(user_type));
    payload
}

/// Captures and resolves the traffic source in a [`KeyValueStore`].
#[derive(Debug)]
pub struct Attribution<S> {
    store: S,
}

impl<S: KeyValueStore> Attribution<S> {
    /// Create an attribution tracker over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Remember the campaign of a landing URL.
    ///
    /// Only a non-empty `utm_source` counts as a campaign; without one the
    /// stored campaign is left untouched. Medium and campaign are replaced
    /// together with the source, so a missing value clears the old one.
    pub fn capture(&self, params: &CampaignParams) {
        let Some(source) = non_empty(params.source.as_deref()) else {
            return;
        };
        debug!(source, "Captured campaign source");
        self.write(keys::TRAFFIC_SOURCE, Some(source));
        self.write(keys::UTM_MEDIUM, non_empty(params.medium.as_deref()));
        self.write(keys::UTM_CAMPAIGN, non_empty(params.campaign.as_deref()));
    }

    /// The current traffic source.
    ///
    /// A stored campaign wins, then a non-empty `referrer`, then
    /// [`DIRECT`]. Store failures are logged and read as no campaign.
    pub fn resolve(&self, referrer: Option<&str>) -> TrafficSource {
        if let Some(source) = self.read(keys::TRAFFIC_SOURCE) {
            return TrafficSource {
                source,
                medium: self.read(keys::UTM_MEDIUM),
                campaign: self.read(keys::UTM_CAMPAIGN),
            };
        }
        TrafficSource {
            source: non_empty(referrer).unwrap_or(DIRECT).to_owned(),
            medium: None,
            campaign: None,
        }
    }

    /// Handle a page load: [`capture`](Self::capture) the landing
    /// campaign, then report it, or [`resolve`](Self::resolve) the source
    /// when the URL carries none.
    ///
    /// A campaign on the URL is reported even if it could not be stored.
    pub fn land(&self, params: &CampaignParams, referrer: Option<&str>) -> TrafficSource {
        self.capture(params);
        match non_empty(params.source.as_deref()) {
            Some(source) => TrafficSource {
                source: source.to_owned(),
                medium: non_empty(params.medium.as_deref()).map(str::to_owned),
                campaign: non_empty(params.campaign.as_deref()).map(str::to_owned),
            },
            None => self.resolve(referrer),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read attribution key");
                None
            }
        }
    }

    fn write(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "Failed to write attribution key");
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
