//! Core data structures: events, variant assignments, and segments.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};
use ts_rs::TS;

use crate::ids::AnonymousId;

/// Free-form event parameters: string keys mapped to JSON values.
pub type Payload = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A single entry in the local event log.
///
/// Field names on the wire (`event`, `data`, `timestamp`) match the log
/// format the browser scripts already write, so an existing log can be
/// read back without migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Event name, e.g. `variant_impression`.
    #[serde(rename = "event")]
    pub name: String,
    /// Event parameters.
    #[serde(rename = "data", default)]
    pub payload: Payload,
    /// When the event was recorded (ISO-8601, UTC, millisecond precision).
    #[serde(serialize_with = "serialize_millis")]
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Construct an event. The timestamp is truncated to milliseconds, the
    /// precision the log is stored with.
    pub fn new(name: impl Into<String>, payload: Payload, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            payload,
            timestamp: timestamp.trunc_subsecs(3),
        }
    }
}

/// `2024-05-01T12:00:00.000Z`, as `Date.prototype.toISOString` writes it.
fn serialize_millis<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// ---------------------------------------------------------------------------
// VariantAssignment
// ---------------------------------------------------------------------------

/// The variant chosen for each experiment, keyed by experiment name.
///
/// Always derived from an [`AnonymousId`] and a catalog; never stored on
/// its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VariantAssignment(BTreeMap<String, String>);

impl VariantAssignment {
    /// The variant assigned for `experiment`, if the experiment exists.
    pub fn get(&self, experiment: &str) -> Option<&str> {
        self.0.get(experiment).map(String::as_str)
    }

    /// Record the variant for an experiment.
    pub fn insert(&mut self, experiment: impl Into<String>, variant: impl Into<String>) {
        self.0.insert(experiment.into(), variant.into());
    }

    /// Iterate over `(experiment, variant)` pairs in experiment-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of experiments assigned.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no experiments were assigned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert into a JSON object for event payloads.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl FromIterator<(String, String)> for VariantAssignment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// A visitor together with every variant they are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Segment {
    /// The visitor's anonymous id.
    #[serde(rename = "userId")]
    pub user_id: AnonymousId,
    /// One variant per configured experiment.
    pub variants: VariantAssignment,
}
