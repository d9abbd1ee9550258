//! First and last visit bookkeeping.
//!
//! On every page load the visitor's `last_visit` is refreshed. The first
//! time a store is seen, `user_type` is set to `new` and `first_visit` is
//! stamped. Timestamps are written in the same millisecond ISO-8601 form
//! the browser produces (`2024-05-01T12:00:00.000Z`).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tally_store::{KeyValueStore, keys};
use tracing::warn;

/// The `user_type` value written for a first visit.
pub const NEW_USER: &str = "new";

/// What the tracker knows about the current visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitSummary {
    /// Visitor type as stored (`new` unless changed elsewhere).
    pub user_type: String,
    /// When the visitor was first seen, if known.
    pub first_visit: Option<DateTime<Utc>>,
    /// The previous visit, if any.
    pub previous_visit: Option<DateTime<Utc>>,
    /// This visit.
    pub last_visit: DateTime<Utc>,
    /// Whether the store had seen this visitor before.
    pub returning: bool,
}

/// Maintains visit keys in a [`KeyValueStore`].
#[derive(Debug)]
pub struct VisitTracker<S> {
    store: S,
}

impl<S: KeyValueStore> VisitTracker<S> {
    /// Create a tracker over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The stored visitor type, or [`NEW_USER`] when none is stored.
    pub fn user_type(&self) -> String {
        self.read(keys::USER_TYPE)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NEW_USER.to_owned())
    }

    /// Register a visit at `now`.
    ///
    /// Storage failures are logged and the summary is returned as if the
    /// visitor were new; nothing is surfaced to the caller.
    pub fn touch(&self, now: DateTime<Utc>) -> VisitSummary {
        let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let existing_type = self.read(keys::USER_TYPE).filter(|t| !t.is_empty());
        let previous_visit = self.read_time(keys::LAST_VISIT);

        let summary = if let Some(user_type) = existing_type {
            VisitSummary {
                user_type,
                first_visit: self.read_time(keys::FIRST_VISIT),
                previous_visit,
                last_visit: now,
                returning: true,
            }
        } else {
            self.write(keys::USER_TYPE, NEW_USER);
            self.write(keys::FIRST_VISIT, &stamp);
            VisitSummary {
                user_type: NEW_USER.to_owned(),
                first_visit: Some(now),
                previous_visit,
                last_visit: now,
                returning: false,
            }
        };

        self.write(keys::LAST_VISIT, &stamp);
        summary
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "Failed to read visit key");
            None
        })
    }

    fn read_time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.read(key)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key, error = %e, "Failed to write visit key");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use tally_store::MemoryStore;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn first_visit_marks_new_user() {
        let store = MemoryStore::new();
        let visits = VisitTracker::new(&store);
        let summary = visits.touch(at(9));

        assert!(!summary.returning);
        assert_eq!(summary.user_type, "new");
        assert_eq!(summary.first_visit, Some(at(9)));
        assert!(summary.previous_visit.is_none());
        assert_eq!(
            store.get(keys::FIRST_VISIT).unwrap().as_deref(),
            Some("2024-05-01T09:00:00.000Z")
        );
    }

    #[test]
    fn second_visit_is_returning() {
        let store = MemoryStore::new();
        let visits = VisitTracker::new(&store);
        visits.touch(at(9));
        let summary = visits.touch(at(11));

        assert!(summary.returning);
        assert_eq!(summary.first_visit, Some(at(9)));
        assert_eq!(summary.previous_visit, Some(at(9)));
        assert_eq!(summary.last_visit, at(11));
        assert_eq!(
            store.get(keys::LAST_VISIT).unwrap().as_deref(),
            Some("2024-05-01T11:00:00.000Z")
        );
    }

    #[test]
    fn existing_user_type_is_kept() {
        let store = MemoryStore::new();
        store.set(keys::USER_TYPE, "subscriber").unwrap();
        let summary = VisitTracker::new(&store).touch(at(9));
        assert_eq!(summary.user_type, "subscriber");
        assert!(summary.returning);
        assert!(store.get(keys::FIRST_VISIT).unwrap().is_none());
    }

    #[test]
    fn user_type_defaults_to_new_without_writing() {
        let store = MemoryStore::new();
        let visits = VisitTracker::new(&store);
        assert_eq!(visits.user_type(), "new");
        assert!(store.is_empty().unwrap());

        store.set(keys::USER_TYPE, "subscriber").unwrap();
        assert_eq!(visits.user_type(), "subscriber");
    }

    #[test]
    fn full_store_still_reports_visit() {
        let store = MemoryStore::with_quota(1);
        let summary = VisitTracker::new(&store).touch(at(9));
        assert!(!summary.returning);
        assert_eq!(summary.last_visit, at(9));
        assert!(store.is_empty().unwrap());
    }
}
