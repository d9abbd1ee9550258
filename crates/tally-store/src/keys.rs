//! Fixed key names in the local store.
//!
//! These match the keys the browser scripts use so both sides read and
//! write the same entries.
//!
//! | Key | Value |
//! |-----|-------|
//! | `gc_user_id` | Anonymous id |
//! | `gc_events` | JSON array of events |
//! | `user_type` | Visitor type (`new` until changed elsewhere) |
//! | `first_visit` | ISO-8601 timestamp |
//! | `last_visit` | ISO-8601 timestamp |
//! | `traffic_source` | `utm_source` of the landing URL |
//! | `utm_medium` | `utm_medium` of the landing URL |
//! | `utm_campaign` | `utm_campaign` of the landing URL |

/// Persisted anonymous id.
pub const ANONYMOUS_ID: &str = "gc_user_id";

/// Serialized event log.
pub const EVENT_LOG: &str = "gc_events";

/// Visitor type.
pub const USER_TYPE: &str = "user_type";

/// Time of the first recorded visit.
pub const FIRST_VISIT: &str = "first_visit";

/// Time of the most recent visit.
pub const LAST_VISIT: &str = "last_visit";

/// Campaign source captured from a landing URL.
pub const TRAFFIC_SOURCE: &str = "traffic_source";

/// Campaign medium captured with [`TRAFFIC_SOURCE`].
pub const UTM_MEDIUM: &str = "utm_medium";

/// Campaign name captured with [`TRAFFIC_SOURCE`].
pub const UTM_CAMPAIGN: &str = "utm_campaign";
