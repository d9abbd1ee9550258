//! Well-known event names.
//!
//! Callers may emit events under any name; these are the ones the tracker
//! itself produces and the browser glue listens for.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// An event name with a fixed meaning across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// The visitor was shown their assigned variants.
    VariantImpression,
    /// The visitor followed an affiliate product link.
    AffiliateClick,
    /// A page was viewed.
    PageView,
    /// The visitor clicked a social media link.
    SocialClick,
}

impl EventKind {
    /// The wire name stored in the event log and sent to sinks.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VariantImpression => "variant_impression",
            Self::AffiliateClick => "affiliate_click",
            Self::PageView => "page_view",
            Self::SocialClick => "social_click",
        }
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
