//! Impression and click tracking with variant data attached.
//!
//! The [`Tracker`] ties an assigner to an emitter: it resolves the
//! visitor's [`Segment`] and emits the well-known events with the
//! segment's id and variants in the payload, so every conversion can be
//! attributed to the variants that were shown.
//!
//! Dimensions set on the tracker (visitor type, traffic source) are added
//! to every page view and impression, like site-wide analytics parameters.

use serde_json::{Value, json};
use tally_store::KeyValueStore;
use tally_types::{EventKind, Payload, Segment};

use crate::assigner::BucketAssigner;
use crate::emitter::{DispatchReport, Emitter};

/// Emits segment-aware events.
#[derive(Debug)]
pub struct Tracker<A, E> {
    assigner: BucketAssigner<A>,
    emitter: Emitter<E>,
    dimensions: Payload,
}

impl<A: KeyValueStore, E: KeyValueStore> Tracker<A, E> {
    /// Combine an assigner and an emitter.
    pub const fn new(assigner: BucketAssigner<A>, emitter: Emitter<E>) -> Self {
        Self {
            assigner,
            emitter,
            dimensions: Payload::new(),
        }
    }

    /// Set the dimensions added to page views and impressions.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Payload) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Replace the dimensions added to page views and impressions.
    pub fn set_dimensions(&mut self, dimensions: Payload) {
        self.dimensions = dimensions;
    }

    /// The current dimensions.
    pub const fn dimensions(&self) -> &Payload {
        &self.dimensions
    }

    /// The assigner.
    pub const fn assigner(&self) -> &BucketAssigner<A> {
        &self.assigner
    }

    /// The emitter.
    pub const fn emitter(&self) -> &Emitter<E> {
        &self.emitter
    }

    /// Mutable access to the emitter for emitting arbitrary events.
    pub const fn emitter_mut(&mut self) -> &mut Emitter<E> {
        &mut self.emitter
    }

    /// Resolve the segment and emit `variant_impression` for `page`.
    pub fn impression(&mut self, page: &str) -> (Segment, DispatchReport) {
        let segment = self.assigner.segment();
        let mut payload = self.dimensions.clone();
        payload.extend(segment_payload(&segment));
        payload.insert(String::from("page"), json!(page));
        let report = self
            .emitter
            .emit(EventKind::VariantImpression.as_str(), payload);
        (segment, report)
    }

    /// Emit `affiliate_click` for `product` with the visitor's variants.
    pub fn affiliate_click(&mut self, product: &str, url: &str) -> DispatchReport {
        let segment = self.assigner.segment();
        let mut payload = segment_payload(&segment);
        payload.insert(String::from("product"), json!(product));
        payload.insert(String::from("url"), json!(url));
        self.emitter
            .emit(EventKind::AffiliateClick.as_str(), payload)
    }

    /// Emit `page_view` for `page`, merged with caller-supplied fields.
    ///
    /// Caller fields win over the dimensions and defaults on key collision.
    pub fn page_view(&mut self, page: &str, extra: Payload) -> DispatchReport {
        let mut payload = self.dimensions.clone();
        payload.insert(String::from("page_path"), json!(page));
        payload.extend(extra);
        self.emitter.emit(EventKind::PageView.as_str(), payload)
    }

    /// Emit `social_click` for a social platform link.
    pub fn social_click(&mut self, platform: &str, action: &str) -> DispatchReport {
        let mut payload = Payload::new();
        payload.insert(String::from("event_category"), json!("Social"));
        payload.insert(String::from("event_label"), json!(platform));
        payload.insert(String::from("value"), json!(1));
        payload.insert(String::from("action"), json!(action));
        self.emitter.emit(EventKind::SocialClick.as_str(), payload)
    }
}

/// `{userId, variants}` as event parameters.
pub fn segment_payload(segment: &Segment) -> Payload {
    let mut payload = Payload::new();
    payload.insert(
        String::from("userId"),
        Value::String(segment.user_id.as_str().to_owned()),
    );
    payload.insert(String::from("variants"), segment.variants.to_json());
    payload
}
