//! Anonymous identity and deterministic variant assignment.
//!
//! Assignment is a pure function of `(anonymous id, experiment name,
//! variant list)`: the id and experiment name are concatenated, hashed, and
//! reduced modulo the number of variants. Nothing is stored per experiment,
//! so any number of experiments costs one stored id.

use tally_store::{KeyValueStore, keys};
use tally_types::{AnonymousId, Segment, VariantAssignment};
use tracing::{debug, warn};

use crate::catalog::ExperimentCatalog;
use crate::error::CoreError;
use crate::hash::hash_to_index;

/// Pick the variant for one experiment.
///
/// # Errors
///
/// Returns [`CoreError::InvalidConfiguration`] if `variants` is empty. No
/// assignment is made in that case.
pub fn assign_variant<'a>(
    id: &AnonymousId,
    experiment: &str,
    variants: &'a [String],
) -> Result<&'a str, CoreError> {
    if variants.is_empty() {
        return Err(CoreError::invalid(format!(
            "experiment {experiment:?} has no variants"
        )));
    }
    let key = format!("{id}{experiment}");
    let index = hash_to_index(&key, variants.len())?;
    variants
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| CoreError::invalid(format!("bucket {index} out of range for {experiment:?}")))
}

/// Assign a variant for every experiment in `catalog`.
///
/// Experiments are independent; the result does not depend on iteration
/// order.
pub fn assign_all(id: &AnonymousId, catalog: &ExperimentCatalog) -> VariantAssignment {
    catalog
        .iter()
        .filter_map(|(experiment, variants)| {
            // The catalog guarantees non-empty lists, so this never skips.
            assign_variant(id, experiment, variants)
                .ok()
                .map(|variant| (experiment.to_owned(), variant.to_owned()))
        })
        .collect()
}

/// Resolves the visitor's anonymous id and their variants.
#[derive(Debug)]
pub struct BucketAssigner<S> {
    store: S,
    catalog: ExperimentCatalog,
}

impl<S: KeyValueStore> BucketAssigner<S> {
    /// Create an assigner over `store` for the experiments in `catalog`.
    pub const fn new(store: S, catalog: ExperimentCatalog) -> Self {
        Self { store, catalog }
    }

    /// The experiments this assigner covers.
    pub const fn catalog(&self) -> &ExperimentCatalog {
        &self.catalog
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Return the persisted anonymous id, minting and persisting one if
    /// none exists.
    ///
    /// An existing id is returned without writing to the store. If the
    /// store cannot be read or written, a fresh id is returned for this
    /// call only and the failure is logged; the caller never sees an error.
    pub fn get_or_create_anonymous_id(&self) -> AnonymousId {
        match self.store.get(keys::ANONYMOUS_ID) {
            Ok(Some(raw)) => {
                if let Some(id) = AnonymousId::parse(&raw) {
                    return id;
                }
            }
            Ok(None) => {}
            Err(e) => {
                let id = AnonymousId::generate();
                warn!(error = %e, "Store unreadable, using ephemeral anonymous id");
                return id;
            }
        }

        let id = AnonymousId::generate();
        match self.store.set(keys::ANONYMOUS_ID, id.as_str()) {
            Ok(()) => debug!(anonymous_id = %id, "Minted anonymous id"),
            Err(e) => warn!(error = %e, "Failed to persist anonymous id, using it for this call only"),
        }
        id
    }

    /// Variant for one experiment of this assigner's catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfiguration`] if `experiment` is not in
    /// the catalog.
    pub fn variant_for(&self, id: &AnonymousId, experiment: &str) -> Result<String, CoreError> {
        let variants = self
            .catalog
            .get(experiment)
            .ok_or_else(|| CoreError::invalid(format!("unknown experiment {experiment:?}")))?;
        assign_variant(id, experiment, variants).map(str::to_owned)
    }

    /// The visitor's id together with every assigned variant.
    pub fn segment(&self) -> Segment {
        let user_id = self.get_or_create_anonymous_id();
        let variants = assign_all(&user_id, &self.catalog);
        Segment { user_id, variants }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tally_store::MemoryStore;

    use super::*;

    fn id(raw: &str) -> AnonymousId {
        AnonymousId::parse(raw).unwrap()
    }

    fn three() -> Vec<String> {
        vec![String::from("a"), String::from("b"), String::from("c")]
    }

    #[test]
    fn assignment_is_deterministic() {
        let variants = three();
        let visitor = id("k3j2h1g0f9e8d");
        let first = assign_variant(&visitor, "hero", &variants).unwrap();
        for _ in 0..1000 {
            assert_eq!(assign_variant(&visitor, "hero", &variants).unwrap(), first);
        }
    }

    #[test]
    fn empty_variants_is_invalid_configuration() {
        let result = assign_variant(&id("abc123"), "hero", &[]);
        assert!(matches!(result, Err(CoreError::InvalidConfiguration { .. })));
    }

    #[test]
    fn single_variant_always_wins() {
        let only = vec![String::from("control")];
        for i in 0..50 {
            let visitor = id(&format!("user-{i}"));
            assert_eq!(assign_variant(&visitor, "hero", &only).unwrap(), "control");
        }
    }

    #[test]
    fn fixture_assignments_for_default_catalog() {
        let catalog = ExperimentCatalog::conversion_defaults();
        let assignment = assign_all(&id("abc123"), &catalog);
        assert_eq!(assignment.get("button-color"), Some("#1e90ff"));
        assert_eq!(assignment.get("countdown"), Some("hidden"));
        assert_eq!(assignment.get("urgency-text"), Some("X Left at This Price"));
    }

    #[test]
    fn assign_all_covers_every_experiment() {
        let catalog = ExperimentCatalog::conversion_defaults();
        let assignment = assign_all(&AnonymousId::generate(), &catalog);
        assert_eq!(assignment.len(), catalog.len());
        for (experiment, variant) in assignment.iter() {
            assert!(catalog.get(experiment).unwrap().iter().any(|v| v == variant));
        }
    }

    #[test]
    fn assign_all_matches_individual_assignment() {
        let catalog = ExperimentCatalog::conversion_defaults();
        let visitor = id("zz9plural");
        let all = assign_all(&visitor, &catalog);
        for (experiment, variants) in catalog.iter() {
            let single = assign_variant(&visitor, experiment, variants).unwrap();
            assert_eq!(all.get(experiment), Some(single));
        }
    }

    #[test]
    fn creates_and_persists_id() {
        let store = MemoryStore::new();
        let assigner = BucketAssigner::new(&store, ExperimentCatalog::empty());
        let minted = assigner.get_or_create_anonymous_id();
        assert_eq!(
            store.get(keys::ANONYMOUS_ID).unwrap().as_deref(),
            Some(minted.as_str())
        );
        assert_eq!(assigner.get_or_create_anonymous_id(), minted);
    }

    #[test]
    fn empty_stored_id_is_replaced() {
        let store = MemoryStore::new();
        store.set(keys::ANONYMOUS_ID, "").unwrap();
        let assigner = BucketAssigner::new(&store, ExperimentCatalog::empty());
        let minted = assigner.get_or_create_anonymous_id();
        assert!(!minted.as_str().is_empty());
        assert_eq!(
            store.get(keys::ANONYMOUS_ID).unwrap().as_deref(),
            Some(minted.as_str())
        );
    }

    #[test]
    fn variant_for_unknown_experiment_is_invalid() {
        let assigner = BucketAssigner::new(MemoryStore::new(), ExperimentCatalog::empty());
        assert!(assigner.variant_for(&id("abc123"), "missing").is_err());
    }

    #[test]
    fn segment_uses_persisted_id() {
        let store = MemoryStore::new();
        store.set(keys::ANONYMOUS_ID, "abc123").unwrap();
        let assigner = BucketAssigner::new(&store, ExperimentCatalog::conversion_defaults());
        let segment = assigner.segment();
        assert_eq!(segment.user_id.as_str(), "abc123");
        assert_eq!(segment.variants.get("countdown"), Some("hidden"));
    }
}
