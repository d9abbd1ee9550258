//! The experiment catalog.
//!
//! Maps each experiment name to its ordered list of variant labels. The
//! catalog is validated once at construction and never changes afterwards,
//! so assignment over a catalog cannot fail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Validated mapping from experiment name to a non-empty variant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct ExperimentCatalog {
    experiments: BTreeMap<String, Vec<String>>,
}

impl ExperimentCatalog {
    /// Build a catalog, rejecting empty names and empty variant lists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfiguration`] naming the first
    /// offending experiment.
    pub fn new(experiments: BTreeMap<String, Vec<String>>) -> Result<Self, CoreError> {
        for (name, variants) in &experiments {
            if name.is_empty() {
                return Err(CoreError::invalid("experiment name must not be empty"));
            }
            if variants.is_empty() {
                return Err(CoreError::invalid(format!(
                    "experiment {name:?} has no variants"
                )));
            }
        }
        Ok(Self { experiments })
    }

    /// A catalog with no experiments.
    pub const fn empty() -> Self {
        Self {
            experiments: BTreeMap::new(),
        }
    }

    /// The storefront experiments: CTA button color, countdown visibility,
    /// and urgency badge text.
    pub fn conversion_defaults() -> Self {
        let experiments = [
            ("button-color", &["#00ff88", "#ff4500", "#1e90ff"][..]),
            ("countdown", &["visible", "hidden"][..]),
            (
                "urgency-text",
                &[
                    "Limited Time Offer",
                    "Almost Sold Out",
                    "Deal Ends Soon",
                    "X Left at This Price",
                ][..],
            ),
        ]
        .into_iter()
        .map(|(name, variants)| {
            (
                name.to_owned(),
                variants.iter().map(|v| (*v).to_owned()).collect(),
            )
        })
        .collect();
        Self { experiments }
    }

    /// Return a copy with one more experiment added (or replaced).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfiguration`] if `variants` is empty
    /// or `name` is empty.
    pub fn with_experiment(
        mut self,
        name: impl Into<String>,
        variants: Vec<String>,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::invalid("experiment name must not be empty"));
        }
        if variants.is_empty() {
            return Err(CoreError::invalid(format!(
                "experiment {name:?} has no variants"
            )));
        }
        self.experiments.insert(name, variants);
        Ok(self)
    }

    /// Variants for `experiment`, if it exists.
    pub fn get(&self, experiment: &str) -> Option<&[String]> {
        self.experiments.get(experiment).map(Vec::as_slice)
    }

    /// Iterate over `(experiment, variants)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.experiments
            .iter()
            .map(|(name, variants)| (name.as_str(), variants.as_slice()))
    }

    /// Number of experiments.
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Whether the catalog has no experiments.
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for ExperimentCatalog {
    type Error = CoreError;

    fn try_from(experiments: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        Self::new(experiments)
    }
}

impl From<ExperimentCatalog> for BTreeMap<String, Vec<String>> {
    fn from(catalog: ExperimentCatalog) -> Self {
        catalog.experiments
    }
}
