//! Error types for the tally core.
//!
//! Only configuration mistakes are returned to callers. Storage trouble is
//! recovered inside the assigner and event log, and sink failures are
//! reported through [`crate::emitter::DispatchReport`] instead.

use tally_store::StoreError;

/// Errors returned by core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The experiment configuration cannot produce an assignment.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The local store failed during an explicit read or maintenance call.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidConfiguration`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
