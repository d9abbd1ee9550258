//! The anonymous visitor identifier.
//!
//! An [`AnonymousId`] is minted once per local store and persisted
//! indefinitely. It is opaque: nothing parses it, it is only hashed and
//! compared. Generated ids are 13 characters drawn from `[0-9a-z]`, the
//! same shape the browser scripts produce, so ids written by either side
//! are interchangeable.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Characters used when minting a new identifier.
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of a freshly minted identifier.
pub const GENERATED_LEN: usize = 13;

/// Opaque identifier for an anonymous visitor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AnonymousId(String);

impl AnonymousId {
    /// Mint a new random identifier.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id: String = (0..GENERATED_LEN)
            .filter_map(|_| ALPHABET.choose(&mut rng).map(|&b| char::from(b)))
            .collect();
        Self(id)
    }

    /// Wrap an existing identifier read from storage.
    ///
    /// Returns `None` for an empty string, which is treated the same as a
    /// missing value.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_owned()))
        }
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for AnonymousId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AnonymousId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
