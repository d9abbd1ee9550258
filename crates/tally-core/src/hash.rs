//! String hashing for bucket assignment.
//!
//! The hash must agree bit-for-bit with the browser scripts, which compute
//! it over UTF-16 code units with 32-bit signed wrap-around:
//!
//! ```text
//! hash = 0
//! for each UTF-16 code unit c:
//!     hash = hash * 31 + c      (wrapping i32)
//! index = |hash| mod n
//! ```
//!
//! Nothing here depends on the platform hasher or on randomness.

use crate::error::CoreError;

/// Polynomial hash of `key` over its UTF-16 code units.
pub fn hash_code(key: &str) -> i32 {
    key.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

/// Reduce the hash of `key` to a bucket in `0..modulus`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidConfiguration`] if `modulus` is zero.
pub fn hash_to_index(key: &str, modulus: usize) -> Result<usize, CoreError> {
    let magnitude = u64::from(hash_code(key).unsigned_abs());
    let modulus = u64::try_from(modulus).unwrap_or(u64::MAX);
    let index = magnitude
        .checked_rem(modulus)
        .ok_or_else(|| CoreError::invalid("bucket count must be greater than zero"))?;
    usize::try_from(index).map_err(|e| CoreError::invalid(format!("bucket index overflow: {e}")))
}
