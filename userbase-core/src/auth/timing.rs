//! Constant-time comparisons
//!
//! Running time depends only on the input lengths, never on where the first
//! differing byte sits.

use crate::PasswordDigest;
use subtle::ConstantTimeEq;

/// Constant-time byte comparison.
///
/// A length mismatch does not return early: `a` is still compared against a
/// buffer of its own length and the result is masked with the length check.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    let lengths_match = (a.len() as u64).ct_eq(&(b.len() as u64));
    let other = if a.len() == b.len() { b } else { a };

    (a.ct_eq(other) & lengths_match).into()
}

/// Constant-time string comparison
pub fn constant_time_str_compare(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}

/// Compare a freshly computed digest with a stored one
pub fn constant_time_digest_compare(candidate: &PasswordDigest, stored: &PasswordDigest) -> bool {
    constant_time_compare(candidate.as_bytes(), stored.as_bytes())
}
