//! Field-level optimistic concurrency.
//!
//! Update commands carry the issuer's belief about a field's previous value.
//! When that belief disagrees with the aggregate, the command is refused with
//! a [`ValueMismatch`] holding all three values so the issuer can decide
//! whether to retry with corrected data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Disagreement between a command's claimed previous value and the actual one.
///
/// Produced by [`check`], carried by rejections, never stored in state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMismatch<V> {
    /// The previous value the command claimed.
    pub expected: V,
    /// The value the aggregate actually holds.
    pub actual: V,
    /// The value the command tried to set.
    pub proposed_new: V,
}

impl<V: fmt::Debug> fmt::Display for ValueMismatch<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {:?} but found {:?} (proposed {:?})",
            self.expected, self.actual, self.proposed_new
        )
    }
}

/// Compares the claimed previous value against the actual value.
///
/// Equality is `PartialEq` of the field type: exact content for strings,
/// exact instant for timestamps, variant equality for priorities.
pub fn check<V>(expected: &V, actual: &V, proposed: &V) -> Result<(), ValueMismatch<V>>
where
    V: PartialEq + Clone,
{
    if expected == actual {
        return Ok(());
    }

    Err(ValueMismatch {
        expected: expected.clone(),
        actual: actual.clone(),
        proposed_new: proposed.clone(),
    })
}
