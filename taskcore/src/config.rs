//! Validation rules that vary per deployment.
//!
//! Values use `nutype` validation so an invalid configuration cannot be
//! constructed, and deserialize from any serde format.

use crate::errors::Refusal;
use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Minimum number of characters in a task description.
///
/// Validated to be between 1 and 1024.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 1024),
    default = 3,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Default,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct MinDescriptionLength(usize);

/// Rules applied by the task handlers before any state is consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRules {
    /// Shortest description accepted on creation and update.
    #[serde(default)]
    pub min_description_length: MinDescriptionLength,
}

impl TaskRules {
    /// Rules with a custom minimum description length.
    pub const fn with_min_description_length(min_description_length: MinDescriptionLength) -> Self {
        Self {
            min_description_length,
        }
    }

    /// Checks a proposed description, counting characters rather than bytes.
    pub fn check_description(&self, description: &str) -> Result<(), Refusal> {
        let minimum: usize = self.min_description_length.into();
        let length = description.chars().count();
        if length < minimum {
            return Err(Refusal::InappropriateDescription { length, minimum });
        }
        Ok(())
    }
}
