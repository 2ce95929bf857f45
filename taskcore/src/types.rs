//! Core domain types for the task lifecycle.
//!
//! Identifiers use smart constructors so that a value that exists is always
//! valid. Statuses and priorities are closed enumerations.

use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a task, shared by the task aggregate and its label set.
///
/// `TaskId` values are trimmed, non-empty and at most 255 characters. They are
/// chosen by whoever issues the first command for the task.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct TaskId(String);

impl TaskId {
    /// Mints a fresh identifier backed by a `UUIDv7`.
    pub fn generate() -> Self {
        Self::try_new(format!("task-{}", Uuid::now_v7()))
            .expect("a prefixed UUID is never empty and always shorter than 255 characters")
    }
}

/// Identity of a label that can be assigned to tasks.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct LabelId(String);

impl LabelId {
    /// Mints a fresh identifier backed by a `UUIDv7`.
    pub fn generate() -> Self {
        Self::try_new(format!("label-{}", Uuid::now_v7()))
            .expect("a prefixed UUID is never empty and always shorter than 255 characters")
    }
}

/// Lifecycle status of a task. Exactly one value holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Entry state of tasks created as drafts.
    Draft,
    /// Entry state of basic tasks, and of drafts once finalized.
    Finalized,
    /// Reopened or restored task.
    Open,
    /// Task marked as done.
    Completed,
    /// Task marked as deleted. Deletion is a status, the history is kept.
    Deleted,
}

impl TaskStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Finalized,
        Self::Open,
        Self::Completed,
        Self::Deleted,
    ];

    /// Name of the status as it appears in messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Finalized => "FINALIZED",
            Self::Open => "OPEN",
            Self::Completed => "COMPLETED",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority of a task.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// No priority chosen yet.
    #[default]
    Undefined,
    /// Low priority.
    Low,
    /// Normal priority.
    Normal,
    /// High priority.
    High,
}

impl Priority {
    /// Every priority, in declaration order.
    pub const ALL: [Self; 4] = [Self::Undefined, Self::Low, Self::Normal, Self::High];
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Undefined => "UNDEFINED",
            Self::Low => "LOW",
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
        })
    }
}

/// A point in time, compared as an exact instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Number of events applied to an aggregate.
///
/// A fresh aggregate is at version 0; each applied event moves it forward by
/// one. External stores use it as the expected version of an append.
#[nutype(
    validate(greater_or_equal = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct AggregateVersion(u64);

impl AggregateVersion {
    /// Version of an aggregate with no history.
    pub fn initial() -> Self {
        Self::try_new(0).expect("0 is always a valid version")
    }

    /// Returns the version after one more event.
    #[must_use]
    pub fn next(self) -> Self {
        let current: u64 = self.into();
        Self::try_new(current.saturating_add(1)).expect("next version is always valid")
    }

    /// Returns the version after `count` more events.
    #[must_use]
    pub fn advance(self, count: usize) -> Self {
        let current: u64 = self.into();
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        Self::try_new(current.saturating_add(count)).expect("advanced version is always valid")
    }
}

impl Default for AggregateVersion {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn task_id_accepts_valid_strings(s in "[a-zA-Z0-9_-]{1,255}") {
            let task_id = TaskId::try_new(s.clone()).unwrap();
            prop_assert_eq!(task_id.as_ref(), &s);
        }

        #[test]
        fn task_id_trims_whitespace(s in " {0,10}[a-zA-Z0-9_-]{1,240} {0,10}") {
            let task_id = TaskId::try_new(s.clone()).unwrap();
            prop_assert_eq!(task_id.as_ref(), s.trim());
        }

        #[test]
        fn task_id_rejects_blank_strings(s in " {0,50}") {
            prop_assert!(TaskId::try_new(s).is_err());
        }

        #[test]
        fn label_id_rejects_strings_over_255_chars(s in "[a-zA-Z0-9]{256,500}") {
            prop_assert!(LabelId::try_new(s).is_err());
        }

        #[test]
        fn version_advance_matches_repeated_next(start in 0u64..1_000, steps in 0usize..50) {
            let version = AggregateVersion::try_new(start).unwrap();
            let stepped = (0..steps).fold(version, |v, _| v.next());
            prop_assert_eq!(version.advance(steps), stepped);
        }
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(TaskId::generate(), TaskId::generate());
        assert_ne!(LabelId::generate(), LabelId::generate());
    }

    #[test]
    fn status_serializes_in_screaming_case() {
        let json = serde_json::to_string(&TaskStatus::Finalized).unwrap();
        assert_eq!(json, "\"FINALIZED\"");
        assert_eq!(TaskStatus::Finalized.to_string(), "FINALIZED");
    }

    #[test]
    fn priority_defaults_to_undefined() {
        assert_eq!(Priority::default(), Priority::Undefined);
    }

    #[test]
    fn timestamps_compare_by_exact_instant() {
        let instant = Utc::now();
        let later = instant + chrono::Duration::nanoseconds(1);
        assert_eq!(Timestamp::new(instant), Timestamp::from(instant));
        assert_ne!(Timestamp::new(instant), Timestamp::new(later));
    }
}
