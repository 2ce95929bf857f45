//! Configuration for the in-memory log and the dispatcher.
//!
//! As in `taskcore`, every value is a validated newtype, so an out-of-range
//! setting fails when it is constructed or deserialized.

use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskcore::TaskRules;

/// Number of commands that may queue for one task before senders wait.
///
/// Validated to be between 1 and 65 536.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 65_536),
    default = 64,
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
pub struct MailboxCapacity(usize);

/// Number of appended events a slow subscriber may fall behind by before it
/// starts missing events.
///
/// Validated to be between 1 and 65 536.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 65_536),
    default = 1024,
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
pub struct FeedCapacity(usize);

/// How long a task worker waits for its next command before it stops, in
/// milliseconds.
///
/// Validated to be between 10ms and one hour. A stopped worker is started
/// again, from the log, by the next command for its task.
#[nutype(
    validate(greater_or_equal = 10, less_or_equal = 3_600_000),
    default = 30_000,
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
pub struct IdleTimeoutMs(u64);

impl IdleTimeoutMs {
    /// Convert to Duration for use with tokio::time::timeout.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.into())
    }
}

/// Settings for [`TaskDispatcher`](crate::TaskDispatcher).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Queue length per task identity.
    #[serde(default)]
    pub mailbox_capacity: MailboxCapacity,
    /// Idle time after which a task worker is released.
    #[serde(default)]
    pub idle_timeout: IdleTimeoutMs,
    /// Validation rules handed to every task aggregate.
    #[serde(default)]
    pub rules: TaskRules,
}

impl DispatcherConfig {
    /// Replaces the mailbox capacity.
    #[must_use]
    pub fn with_mailbox_capacity(mut self, mailbox_capacity: MailboxCapacity) -> Self {
        self.mailbox_capacity = mailbox_capacity;
        self
    }

    /// Replaces the idle timeout.
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: IdleTimeoutMs) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Replaces the task rules.
    #[must_use]
    pub fn with_rules(mut self, rules: TaskRules) -> Self {
        self.rules = rules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskcore::MinDescriptionLength;

    #[test]
    fn defaults() {
        let config = DispatcherConfig::default();

        assert_eq!(config.mailbox_capacity.into_inner(), 64);
        assert_eq!(config.idle_timeout.as_duration(), Duration::from_secs(30));
        assert_eq!(config.rules, TaskRules::default());
        assert_eq!(FeedCapacity::default().into_inner(), 1024);
    }

    #[test]
    fn zero_capacity_is_invalid() {
        assert!(MailboxCapacity::try_new(0).is_err());
        assert!(FeedCapacity::try_new(0).is_err());
        assert!(MailboxCapacity::try_new(65_537).is_err());
        assert!(IdleTimeoutMs::try_new(9).is_err());
    }

    #[test]
    fn deserializes_partial_config() {
        let config: DispatcherConfig = serde_json::from_str(
            r#"{ "mailbox_capacity": 8, "rules": { "min_description_length": 5 } }"#,
        )
        .unwrap();

        assert_eq!(config.mailbox_capacity.into_inner(), 8);
        assert_eq!(config.idle_timeout, IdleTimeoutMs::default());
        assert_eq!(
            config.rules,
            TaskRules::with_min_description_length(MinDescriptionLength::try_new(5).unwrap())
        );
    }
}
