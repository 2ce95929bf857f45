//! Explicit collaborators handed to command handlers.
//!
//! The task and label aggregates share an identity but never hold references
//! to each other. When a handler needs the sibling's state it reads it through
//! one of the reader traits carried by [`CommandContext`].

use crate::config::TaskRules;
use crate::types::{LabelId, TaskId, TaskStatus, Timestamp};
use std::collections::BTreeSet;
use std::fmt;

/// Read access to the labels currently assigned to a task.
///
/// Implementations return the latest durably applied state; commands still in
/// flight against the label aggregate need not be visible.
pub trait LabelSetReader {
    /// Labels assigned to `task_id`, in ascending order.
    fn labels_of(&self, task_id: &TaskId) -> BTreeSet<LabelId>;
}

/// Read access to the status of a task.
pub trait TaskStatusReader {
    /// Current status of `task_id`, or `None` if it has no history.
    fn status_of(&self, task_id: &TaskId) -> Option<TaskStatus>;
}

/// A reader that knows no tasks and no labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoHistory;

impl LabelSetReader for NoHistory {
    fn labels_of(&self, _task_id: &TaskId) -> BTreeSet<LabelId> {
        BTreeSet::new()
    }
}

impl TaskStatusReader for NoHistory {
    fn status_of(&self, _task_id: &TaskId) -> Option<TaskStatus> {
        None
    }
}

/// Everything a handler may consult besides its own state and the command.
///
/// # Example
///
/// ```rust,ignore
/// let context = CommandContext::new(Timestamp::now())
///     .with_rules(rules)
///     .with_labels(&label_aggregate);
/// let events = task_aggregate.handle(command, &context)?;
/// ```
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    issued_at: Timestamp,
    rules: TaskRules,
    labels: &'a dyn LabelSetReader,
    tasks: &'a dyn TaskStatusReader,
}

impl<'a> CommandContext<'a> {
    /// A context for a command issued at `issued_at`, with default rules and
    /// readers that see no sibling history.
    pub fn new(issued_at: Timestamp) -> Self {
        Self {
            issued_at,
            rules: TaskRules::default(),
            labels: &NoHistory,
            tasks: &NoHistory,
        }
    }

    /// Replaces the validation rules.
    #[must_use]
    pub fn with_rules(mut self, rules: TaskRules) -> Self {
        self.rules = rules;
        self
    }

    /// Replaces the label reader used by the restore cascade.
    #[must_use]
    pub fn with_labels(mut self, labels: &'a dyn LabelSetReader) -> Self {
        self.labels = labels;
        self
    }

    /// Replaces the task status reader used by the label handlers.
    #[must_use]
    pub fn with_tasks(mut self, tasks: &'a dyn TaskStatusReader) -> Self {
        self.tasks = tasks;
        self
    }

    /// When the command was issued.
    pub const fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// Validation rules in force.
    pub const fn rules(&self) -> &TaskRules {
        &self.rules
    }

    /// Reader for the sibling label set.
    pub const fn labels(&self) -> &'a dyn LabelSetReader {
        self.labels
    }

    /// Reader for the sibling task status.
    pub const fn tasks(&self) -> &'a dyn TaskStatusReader {
        self.tasks
    }
}

impl fmt::Debug for CommandContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("issued_at", &self.issued_at)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
