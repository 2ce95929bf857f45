//! Error types for taskcore.
//!
//! Two families live here:
//!
//! - [`Rejection`]: the expected alternate outcome of a command. A handler
//!   returns it instead of events; nothing is applied. Rejections are never
//!   retried automatically since the same command would be refused again.
//! - [`ReplayError`]: the persisted history is inconsistent with the
//!   appliers. This is a fault and must surface to the operator.

use crate::mismatch::ValueMismatch;
use crate::types::{AggregateVersion, LabelId, Priority, TaskId, TaskStatus, Timestamp};
use std::fmt;
use thiserror::Error;

/// Why a command was refused, independent of which command it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    /// The description is shorter than the configured minimum.
    #[error("description has {length} characters, at least {minimum} required")]
    InappropriateDescription {
        /// Length of the proposed description, in characters.
        length: usize,
        /// Configured minimum length.
        minimum: usize,
    },

    /// A creation command targeted a task that already has history.
    #[error("task already exists")]
    AlreadyExists,

    /// The task has no history yet.
    #[error("task does not exist")]
    NotCreated,

    /// The transition table forbids the requested status change.
    #[error("transition from {from} to {to} is not allowed")]
    TransitionNotAllowed {
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The command only applies to tasks in one particular status.
    #[error("task is {actual}, command requires {required}")]
    WrongStatus {
        /// Status the command requires.
        required: TaskStatus,
        /// Current status.
        actual: TaskStatus,
    },

    /// The task is completed or deleted, so its fields are frozen.
    #[error("task in status {status} cannot be edited")]
    NotEditable {
        /// Current status.
        status: TaskStatus,
    },

    /// The label is not currently assigned to the task.
    #[error("label {label_id} is not assigned")]
    LabelNotAssigned {
        /// The label the command tried to remove.
        label_id: LabelId,
    },
}

/// Why a field update was refused: a status refusal or a stale previous value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRefusal<V> {
    /// Refused regardless of the claimed previous value.
    Refused(Refusal),
    /// The claimed previous value disagrees with the actual one.
    Mismatch(ValueMismatch<V>),
}

impl<V: fmt::Debug> fmt::Display for UpdateRefusal<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused(refusal) => refusal.fmt(f),
            Self::Mismatch(mismatch) => write!(f, "value mismatch: {mismatch}"),
        }
    }
}

impl<V> From<Refusal> for UpdateRefusal<V> {
    fn from(refusal: Refusal) -> Self {
        Self::Refused(refusal)
    }
}

impl<V> From<ValueMismatch<V>> for UpdateRefusal<V> {
    fn from(mismatch: ValueMismatch<V>) -> Self {
        Self::Mismatch(mismatch)
    }
}

/// A refused command. One variant per command type.
///
/// # Example
///
/// ```rust,ignore
/// match aggregate.handle(command, &context) {
///     Ok(events) => publish(events),
///     Err(Rejection::CannotUpdateTaskDescription {
///         reason: UpdateRefusal::Mismatch(mismatch),
///         ..
///     }) => ask_user_to_merge(mismatch),
///     Err(rejection) => report(rejection),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// `CreateBasicTask` was refused.
    #[error("cannot create task {task_id}: {reason}")]
    CannotCreateTask {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: Refusal,
    },

    /// `CreateDraft` was refused.
    #[error("cannot create draft {task_id}: {reason}")]
    CannotCreateDraft {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: Refusal,
    },

    /// `FinalizeDraft` was refused.
    #[error("cannot finalize draft {task_id}: {reason}")]
    CannotFinalizeDraft {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: Refusal,
    },

    /// `UpdateTaskDescription` was refused.
    #[error("cannot update description of task {task_id}: {reason}")]
    CannotUpdateTaskDescription {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: UpdateRefusal<String>,
    },

    /// `UpdateTaskDueDate` was refused.
    #[error("cannot update due date of task {task_id}: {reason}")]
    CannotUpdateTaskDueDate {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: UpdateRefusal<Option<Timestamp>>,
    },

    /// `UpdateTaskPriority` was refused.
    #[error("cannot update priority of task {task_id}: {reason}")]
    CannotUpdateTaskPriority {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: UpdateRefusal<Priority>,
    },

    /// `ReopenTask` was refused.
    #[error("cannot reopen task {task_id}: {reason}")]
    CannotReopenTask {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: Refusal,
    },

    /// `DeleteTask` was refused.
    #[error("cannot delete task {task_id}: {reason}")]
    CannotDeleteTask {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: Refusal,
    },

    /// `CompleteTask` was refused.
    #[error("cannot complete task {task_id}: {reason}")]
    CannotCompleteTask {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: Refusal,
    },

    /// `RestoreDeletedTask` was refused.
    #[error("cannot restore task {task_id}: {reason}")]
    CannotRestoreDeletedTask {
        /// Target task.
        task_id: TaskId,
        /// Why.
        reason: Refusal,
    },

    /// `AssignLabelToTask` was refused.
    #[error("cannot assign label {label_id} to task {task_id}: {reason}")]
    CannotAssignLabelToTask {
        /// Target task.
        task_id: TaskId,
        /// Label to assign.
        label_id: LabelId,
        /// Why.
        reason: Refusal,
    },

    /// `RemoveLabelFromTask` was refused.
    #[error("cannot remove label {label_id} from task {task_id}: {reason}")]
    CannotRemoveLabelFromTask {
        /// Target task.
        task_id: TaskId,
        /// Label to remove.
        label_id: LabelId,
        /// Why.
        reason: Refusal,
    },

    /// The command names a different task than the aggregate handling it.
    #[error("{command} for task {task_id} was sent to the aggregate of task {aggregate}")]
    Misrouted {
        /// Name of the command.
        command: &'static str,
        /// Task named by the command.
        task_id: TaskId,
        /// Task of the aggregate that received it.
        aggregate: TaskId,
    },
}

impl Rejection {
    /// The task the refused command targeted.
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::CannotCreateTask { task_id, .. }
            | Self::CannotCreateDraft { task_id, .. }
            | Self::CannotFinalizeDraft { task_id, .. }
            | Self::CannotUpdateTaskDescription { task_id, .. }
            | Self::CannotUpdateTaskDueDate { task_id, .. }
            | Self::CannotUpdateTaskPriority { task_id, .. }
            | Self::CannotReopenTask { task_id, .. }
            | Self::CannotDeleteTask { task_id, .. }
            | Self::CannotCompleteTask { task_id, .. }
            | Self::CannotRestoreDeletedTask { task_id, .. }
            | Self::CannotAssignLabelToTask { task_id, .. }
            | Self::CannotRemoveLabelFromTask { task_id, .. }
            | Self::Misrouted { task_id, .. } => task_id,
        }
    }

    /// Name of the refused command.
    pub const fn command_name(&self) -> &'static str {
        match self {
            Self::CannotCreateTask { .. } => "CreateBasicTask",
            Self::CannotCreateDraft { .. } => "CreateDraft",
            Self::CannotFinalizeDraft { .. } => "FinalizeDraft",
            Self::CannotUpdateTaskDescription { .. } => "UpdateTaskDescription",
            Self::CannotUpdateTaskDueDate { .. } => "UpdateTaskDueDate",
            Self::CannotUpdateTaskPriority { .. } => "UpdateTaskPriority",
            Self::CannotReopenTask { .. } => "ReopenTask",
            Self::CannotDeleteTask { .. } => "DeleteTask",
            Self::CannotCompleteTask { .. } => "CompleteTask",
            Self::CannotRestoreDeletedTask { .. } => "RestoreDeletedTask",
            Self::CannotAssignLabelToTask { .. } => "AssignLabelToTask",
            Self::CannotRemoveLabelFromTask { .. } => "RemoveLabelFromTask",
            Self::Misrouted { command, .. } => *command,
        }
    }

    /// True when the command was refused because of a stale previous value.
    ///
    /// Only these rejections are worth retrying, and only by the caller after
    /// re-reading the current value.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Self::CannotUpdateTaskDescription {
                reason: UpdateRefusal::Mismatch(_),
                ..
            } | Self::CannotUpdateTaskDueDate {
                reason: UpdateRefusal::Mismatch(_),
                ..
            } | Self::CannotUpdateTaskPriority {
                reason: UpdateRefusal::Mismatch(_),
                ..
            }
        )
    }
}

/// Faults detected while folding persisted history.
///
/// A `ReplayError` means the stored events cannot have been produced by the
/// handlers of this crate. It is never a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The record's type tag names no known event.
    #[error("unknown event type '{event_type}'")]
    UnknownEventType {
        /// The unrecognised tag.
        event_type: String,
    },

    /// The record could not be decoded into its event type.
    #[error("malformed '{event_type}' event: {detail}")]
    MalformedEvent {
        /// The record's type tag, if it had one.
        event_type: String,
        /// Decoder message.
        detail: String,
    },

    /// An event in the history belongs to a different task.
    #[error("{event_type} at version {version} belongs to task {found}, not {expected}")]
    ForeignEvent {
        /// Identity being replayed.
        expected: TaskId,
        /// Identity carried by the event.
        found: TaskId,
        /// Offending event type.
        event_type: &'static str,
        /// Position of the event in the history.
        version: AggregateVersion,
    },

    /// A non-creation event appears before the task was created.
    #[error("{event_type} at version {version} precedes creation of task {task_id}")]
    EventBeforeCreation {
        /// Identity being replayed.
        task_id: TaskId,
        /// Offending event type.
        event_type: &'static str,
        /// Position of the event in the history.
        version: AggregateVersion,
    },

    /// A creation event appears for a task that already exists.
    #[error("{event_type} at version {version} recreates existing task {task_id}")]
    DuplicateCreation {
        /// Identity being replayed.
        task_id: TaskId,
        /// Offending event type.
        event_type: &'static str,
        /// Position of the event in the history.
        version: AggregateVersion,
    },

    /// A label removal appears for a label that was not assigned.
    #[error("label {label_id} removed from task {task_id} at version {version} without being assigned")]
    RemovalOfUnassignedLabel {
        /// Identity being replayed.
        task_id: TaskId,
        /// The label that was removed.
        label_id: LabelId,
        /// Position of the event in the history.
        version: AggregateVersion,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_id() -> TaskId {
        TaskId::try_new("task-1").unwrap()
    }

    #[test]
    fn rejection_messages_name_the_task_and_reason() {
        let rejection = Rejection::CannotCompleteTask {
            task_id: task_id(),
            reason: Refusal::TransitionNotAllowed {
                from: TaskStatus::Draft,
                to: TaskStatus::Completed,
            },
        };

        insta::assert_snapshot!(
            rejection.to_string(),
            @"cannot complete task task-1: transition from DRAFT to COMPLETED is not allowed"
        );
    }

    #[test]
    fn mismatch_rejections_are_identified() {
        let mismatch = Rejection::CannotUpdateTaskDescription {
            task_id: task_id(),
            reason: UpdateRefusal::Mismatch(ValueMismatch {
                expected: "A".to_string(),
                actual: "B".to_string(),
                proposed_new: "New".to_string(),
            }),
        };
        let frozen = Rejection::CannotUpdateTaskDescription {
            task_id: task_id(),
            reason: Refusal::NotEditable {
                status: TaskStatus::Completed,
            }
            .into(),
        };

        assert!(mismatch.is_mismatch());
        assert!(!frozen.is_mismatch());
        assert_eq!(mismatch.command_name(), "UpdateTaskDescription");
        insta::assert_snapshot!(
            mismatch.to_string(),
            @r#"cannot update description of task task-1: value mismatch: expected "A" but found "B" (proposed "New")"#
        );
    }

    #[test]
    fn label_rejections_carry_the_label() {
        let label_id = LabelId::try_new("urgent").unwrap();
        let rejection = Rejection::CannotRemoveLabelFromTask {
            task_id: task_id(),
            label_id: label_id.clone(),
            reason: Refusal::LabelNotAssigned { label_id },
        };

        assert_eq!(rejection.task_id(), &task_id());
        insta::assert_snapshot!(
            rejection.to_string(),
            @"cannot remove label urgent from task task-1: label urgent is not assigned"
        );
    }
}
