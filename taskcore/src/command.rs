//! Intent messages accepted by the aggregates.
//!
//! Commands are closed enums, one per aggregate, so every handler is reached
//! through a single exhaustive `match`.

use crate::types::{LabelId, Priority, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// Behaviour shared by every command enum.
pub trait AggregateCommand: Send + 'static {
    /// The task this command targets. Dispatchers partition on it.
    fn task_id(&self) -> &TaskId;

    /// Name of the command, for logs and rejections.
    fn name(&self) -> &'static str;
}

/// Commands handled by the task aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskCommand {
    /// Create a finalized task with a description.
    CreateBasicTask {
        /// Identity chosen by the issuer.
        task_id: TaskId,
        /// Initial description.
        description: String,
    },
    /// Create a draft, optionally with a description.
    CreateDraft {
        /// Identity chosen by the issuer.
        task_id: TaskId,
        /// Initial description, if any.
        description: Option<String>,
    },
    /// Finalize a draft.
    FinalizeDraft {
        /// Target task.
        task_id: TaskId,
    },
    /// Replace the description.
    UpdateTaskDescription {
        /// Target task.
        task_id: TaskId,
        /// The description the issuer believes is current.
        previous: String,
        /// The description to set.
        new: String,
    },
    /// Replace or clear the due date.
    UpdateTaskDueDate {
        /// Target task.
        task_id: TaskId,
        /// The due date the issuer believes is current.
        previous: Option<Timestamp>,
        /// The due date to set.
        new: Option<Timestamp>,
    },
    /// Replace the priority.
    UpdateTaskPriority {
        /// Target task.
        task_id: TaskId,
        /// The priority the issuer believes is current.
        previous: Priority,
        /// The priority to set.
        new: Priority,
    },
    /// Reopen a completed task.
    ReopenTask {
        /// Target task.
        task_id: TaskId,
    },
    /// Delete a task.
    DeleteTask {
        /// Target task.
        task_id: TaskId,
    },
    /// Complete a task.
    CompleteTask {
        /// Target task.
        task_id: TaskId,
    },
    /// Restore a deleted task along with its label relationships.
    RestoreDeletedTask {
        /// Target task.
        task_id: TaskId,
    },
}

impl AggregateCommand for TaskCommand {
    fn task_id(&self) -> &TaskId {
        match self {
            Self::CreateBasicTask { task_id, .. }
            | Self::CreateDraft { task_id, .. }
            | Self::FinalizeDraft { task_id }
            | Self::UpdateTaskDescription { task_id, .. }
            | Self::UpdateTaskDueDate { task_id, .. }
            | Self::UpdateTaskPriority { task_id, .. }
            | Self::ReopenTask { task_id }
            | Self::DeleteTask { task_id }
            | Self::CompleteTask { task_id }
            | Self::RestoreDeletedTask { task_id } => task_id,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::CreateBasicTask { .. } => "CreateBasicTask",
            Self::CreateDraft { .. } => "CreateDraft",
            Self::FinalizeDraft { .. } => "FinalizeDraft",
            Self::UpdateTaskDescription { .. } => "UpdateTaskDescription",
            Self::UpdateTaskDueDate { .. } => "UpdateTaskDueDate",
            Self::UpdateTaskPriority { .. } => "UpdateTaskPriority",
            Self::ReopenTask { .. } => "ReopenTask",
            Self::DeleteTask { .. } => "DeleteTask",
            Self::CompleteTask { .. } => "CompleteTask",
            Self::RestoreDeletedTask { .. } => "RestoreDeletedTask",
        }
    }
}

/// Commands handled by the label assignment aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LabelCommand {
    /// Assign a label to a task.
    AssignLabelToTask {
        /// Target task.
        task_id: TaskId,
        /// Label to assign.
        label_id: LabelId,
    },
    /// Remove an assigned label from a task.
    RemoveLabelFromTask {
        /// Target task.
        task_id: TaskId,
        /// Label to remove.
        label_id: LabelId,
    },
}

impl AggregateCommand for LabelCommand {
    fn task_id(&self) -> &TaskId {
        match self {
            Self::AssignLabelToTask { task_id, .. } | Self::RemoveLabelFromTask { task_id, .. } => {
                task_id
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::AssignLabelToTask { .. } => "AssignLabelToTask",
            Self::RemoveLabelFromTask { .. } => "RemoveLabelFromTask",
        }
    }
}

/// Any command accepted by the core, as routed by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// A command for the task aggregate.
    Task(TaskCommand),
    /// A command for the label assignment aggregate.
    Label(LabelCommand),
}

impl AggregateCommand for Command {
    fn task_id(&self) -> &TaskId {
        match self {
            Self::Task(command) => command.task_id(),
            Self::Label(command) => command.task_id(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Task(command) => command.name(),
            Self::Label(command) => command.name(),
        }
    }
}

impl From<TaskCommand> for Command {
    fn from(command: TaskCommand) -> Self {
        Self::Task(command)
    }
}

impl From<LabelCommand> for Command {
    fn from(command: LabelCommand) -> Self {
        Self::Label(command)
    }
}
