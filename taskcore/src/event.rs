//! Fact messages emitted by the aggregates.
//!
//! Events are named in past tense and carry everything their applier needs.
//! The task history and the label history are separate streams that share the
//! task identity, hence two enums.

use crate::errors::ReplayError;
use crate::types::{LabelId, Priority, TaskId, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Behaviour shared by every event enum.
pub trait Event: Clone + Send + Sync + 'static {
    /// Every `type` tag this enum serializes with.
    const EVENT_TYPES: &'static [&'static str];

    /// The task this event belongs to.
    fn task_id(&self) -> &TaskId;

    /// The `type` tag of this event.
    fn event_type(&self) -> &'static str;
}

/// Facts recorded in a task's own history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskEvent {
    /// A basic task was created; it starts out finalized.
    TaskCreated {
        /// The new task.
        task_id: TaskId,
        /// Initial description.
        description: String,
        /// When the creating command was issued.
        created_at: Timestamp,
    },
    /// A draft was created.
    TaskDraftCreated {
        /// The new task.
        task_id: TaskId,
        /// Initial description, empty when none was given.
        description: String,
        /// When the creating command was issued.
        created_at: Timestamp,
    },
    /// A draft was finalized.
    TaskDraftFinalized {
        /// The finalized task.
        task_id: TaskId,
    },
    /// The description changed.
    TaskDescriptionUpdated {
        /// The updated task.
        task_id: TaskId,
        /// Description before the change.
        previous: String,
        /// Description after the change.
        new: String,
    },
    /// The due date changed.
    TaskDueDateUpdated {
        /// The updated task.
        task_id: TaskId,
        /// Due date before the change.
        previous: Option<Timestamp>,
        /// Due date after the change.
        new: Option<Timestamp>,
    },
    /// The priority changed.
    TaskPriorityUpdated {
        /// The updated task.
        task_id: TaskId,
        /// Priority before the change.
        previous: Priority,
        /// Priority after the change.
        new: Priority,
    },
    /// A completed task was reopened.
    TaskReopened {
        /// The reopened task.
        task_id: TaskId,
    },
    /// The task was deleted.
    TaskDeleted {
        /// The deleted task.
        task_id: TaskId,
    },
    /// The task was completed.
    TaskCompleted {
        /// The completed task.
        task_id: TaskId,
    },
    /// A deleted task was restored.
    DeletedTaskRestored {
        /// The restored task.
        task_id: TaskId,
    },
    /// A label relationship was re-asserted by a restore.
    LabelledTaskRestored {
        /// The restored task.
        task_id: TaskId,
        /// A label assigned to the task at restore time.
        label_id: LabelId,
    },
}

impl Event for TaskEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "TaskCreated",
        "TaskDraftCreated",
        "TaskDraftFinalized",
        "TaskDescriptionUpdated",
        "TaskDueDateUpdated",
        "TaskPriorityUpdated",
        "TaskReopened",
        "TaskDeleted",
        "TaskCompleted",
        "DeletedTaskRestored",
        "LabelledTaskRestored",
    ];

    fn task_id(&self) -> &TaskId {
        match self {
            Self::TaskCreated { task_id, .. }
            | Self::TaskDraftCreated { task_id, .. }
            | Self::TaskDraftFinalized { task_id }
            | Self::TaskDescriptionUpdated { task_id, .. }
            | Self::TaskDueDateUpdated { task_id, .. }
            | Self::TaskPriorityUpdated { task_id, .. }
            | Self::TaskReopened { task_id }
            | Self::TaskDeleted { task_id }
            | Self::TaskCompleted { task_id }
            | Self::DeletedTaskRestored { task_id }
            | Self::LabelledTaskRestored { task_id, .. } => task_id,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "TaskCreated",
            Self::TaskDraftCreated { .. } => "TaskDraftCreated",
            Self::TaskDraftFinalized { .. } => "TaskDraftFinalized",
            Self::TaskDescriptionUpdated { .. } => "TaskDescriptionUpdated",
            Self::TaskDueDateUpdated { .. } => "TaskDueDateUpdated",
            Self::TaskPriorityUpdated { .. } => "TaskPriorityUpdated",
            Self::TaskReopened { .. } => "TaskReopened",
            Self::TaskDeleted { .. } => "TaskDeleted",
            Self::TaskCompleted { .. } => "TaskCompleted",
            Self::DeletedTaskRestored { .. } => "DeletedTaskRestored",
            Self::LabelledTaskRestored { .. } => "LabelledTaskRestored",
        }
    }
}

/// Facts recorded in a task's label history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LabelEvent {
    /// A label was assigned. Assigning an assigned label is recorded again.
    LabelAssignedToTask {
        /// The labelled task.
        task_id: TaskId,
        /// The assigned label.
        label_id: LabelId,
    },
    /// A label was removed.
    LabelRemovedFromTask {
        /// The task.
        task_id: TaskId,
        /// The removed label.
        label_id: LabelId,
    },
}

impl Event for LabelEvent {
    const EVENT_TYPES: &'static [&'static str] = &["LabelAssignedToTask", "LabelRemovedFromTask"];

    fn task_id(&self) -> &TaskId {
        match self {
            Self::LabelAssignedToTask { task_id, .. } | Self::LabelRemovedFromTask { task_id, .. } => {
                task_id
            }
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::LabelAssignedToTask { .. } => "LabelAssignedToTask",
            Self::LabelRemovedFromTask { .. } => "LabelRemovedFromTask",
        }
    }
}

/// Any event emitted by the core, as seen by transports and read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainEvent {
    /// An event of the task history.
    Task(TaskEvent),
    /// An event of the label history.
    Label(LabelEvent),
}

impl DomainEvent {
    /// The task this event belongs to.
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Task(event) => event.task_id(),
            Self::Label(event) => event.task_id(),
        }
    }

    /// The `type` tag of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Task(event) => event.event_type(),
            Self::Label(event) => event.event_type(),
        }
    }
}

impl From<TaskEvent> for DomainEvent {
    fn from(event: TaskEvent) -> Self {
        Self::Task(event)
    }
}

impl From<LabelEvent> for DomainEvent {
    fn from(event: LabelEvent) -> Self {
        Self::Label(event)
    }
}

/// Decodes a persisted event record.
///
/// The record must be a JSON object whose `type` field names one of
/// `E::EVENT_TYPES`. An unregistered tag is a replay fault, not something to
/// skip: it means the history was written by appliers this build lacks.
pub fn decode_event<E>(record: serde_json::Value) -> Result<E, ReplayError>
where
    E: Event + DeserializeOwned,
{
    let event_type = record
        .get("type")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ReplayError::MalformedEvent {
            event_type: String::new(),
            detail: "record has no string 'type' field".to_string(),
        })?;

    if !E::EVENT_TYPES.contains(&event_type.as_str()) {
        return Err(ReplayError::UnknownEventType { event_type });
    }

    serde_json::from_value(record).map_err(|error| ReplayError::MalformedEvent {
        event_type,
        detail: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_id() -> TaskId {
        TaskId::try_new("task-7").unwrap()
    }

    #[test]
    fn event_type_matches_serialized_tag() {
        let event = TaskEvent::TaskDeleted { task_id: task_id() };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], event.event_type());
        assert!(TaskEvent::EVENT_TYPES.contains(&event.event_type()));
    }

    #[test]
    fn decodes_registered_event() {
        let record = json!({
            "type": "LabelAssignedToTask",
            "task_id": "task-7",
            "label_id": "urgent",
        });

        let event: LabelEvent = decode_event(record).unwrap();
        assert_eq!(
            event,
            LabelEvent::LabelAssignedToTask {
                task_id: task_id(),
                label_id: LabelId::try_new("urgent").unwrap(),
            }
        );
    }

    #[test]
    fn unknown_type_is_a_replay_fault() {
        let record = json!({ "type": "TaskArchived", "task_id": "task-7" });

        let error = decode_event::<TaskEvent>(record).unwrap_err();
        assert_eq!(
            error,
            ReplayError::UnknownEventType {
                event_type: "TaskArchived".to_string()
            }
        );
    }

    #[test]
    fn label_event_is_unknown_to_task_history() {
        let record = json!({ "type": "LabelRemovedFromTask", "task_id": "task-7", "label_id": "x" });

        assert!(matches!(
            decode_event::<TaskEvent>(record),
            Err(ReplayError::UnknownEventType { .. })
        ));
    }

    #[test]
    fn invalid_payload_is_malformed() {
        let record = json!({ "type": "TaskDeleted", "task_id": "   " });

        assert!(matches!(
            decode_event::<TaskEvent>(record),
            Err(ReplayError::MalformedEvent { event_type, .. }) if event_type == "TaskDeleted"
        ));
    }

    #[test]
    fn missing_tag_is_malformed() {
        assert!(matches!(
            decode_event::<TaskEvent>(json!({ "task_id": "task-7" })),
            Err(ReplayError::MalformedEvent { .. })
        ));
    }
}
