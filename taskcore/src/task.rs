//! The task aggregate: description, priority, due date and lifecycle status
//! of one task identity.

use crate::aggregate::{Aggregate, AggregateLogic};
use crate::command::TaskCommand;
use crate::context::{CommandContext, TaskStatusReader};
use crate::errors::{Refusal, Rejection, ReplayError, UpdateRefusal};
use crate::event::{Event, TaskEvent};
use crate::mismatch;
use crate::restore::RestoreCascadeCoordinator;
use crate::transitions::{is_allowed, is_editable};
use crate::types::{AggregateVersion, Priority, TaskId, TaskStatus, Timestamp};
use serde::{Deserialize, Serialize};

/// The task aggregate for one identity.
pub type TaskAggregate = Aggregate<TaskState>;

/// A created task.
///
/// Fields are only ever changed by the appliers of [`TaskState`]. The
/// description rule is enforced by the handlers, not here, so any historical
/// state coming out of replay is representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    description: String,
    priority: Priority,
    due_date: Option<Timestamp>,
    status: TaskStatus,
    created_at: Timestamp,
}

impl Task {
    fn created(id: TaskId, description: String, created_at: Timestamp, status: TaskStatus) -> Self {
        Self {
            id,
            description,
            priority: Priority::default(),
            due_date: None,
            status,
            created_at,
        }
    }

    /// Identity of the task.
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Current description; empty for a draft created without one.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current priority.
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Current due date.
    pub const fn due_date(&self) -> Option<Timestamp> {
        self.due_date
    }

    /// Current status.
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// When the task was created.
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Reconstructed state of a task: `None` until a creation event is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState(Option<Task>);

impl TaskState {
    /// The task, once created.
    pub const fn task(&self) -> Option<&Task> {
        self.0.as_ref()
    }

    /// Current status, once created.
    pub fn status(&self) -> Option<TaskStatus> {
        self.0.as_ref().map(Task::status)
    }

    fn existing(&self) -> Result<&Task, Refusal> {
        self.0.as_ref().ok_or(Refusal::NotCreated)
    }

    fn ensure_absent(&self) -> Result<(), Refusal> {
        match self.0 {
            Some(_) => Err(Refusal::AlreadyExists),
            None => Ok(()),
        }
    }

    /// The task, if the transition table lets it move to `target`.
    fn transition_to(&self, target: TaskStatus) -> Result<&Task, Refusal> {
        let task = self.existing()?;
        if !is_allowed(task.status, target) {
            return Err(Refusal::TransitionNotAllowed {
                from: task.status,
                to: target,
            });
        }
        Ok(task)
    }

    /// The task, if it is in `required` and may move to `target`.
    fn transition_from(&self, required: TaskStatus, target: TaskStatus) -> Result<&Task, Refusal> {
        let task = self.existing()?;
        if task.status != required {
            return Err(Refusal::WrongStatus {
                required,
                actual: task.status,
            });
        }
        self.transition_to(target)
    }

    fn editable(&self) -> Result<&Task, Refusal> {
        let task = self.existing()?;
        if !is_editable(task.status) {
            return Err(Refusal::NotEditable {
                status: task.status,
            });
        }
        Ok(task)
    }

    fn update(self, change: impl FnOnce(&mut Task)) -> Self {
        Self(self.0.map(|mut task| {
            change(&mut task);
            task
        }))
    }
}

impl TaskStatusReader for TaskState {
    fn status_of(&self, task_id: &TaskId) -> Option<TaskStatus> {
        self.0
            .as_ref()
            .filter(|task| &task.id == task_id)
            .map(Task::status)
    }
}

impl AggregateLogic for TaskState {
    type Command = TaskCommand;
    type Event = TaskEvent;

    const KIND: &'static str = "task";

    fn initial(_task_id: &TaskId) -> Self {
        Self(None)
    }

    fn handle(
        &self,
        command: TaskCommand,
        context: &CommandContext<'_>,
    ) -> Result<Vec<TaskEvent>, Rejection> {
        match command {
            TaskCommand::CreateBasicTask {
                task_id,
                description,
            } => {
                let checked = context
                    .rules()
                    .check_description(&description)
                    .and_then(|()| self.ensure_absent());
                match checked {
                    Ok(()) => Ok(vec![TaskEvent::TaskCreated {
                        task_id,
                        description,
                        created_at: context.issued_at(),
                    }]),
                    Err(reason) => Err(Rejection::CannotCreateTask { task_id, reason }),
                }
            }

            TaskCommand::CreateDraft {
                task_id,
                description,
            } => {
                // No length check: a draft may start with any description.
                match self.ensure_absent() {
                    Ok(()) => Ok(vec![TaskEvent::TaskDraftCreated {
                        task_id,
                        description: description.unwrap_or_default(),
                        created_at: context.issued_at(),
                    }]),
                    Err(reason) => Err(Rejection::CannotCreateDraft { task_id, reason }),
                }
            }

            TaskCommand::FinalizeDraft { task_id } => {
                match self.transition_from(TaskStatus::Draft, TaskStatus::Finalized) {
                    Ok(_) => Ok(vec![TaskEvent::TaskDraftFinalized { task_id }]),
                    Err(reason) => Err(Rejection::CannotFinalizeDraft { task_id, reason }),
                }
            }

            TaskCommand::UpdateTaskDescription {
                task_id,
                previous,
                new,
            } => {
                let checked = context
                    .rules()
                    .check_description(&new)
                    .and_then(|()| self.editable())
                    .map_err(UpdateRefusal::from)
                    .and_then(|task| {
                        mismatch::check(&previous, &task.description, &new)
                            .map_err(UpdateRefusal::from)
                    });
                match checked {
                    Ok(()) => Ok(vec![TaskEvent::TaskDescriptionUpdated {
                        task_id,
                        previous,
                        new,
                    }]),
                    Err(reason) => Err(Rejection::CannotUpdateTaskDescription { task_id, reason }),
                }
            }

            TaskCommand::UpdateTaskDueDate {
                task_id,
                previous,
                new,
            } => {
                let checked = self
                    .editable()
                    .map_err(UpdateRefusal::from)
                    .and_then(|task| {
                        mismatch::check(&previous, &task.due_date, &new).map_err(UpdateRefusal::from)
                    });
                match checked {
                    Ok(()) => Ok(vec![TaskEvent::TaskDueDateUpdated {
                        task_id,
                        previous,
                        new,
                    }]),
                    Err(reason) => Err(Rejection::CannotUpdateTaskDueDate { task_id, reason }),
                }
            }

            TaskCommand::UpdateTaskPriority {
                task_id,
                previous,
                new,
            } => {
                let checked = self
                    .editable()
                    .map_err(UpdateRefusal::from)
                    .and_then(|task| {
                        mismatch::check(&previous, &task.priority, &new).map_err(UpdateRefusal::from)
                    });
                match checked {
                    Ok(()) => Ok(vec![TaskEvent::TaskPriorityUpdated {
                        task_id,
                        previous,
                        new,
                    }]),
                    Err(reason) => Err(Rejection::CannotUpdateTaskPriority { task_id, reason }),
                }
            }

            TaskCommand::ReopenTask { task_id } => {
                match self.transition_from(TaskStatus::Completed, TaskStatus::Open) {
                    Ok(_) => Ok(vec![TaskEvent::TaskReopened { task_id }]),
                    Err(reason) => Err(Rejection::CannotReopenTask { task_id, reason }),
                }
            }

            TaskCommand::DeleteTask { task_id } => match self.transition_to(TaskStatus::Deleted) {
                Ok(_) => Ok(vec![TaskEvent::TaskDeleted { task_id }]),
                Err(reason) => Err(Rejection::CannotDeleteTask { task_id, reason }),
            },

            TaskCommand::CompleteTask { task_id } => {
                match self.transition_to(TaskStatus::Completed) {
                    Ok(_) => Ok(vec![TaskEvent::TaskCompleted { task_id }]),
                    Err(reason) => Err(Rejection::CannotCompleteTask { task_id, reason }),
                }
            }

            TaskCommand::RestoreDeletedTask { task_id } => {
                match self.transition_from(TaskStatus::Deleted, TaskStatus::Open) {
                    Ok(_) => Ok(RestoreCascadeCoordinator::new(context.labels()).restore(&task_id)),
                    Err(reason) => Err(Rejection::CannotRestoreDeletedTask { task_id, reason }),
                }
            }
        }
    }

    fn apply(self, event: &TaskEvent) -> Self {
        match event {
            TaskEvent::TaskCreated {
                task_id,
                description,
                created_at,
            } => Self(Some(Task::created(
                task_id.clone(),
                description.clone(),
                *created_at,
                TaskStatus::Finalized,
            ))),
            TaskEvent::TaskDraftCreated {
                task_id,
                description,
                created_at,
            } => Self(Some(Task::created(
                task_id.clone(),
                description.clone(),
                *created_at,
                TaskStatus::Draft,
            ))),
            TaskEvent::TaskDraftFinalized { .. } => {
                self.update(|task| task.status = TaskStatus::Finalized)
            }
            TaskEvent::TaskDescriptionUpdated { new, .. } => {
                self.update(|task| task.description.clone_from(new))
            }
            TaskEvent::TaskDueDateUpdated { new, .. } => self.update(|task| task.due_date = *new),
            TaskEvent::TaskPriorityUpdated { new, .. } => self.update(|task| task.priority = *new),
            TaskEvent::TaskReopened { .. } | TaskEvent::DeletedTaskRestored { .. } => {
                self.update(|task| task.status = TaskStatus::Open)
            }
            TaskEvent::TaskDeleted { .. } => self.update(|task| task.status = TaskStatus::Deleted),
            TaskEvent::TaskCompleted { .. } => {
                self.update(|task| task.status = TaskStatus::Completed)
            }
            // Re-asserts a relationship owned by the label history.
            TaskEvent::LabelledTaskRestored { .. } => self,
        }
    }

    fn check_history(
        &self,
        task_id: &TaskId,
        event: &TaskEvent,
        version: AggregateVersion,
    ) -> Result<(), ReplayError> {
        let creates = matches!(
            event,
            TaskEvent::TaskCreated { .. } | TaskEvent::TaskDraftCreated { .. }
        );

        match (&self.0, creates) {
            (Some(_), true) => Err(ReplayError::DuplicateCreation {
                task_id: task_id.clone(),
                event_type: event.event_type(),
                version,
            }),
            (None, false) => Err(ReplayError::EventBeforeCreation {
                task_id: task_id.clone(),
                event_type: event.event_type(),
                version,
            }),
            _ => Ok(()),
        }
    }
}

impl TaskStatusReader for TaskAggregate {
    fn status_of(&self, task_id: &TaskId) -> Option<TaskStatus> {
        self.state().status_of(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mismatch::ValueMismatch;
    use chrono::{TimeZone, Utc};

    fn task_id() -> TaskId {
        TaskId::try_new("task-42").unwrap()
    }

    fn at(hour: u32) -> Timestamp {
        Timestamp::new(Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap())
    }

    fn context() -> CommandContext<'static> {
        CommandContext::new(at(8))
    }

    fn basic_task(description: &str) -> TaskAggregate {
        let mut aggregate = TaskAggregate::new(task_id());
        aggregate
            .dispatch(
                TaskCommand::CreateBasicTask {
                    task_id: task_id(),
                    description: description.to_string(),
                },
                &context(),
            )
            .unwrap();
        aggregate
    }

    #[test]
    fn basic_task_starts_finalized_with_defaults() {
        let aggregate = basic_task("Buy milk");
        let task = aggregate.state().task().unwrap();

        assert_eq!(task.id(), &task_id());
        assert_eq!(task.description(), "Buy milk");
        assert_eq!(task.status(), TaskStatus::Finalized);
        assert_eq!(task.priority(), Priority::Undefined);
        assert_eq!(task.due_date(), None);
        assert_eq!(task.created_at(), at(8));
        assert_eq!(aggregate.version(), AggregateVersion::initial().next());
    }

    #[test]
    fn short_description_is_rejected_before_state_is_consulted() {
        let aggregate = basic_task("Buy milk");

        let rejection = aggregate
            .handle(
                TaskCommand::CreateBasicTask {
                    task_id: task_id(),
                    description: "ab".to_string(),
                },
                &context(),
            )
            .unwrap_err();

        // The task exists, yet the length check wins.
        assert_eq!(
            rejection,
            Rejection::CannotCreateTask {
                task_id: task_id(),
                reason: Refusal::InappropriateDescription {
                    length: 2,
                    minimum: 3
                },
            }
        );
    }

    #[test]
    fn creating_twice_is_rejected() {
        let aggregate = basic_task("Buy milk");

        let rejection = aggregate
            .handle(
                TaskCommand::CreateDraft {
                    task_id: task_id(),
                    description: None,
                },
                &context(),
            )
            .unwrap_err();

        assert_eq!(
            rejection,
            Rejection::CannotCreateDraft {
                task_id: task_id(),
                reason: Refusal::AlreadyExists,
            }
        );
    }

    #[test]
    fn commands_on_unknown_task_are_rejected() {
        let aggregate = TaskAggregate::new(task_id());

        let rejection = aggregate
            .handle(TaskCommand::CompleteTask { task_id: task_id() }, &context())
            .unwrap_err();

        assert_eq!(
            rejection,
            Rejection::CannotCompleteTask {
                task_id: task_id(),
                reason: Refusal::NotCreated,
            }
        );
    }

    #[test]
    fn updating_due_date_records_previous_and_new() {
        let mut aggregate = basic_task("Buy milk");

        let events = aggregate
            .dispatch(
                TaskCommand::UpdateTaskDueDate {
                    task_id: task_id(),
                    previous: None,
                    new: Some(at(18)),
                },
                &context(),
            )
            .unwrap();

        assert_eq!(
            events,
            vec![TaskEvent::TaskDueDateUpdated {
                task_id: task_id(),
                previous: None,
                new: Some(at(18)),
            }]
        );
        assert_eq!(aggregate.state().task().unwrap().due_date(), Some(at(18)));
    }

    #[test]
    fn stale_priority_is_a_mismatch() {
        let mut aggregate = basic_task("Buy milk");
        aggregate
            .dispatch(
                TaskCommand::UpdateTaskPriority {
                    task_id: task_id(),
                    previous: Priority::Undefined,
                    new: Priority::High,
                },
                &context(),
            )
            .unwrap();

        let rejection = aggregate
            .handle(
                TaskCommand::UpdateTaskPriority {
                    task_id: task_id(),
                    previous: Priority::Undefined,
                    new: Priority::Low,
                },
                &context(),
            )
            .unwrap_err();

        assert_eq!(
            rejection,
            Rejection::CannotUpdateTaskPriority {
                task_id: task_id(),
                reason: UpdateRefusal::Mismatch(ValueMismatch {
                    expected: Priority::Undefined,
                    actual: Priority::High,
                    proposed_new: Priority::Low,
                }),
            }
        );
    }

    #[test]
    fn completed_task_fields_are_frozen_even_with_correct_previous_value() {
        let mut aggregate = basic_task("Buy milk");
        aggregate
            .dispatch(TaskCommand::CompleteTask { task_id: task_id() }, &context())
            .unwrap();

        let rejection = aggregate
            .handle(
                TaskCommand::UpdateTaskDueDate {
                    task_id: task_id(),
                    previous: None,
                    new: Some(at(9)),
                },
                &context(),
            )
            .unwrap_err();

        assert_eq!(
            rejection,
            Rejection::CannotUpdateTaskDueDate {
                task_id: task_id(),
                reason: UpdateRefusal::Refused(Refusal::NotEditable {
                    status: TaskStatus::Completed
                }),
            }
        );
    }

    #[test]
    fn reopen_requires_completed_even_though_deleted_may_become_open() {
        let mut aggregate = basic_task("Buy milk");
        aggregate
            .dispatch(TaskCommand::DeleteTask { task_id: task_id() }, &context())
            .unwrap();

        let rejection = aggregate
            .handle(TaskCommand::ReopenTask { task_id: task_id() }, &context())
            .unwrap_err();

        assert_eq!(
            rejection,
            Rejection::CannotReopenTask {
                task_id: task_id(),
                reason: Refusal::WrongStatus {
                    required: TaskStatus::Completed,
                    actual: TaskStatus::Deleted,
                },
            }
        );
    }

    #[test]
    fn labelled_task_restored_leaves_task_state_alone() {
        let aggregate = basic_task("Buy milk");
        let before = aggregate.state().clone();

        let after = before.clone().apply(&TaskEvent::LabelledTaskRestored {
            task_id: task_id(),
            label_id: crate::types::LabelId::try_new("home").unwrap(),
        });

        assert_eq!(after, before);
    }

    #[test]
    fn replay_rejects_update_before_creation() {
        let history = [TaskEvent::TaskCompleted { task_id: task_id() }];

        assert_eq!(
            TaskAggregate::replay(task_id(), &history).unwrap_err(),
            ReplayError::EventBeforeCreation {
                task_id: task_id(),
                event_type: "TaskCompleted",
                version: AggregateVersion::initial().next(),
            }
        );
    }

    #[test]
    fn replay_rejects_second_creation() {
        let created = TaskEvent::TaskDraftCreated {
            task_id: task_id(),
            description: String::new(),
            created_at: at(7),
        };

        assert!(matches!(
            TaskAggregate::replay(task_id(), &[created.clone(), created]),
            Err(ReplayError::DuplicateCreation { .. })
        ));
    }

    #[test]
    fn status_reader_only_answers_for_its_own_identity() {
        let aggregate = basic_task("Buy milk");

        assert_eq!(aggregate.status_of(&task_id()), Some(TaskStatus::Finalized));
        assert_eq!(aggregate.status_of(&TaskId::try_new("other").unwrap()), None);
    }

    #[test]
    fn command_for_another_task_is_refused() {
        let aggregate = basic_task("Buy milk");
        let elsewhere = TaskId::try_new("elsewhere").unwrap();

        let rejection = aggregate
            .handle(
                TaskCommand::DeleteTask {
                    task_id: elsewhere.clone(),
                },
                &context(),
            )
            .unwrap_err();

        assert_eq!(
            rejection,
            Rejection::Misrouted {
                command: "DeleteTask",
                task_id: elsewhere,
                aggregate: task_id(),
            }
        );
        assert_eq!(rejection.command_name(), "DeleteTask");
        assert_eq!(aggregate.state().status(), Some(TaskStatus::Finalized));
    }
}
