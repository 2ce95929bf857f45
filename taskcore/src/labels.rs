//! The label assignment aggregate: which labels are attached to one task.
//!
//! It shares its identity with the task aggregate but keeps its own history.
//! The task's status is read through [`CommandContext::tasks`].

use crate::aggregate::{Aggregate, AggregateLogic};
use crate::command::LabelCommand;
use crate::context::{CommandContext, LabelSetReader};
use crate::errors::{Refusal, Rejection, ReplayError};
use crate::event::LabelEvent;
use crate::transitions::is_editable;
use crate::types::{AggregateVersion, LabelId, TaskId};
use std::collections::BTreeSet;

/// The label assignment aggregate for one task identity.
pub type LabelAssignmentAggregate = Aggregate<LabelAssignmentSet>;

/// Labels currently assigned to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAssignmentSet {
    task_id: TaskId,
    labels: BTreeSet<LabelId>,
}

impl LabelAssignmentSet {
    /// The task these labels belong to.
    pub const fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Assigned labels in ascending order.
    pub const fn labels(&self) -> &BTreeSet<LabelId> {
        &self.labels
    }

    /// Whether `label_id` is assigned.
    pub fn contains(&self, label_id: &LabelId) -> bool {
        self.labels.contains(label_id)
    }

    fn labelable(context: &CommandContext<'_>, task_id: &TaskId) -> Result<(), Refusal> {
        let status = context.tasks().status_of(task_id).ok_or(Refusal::NotCreated)?;
        if !is_editable(status) {
            return Err(Refusal::NotEditable { status });
        }
        Ok(())
    }
}

impl LabelSetReader for LabelAssignmentSet {
    fn labels_of(&self, task_id: &TaskId) -> BTreeSet<LabelId> {
        if task_id == &self.task_id {
            self.labels.clone()
        } else {
            BTreeSet::new()
        }
    }
}

impl AggregateLogic for LabelAssignmentSet {
    type Command = LabelCommand;
    type Event = LabelEvent;

    const KIND: &'static str = "labels";

    fn initial(task_id: &TaskId) -> Self {
        Self {
            task_id: task_id.clone(),
            labels: BTreeSet::new(),
        }
    }

    fn handle(
        &self,
        command: LabelCommand,
        context: &CommandContext<'_>,
    ) -> Result<Vec<LabelEvent>, Rejection> {
        match command {
            // Assigning an assigned label is accepted and recorded again.
            LabelCommand::AssignLabelToTask { task_id, label_id } => {
                match Self::labelable(context, &task_id) {
                    Ok(()) => Ok(vec![LabelEvent::LabelAssignedToTask { task_id, label_id }]),
                    Err(reason) => Err(Rejection::CannotAssignLabelToTask {
                        task_id,
                        label_id,
                        reason,
                    }),
                }
            }

            LabelCommand::RemoveLabelFromTask { task_id, label_id } => {
                let checked = Self::labelable(context, &task_id).and_then(|()| {
                    if self.contains(&label_id) {
                        Ok(())
                    } else {
                        Err(Refusal::LabelNotAssigned {
                            label_id: label_id.clone(),
                        })
                    }
                });
                match checked {
                    Ok(()) => Ok(vec![LabelEvent::LabelRemovedFromTask { task_id, label_id }]),
                    Err(reason) => Err(Rejection::CannotRemoveLabelFromTask {
                        task_id,
                        label_id,
                        reason,
                    }),
                }
            }
        }
    }

    fn apply(mut self, event: &LabelEvent) -> Self {
        match event {
            LabelEvent::LabelAssignedToTask { label_id, .. } => {
                self.labels.insert(label_id.clone());
            }
            LabelEvent::LabelRemovedFromTask { label_id, .. } => {
                self.labels.remove(label_id);
            }
        }
        self
    }

    fn check_history(
        &self,
        task_id: &TaskId,
        event: &LabelEvent,
        version: AggregateVersion,
    ) -> Result<(), ReplayError> {
        match event {
            LabelEvent::LabelRemovedFromTask { label_id, .. } if !self.contains(label_id) => {
                Err(ReplayError::RemovalOfUnassignedLabel {
                    task_id: task_id.clone(),
                    label_id: label_id.clone(),
                    version,
                })
            }
            _ => Ok(()),
        }
    }
}

impl LabelSetReader for LabelAssignmentAggregate {
    fn labels_of(&self, task_id: &TaskId) -> BTreeSet<LabelId> {
        self.state().labels_of(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TaskStatusReader;
    use crate::types::{TaskStatus, Timestamp};

    struct StatusIs(Option<TaskStatus>);

    impl TaskStatusReader for StatusIs {
        fn status_of(&self, _task_id: &TaskId) -> Option<TaskStatus> {
            self.0
        }
    }

    fn task_id() -> TaskId {
        TaskId::try_new("task-9").unwrap()
    }

    fn label(id: &str) -> LabelId {
        LabelId::try_new(id).unwrap()
    }

    fn assign(id: &str) -> LabelCommand {
        LabelCommand::AssignLabelToTask {
            task_id: task_id(),
            label_id: label(id),
        }
    }

    fn remove(id: &str) -> LabelCommand {
        LabelCommand::RemoveLabelFromTask {
            task_id: task_id(),
            label_id: label(id),
        }
    }

    #[test]
    fn assigning_twice_records_two_events_and_one_label() {
        let open = StatusIs(Some(TaskStatus::Open));
        let context = CommandContext::new(Timestamp::now()).with_tasks(&open);
        let mut aggregate = LabelAssignmentAggregate::new(task_id());

        aggregate.dispatch(assign("home"), &context).unwrap();
        let events = aggregate.dispatch(assign("home"), &context).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(aggregate.version(), AggregateVersion::initial().advance(2));
        assert_eq!(aggregate.state().labels().len(), 1);
    }

    #[test]
    fn labels_need_an_existing_task() {
        let context = CommandContext::new(Timestamp::now());
        let aggregate = LabelAssignmentAggregate::new(task_id());

        assert_eq!(
            aggregate.handle(assign("home"), &context).unwrap_err(),
            Rejection::CannotAssignLabelToTask {
                task_id: task_id(),
                label_id: label("home"),
                reason: Refusal::NotCreated,
            }
        );
    }

    #[test]
    fn deleted_task_cannot_be_labelled() {
        let deleted = StatusIs(Some(TaskStatus::Deleted));
        let context = CommandContext::new(Timestamp::now()).with_tasks(&deleted);
        let aggregate = LabelAssignmentAggregate::new(task_id());

        assert!(matches!(
            aggregate.handle(assign("home"), &context),
            Err(Rejection::CannotAssignLabelToTask {
                reason: Refusal::NotEditable {
                    status: TaskStatus::Deleted
                },
                ..
            })
        ));
    }

    #[test]
    fn removing_unassigned_label_is_rejected() {
        let draft = StatusIs(Some(TaskStatus::Draft));
        let context = CommandContext::new(Timestamp::now()).with_tasks(&draft);
        let mut aggregate = LabelAssignmentAggregate::new(task_id());
        aggregate.dispatch(assign("home"), &context).unwrap();

        assert_eq!(
            aggregate.handle(remove("work"), &context).unwrap_err(),
            Rejection::CannotRemoveLabelFromTask {
                task_id: task_id(),
                label_id: label("work"),
                reason: Refusal::LabelNotAssigned {
                    label_id: label("work")
                },
            }
        );

        aggregate.dispatch(remove("home"), &context).unwrap();
        assert!(aggregate.labels_of(&task_id()).is_empty());
    }

    #[test]
    fn replay_rejects_removal_of_unassigned_label() {
        let history = [LabelEvent::LabelRemovedFromTask {
            task_id: task_id(),
            label_id: label("home"),
        }];

        assert!(matches!(
            LabelAssignmentAggregate::replay(task_id(), &history),
            Err(ReplayError::RemovalOfUnassignedLabel { .. })
        ));
    }

    #[test]
    fn label_reader_is_scoped_to_its_task() {
        let state = LabelAssignmentSet::initial(&task_id())
            .apply(&LabelEvent::LabelAssignedToTask {
                task_id: task_id(),
                label_id: label("home"),
            });

        assert_eq!(state.labels_of(&task_id()), [label("home")].into());
        assert!(state.labels_of(&TaskId::try_new("other").unwrap()).is_empty());
    }
}
