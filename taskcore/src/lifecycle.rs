//! Both aggregates of one task identity, routed together.
//!
//! [`TaskLifecycle`] is what a single writer for an identity owns: the task
//! aggregate and the label assignment aggregate. Each command goes to exactly
//! one of them, with the other exposed read-only through the
//! [`CommandContext`].

use crate::aggregate::Aggregate;
use crate::command::Command;
use crate::config::TaskRules;
use crate::context::CommandContext;
use crate::errors::{Rejection, ReplayError};
use crate::event::{DomainEvent, LabelEvent, TaskEvent};
use crate::labels::LabelAssignmentAggregate;
use crate::task::TaskAggregate;
use crate::types::{AggregateVersion, TaskId, Timestamp};

/// Events accepted for one command, tagged with the history they extend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Events for the task history.
    Task(Vec<TaskEvent>),
    /// Events for the label history.
    Labels(Vec<LabelEvent>),
}

impl Decision {
    /// The decided events in order, as domain events.
    pub fn domain_events(&self) -> Vec<DomainEvent> {
        match self {
            Self::Task(events) => events.iter().cloned().map(DomainEvent::from).collect(),
            Self::Labels(events) => events.iter().cloned().map(DomainEvent::from).collect(),
        }
    }

    /// Number of decided events.
    pub fn len(&self) -> usize {
        match self {
            Self::Task(events) => events.len(),
            Self::Labels(events) => events.len(),
        }
    }

    /// Always false for an accepted command.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The task and label aggregates of one identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskLifecycle {
    task: TaskAggregate,
    labels: LabelAssignmentAggregate,
    rules: TaskRules,
}

impl TaskLifecycle {
    /// An identity with no history.
    pub fn new(id: TaskId, rules: TaskRules) -> Self {
        Self {
            task: Aggregate::new(id.clone()),
            labels: Aggregate::new(id),
            rules,
        }
    }

    /// Rebuilds both aggregates from their histories.
    pub fn replay(
        id: TaskId,
        rules: TaskRules,
        task_history: &[TaskEvent],
        label_history: &[LabelEvent],
    ) -> Result<Self, ReplayError> {
        Ok(Self {
            task: Aggregate::replay(id.clone(), task_history)?,
            labels: Aggregate::replay(id, label_history)?,
            rules,
        })
    }

    /// Identity of the task.
    pub const fn id(&self) -> &TaskId {
        self.task.id()
    }

    /// The task aggregate.
    pub const fn task(&self) -> &TaskAggregate {
        &self.task
    }

    /// The label assignment aggregate.
    pub const fn labels(&self) -> &LabelAssignmentAggregate {
        &self.labels
    }

    /// Validation rules applied to task commands.
    pub const fn rules(&self) -> TaskRules {
        self.rules
    }

    /// Version of the history `decision` extends.
    pub const fn version_for(&self, decision: &Decision) -> AggregateVersion {
        match decision {
            Decision::Task(_) => self.task.version(),
            Decision::Labels(_) => self.labels.version(),
        }
    }

    /// Routes `command` to its aggregate and decides, without changing state.
    pub fn handle(&self, command: Command, issued_at: Timestamp) -> Result<Decision, Rejection> {
        let context = CommandContext::new(issued_at).with_rules(self.rules);
        match command {
            Command::Task(command) => self
                .task
                .handle(command, &context.with_labels(&self.labels))
                .map(Decision::Task),
            Command::Label(command) => self
                .labels
                .handle(command, &context.with_tasks(&self.task))
                .map(Decision::Labels),
        }
    }

    /// Applies decided events to their aggregate.
    pub fn apply(&mut self, decision: &Decision) {
        match decision {
            Decision::Task(events) => self.task.apply_all(events),
            Decision::Labels(events) => self.labels.apply_all(events),
        }
    }

    /// Applies one domain event to its aggregate.
    pub fn apply_event(&mut self, event: &DomainEvent) {
        match event {
            DomainEvent::Task(event) => self.task.apply(event),
            DomainEvent::Label(event) => self.labels.apply(event),
        }
    }

    /// Handles `command` and applies the outcome.
    pub fn dispatch(
        &mut self,
        command: Command,
        issued_at: Timestamp,
    ) -> Result<Vec<DomainEvent>, Rejection> {
        let decision = self.handle(command, issued_at)?;
        self.apply(&decision);
        Ok(decision.domain_events())
    }
}
