//! Given/when/then harness over one task identity.
//!
//! A [`Scenario`] owns a [`TaskLifecycle`] and the history that produced it.
//! Events given up front are applied without validation, the way replay
//! would see them; the command under test goes through the real handlers.

use crate::command::Command;
use crate::config::TaskRules;
use crate::errors::Rejection;
use crate::event::{DomainEvent, LabelEvent, TaskEvent};
use crate::lifecycle::TaskLifecycle;
use crate::types::{LabelId, TaskId, TaskStatus, Timestamp};
use chrono::{TimeZone, Utc};
use std::collections::BTreeSet;

/// A test scenario for one task and its label set.
///
/// # Example
/// ```rust,ignore
/// use taskcore::testing::harness::Scenario;
///
/// Scenario::for_task(task_id.clone())
///     .given([TaskEvent::TaskCreated { /* ... */ }])
///     .when(TaskCommand::CompleteTask { task_id: task_id.clone() })
///     .then_events([TaskEvent::TaskCompleted { task_id }]);
/// ```
#[derive(Debug, Clone)]
pub struct Scenario {
    lifecycle: TaskLifecycle,
    history: Vec<DomainEvent>,
    issued_at: Timestamp,
}

impl Scenario {
    /// A scenario for `task_id` with default rules.
    pub fn for_task(task_id: TaskId) -> Self {
        Self::with_rules(task_id, TaskRules::default())
    }

    /// A scenario for `task_id` with custom rules.
    pub fn with_rules(task_id: TaskId, rules: TaskRules) -> Self {
        Self {
            lifecycle: TaskLifecycle::new(task_id, rules),
            history: Vec::new(),
            issued_at: Self::default_issue_time(),
        }
    }

    /// The fixed instant commands are issued at unless overridden.
    pub fn default_issue_time() -> Timestamp {
        Timestamp::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0)
                .single()
                .expect("fixed calendar date is valid"),
        )
    }

    /// Issues subsequent commands at `issued_at`.
    #[must_use]
    pub fn at(mut self, issued_at: Timestamp) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Applies prior events without running any handler.
    #[must_use]
    pub fn given<I, E>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<DomainEvent>,
    {
        for event in events {
            let event = event.into();
            self.lifecycle.apply_event(&event);
            self.history.push(event);
        }
        self
    }

    /// Runs prior commands through the handlers.
    ///
    /// # Panics
    ///
    /// Panics if any of them is rejected.
    #[must_use]
    pub fn given_commands<I, C>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Command>,
    {
        for command in commands {
            let command = command.into();
            let name = crate::command::AggregateCommand::name(&command);
            if let Err(rejection) = self.run(command) {
                panic!("setup command {name} was rejected: {rejection}");
            }
        }
        self
    }

    /// Runs the command under test. Accepted events are applied.
    pub fn when(&mut self, command: impl Into<Command>) -> Outcome {
        Outcome {
            result: self.run(command.into()),
        }
    }

    fn run(&mut self, command: Command) -> Result<Vec<DomainEvent>, Rejection> {
        let events = self.lifecycle.dispatch(command, self.issued_at)?;
        self.history.extend(events.iter().cloned());
        Ok(events)
    }

    /// Everything given or produced so far, in order.
    pub fn history(&self) -> &[DomainEvent] {
        &self.history
    }

    /// The aggregates as they stand.
    pub const fn lifecycle(&self) -> &TaskLifecycle {
        &self.lifecycle
    }

    /// Current task status, if created.
    pub fn status(&self) -> Option<TaskStatus> {
        self.lifecycle.task().state().status()
    }

    /// Labels currently assigned.
    pub fn labels(&self) -> &BTreeSet<LabelId> {
        self.lifecycle.labels().state().labels()
    }

    /// Asserts that replaying the history yields the current state.
    ///
    /// # Panics
    ///
    /// Panics if the history fails to replay or replays to different state.
    pub fn assert_replay_matches(&self) {
        let (task_history, label_history) = split_history(&self.history);
        let replayed = TaskLifecycle::replay(
            self.lifecycle.id().clone(),
            self.lifecycle.rules(),
            &task_history,
            &label_history,
        )
        .unwrap_or_else(|fault| panic!("history did not replay: {fault}"));

        assert_eq!(replayed.task(), self.lifecycle.task(), "task state diverged");
        assert_eq!(replayed.labels(), self.lifecycle.labels(), "label state diverged");
    }
}

/// Splits a mixed history into the task stream and the label stream.
pub fn split_history(history: &[DomainEvent]) -> (Vec<TaskEvent>, Vec<LabelEvent>) {
    let mut tasks = Vec::new();
    let mut labels = Vec::new();
    for event in history {
        match event {
            DomainEvent::Task(event) => tasks.push(event.clone()),
            DomainEvent::Label(event) => labels.push(event.clone()),
        }
    }
    (tasks, labels)
}

/// The result of [`Scenario::when`].
#[derive(Debug, Clone)]
#[must_use]
pub struct Outcome {
    result: Result<Vec<DomainEvent>, Rejection>,
}

impl Outcome {
    /// Asserts the command produced exactly `expected`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the command was rejected or produced other events.
    pub fn then_events<I, E>(self, expected: I) -> Vec<DomainEvent>
    where
        I: IntoIterator<Item = E>,
        E: Into<DomainEvent>,
    {
        let expected: Vec<DomainEvent> = expected.into_iter().map(Into::into).collect();
        match self.result {
            Ok(events) => {
                assert_eq!(events, expected, "unexpected events");
                events
            }
            Err(rejection) => {
                panic!("expected {} events, command was rejected: {rejection}", expected.len())
            }
        }
    }

    /// Asserts the command was rejected and returns the rejection.
    ///
    /// # Panics
    ///
    /// Panics if the command was accepted.
    pub fn then_rejected(self) -> Rejection {
        match self.result {
            Ok(events) => panic!("expected a rejection, command produced {events:?}"),
            Err(rejection) => rejection,
        }
    }

    /// Asserts the command was rejected with `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the command was accepted or rejected differently.
    pub fn then_rejected_with(self, expected: &Rejection) {
        assert_eq!(&self.then_rejected(), expected);
    }

    /// The raw result.
    pub fn into_result(self) -> Result<Vec<DomainEvent>, Rejection> {
        self.result
    }
}
