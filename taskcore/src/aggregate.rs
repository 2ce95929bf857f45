//! The aggregate envelope shared by the task and label state machines.
//!
//! An [`AggregateLogic`] implementation is a pure state type: it decides what
//! events a command produces and folds events back into itself. [`Aggregate`]
//! wraps it with an identity and a version, replays history, and logs.

use crate::command::AggregateCommand;
use crate::context::CommandContext;
use crate::errors::{Rejection, ReplayError};
use crate::event::{decode_event, Event};
use crate::types::{AggregateVersion, TaskId};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, error, info, instrument, warn};

/// Decision and evolution logic of one aggregate kind.
///
/// `handle` validates a command against the current state and returns the
/// events it implies or a [`Rejection`]. `apply` folds an event into state and
/// never fails: by the time an event exists, its handler already checked it.
pub trait AggregateLogic: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// The closed set of commands this aggregate handles.
    type Command: AggregateCommand + Debug;

    /// The closed set of events this aggregate emits and applies.
    type Event: Event + Debug;

    /// Short name used in logs.
    const KIND: &'static str;

    /// State of an identity with no history.
    fn initial(task_id: &TaskId) -> Self;

    /// Produces the events for `command`, in order, or refuses it.
    ///
    /// Successful results are never empty.
    fn handle(
        &self,
        command: Self::Command,
        context: &CommandContext<'_>,
    ) -> Result<Vec<Self::Event>, Rejection>;

    /// Folds one event into state.
    #[must_use]
    fn apply(self, event: &Self::Event) -> Self;

    /// Checks that `event` may follow the current state in a persisted history.
    ///
    /// Called only during replay. The default accepts everything.
    fn check_history(
        &self,
        _task_id: &TaskId,
        _event: &Self::Event,
        _version: AggregateVersion,
    ) -> Result<(), ReplayError> {
        Ok(())
    }
}

/// Folds a sequence of events into `initial`.
///
/// This is the entry point for external replay mechanisms. It performs no
/// history checks; use [`Aggregate::replay`] for that.
pub fn fold<'e, L, I>(initial: L, events: I) -> L
where
    L: AggregateLogic,
    I: IntoIterator<Item = &'e L::Event>,
{
    events.into_iter().fold(initial, L::apply)
}

/// One identity's reconstructed state together with its version.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<L: AggregateLogic> {
    id: TaskId,
    state: L,
    version: AggregateVersion,
}

impl<L: AggregateLogic> Aggregate<L> {
    /// An aggregate with no history.
    pub fn new(id: TaskId) -> Self {
        let state = L::initial(&id);
        Self {
            id,
            state,
            version: AggregateVersion::initial(),
        }
    }

    /// Reconstructs an aggregate by folding its persisted history in order.
    ///
    /// Fails on the first event that cannot belong to this history: an event
    /// for another identity, or one the state machine could never have
    /// produced at that point.
    pub fn replay<'e, I>(id: TaskId, events: I) -> Result<Self, ReplayError>
    where
        I: IntoIterator<Item = &'e L::Event>,
    {
        let mut aggregate = Self::new(id);
        for event in events {
            aggregate.replay_one(event)?;
        }

        debug!(
            aggregate = L::KIND,
            task_id = %aggregate.id,
            version = %aggregate.version,
            "Replayed history"
        );
        Ok(aggregate)
    }

    /// Decodes persisted JSON records and replays them.
    pub fn replay_records<I>(id: TaskId, records: I) -> Result<Self, ReplayError>
    where
        I: IntoIterator<Item = serde_json::Value>,
        L::Event: DeserializeOwned,
    {
        let mut aggregate = Self::new(id);
        for record in records {
            let event = decode_event::<L::Event>(record).inspect_err(|fault| {
                error!(aggregate = L::KIND, task_id = %aggregate.id, %fault, "Undecodable history");
            })?;
            aggregate.replay_one(&event)?;
        }
        Ok(aggregate)
    }

    fn replay_one(&mut self, event: &L::Event) -> Result<(), ReplayError> {
        let position = self.version.next();
        let result = if event.task_id() == &self.id {
            self.state.check_history(&self.id, event, position)
        } else {
            Err(ReplayError::ForeignEvent {
                expected: self.id.clone(),
                found: event.task_id().clone(),
                event_type: event.event_type(),
                version: position,
            })
        };

        if let Err(fault) = result {
            error!(aggregate = L::KIND, task_id = %self.id, %fault, "Inconsistent history");
            return Err(fault);
        }

        self.apply(event);
        Ok(())
    }

    /// Identity of this aggregate.
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Current state.
    pub const fn state(&self) -> &L {
        &self.state
    }

    /// Number of events applied so far.
    pub const fn version(&self) -> AggregateVersion {
        self.version
    }

    /// Decides the events for `command` without changing state.
    ///
    /// A command naming another identity is refused with
    /// [`Rejection::Misrouted`] before the state is consulted.
    #[instrument(
        level = "debug",
        skip_all,
        fields(aggregate = L::KIND, task_id = %self.id, command = command.name())
    )]
    pub fn handle(
        &self,
        command: L::Command,
        context: &CommandContext<'_>,
    ) -> Result<Vec<L::Event>, Rejection> {
        if command.task_id() != &self.id {
            let rejection = Rejection::Misrouted {
                command: command.name(),
                task_id: command.task_id().clone(),
                aggregate: self.id.clone(),
            };
            warn!(%rejection, "Command routed to the wrong aggregate");
            return Err(rejection);
        }

        match self.state.handle(command, context) {
            Ok(events) => {
                debug!(events = events.len(), "Command accepted");
                Ok(events)
            }
            Err(rejection) => {
                info!(%rejection, "Command rejected");
                Err(rejection)
            }
        }
    }

    /// Handles `command` and applies the resulting events.
    ///
    /// Use this when the caller is the single writer for this identity and
    /// the events are persisted by someone else afterwards.
    pub fn dispatch(
        &mut self,
        command: L::Command,
        context: &CommandContext<'_>,
    ) -> Result<Vec<L::Event>, Rejection> {
        let events = self.handle(command, context)?;
        self.apply_all(&events);
        Ok(events)
    }

    /// Applies one event and advances the version.
    pub fn apply(&mut self, event: &L::Event) {
        let state = std::mem::replace(&mut self.state, L::initial(&self.id));
        self.state = state.apply(event);
        self.version = self.version.next();
    }

    /// Applies events in order.
    pub fn apply_all<'e, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'e L::Event>,
    {
        for event in events {
            self.apply(event);
        }
    }
}
