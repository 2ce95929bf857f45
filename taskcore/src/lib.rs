//! `taskcore` - event-sourced task lifecycle aggregate
//!
//! A task moves through the statuses `DRAFT`, `FINALIZED`, `OPEN`,
//! `COMPLETED` and `DELETED` according to a fixed transition table. Commands
//! are validated against the current state and yield either an ordered list
//! of events or a typed [`Rejection`]. State is never mutated directly: it is
//! rebuilt by folding events through pure appliers.
//!
//! Field updates carry the value the issuer believes is current. When it
//! disagrees with the actual value the command is rejected with a
//! [`ValueMismatch`](mismatch::ValueMismatch) holding all three values, which
//! gives field-level optimistic concurrency without version numbers.
//!
//! Each task identity has two aggregates sharing that identity: the
//! [`TaskAggregate`] and the [`LabelAssignmentAggregate`]. Restoring a
//! deleted task re-asserts its labels through the
//! [`RestoreCascadeCoordinator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use taskcore::prelude::*;
//!
//! let task_id = TaskId::generate();
//! let mut lifecycle = TaskLifecycle::new(task_id.clone(), TaskRules::default());
//!
//! lifecycle.dispatch(
//!     TaskCommand::CreateBasicTask { task_id: task_id.clone(), description: "Buy milk".into() }.into(),
//!     Timestamp::now(),
//! )?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod command;
pub mod config;
pub mod context;
pub mod errors;
pub mod event;
pub mod labels;
pub mod lifecycle;
pub mod mismatch;
pub mod restore;
pub mod task;
pub mod transitions;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregate::{fold, Aggregate, AggregateLogic};
pub use command::{AggregateCommand, Command, LabelCommand, TaskCommand};
pub use config::{MinDescriptionLength, TaskRules};
pub use context::{CommandContext, LabelSetReader, NoHistory, TaskStatusReader};
pub use errors::{Refusal, Rejection, ReplayError, UpdateRefusal};
pub use event::{decode_event, DomainEvent, Event, LabelEvent, TaskEvent};
pub use labels::{LabelAssignmentAggregate, LabelAssignmentSet};
pub use lifecycle::{Decision, TaskLifecycle};
pub use restore::RestoreCascadeCoordinator;
pub use task::{Task, TaskAggregate, TaskState};
pub use types::{AggregateVersion, LabelId, Priority, TaskId, TaskStatus, Timestamp};

/// Commonly used types in one import.
pub mod prelude {
    pub use crate::aggregate::{Aggregate, AggregateLogic};
    pub use crate::command::{AggregateCommand, Command, LabelCommand, TaskCommand};
    pub use crate::config::{MinDescriptionLength, TaskRules};
    pub use crate::context::{CommandContext, LabelSetReader, TaskStatusReader};
    pub use crate::errors::{Refusal, Rejection, ReplayError, UpdateRefusal};
    pub use crate::event::{DomainEvent, Event, LabelEvent, TaskEvent};
    pub use crate::labels::LabelAssignmentAggregate;
    pub use crate::lifecycle::{Decision, TaskLifecycle};
    pub use crate::mismatch::ValueMismatch;
    pub use crate::task::TaskAggregate;
    pub use crate::types::{AggregateVersion, LabelId, Priority, TaskId, TaskStatus, Timestamp};
}
