//! In-memory event log and dispatcher for `taskcore`
//!
//! [`InMemoryEventLog`] keeps the task and label histories of every task in
//! process memory and checks appends against the writer's expected version.
//! [`TaskDispatcher`] runs one worker per task identity on top of any
//! [`EventLog`], so commands for one task are processed strictly in order
//! while different tasks proceed in parallel. A worker left idle for the
//! configured timeout is released and restarted by the next command.
//!
//! Useful for tests and local development where persistence is not required.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dispatcher;
pub mod log;

pub use config::{DispatcherConfig, FeedCapacity, IdleTimeoutMs, MailboxCapacity};
pub use dispatcher::{DispatchError, TaskDispatcher};
pub use log::{EventLog, EventStoreError, History, InMemoryEventLog, StoredEvent, StreamKind};
