//! The event log: per-task task and label histories with optimistic appends.

use crate::config::FeedCapacity;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use taskcore::{
    AggregateVersion, Decision, DomainEvent, Event, LabelEvent, ReplayError, TaskEvent, TaskId,
    TaskLifecycle, TaskRules, Timestamp,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// The two histories kept per task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// History of the task aggregate.
    Task,
    /// History of the label assignment aggregate.
    Labels,
}

impl StreamKind {
    /// The stream a decision extends.
    pub const fn of(decision: &Decision) -> Self {
        match decision {
            Decision::Task(_) => Self::Task,
            Decision::Labels(_) => Self::Labels,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => f.write_str("task"),
            Self::Labels => f.write_str("labels"),
        }
    }
}

/// An event as recorded in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent<E> {
    /// The task the event belongs to.
    pub task_id: TaskId,
    /// Position of the event in its stream, starting at 1.
    pub version: AggregateVersion,
    /// When the log accepted the event.
    pub recorded_at: Timestamp,
    /// The event itself.
    pub event: E,
}

/// Errors raised by an [`EventLog`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventStoreError {
    /// The stream moved on since the writer last read it.
    #[error("{stream} stream of task {task_id} is at version {current}, writer expected {expected}")]
    VersionConflict {
        /// Target task.
        task_id: TaskId,
        /// Target stream.
        stream: StreamKind,
        /// Version the writer based its decision on.
        expected: AggregateVersion,
        /// Version actually stored.
        current: AggregateVersion,
    },

    /// An event in the batch names another task.
    #[error("{event_type} for task {found} cannot be appended to task {expected}")]
    ForeignEvent {
        /// Target task.
        expected: TaskId,
        /// Task named by the event.
        found: TaskId,
        /// Offending event type.
        event_type: &'static str,
    },
}

/// Both recorded histories of one task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    /// Task aggregate events, in order.
    pub task: Vec<StoredEvent<TaskEvent>>,
    /// Label assignment events, in order.
    pub labels: Vec<StoredEvent<LabelEvent>>,
}

impl History {
    /// Version of the given stream.
    pub fn version(&self, stream: StreamKind) -> AggregateVersion {
        let count = match stream {
            StreamKind::Task => self.task.len(),
            StreamKind::Labels => self.labels.len(),
        };
        AggregateVersion::initial().advance(count)
    }

    /// Rebuilds both aggregates for `task_id`.
    pub fn replay(&self, task_id: TaskId, rules: TaskRules) -> Result<TaskLifecycle, ReplayError> {
        let task: Vec<TaskEvent> = self.task.iter().map(|stored| stored.event.clone()).collect();
        let labels: Vec<LabelEvent> = self
            .labels
            .iter()
            .map(|stored| stored.event.clone())
            .collect();
        TaskLifecycle::replay(task_id, rules, &task, &labels)
    }
}

/// Durable storage for task histories.
///
/// Appends are optimistic: the writer states the version its decision was
/// based on, and the append fails if the stream has moved since.
#[async_trait]
pub trait EventLog: Send + Sync + 'static {
    /// Reads both histories of `task_id`. Unknown tasks have empty histories.
    async fn read_stream(&self, task_id: &TaskId) -> Result<History, EventStoreError>;

    /// Appends the events of `decision` to the stream they extend.
    ///
    /// Returns the new version of that stream.
    async fn append(
        &self,
        task_id: &TaskId,
        expected: AggregateVersion,
        decision: &Decision,
    ) -> Result<AggregateVersion, EventStoreError>;

    /// A feed of every event appended from now on, in append order.
    fn subscribe(&self) -> broadcast::Receiver<StoredEvent<DomainEvent>>;
}

/// Thread-safe in-memory event log for tests and local development.
#[derive(Debug, Clone)]
pub struct InMemoryEventLog {
    streams: Arc<RwLock<HashMap<TaskId, History>>>,
    feed: broadcast::Sender<StoredEvent<DomainEvent>>,
}

impl InMemoryEventLog {
    /// An empty log with the default feed capacity.
    pub fn new() -> Self {
        Self::with_feed_capacity(FeedCapacity::default())
    }

    /// An empty log whose feed buffers `capacity` events per subscriber.
    pub fn with_feed_capacity(capacity: FeedCapacity) -> Self {
        let (feed, _) = broadcast::channel(capacity.into_inner());
        Self {
            streams: Arc::new(RwLock::new(HashMap::new())),
            feed,
        }
    }

    /// Identities with at least one recorded event, in ascending order.
    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.streams.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn record<E: Event>(
        task_id: &TaskId,
        start: AggregateVersion,
        recorded_at: Timestamp,
        events: &[E],
    ) -> Result<Vec<StoredEvent<E>>, EventStoreError> {
        let mut version = start;
        events
            .iter()
            .map(|event| {
                if event.task_id() != task_id {
                    return Err(EventStoreError::ForeignEvent {
                        expected: task_id.clone(),
                        found: event.task_id().clone(),
                        event_type: event.event_type(),
                    });
                }
                version = version.next();
                Ok(StoredEvent {
                    task_id: task_id.clone(),
                    version,
                    recorded_at,
                    event: event.clone(),
                })
            })
            .collect()
    }

    fn publish<E: Clone + Into<DomainEvent>>(&self, stored: &[StoredEvent<E>]) {
        for stored in stored {
            // Nobody listening is not an error.
            let _ = self.feed.send(StoredEvent {
                task_id: stored.task_id.clone(),
                version: stored.version,
                recorded_at: stored.recorded_at,
                event: stored.event.clone().into(),
            });
        }
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn read_stream(&self, task_id: &TaskId) -> Result<History, EventStoreError> {
        Ok(self
            .streams
            .read()
            .get(task_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(
        &self,
        task_id: &TaskId,
        expected: AggregateVersion,
        decision: &Decision,
    ) -> Result<AggregateVersion, EventStoreError> {
        let stream = StreamKind::of(decision);
        let recorded_at = Timestamp::now();
        let mut streams = self.streams.write();

        let current = streams
            .get(task_id)
            .map_or_else(AggregateVersion::initial, |existing| existing.version(stream));
        if current != expected {
            warn!(%task_id, %stream, %expected, %current, "Version conflict");
            return Err(EventStoreError::VersionConflict {
                task_id: task_id.clone(),
                stream,
                expected,
                current,
            });
        }

        let version = match decision {
            Decision::Task(events) => {
                let stored = Self::record(task_id, current, recorded_at, events)?;
                let entry = streams.entry(task_id.clone()).or_default();
                entry.task.extend(stored.iter().cloned());
                self.publish(&stored);
                entry.version(stream)
            }
            Decision::Labels(events) => {
                let stored = Self::record(task_id, current, recorded_at, events)?;
                let entry = streams.entry(task_id.clone()).or_default();
                entry.labels.extend(stored.iter().cloned());
                self.publish(&stored);
                entry.version(stream)
            }
        };

        debug!(%task_id, %stream, %version, events = decision.len(), "Appended");
        Ok(version)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoredEvent<DomainEvent>> {
        self.feed.subscribe()
    }
}
