//! Actor-per-identity command dispatcher.
//!
//! Every task identity gets one tokio task that owns its [`TaskLifecycle`]
//! and drains a bounded mailbox in order. Commands for different identities
//! run in parallel; commands for the same identity never overlap, so the
//! aggregate a worker holds is always the latest appended state.
//!
//! A worker that receives nothing for [`DispatcherConfig::idle_timeout`]
//! closes its mailbox, finishes what is already queued and removes itself.
//! The next command for that task starts a fresh worker, which waits for the
//! old one to finish before loading the task from the log.

use crate::config::DispatcherConfig;
use crate::log::{EventLog, EventStoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use taskcore::{
    AggregateCommand, Command, DomainEvent, Rejection, ReplayError, TaskId, TaskLifecycle,
    TaskRules, Timestamp,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, instrument, warn};

/// Why a command sent through the dispatcher produced no events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The aggregate refused the command.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The log refused the append or the read.
    #[error("event log: {0}")]
    Store(#[from] EventStoreError),

    /// The stored history of the task is inconsistent.
    #[error("corrupt history: {0}")]
    Replay(#[from] ReplayError),

    /// The dispatcher was shut down.
    #[error("dispatcher is shut down")]
    Closed,
}

struct Envelope {
    command: Command,
    issued_at: Timestamp,
    reply: oneshot::Sender<Result<Vec<DomainEvent>, DispatchError>>,
}

struct Mailbox {
    sender: mpsc::Sender<Envelope>,
    worker: JoinHandle<()>,
}

/// `None` once the dispatcher is shut down.
type Mailboxes = Arc<Mutex<Option<HashMap<TaskId, Mailbox>>>>;

/// Routes commands to one worker per task identity.
///
/// # Example
///
/// ```rust,ignore
/// let log = Arc::new(InMemoryEventLog::new());
/// let dispatcher = TaskDispatcher::new(log, DispatcherConfig::default());
///
/// let events = dispatcher
///     .send(TaskCommand::CreateBasicTask { task_id, description: "Buy milk".into() })
///     .await?;
/// ```
pub struct TaskDispatcher<L: EventLog> {
    log: Arc<L>,
    config: DispatcherConfig,
    mailboxes: Mailboxes,
}

impl<L: EventLog> TaskDispatcher<L> {
    /// A dispatcher writing to `log`.
    pub fn new(log: Arc<L>, config: DispatcherConfig) -> Self {
        Self {
            log,
            config,
            mailboxes: Arc::new(Mutex::new(Some(HashMap::new()))),
        }
    }

    /// The log this dispatcher writes to.
    pub const fn log(&self) -> &Arc<L> {
        &self.log
    }

    /// Sends a command issued now and waits for its outcome.
    pub async fn send(&self, command: impl Into<Command>) -> Result<Vec<DomainEvent>, DispatchError> {
        self.send_at(command, Timestamp::now()).await
    }

    /// Sends a command issued at `issued_at` and waits for its outcome.
    pub async fn send_at(
        &self,
        command: impl Into<Command>,
        issued_at: Timestamp,
    ) -> Result<Vec<DomainEvent>, DispatchError> {
        self.dispatch(command.into(), issued_at).await
    }

    #[instrument(
        name = "dispatch",
        skip_all,
        fields(task_id = %command.task_id(), command = command.name())
    )]
    async fn dispatch(
        &self,
        command: Command,
        issued_at: Timestamp,
    ) -> Result<Vec<DomainEvent>, DispatchError> {
        let task_id = command.task_id().clone();
        let (reply, outcome) = oneshot::channel();
        let mut envelope = Envelope {
            command,
            issued_at,
            reply,
        };

        loop {
            let sender = self.mailbox(&task_id)?;
            match sender.send(envelope).await {
                Ok(()) => break,
                // The worker went idle between lookup and send.
                Err(mpsc::error::SendError(returned)) => envelope = returned,
            }
        }

        outcome.await.map_err(|_| DispatchError::Closed)?
    }

    fn mailbox(&self, task_id: &TaskId) -> Result<mpsc::Sender<Envelope>, DispatchError> {
        let mut guard = self.mailboxes.lock();
        let mailboxes = guard.as_mut().ok_or(DispatchError::Closed)?;

        if let Some(mailbox) = mailboxes.get(task_id) {
            if !mailbox.sender.is_closed() {
                return Ok(mailbox.sender.clone());
            }
        }

        let previous = mailboxes.remove(task_id).map(|stopping| {
            debug!(%task_id, "Worker is stopping, starting its successor");
            stopping.worker
        });
        let (sender, inbox) = mpsc::channel(self.config.mailbox_capacity.into_inner());
        let worker = tokio::spawn(run_worker(
            task_id.clone(),
            Arc::clone(&self.log),
            self.config,
            Arc::clone(&self.mailboxes),
            previous,
            inbox,
        ));
        debug!(%task_id, "Started worker");

        mailboxes.insert(
            task_id.clone(),
            Mailbox {
                sender: sender.clone(),
                worker,
            },
        );
        Ok(sender)
    }

    /// Identities that currently have a worker.
    pub fn active_tasks(&self) -> Vec<TaskId> {
        let guard = self.mailboxes.lock();
        let mut ids: Vec<TaskId> = guard
            .as_ref()
            .map(|mailboxes| mailboxes.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Closes every mailbox and waits for queued commands to finish.
    ///
    /// Commands sent afterwards fail with [`DispatchError::Closed`].
    pub async fn shutdown(&self) {
        let mailboxes = self.mailboxes.lock().take().unwrap_or_default();
        info!(workers = mailboxes.len(), "Shutting down dispatcher");

        for (task_id, Mailbox { sender, worker }) in mailboxes {
            drop(sender);
            if let Err(join_error) = worker.await {
                error!(%task_id, %join_error, "Worker ended abnormally");
            }
        }
    }
}

impl<L: EventLog> std::fmt::Debug for TaskDispatcher<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDispatcher")
            .field("config", &self.config)
            .field("active_tasks", &self.active_tasks().len())
            .finish_non_exhaustive()
    }
}

async fn run_worker<L: EventLog>(
    task_id: TaskId,
    log: Arc<L>,
    config: DispatcherConfig,
    mailboxes: Mailboxes,
    previous: Option<JoinHandle<()>>,
    mut inbox: mpsc::Receiver<Envelope>,
) {
    if let Some(previous) = previous {
        if let Err(join_error) = previous.await {
            error!(%task_id, %join_error, "Previous worker ended abnormally");
        }
    }

    let idle_timeout = config.idle_timeout.as_duration();
    let mut loaded: Option<TaskLifecycle> = None;

    loop {
        let Envelope {
            command,
            issued_at,
            reply,
        } = match time::timeout(idle_timeout, inbox.recv()).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => break,
            Err(_elapsed) => {
                // Refuse new commands; anything already queued is still drained.
                debug!(%task_id, ?idle_timeout, "Worker idle, closing mailbox");
                inbox.close();
                continue;
            }
        };

        let outcome = process(&task_id, log.as_ref(), config.rules, &mut loaded, command, issued_at).await;
        if reply.send(outcome).is_err() {
            debug!(%task_id, "Caller went away before the outcome was ready");
        }
    }

    release(&mailboxes, &task_id);
    debug!(%task_id, "Mailbox closed");
}

/// Drops the map entry of a worker that closed its own mailbox.
///
/// An entry whose sender is still open belongs to a successor and is kept.
fn release(mailboxes: &Mutex<Option<HashMap<TaskId, Mailbox>>>, task_id: &TaskId) {
    let mut guard = mailboxes.lock();
    let Some(mailboxes) = guard.as_mut() else {
        return;
    };
    if mailboxes
        .get(task_id)
        .is_some_and(|mailbox| mailbox.sender.is_closed())
    {
        mailboxes.remove(task_id);
    }
}

/// Handles one command: load on first use, decide, append, then apply.
///
/// The lifecycle is dropped after a failed append so that the next command
/// reloads it from the log.
async fn process<L: EventLog>(
    task_id: &TaskId,
    log: &L,
    rules: TaskRules,
    loaded: &mut Option<TaskLifecycle>,
    command: Command,
    issued_at: Timestamp,
) -> Result<Vec<DomainEvent>, DispatchError> {
    let mut lifecycle = match loaded.take() {
        Some(lifecycle) => lifecycle,
        None => {
            let history = log.read_stream(task_id).await?;
            history
                .replay(task_id.clone(), rules)
                .inspect_err(|fault| error!(%task_id, %fault, "Cannot rebuild task"))?
        }
    };

    let decision = match lifecycle.handle(command, issued_at) {
        Ok(decision) => decision,
        Err(rejection) => {
            *loaded = Some(lifecycle);
            return Err(rejection.into());
        }
    };

    log.append(task_id, lifecycle.version_for(&decision), &decision)
        .await
        .inspect_err(|conflict| warn!(%task_id, %conflict, "Append failed, reloading on next command"))?;

    lifecycle.apply(&decision);
    let events = decision.domain_events();
    *loaded = Some(lifecycle);
    Ok(events)
}
