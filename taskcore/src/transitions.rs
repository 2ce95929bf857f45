//! The task status transition table.
//!
//! Every status-changing handler asks [`is_allowed`] before producing an
//! event. Field edits use the narrower [`is_editable`] predicate.

use crate::types::TaskStatus;

/// Returns whether a task may move from `current` to `target`.
///
/// Total over all 25 pairs. The allowed edges are:
///
/// - `DRAFT -> FINALIZED`
/// - `FINALIZED -> COMPLETED`, `OPEN -> COMPLETED`
/// - `COMPLETED -> OPEN`, `DELETED -> OPEN`
/// - `FINALIZED -> DELETED`, `OPEN -> DELETED`, `COMPLETED -> DELETED`
///
/// Everything else is refused, self-transitions included. A draft has to be
/// finalized before any other status change succeeds, deletion included.
///
/// `FINALIZED -> COMPLETED` exists so a basic task can be completed directly;
/// without it the only way out of `FINALIZED` into `OPEN` is delete then restore.
pub const fn is_allowed(current: TaskStatus, target: TaskStatus) -> bool {
    use TaskStatus::{Completed, Deleted, Draft, Finalized, Open};

    matches!(
        (current, target),
        (Draft, Finalized)
            | (Finalized | Open, Completed)
            | (Completed | Deleted, Open)
            | (Finalized | Open | Completed, Deleted)
    )
}

/// Returns whether description, priority, due date or labels may change.
pub const fn is_editable(status: TaskStatus) -> bool {
    !matches!(status, TaskStatus::Completed | TaskStatus::Deleted)
}

/// Statuses reachable from `current` in one step.
pub fn targets_from(current: TaskStatus) -> impl Iterator<Item = TaskStatus> {
    TaskStatus::ALL
        .into_iter()
        .filter(move |target| is_allowed(current, *target))
}
