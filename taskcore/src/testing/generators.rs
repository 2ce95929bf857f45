//! Property test generators for domain types and commands.
//!
//! Every generator respects the validation rules of the type it produces.
//! Command generators draw field values from small pools so that random
//! sequences hit both accepted and rejected paths.

use crate::command::{Command, LabelCommand, TaskCommand};
use crate::types::{LabelId, Priority, TaskId, TaskStatus, Timestamp};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

/// Generates valid `TaskId` values.
///
/// # Example
/// ```rust,ignore
/// use proptest::prelude::*;
/// use taskcore::testing::generators::arb_task_id;
///
/// proptest! {
///     #[test]
///     fn ids_are_never_blank(task_id in arb_task_id()) {
///         assert!(!task_id.trim().is_empty());
///     }
/// }
/// ```
pub fn arb_task_id() -> impl Strategy<Value = TaskId> {
    "[a-zA-Z0-9][a-zA-Z0-9._-]{0,63}".prop_filter_map("Invalid TaskId", |s| TaskId::try_new(s).ok())
}

/// Generates valid `LabelId` values.
pub fn arb_label_id() -> impl Strategy<Value = LabelId> {
    "[a-z][a-z0-9-]{0,31}".prop_filter_map("Invalid LabelId", |s| LabelId::try_new(s).ok())
}

/// Generates a `LabelId` from a pool of four, so repeats are likely.
pub fn arb_pooled_label_id() -> impl Strategy<Value = LabelId> {
    prop::sample::select(vec!["errand", "home", "urgent", "work"])
        .prop_filter_map("Invalid LabelId", |s| LabelId::try_new(s).ok())
}

/// Generates any `TaskStatus`.
pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

/// Generates any `Priority`.
pub fn arb_priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

/// Generates `Timestamp` values between 2000 and 2100, at whole seconds.
pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    (946_684_800_i64..=4_102_444_800_i64).prop_filter_map("Invalid timestamp", |secs| {
        Utc.timestamp_opt(secs, 0).single().map(Timestamp::new)
    })
}

/// Generates a due date from a pool of two instants, or none.
pub fn arb_due_date() -> impl Strategy<Value = Option<Timestamp>> {
    prop_oneof![
        Just(None),
        Just(Utc.timestamp_opt(1_717_200_000, 0).single().map(Timestamp::new)),
        Just(Utc.timestamp_opt(1_717_286_400, 0).single().map(Timestamp::new)),
    ]
}

/// Generates descriptions, roughly a third of them shorter than three
/// characters.
pub fn arb_description() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{0,2}",
        prop::sample::select(vec!["Buy milk", "Call the plumber", "File taxes"])
            .prop_map(String::from),
        "[A-Za-z ]{3,40}",
    ]
}

/// Generates a task command targeting `task_id`.
pub fn arb_task_command(task_id: TaskId) -> impl Strategy<Value = TaskCommand> {
    let id = move || task_id.clone();
    prop_oneof![
        arb_description().prop_map({
            let id = id.clone();
            move |description| TaskCommand::CreateBasicTask {
                task_id: id(),
                description,
            }
        }),
        prop::option::of(arb_description()).prop_map({
            let id = id.clone();
            move |description| TaskCommand::CreateDraft {
                task_id: id(),
                description,
            }
        }),
        Just(TaskCommand::FinalizeDraft { task_id: id() }),
        (arb_description(), arb_description()).prop_map({
            let id = id.clone();
            move |(previous, new)| TaskCommand::UpdateTaskDescription {
                task_id: id(),
                previous,
                new,
            }
        }),
        (arb_due_date(), arb_due_date()).prop_map({
            let id = id.clone();
            move |(previous, new)| TaskCommand::UpdateTaskDueDate {
                task_id: id(),
                previous,
                new,
            }
        }),
        (arb_priority(), arb_priority()).prop_map({
            let id = id.clone();
            move |(previous, new)| TaskCommand::UpdateTaskPriority {
                task_id: id(),
                previous,
                new,
            }
        }),
        Just(TaskCommand::ReopenTask { task_id: id() }),
        Just(TaskCommand::DeleteTask { task_id: id() }),
        Just(TaskCommand::CompleteTask { task_id: id() }),
        Just(TaskCommand::RestoreDeletedTask { task_id: id() }),
    ]
}

/// Generates a label command targeting `task_id`.
pub fn arb_label_command(task_id: TaskId) -> impl Strategy<Value = LabelCommand> {
    let removal_id = task_id.clone();
    prop_oneof![
        arb_pooled_label_id().prop_map(move |label_id| LabelCommand::AssignLabelToTask {
            task_id: task_id.clone(),
            label_id,
        }),
        arb_pooled_label_id().prop_map(move |label_id| LabelCommand::RemoveLabelFromTask {
            task_id: removal_id.clone(),
            label_id,
        }),
    ]
}

/// Generates any command targeting `task_id`, task commands three times as
/// often as label commands.
pub fn arb_command(task_id: TaskId) -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => arb_task_command(task_id.clone()).prop_map(Command::from),
        1 => arb_label_command(task_id).prop_map(Command::from),
    ]
}

/// Generates up to `max_len` commands targeting `task_id`.
pub fn arb_command_sequence(task_id: TaskId, max_len: usize) -> impl Strategy<Value = Vec<Command>> {
    prop::collection::vec(arb_command(task_id), 0..=max_len)
}
