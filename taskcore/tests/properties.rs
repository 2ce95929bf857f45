//! Property tests for the task lifecycle.

use proptest::prelude::*;
use taskcore::testing::generators::{
    arb_command_sequence, arb_priority, arb_task_id, arb_task_status,
};
use taskcore::testing::harness::{split_history, Scenario};
use taskcore::transitions::{is_allowed, is_editable};
use taskcore::{
    Aggregate, DomainEvent, Event, Refusal, Rejection, TaskAggregate, TaskCommand, TaskEvent,
    TaskId, TaskStatus, UpdateRefusal,
};

/// The shortest history that leaves `task_id` in `status`.
fn history_in(task_id: &TaskId, status: TaskStatus) -> Vec<TaskEvent> {
    let created_at = Scenario::default_issue_time();
    let basic = TaskEvent::TaskCreated {
        task_id: task_id.clone(),
        description: "Buy milk".to_string(),
        created_at,
    };
    let completed = TaskEvent::TaskCompleted {
        task_id: task_id.clone(),
    };

    match status {
        TaskStatus::Draft => vec![TaskEvent::TaskDraftCreated {
            task_id: task_id.clone(),
            description: String::new(),
            created_at,
        }],
        TaskStatus::Finalized => vec![basic],
        TaskStatus::Open => vec![
            basic,
            completed,
            TaskEvent::TaskReopened {
                task_id: task_id.clone(),
            },
        ],
        TaskStatus::Completed => vec![basic, completed],
        TaskStatus::Deleted => vec![
            basic,
            TaskEvent::TaskDeleted {
                task_id: task_id.clone(),
            },
        ],
    }
}

/// Status-changing commands paired with whether they should be accepted
/// from `status`.
fn status_commands(task_id: &TaskId, status: TaskStatus) -> Vec<(TaskCommand, bool)> {
    let task_id = || task_id.clone();
    vec![
        (
            TaskCommand::FinalizeDraft { task_id: task_id() },
            status == TaskStatus::Draft,
        ),
        (
            TaskCommand::CompleteTask { task_id: task_id() },
            is_allowed(status, TaskStatus::Completed),
        ),
        (
            TaskCommand::DeleteTask { task_id: task_id() },
            is_allowed(status, TaskStatus::Deleted),
        ),
        (
            TaskCommand::ReopenTask { task_id: task_id() },
            status == TaskStatus::Completed,
        ),
        (
            TaskCommand::RestoreDeletedTask { task_id: task_id() },
            status == TaskStatus::Deleted,
        ),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn history_helper_reaches_the_requested_status(
        task_id in arb_task_id(),
        status in arb_task_status(),
    ) {
        let aggregate = TaskAggregate::replay(task_id.clone(), &history_in(&task_id, status)).unwrap();
        prop_assert_eq!(aggregate.state().status(), Some(status));
    }

    #[test]
    fn status_commands_follow_the_transition_table(
        task_id in arb_task_id(),
        status in arb_task_status(),
    ) {
        for (command, accepted) in status_commands(&task_id, status) {
            let name = taskcore::AggregateCommand::name(&command);
            let mut scenario = Scenario::for_task(task_id.clone()).given(history_in(&task_id, status));
            let before = scenario.history().len();

            let result = scenario.when(command).into_result();

            prop_assert_eq!(result.is_ok(), accepted, "{} from {}", name, status);
            if accepted {
                prop_assert!(scenario.history().len() > before);
            } else {
                prop_assert_eq!(scenario.history().len(), before);
                prop_assert_eq!(scenario.status(), Some(status));
            }
        }
    }

    #[test]
    fn priority_updates_succeed_exactly_when_editable_and_current(
        task_id in arb_task_id(),
        status in arb_task_status(),
        claimed in arb_priority(),
        new in arb_priority(),
    ) {
        let mut scenario = Scenario::for_task(task_id.clone()).given(history_in(&task_id, status));

        let result = scenario
            .when(TaskCommand::UpdateTaskPriority {
                task_id: task_id.clone(),
                previous: claimed,
                new,
            })
            .into_result();

        let current = taskcore::Priority::default();
        match result {
            Ok(events) => {
                prop_assert!(is_editable(status));
                prop_assert_eq!(claimed, current);
                prop_assert_eq!(events.len(), 1);
            }
            Err(Rejection::CannotUpdateTaskPriority { reason: UpdateRefusal::Mismatch(mismatch), .. }) => {
                prop_assert!(is_editable(status));
                prop_assert_eq!(mismatch.expected, claimed);
                prop_assert_eq!(mismatch.actual, current);
                prop_assert_eq!(mismatch.proposed_new, new);
            }
            Err(Rejection::CannotUpdateTaskPriority { reason: UpdateRefusal::Refused(refusal), .. }) => {
                prop_assert!(!is_editable(status));
                prop_assert_eq!(refusal, Refusal::NotEditable { status });
            }
            Err(other) => prop_assert!(false, "unexpected rejection {}", other),
        }
    }

    #[test]
    fn replaying_accepted_history_reproduces_live_state(
        commands in arb_command_sequence(TaskId::try_new("T1").unwrap(), 40),
    ) {
        let mut scenario = Scenario::for_task(TaskId::try_new("T1").unwrap());
        for command in commands {
            let _ = scenario.when(command).into_result();
        }

        scenario.assert_replay_matches();
    }

    #[test]
    fn persisted_records_replay_like_in_memory_events(
        commands in arb_command_sequence(TaskId::try_new("T1").unwrap(), 40),
    ) {
        let task_id = TaskId::try_new("T1").unwrap();
        let mut scenario = Scenario::for_task(task_id.clone());
        for command in commands {
            let _ = scenario.when(command).into_result();
        }

        let (task_history, _) = split_history(scenario.history());
        let records: Vec<serde_json::Value> = task_history
            .iter()
            .map(|event| serde_json::to_value(event).unwrap())
            .collect();

        let from_records = TaskAggregate::replay_records(task_id, records).unwrap();
        prop_assert_eq!(&from_records, scenario.lifecycle().task());
    }

    #[test]
    fn restore_emits_one_event_per_label(
        labels in prop::collection::btree_set("[a-z]{1,8}", 0..6),
    ) {
        let task_id = TaskId::try_new("T1").unwrap();
        let mut scenario = Scenario::for_task(task_id.clone())
            .given(history_in(&task_id, TaskStatus::Finalized));
        for label in &labels {
            scenario = scenario.given([taskcore::LabelEvent::LabelAssignedToTask {
                task_id: task_id.clone(),
                label_id: taskcore::LabelId::try_new(label.as_str()).unwrap(),
            }]);
        }
        scenario = scenario.given([TaskEvent::TaskDeleted { task_id: task_id.clone() }]);

        let events = scenario
            .when(TaskCommand::RestoreDeletedTask { task_id })
            .into_result()
            .unwrap();

        prop_assert_eq!(events.len(), labels.len() + 1);
        prop_assert_eq!(events[0].event_type(), "DeletedTaskRestored");
        let restored: Vec<String> = events[1..]
            .iter()
            .map(|event| match event {
                DomainEvent::Task(TaskEvent::LabelledTaskRestored { label_id, .. }) => label_id.to_string(),
                other => other.event_type().to_string(),
            })
            .collect();
        prop_assert_eq!(restored, labels.into_iter().collect::<Vec<_>>());
    }
}

#[test]
fn replay_rejects_events_of_another_task() {
    let mine = TaskId::try_new("T1").unwrap();
    let theirs = TaskId::try_new("T2").unwrap();
    let history = history_in(&theirs, TaskStatus::Finalized);

    let fault = Aggregate::<taskcore::TaskState>::replay(mine, &history).unwrap_err();

    insta::assert_snapshot!(
        fault.to_string(),
        @"TaskCreated at version 1 belongs to task T2, not T1"
    );
    assert_eq!(history[0].event_type(), "TaskCreated");
}
