//! Event cascade produced when a deleted task comes back.

use crate::context::LabelSetReader;
use crate::event::TaskEvent;
use crate::types::TaskId;
use tracing::debug;

/// Builds the events of a successful restore.
///
/// The first event is always [`TaskEvent::DeletedTaskRestored`], followed by
/// one [`TaskEvent::LabelledTaskRestored`] per label currently assigned, in
/// ascending label order. Whether the restore is allowed at all is decided by
/// the task aggregate before the coordinator is asked.
pub struct RestoreCascadeCoordinator<'a> {
    labels: &'a dyn LabelSetReader,
}

impl<'a> RestoreCascadeCoordinator<'a> {
    /// A coordinator reading assignments from `labels`.
    pub const fn new(labels: &'a dyn LabelSetReader) -> Self {
        Self { labels }
    }

    /// The restore cascade for `task_id`.
    pub fn restore(&self, task_id: &TaskId) -> Vec<TaskEvent> {
        let labels = self.labels.labels_of(task_id);
        debug!(task_id = %task_id, labels = labels.len(), "Restoring deleted task");

        std::iter::once(TaskEvent::DeletedTaskRestored {
            task_id: task_id.clone(),
        })
        .chain(labels.into_iter().map(|label_id| TaskEvent::LabelledTaskRestored {
            task_id: task_id.clone(),
            label_id,
        }))
        .collect()
    }
}

impl std::fmt::Debug for RestoreCascadeCoordinator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreCascadeCoordinator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoHistory;
    use crate::types::LabelId;
    use std::collections::BTreeSet;

    struct Fixed(BTreeSet<LabelId>);

    impl LabelSetReader for Fixed {
        fn labels_of(&self, _task_id: &TaskId) -> BTreeSet<LabelId> {
            self.0.clone()
        }
    }

    fn label(id: &str) -> LabelId {
        LabelId::try_new(id).unwrap()
    }

    #[test]
    fn unlabelled_task_restores_with_a_single_event() {
        let task_id = TaskId::try_new("t1").unwrap();

        let events = RestoreCascadeCoordinator::new(&NoHistory).restore(&task_id);

        assert_eq!(events, vec![TaskEvent::DeletedTaskRestored { task_id }]);
    }

    #[test]
    fn labels_follow_the_restore_in_ascending_order() {
        let task_id = TaskId::try_new("t1").unwrap();
        let labels = Fixed([label("work"), label("home"), label("errand")].into());

        let events = RestoreCascadeCoordinator::new(&labels).restore(&task_id);

        let types: Vec<_> = events
            .iter()
            .map(|event| match event {
                TaskEvent::LabelledTaskRestored { label_id, .. } => label_id.to_string(),
                other => crate::event::Event::event_type(other).to_string(),
            })
            .collect();
        assert_eq!(types, ["DeletedTaskRestored", "errand", "home", "work"]);
    }
}
