//! Durable assignment records that outlive a single cycle.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::model::{AssetKey, PlatformIndex, SimTime, Task, TaskId, TaskStatus};

/// Ledger key: task id and the platform on the other side of the assignment.
pub type AssignmentKey = (TaskId, PlatformIndex);

/// Assignment this tasker sent and has not seen finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmittedTask {
    /// Protocol-level id.
    pub assignment_id: u64,
    /// Task as sent.
    pub task: Task,
    /// Receiving platform.
    pub assignee: PlatformIndex,
    /// Matrix asset the pairing was made with.
    pub asset: AssetKey,
    /// Comm channel the assignment went out on.
    pub comm_channel: String,
    /// Current status.
    pub status: TaskStatus,
    /// First send time.
    pub sent_at: SimTime,
    /// Last status change.
    pub updated_at: SimTime,
    /// Whether periodic track pushes are scheduled.
    pub track_updates: bool,
}

/// Assignment this tasker received from another platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedTask {
    /// Protocol-level id assigned by the sender.
    pub assignment_id: u64,
    /// Task as received.
    pub task: Task,
    /// Sending platform.
    pub assigner: PlatformIndex,
    /// Current status.
    pub status: TaskStatus,
    /// Receive time.
    pub received_at: SimTime,
    /// Last status change.
    pub updated_at: SimTime,
}

/// Why a transmitted record left the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurgeReason {
    /// Assignee completed it.
    Completed,
    /// Assignee rejected it.
    Rejected,
    /// Assigner or assignee canceled it.
    Canceled,
}

/// Outstanding assignments plus the history needed to interpret late status messages.
#[derive(Debug, Clone, Default)]
pub struct AssignmentLedger {
    next_assignment_id: u64,
    in_flight: IndexMap<AssignmentKey, TransmittedTask>,
    received: IndexMap<AssignmentKey, ReceivedTask>,
    purged: IndexMap<AssignmentKey, PurgeReason>,
    rejected: IndexSet<AssignmentKey>,
}

impl AssignmentLedger {
    /// Allocates the next protocol-level assignment id.
    pub fn next_assignment_id(&mut self) -> u64 {
        self.next_assignment_id += 1;
        self.next_assignment_id
    }

    /// Records a sent assignment, replacing any record with the same key.
    pub fn record_sent(&mut self, record: TransmittedTask) {
        let key = (record.task.id, record.assignee);
        self.purged.shift_remove(&key);
        self.in_flight.insert(key, record);
    }

    /// Outstanding record for `key`.
    #[must_use]
    pub fn in_flight(&self, key: &AssignmentKey) -> Option<&TransmittedTask> {
        self.in_flight.get(key)
    }

    /// Mutable outstanding record for `key`.
    pub fn in_flight_mut(&mut self, key: &AssignmentKey) -> Option<&mut TransmittedTask> {
        self.in_flight.get_mut(key)
    }

    /// True when `key` is outstanding.
    #[must_use]
    pub fn is_in_flight(&self, key: &AssignmentKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// All outstanding records, oldest first.
    pub fn outstanding(&self) -> impl Iterator<Item = &TransmittedTask> {
        self.in_flight.values()
    }

    /// Keys of all outstanding records.
    #[must_use]
    pub fn outstanding_keys(&self) -> Vec<AssignmentKey> {
        self.in_flight.keys().copied().collect()
    }

    /// Number of outstanding records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// True when nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Removes an outstanding record, remembering why.
    pub fn purge(&mut self, key: &AssignmentKey, reason: PurgeReason) -> Option<TransmittedTask> {
        let record = self.in_flight.shift_remove(key)?;
        self.purged.insert(*key, reason);
        if reason == PurgeReason::Rejected {
            self.rejected.insert(*key);
        }
        Some(record)
    }

    /// Why `key` was purged, if it was.
    #[must_use]
    pub fn purge_reason(&self, key: &AssignmentKey) -> Option<PurgeReason> {
        self.purged.get(key).copied()
    }

    /// True when the assignee rejected `key` at some point.
    #[must_use]
    pub fn is_rejected(&self, key: &AssignmentKey) -> bool {
        self.rejected.contains(key)
    }

    /// True when `key` was completed and acknowledged.
    #[must_use]
    pub fn is_completed(&self, key: &AssignmentKey) -> bool {
        self.purge_reason(key) == Some(PurgeReason::Completed)
    }

    /// Forgets purge history and rejections of tasks outside `live`; returns how many
    /// entries were dropped.
    pub fn prune(&mut self, live: &HashSet<TaskId>) -> usize {
        let before = self.purged.len() + self.rejected.len();
        self.purged.retain(|(task, _), _| live.contains(task));
        self.rejected.retain(|(task, _)| live.contains(task));
        before - self.purged.len() - self.rejected.len()
    }

    /// Records a received assignment, keyed by task id and assigner.
    pub fn record_received(&mut self, record: ReceivedTask) {
        self.received.insert((record.task.id, record.assigner), record);
    }

    /// Mutable received record.
    pub fn received_mut(&mut self, key: &AssignmentKey) -> Option<&mut ReceivedTask> {
        self.received.get_mut(key)
    }

    /// Drops a received record.
    pub fn remove_received(&mut self, key: &AssignmentKey) -> Option<ReceivedTask> {
        self.received.shift_remove(key)
    }

    /// All received records.
    pub fn received(&self) -> impl Iterator<Item = &ReceivedTask> {
        self.received.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResourceKind, TaskResource};

    fn record(ledger: &mut AssignmentLedger, target: &str, assignee: u64) -> AssignmentKey {
        let task = Task::new(Some(target.into()), "WEAPON", TaskResource::of(ResourceKind::Weapon));
        let key = (task.id, PlatformIndex(assignee));
        let assignment_id = ledger.next_assignment_id();
        ledger.record_sent(TransmittedTask {
            assignment_id,
            task,
            assignee: PlatformIndex(assignee),
            asset: AssetKey {
                platform: PlatformIndex(assignee),
                system: None,
            },
            comm_channel: "net".into(),
            status: TaskStatus::Assigned,
            sent_at: 0.0,
            updated_at: 0.0,
            track_updates: false,
        });
        key
    }

    #[test]
    fn purge_remembers_reason_and_rejections() {
        let mut ledger = AssignmentLedger::default();
        let a = record(&mut ledger, "a", 1);
        let b = record(&mut ledger, "b", 2);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.purge(&a, PurgeReason::Rejected).is_some());
        assert!(ledger.purge(&a, PurgeReason::Rejected).is_none());
        assert!(ledger.is_rejected(&a));
        assert!(!ledger.is_in_flight(&a));
        ledger.purge(&b, PurgeReason::Completed);
        assert!(ledger.is_completed(&b));
        assert!(ledger.is_empty());
    }

    #[test]
    fn prune_drops_history_of_tasks_no_longer_live() {
        let mut ledger = AssignmentLedger::default();
        let a = record(&mut ledger, "a", 1);
        let b = record(&mut ledger, "b", 2);
        let c = record(&mut ledger, "c", 3);
        ledger.purge(&a, PurgeReason::Rejected);
        ledger.purge(&b, PurgeReason::Completed);

        let live: HashSet<TaskId> = [b.0, c.0].into_iter().collect();
        assert_eq!(ledger.prune(&live), 2);
        assert!(!ledger.is_rejected(&a));
        assert_eq!(ledger.purge_reason(&a), None);
        assert!(ledger.is_completed(&b));
        assert!(ledger.is_in_flight(&c));
        assert_eq!(ledger.prune(&live), 0);
    }

    #[test]
    fn resending_clears_purge_history() {
        let mut ledger = AssignmentLedger::default();
        let a = record(&mut ledger, "a", 1);
        ledger.purge(&a, PurgeReason::Canceled);
        record(&mut ledger, "a", 1);
        assert_eq!(ledger.purge_reason(&a), None);
        assert_eq!(ledger.in_flight(&a).unwrap().assignment_id, 2);
    }
}
