//! Policies deciding which previously committed pairs are held fixed in a new cycle.
//!
//! Held pairs are taken out of the allocation pool; every other (task, asset) pair is
//! eligible for the allocators.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ledger::AssignmentLedger;
use crate::model::{Asset, AssetKey, Task, TaskId};

/// Committed pairs: task id to the assets holding it.
pub type RetentionMap = IndexMap<TaskId, Vec<AssetKey>>;

/// Selectable reallocation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReallocationStrategy {
    /// Committed pairs are never reallocated.
    #[default]
    Static,
    /// Everything is reallocated every cycle.
    Dynamic,
    /// Only rejected or canceled pairs are reallocated.
    Response,
    /// Full reallocation on task growth, asset loss or rejection; static otherwise.
    Event,
}

impl ReallocationStrategy {
    /// Policy object implementing the strategy.
    #[must_use]
    pub fn policy(self) -> Box<dyn ReallocationPolicy> {
        match self {
            Self::Static => Box::new(StaticPolicy),
            Self::Dynamic => Box::new(DynamicPolicy),
            Self::Response => Box::new(ResponsePolicy),
            Self::Event => Box::new(EventPolicy),
        }
    }
}

/// What changed since the previous cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvents {
    /// A task id appeared that was not generated last cycle.
    pub tasks_added: bool,
    /// An asset perceived last cycle is gone.
    pub assets_lost: bool,
    /// An assignee rejected a task since the last cycle.
    pub rejection: bool,
}

impl ChangeEvents {
    /// Compares this cycle's task ids and asset keys with the previous cycle's.
    #[must_use]
    pub fn between(
        previous_tasks: &HashSet<TaskId>,
        previous_assets: &HashSet<AssetKey>,
        tasks: &[Task],
        assets: &[Asset],
        rejection: bool,
    ) -> Self {
        let current_assets: HashSet<AssetKey> = assets.iter().map(Asset::key).collect();
        Self {
            tasks_added: tasks.iter().any(|task| !previous_tasks.contains(&task.id)),
            assets_lost: previous_assets.iter().any(|key| !current_assets.contains(key)),
            rejection,
        }
    }

    /// True when any event occurred.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.tasks_added || self.assets_lost || self.rejection
    }
}

/// Inputs available to a policy.
#[derive(Debug, Clone, Copy)]
pub struct RetentionContext<'a> {
    /// Pairs committed last cycle.
    pub previous: &'a RetentionMap,
    /// Assignment records.
    pub ledger: &'a AssignmentLedger,
    /// This cycle's tasks.
    pub tasks: &'a [Task],
    /// This cycle's assets.
    pub assets: &'a [Asset],
    /// Changes since the previous cycle.
    pub changes: ChangeEvents,
}

impl RetentionContext<'_> {
    /// Previous pairs whose task and asset still exist and that were neither rejected nor
    /// completed.
    fn surviving(&self, extra: impl Fn(&AssetKey, TaskId) -> bool) -> RetentionMap {
        let task_ids: HashSet<TaskId> = self.tasks.iter().map(|task| task.id).collect();
        let asset_keys: HashSet<AssetKey> = self.assets.iter().map(Asset::key).collect();
        let mut held = RetentionMap::new();
        for (task, assets) in self.previous {
            if !task_ids.contains(task) {
                continue;
            }
            let kept: Vec<AssetKey> = assets
                .iter()
                .filter(|asset| asset_keys.contains(*asset))
                .filter(|asset| {
                    let key = (*task, asset.platform);
                    !self.ledger.is_rejected(&key) && !self.ledger.is_completed(&key)
                })
                .filter(|asset| extra(*asset, *task))
                .cloned()
                .collect();
            if !kept.is_empty() {
                held.insert(*task, kept);
            }
        }
        held
    }
}

/// Chooses the pairs held fixed this cycle.
pub trait ReallocationPolicy: Send + Sync {
    /// Strategy name.
    fn name(&self) -> &str;

    /// Pairs carried over unchanged; all others are open to allocation.
    fn retention_set(&self, context: &RetentionContext<'_>) -> RetentionMap;
}

/// Holds every surviving committed pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPolicy;

impl ReallocationPolicy for StaticPolicy {
    fn name(&self) -> &str {
        "static"
    }

    fn retention_set(&self, context: &RetentionContext<'_>) -> RetentionMap {
        context.surviving(|_, _| true)
    }
}

/// Holds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicPolicy;

impl ReallocationPolicy for DynamicPolicy {
    fn name(&self) -> &str {
        "dynamic"
    }

    fn retention_set(&self, _: &RetentionContext<'_>) -> RetentionMap {
        RetentionMap::new()
    }
}

/// Holds surviving pairs that are still outstanding; rejected or canceled ones reopen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsePolicy;

impl ReallocationPolicy for ResponsePolicy {
    fn name(&self) -> &str {
        "response"
    }

    fn retention_set(&self, context: &RetentionContext<'_>) -> RetentionMap {
        context.surviving(|asset, task| context.ledger.is_in_flight(&(task, asset.platform)))
    }
}

/// Static until something changes, then a full reallocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventPolicy;

impl ReallocationPolicy for EventPolicy {
    fn name(&self) -> &str {
        "event"
    }

    fn retention_set(&self, context: &RetentionContext<'_>) -> RetentionMap {
        if context.changes.any() {
            RetentionMap::new()
        } else {
            StaticPolicy.retention_set(context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{PlatformIndex, ResourceKind, TaskResource, TaskStatus, Vec3},
        orchestrator::ledger::{PurgeReason, TransmittedTask},
    };

    struct Fixture {
        tasks: Vec<Task>,
        assets: Vec<Asset>,
        previous: RetentionMap,
        ledger: AssignmentLedger,
    }

    fn fixture() -> Fixture {
        let tasks: Vec<Task> = ["a", "b"]
            .iter()
            .map(|name| Task::new(Some((*name).into()), "WEAPON", TaskResource::of(ResourceKind::Weapon)))
            .collect();
        let assets = vec![Asset::new(1, "one", Vec3::ZERO), Asset::new(2, "two", Vec3::ZERO)];
        let mut previous = RetentionMap::new();
        previous.insert(tasks[0].id, vec![assets[0].key()]);
        previous.insert(tasks[1].id, vec![assets[1].key()]);
        let mut ledger = AssignmentLedger::default();
        for (task, asset) in tasks.iter().zip(&assets) {
            let assignment_id = ledger.next_assignment_id();
            ledger.record_sent(TransmittedTask {
                assignment_id,
                task: task.clone(),
                assignee: asset.platform,
                asset: asset.key(),
                comm_channel: String::new(),
                status: TaskStatus::Assigned,
                sent_at: 0.0,
                updated_at: 0.0,
                track_updates: false,
            });
        }
        Fixture {
            tasks,
            assets,
            previous,
            ledger,
        }
    }

    fn context<'a>(fixture: &'a Fixture, changes: ChangeEvents) -> RetentionContext<'a> {
        RetentionContext {
            previous: &fixture.previous,
            ledger: &fixture.ledger,
            tasks: &fixture.tasks,
            assets: &fixture.assets,
            changes,
        }
    }

    #[test]
    fn static_holds_surviving_pairs() {
        let mut fixture = fixture();
        let held = StaticPolicy.retention_set(&context(&fixture, ChangeEvents::default()));
        assert_eq!(held, fixture.previous);

        fixture.assets.remove(1);
        let held = StaticPolicy.retention_set(&context(&fixture, ChangeEvents::default()));
        assert_eq!(held.len(), 1);
        assert!(held.contains_key(&fixture.tasks[0].id));
    }

    #[test]
    fn static_releases_rejected_pairs() {
        let mut fixture = fixture();
        let key = (fixture.tasks[0].id, PlatformIndex(1));
        fixture.ledger.purge(&key, PurgeReason::Rejected);
        let held = StaticPolicy.retention_set(&context(&fixture, ChangeEvents::default()));
        assert!(!held.contains_key(&fixture.tasks[0].id));
    }

    #[test]
    fn response_releases_canceled_pairs_static_does_not() {
        let mut fixture = fixture();
        let key = (fixture.tasks[1].id, PlatformIndex(2));
        fixture.ledger.purge(&key, PurgeReason::Canceled);
        let response = ResponsePolicy.retention_set(&context(&fixture, ChangeEvents::default()));
        assert_eq!(response.len(), 1);
        let fixed = StaticPolicy.retention_set(&context(&fixture, ChangeEvents::default()));
        assert_eq!(fixed.len(), 2);
    }

    #[test]
    fn dynamic_holds_nothing() {
        let fixture = fixture();
        assert!(DynamicPolicy
            .retention_set(&context(&fixture, ChangeEvents::default()))
            .is_empty());
    }

    #[test]
    fn event_reallocates_only_on_change() {
        let fixture = fixture();
        let quiet = EventPolicy.retention_set(&context(&fixture, ChangeEvents::default()));
        assert_eq!(quiet.len(), 2);
        let changes = ChangeEvents {
            rejection: true,
            ..ChangeEvents::default()
        };
        assert!(EventPolicy.retention_set(&context(&fixture, changes)).is_empty());
    }

    #[test]
    fn change_detection() {
        let fixture = fixture();
        let previous_tasks: HashSet<TaskId> = std::iter::once(fixture.tasks[0].id).collect();
        let previous_assets: HashSet<AssetKey> = fixture.assets.iter().map(Asset::key).collect();
        let changes = ChangeEvents::between(
            &previous_tasks,
            &previous_assets,
            &fixture.tasks,
            &fixture.assets[..1],
            false,
        );
        assert!(changes.tasks_added);
        assert!(changes.assets_lost);
        assert!(!changes.rejection);
    }
}
