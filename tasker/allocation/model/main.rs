//! Value types flowing through one allocation cycle: assets, tasks and their identities.

/// Task resource descriptors and matching.
pub mod resource;
/// Track snapshots and geometry.
pub mod track;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use resource::{ResourceDetail, ResourceKind, TaskResource};
pub use track::{Iff, TrackSnapshot, Vec3};

/// Simulation time in seconds.
pub type SimTime = f64;

/// Index of a platform in the surrounding simulation. Stable for the platform's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformIndex(pub u64);

impl fmt::Display for PlatformIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sub-resource of an asset platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSystem {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Type name (e.g. `AIM-120`).
    #[serde(default)]
    pub type_name: String,
    /// Instance name on the platform.
    pub name: String,
    /// Remaining channel count.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Remaining quantity (rounds, power, ...).
    #[serde(default)]
    pub quantity: f64,
}

const fn default_capacity() -> u32 {
    1
}

impl AssetSystem {
    /// Creates a system with one channel and no quantity.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            type_name: String::new(),
            name: name.into(),
            capacity: 1,
            quantity: 0.0,
        }
    }

    /// Sets capacity and quantity.
    #[must_use]
    pub const fn with_stock(mut self, capacity: u32, quantity: f64) -> Self {
        self.capacity = capacity;
        self.quantity = quantity;
        self
    }

    /// The resource this system provides.
    #[must_use]
    pub fn as_resource(&self) -> TaskResource {
        TaskResource::of(self.kind).named(self.name.clone())
    }
}

/// Identity of an asset across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    /// Owning platform.
    pub platform: PlatformIndex,
    /// System (and unit) qualifier for finer-grained representations.
    pub system: Option<String>,
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.system {
            Some(system) => write!(f, "{}/{system}", self.platform),
            None => write!(f, "{}", self.platform),
        }
    }
}

/// Perceived friendly resource snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Platform index.
    pub platform: PlatformIndex,
    /// Platform name.
    pub name: String,
    /// Qualifier set when the asset stands for a single system or unit.
    #[serde(default)]
    pub system: Option<String>,
    /// Snapshot time.
    #[serde(default)]
    pub time: SimTime,
    /// Location.
    #[serde(default)]
    pub position: Vec3,
    /// Velocity.
    #[serde(default)]
    pub velocity: Vec3,
    /// Heading, pitch and roll in radians.
    #[serde(default)]
    pub orientation: Vec3,
    /// Systems available on the asset.
    #[serde(default)]
    pub systems: Vec<AssetSystem>,
}

impl Asset {
    /// Creates a stationary asset at `position`.
    #[must_use]
    pub fn new(platform: u64, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            platform: PlatformIndex(platform),
            name: name.into(),
            system: None,
            time: 0.0,
            position,
            velocity: Vec3::ZERO,
            orientation: Vec3::ZERO,
            systems: Vec::new(),
        }
    }

    /// Adds a system.
    #[must_use]
    pub fn with_system(mut self, system: AssetSystem) -> Self {
        self.systems.push(system);
        self
    }

    /// Sets velocity.
    #[must_use]
    pub const fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Identity used to match this asset across cycles.
    #[must_use]
    pub fn key(&self) -> AssetKey {
        AssetKey {
            platform: self.platform,
            system: self.system.clone(),
        }
    }

    /// Current speed.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// First system able to serve `resource`, preferring systems with channels left.
    #[must_use]
    pub fn system_for(&self, resource: &TaskResource) -> Option<&AssetSystem> {
        let mut candidates = self
            .systems
            .iter()
            .filter(|system| resource.is_match(&system.as_resource()));
        let first = candidates.clone().next();
        candidates.find(|system| system.capacity > 0).or(first)
    }
}

/// Granularity at which perceived assets are entered into the matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRepresentation {
    /// One asset per platform.
    #[default]
    Platform,
    /// One asset per system.
    Systems,
    /// One asset per remaining channel of every system.
    Resources,
}

impl AssetRepresentation {
    /// Splits platform snapshots into matrix assets.
    #[must_use]
    pub fn expand(self, assets: Vec<Asset>) -> Vec<Asset> {
        match self {
            Self::Platform => assets,
            Self::Systems => assets
                .into_iter()
                .flat_map(|asset| {
                    asset
                        .systems
                        .iter()
                        .map(|system| single_system(&asset, system, system.name.clone()))
                        .collect::<Vec<_>>()
                })
                .collect(),
            Self::Resources => assets
                .into_iter()
                .flat_map(|asset| {
                    asset
                        .systems
                        .iter()
                        .flat_map(|system| {
                            (0..system.capacity).map(|unit| {
                                single_system(&asset, system, format!("{}#{unit}", system.name))
                            })
                        })
                        .collect::<Vec<_>>()
                })
                .collect(),
        }
    }
}

fn single_system(asset: &Asset, system: &AssetSystem, qualifier: String) -> Asset {
    Asset {
        system: Some(qualifier),
        systems: vec![system.clone()],
        ..asset.clone()
    }
}

/// Deterministic task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Derives the default id from (target name, task type, resource kind).
    ///
    /// 64-bit FNV-1a over the three fields. Distinct tasks can still collide, in which
    /// case they are indistinguishable to the tasker.
    #[must_use]
    pub fn derive(target: Option<&str>, task_type: &str, kind: ResourceKind) -> Self {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        let mut hash = OFFSET;
        let mut feed = |bytes: &[u8]| {
            for &byte in bytes {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(PRIME);
            }
        };
        feed(target.unwrap_or("").as_bytes());
        feed(&[0xff]);
        feed(task_type.as_bytes());
        feed(&[0xff, kind.code()]);
        Self(hash)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Assignment status of a task, shared by assigner records and status messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet sent.
    #[default]
    Unassigned,
    /// Sent to the assignee.
    Assigned,
    /// Assignee accepted.
    Accepted,
    /// Assignee is working on it.
    InProgress,
    /// Assignee finished.
    Completed,
    /// Assignee refused.
    Rejected,
    /// Assigner withdrew it.
    Canceled,
    /// Assigner acknowledged completion.
    CompleteAcknowledged,
}

impl TaskStatus {
    /// Statuses after which the assignment is no longer in flight.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Rejected | Self::Canceled | Self::CompleteAcknowledged
        )
    }
}

/// Unit of work generated against a perceived threat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id, derived unless overridden.
    pub id: TaskId,
    /// Target truth name; anonymous tasks have none.
    #[serde(default)]
    pub target: Option<String>,
    /// Track id the task was generated from, when known.
    #[serde(default)]
    pub track_id: Option<u64>,
    /// Task type label (e.g. `WEAPON`).
    pub task_type: String,
    /// Required resource.
    pub resource: TaskResource,
    /// Priority multiplier applied to evaluator scores.
    pub priority: f64,
    /// Platform that assigned the task.
    #[serde(default)]
    pub assigner: Option<PlatformIndex>,
    /// Platform the task is assigned to.
    #[serde(default)]
    pub assignee: Option<PlatformIndex>,
    /// Assignment status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Free-form sub-status reported by the assignee.
    #[serde(default)]
    pub sub_status: Option<String>,
    /// Time of assignment.
    #[serde(default)]
    pub assign_time: Option<SimTime>,
    /// Time of the last status change.
    #[serde(default)]
    pub update_time: Option<SimTime>,
}

impl Task {
    /// Creates a task with priority 1 and a derived id.
    #[must_use]
    pub fn new(target: Option<String>, task_type: impl Into<String>, resource: TaskResource) -> Self {
        let task_type = task_type.into();
        Self {
            id: TaskId::derive(target.as_deref(), &task_type, resource.kind),
            target,
            track_id: None,
            task_type,
            resource,
            priority: 1.0,
            assigner: None,
            assignee: None,
            status: TaskStatus::Unassigned,
            sub_status: None,
            assign_time: None,
            update_time: None,
        }
    }

    /// Creates the default task for a threat track and resource.
    #[must_use]
    pub fn against(track: &TrackSnapshot, resource: TaskResource) -> Self {
        let task_type = resource.kind.task_type();
        let mut task = Self::new(Some(track.label()), task_type, resource);
        task.track_id = Some(track.track_id);
        task
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Overrides the derived id.
    #[must_use]
    pub const fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Short human-readable label.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}:{}",
            self.task_type,
            self.target.as_deref().unwrap_or("<anonymous>")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_deterministic_and_field_sensitive() {
        let a = TaskId::derive(Some("bandit-1"), "WEAPON", ResourceKind::Weapon);
        assert_eq!(a, TaskId::derive(Some("bandit-1"), "WEAPON", ResourceKind::Weapon));
        assert_ne!(a, TaskId::derive(Some("bandit-1"), "WEAPON", ResourceKind::Jammer));
        assert_ne!(a, TaskId::derive(Some("bandit-2"), "WEAPON", ResourceKind::Weapon));
        assert_ne!(a, TaskId::derive(None, "WEAPON", ResourceKind::Weapon));
    }

    #[test]
    fn systems_representation_splits_platforms() {
        let asset = Asset::new(4, "f16", Vec3::ZERO)
            .with_system(AssetSystem::new(ResourceKind::Weapon, "aim120").with_stock(2, 4.0))
            .with_system(AssetSystem::new(ResourceKind::Sensor, "apg68"));
        let systems = AssetRepresentation::Systems.expand(vec![asset.clone()]);
        assert_eq!(systems.len(), 2);
        assert_eq!(systems[0].key().system.as_deref(), Some("aim120"));
        assert_eq!(systems[1].systems.len(), 1);

        let units = AssetRepresentation::Resources.expand(vec![asset]);
        assert_eq!(units.len(), 3);
        assert_eq!(units[1].key().system.as_deref(), Some("aim120#1"));
        assert!(units.iter().all(|unit| unit.platform == PlatformIndex(4)));
    }

    #[test]
    fn system_lookup_prefers_remaining_capacity() {
        let asset = Asset::new(1, "p", Vec3::ZERO)
            .with_system(AssetSystem::new(ResourceKind::Weapon, "empty").with_stock(0, 0.0))
            .with_system(AssetSystem::new(ResourceKind::Weapon, "loaded").with_stock(1, 2.0));
        let system = asset.system_for(&TaskResource::weapon(1)).unwrap();
        assert_eq!(system.name, "loaded");
        assert!(asset.system_for(&TaskResource::of(ResourceKind::Jammer)).is_none());
    }
}
