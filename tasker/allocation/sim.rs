//! In-memory world standing in for perception, tracks, messaging and the event scheduler.
//!
//! Scenario files describe the world in TOML; assignee platforms answer assignments
//! according to a scripted behaviour.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    config::TaskerConfig,
    model::{Asset, AssetSystem, Iff, PlatformIndex, SimTime, TaskId, TaskStatus, TrackSnapshot, Vec3},
    orchestrator::collaborators::{
        AssignmentMessage, Messenger, PerceptionProvider, Scheduler, StatusMessage, TimerEvent,
        TrackProvider,
    },
};

/// How a simulated assignee answers assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeBehavior {
    /// Never answers.
    #[default]
    Silent,
    /// Accepts and keeps working.
    Accept,
    /// Rejects every assignment.
    Reject,
    /// Accepts, then reports completion this many cycles later.
    CompleteAfter(u32),
}

/// Track pushed to an assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPush {
    /// Receiving platform.
    pub assignee: PlatformIndex,
    /// Task the track belongs to.
    pub task_id: TaskId,
    /// Track sent.
    pub track: TrackSnapshot,
}

/// Message leaving the tasker, in send order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    /// Task assignment.
    Assignment(AssignmentMessage),
    /// Status report.
    Status(StatusMessage),
    /// Cancellation.
    Cancel(StatusMessage),
    /// Track push.
    TrackUpdate(TrackPush),
}

#[derive(Debug, Clone, Copy)]
struct PendingReply {
    assigner: PlatformIndex,
    accepted: bool,
    cycles: u32,
}

#[derive(Debug, Default)]
struct WorldState {
    assets: Vec<Asset>,
    threats: Vec<TrackSnapshot>,
    outbound: Vec<Outbound>,
    timers: Vec<(SimTime, TimerEvent)>,
    behaviors: IndexMap<PlatformIndex, AssigneeBehavior>,
    pending: IndexMap<(TaskId, PlatformIndex), PendingReply>,
}

/// Thread-safe in-memory world.
#[derive(Debug, Default)]
pub struct ScenarioWorld {
    state: Mutex<WorldState>,
}

impl ScenarioWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the friendly assets.
    pub fn set_assets(&self, assets: Vec<Asset>) {
        self.state.lock().assets = assets;
    }

    /// Replaces the threat tracks.
    pub fn set_threats(&self, threats: Vec<TrackSnapshot>) {
        self.state.lock().threats = threats;
    }

    /// Adds or replaces one asset platform.
    pub fn upsert_asset(&self, asset: Asset) {
        let mut state = self.state.lock();
        state.assets.retain(|existing| existing.platform != asset.platform);
        state.assets.push(asset);
    }

    /// Removes an asset platform. Returns false when it was not present.
    pub fn remove_asset(&self, platform: PlatformIndex) -> bool {
        let mut state = self.state.lock();
        let before = state.assets.len();
        state.assets.retain(|asset| asset.platform != platform);
        state.assets.len() != before
    }

    /// Adds or replaces one threat track.
    pub fn upsert_threat(&self, track: TrackSnapshot) {
        let mut state = self.state.lock();
        state.threats.retain(|existing| existing.track_id != track.track_id);
        state.threats.push(track);
    }

    /// Removes a threat by target name. Returns false when it was not present.
    pub fn remove_threat(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.threats.len();
        state
            .threats
            .retain(|track| track.target_name.as_deref() != Some(name));
        state.threats.len() != before
    }

    /// Sets how `platform` answers assignments.
    pub fn set_behavior(&self, platform: PlatformIndex, behavior: AssigneeBehavior) {
        self.state.lock().behaviors.insert(platform, behavior);
    }

    /// Everything sent so far, in order.
    #[must_use]
    pub fn outbound(&self) -> Vec<Outbound> {
        self.state.lock().outbound.clone()
    }

    /// Drains everything sent so far.
    pub fn take_outbound(&self) -> Vec<Outbound> {
        std::mem::take(&mut self.state.lock().outbound)
    }

    /// Assignment messages sent so far.
    #[must_use]
    pub fn assignments(&self) -> Vec<AssignmentMessage> {
        self.state
            .lock()
            .outbound
            .iter()
            .filter_map(|message| match message {
                Outbound::Assignment(assignment) => Some(assignment.clone()),
                _ => None,
            })
            .collect()
    }

    /// Cancellations sent so far.
    #[must_use]
    pub fn cancels(&self) -> Vec<StatusMessage> {
        self.state
            .lock()
            .outbound
            .iter()
            .filter_map(|message| match message {
                Outbound::Cancel(cancel) => Some(cancel.clone()),
                _ => None,
            })
            .collect()
    }

    /// Status messages sent so far.
    #[must_use]
    pub fn statuses(&self) -> Vec<StatusMessage> {
        self.state
            .lock()
            .outbound
            .iter()
            .filter_map(|message| match message {
                Outbound::Status(status) => Some(status.clone()),
                _ => None,
            })
            .collect()
    }

    /// Track pushes sent so far.
    #[must_use]
    pub fn track_pushes(&self) -> Vec<TrackPush> {
        self.state
            .lock()
            .outbound
            .iter()
            .filter_map(|message| match message {
                Outbound::TrackUpdate(push) => Some(push.clone()),
                _ => None,
            })
            .collect()
    }

    /// Removes and returns timer events due at or before `time`, earliest first.
    pub fn due_timers(&self, time: SimTime) -> Vec<TimerEvent> {
        let mut state = self.state.lock();
        let (mut due, later): (Vec<_>, Vec<_>) =
            state.timers.drain(..).partition(|(at, _)| *at <= time);
        state.timers = later;
        due.sort_by(|a, b| a.0.total_cmp(&b.0));
        due.into_iter().map(|(_, event)| event).collect()
    }

    /// Number of timers not yet due.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Lets every assignee with a behaviour answer its outstanding assignments.
    pub fn respond(&self, time: SimTime) -> Vec<StatusMessage> {
        let mut state = self.state.lock();
        let WorldState {
            behaviors, pending, ..
        } = &mut *state;
        let mut replies = Vec::new();
        pending.retain(|&(task_id, assignee), reply| {
            let behavior = behaviors.get(&assignee).copied().unwrap_or_default();
            let status = match behavior {
                AssigneeBehavior::Silent => return true,
                AssigneeBehavior::Reject => TaskStatus::Rejected,
                AssigneeBehavior::Accept if reply.accepted => return true,
                AssigneeBehavior::Accept => TaskStatus::Accepted,
                AssigneeBehavior::CompleteAfter(_) if !reply.accepted => TaskStatus::Accepted,
                AssigneeBehavior::CompleteAfter(cycles) => {
                    reply.cycles += 1;
                    if reply.cycles < cycles {
                        return true;
                    }
                    TaskStatus::Completed
                }
            };
            replies.push(StatusMessage::new(task_id, reply.assigner, assignee, status, time));
            reply.accepted = true;
            !status.is_terminal()
        });
        replies
    }
}

impl PerceptionProvider for ScenarioWorld {
    fn perceived_assets(&self, time: SimTime) -> Vec<Asset> {
        self.state
            .lock()
            .assets
            .iter()
            .map(|asset| Asset {
                position: asset.position + asset.velocity * (time - asset.time),
                time,
                ..asset.clone()
            })
            .collect()
    }

    fn perceived_threats(&self, time: SimTime) -> Vec<TrackSnapshot> {
        self.state
            .lock()
            .threats
            .iter()
            .map(|track| TrackSnapshot {
                position: track.extrapolate(time),
                time,
                ..track.clone()
            })
            .collect()
    }
}

impl TrackProvider for ScenarioWorld {
    fn track_by_target(&self, name: &str) -> Option<TrackSnapshot> {
        self.state
            .lock()
            .threats
            .iter()
            .find(|track| track.target_name.as_deref() == Some(name))
            .cloned()
    }

    fn track_by_id(&self, track_id: u64) -> Option<TrackSnapshot> {
        self.state
            .lock()
            .threats
            .iter()
            .find(|track| track.track_id == track_id)
            .cloned()
    }
}

impl Messenger for ScenarioWorld {
    fn send_assignment(&self, message: AssignmentMessage) {
        let mut state = self.state.lock();
        let key = (message.task.id, message.assignee);
        state.pending.entry(key).or_insert(PendingReply {
            assigner: message.assigner,
            accepted: false,
            cycles: 0,
        });
        state.outbound.push(Outbound::Assignment(message));
    }

    fn send_status(&self, message: StatusMessage) {
        let mut state = self.state.lock();
        if message.status == TaskStatus::CompleteAcknowledged {
            state.pending.shift_remove(&(message.task_id, message.assignee));
        }
        state.outbound.push(Outbound::Status(message));
    }

    fn send_cancel(&self, message: StatusMessage) {
        let mut state = self.state.lock();
        state.pending.shift_remove(&(message.task_id, message.assignee));
        state.outbound.push(Outbound::Cancel(message));
    }

    fn send_track_update(&self, assignee: PlatformIndex, task_id: TaskId, track: TrackSnapshot) {
        self.state.lock().outbound.push(Outbound::TrackUpdate(TrackPush {
            assignee,
            task_id,
            track,
        }));
    }
}

impl Scheduler for ScenarioWorld {
    fn schedule(&self, at: SimTime, event: TimerEvent) {
        self.state.lock().timers.push((at, event));
    }
}

/// Friendly platform in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAsset {
    /// Platform index.
    pub platform: u64,
    /// Platform name.
    pub name: String,
    /// Position at time zero.
    pub position: Vec3,
    /// Constant velocity.
    #[serde(default)]
    pub velocity: Vec3,
    /// Reply behaviour when assigned tasks.
    #[serde(default)]
    pub behavior: AssigneeBehavior,
    /// Systems carried.
    #[serde(default, rename = "system")]
    pub systems: Vec<AssetSystem>,
}

/// Threat track in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioThreat {
    /// Track id.
    pub track_id: u64,
    /// Target name.
    pub name: String,
    /// Position at time zero.
    pub position: Vec3,
    /// Constant velocity; omitted for tracks without a speed estimate.
    #[serde(default)]
    pub velocity: Option<Vec3>,
    /// Classification.
    #[serde(default = "hostile")]
    pub iff: Iff,
}

const fn hostile() -> Iff {
    Iff::Foe
}

/// Change applied to the world before a given cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    /// Cycle number (1-based) the change applies before.
    pub cycle: u32,
    /// Threat removed by name.
    #[serde(default)]
    pub remove_threat: Option<String>,
    /// Asset platform removed.
    #[serde(default)]
    pub remove_asset: Option<u64>,
    /// Threat added.
    #[serde(default)]
    pub add_threat: Option<ScenarioThreat>,
}

/// TOML scenario: tasker configuration plus the world it runs in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
    /// Scenario name.
    #[serde(default)]
    pub name: String,
    /// Platform the tasker runs on.
    pub owner: u64,
    /// Cycles to run when no count is given.
    #[serde(default = "default_cycles")]
    pub cycles: u32,
    /// Simulation time of the first cycle.
    #[serde(default)]
    pub start_time: SimTime,
    /// Tasker configuration.
    #[serde(default)]
    pub tasker: TaskerConfig,
    /// Friendly platforms.
    #[serde(default, rename = "asset")]
    pub assets: Vec<ScenarioAsset>,
    /// Threat tracks.
    #[serde(default, rename = "threat")]
    pub threats: Vec<ScenarioThreat>,
    /// Scripted world changes.
    #[serde(default, rename = "event")]
    pub events: Vec<ScenarioEvent>,
}

const fn default_cycles() -> u32 {
    5
}

impl ScenarioDocument {
    /// Loads a scenario from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates a scenario.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let document: Self = toml::from_str(raw)?;
        document.tasker.validate()?;
        let mut platforms = std::collections::HashSet::new();
        for asset in &document.assets {
            if !platforms.insert(asset.platform) {
                bail!("duplicate asset platform {}", asset.platform);
            }
        }
        let mut tracks = std::collections::HashSet::new();
        for threat in &document.threats {
            if !tracks.insert(threat.track_id) {
                bail!("duplicate threat track id {}", threat.track_id);
            }
        }
        if let Some(event) = document.events.iter().find(|event| event.cycle == 0) {
            bail!("scenario events are numbered from cycle 1: {event:?}");
        }
        Ok(document)
    }

    /// Builds the in-memory world described by the document.
    #[must_use]
    pub fn build_world(&self) -> ScenarioWorld {
        let world = ScenarioWorld::new();
        world.set_assets(self.assets.iter().map(ScenarioAsset::to_asset).collect());
        world.set_threats(self.threats.iter().map(ScenarioThreat::to_track).collect());
        for asset in &self.assets {
            world.set_behavior(PlatformIndex(asset.platform), asset.behavior);
        }
        world
    }
}

impl ScenarioAsset {
    /// Asset snapshot at time zero.
    #[must_use]
    pub fn to_asset(&self) -> Asset {
        self.systems.iter().cloned().fold(
            Asset::new(self.platform, self.name.clone(), self.position).with_velocity(self.velocity),
            Asset::with_system,
        )
    }
}

impl ScenarioThreat {
    /// Track snapshot at time zero.
    #[must_use]
    pub fn to_track(&self) -> TrackSnapshot {
        let track = TrackSnapshot::located(self.track_id, self.name.clone(), 0.0, self.position)
            .with_iff(self.iff);
        match self.velocity {
            Some(velocity) => track.with_velocity(velocity),
            None => track,
        }
    }
}

impl ScenarioEvent {
    /// Applies the change to `world`.
    pub fn apply(&self, world: &ScenarioWorld) {
        if let Some(name) = &self.remove_threat {
            world.remove_threat(name);
        }
        if let Some(platform) = self.remove_asset {
            world.remove_asset(PlatformIndex(platform));
        }
        if let Some(threat) = &self.add_threat {
            world.upsert_threat(threat.to_track());
        }
    }
}
