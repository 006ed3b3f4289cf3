//! Interfaces to the collaborators surrounding the allocation core, and the messages
//! exchanged with them. All calls are synchronous and fire-and-forget.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::model::{Asset, PlatformIndex, SimTime, Task, TaskId, TaskStatus, TrackSnapshot};

/// Supplies perceived friendly assets and threat tracks.
pub trait PerceptionProvider: Send + Sync {
    /// Friendly assets perceived at `time`.
    fn perceived_assets(&self, time: SimTime) -> Vec<Asset>;

    /// Threat tracks perceived at `time`.
    fn perceived_threats(&self, time: SimTime) -> Vec<TrackSnapshot>;
}

/// Resolves local tracks.
pub trait TrackProvider: Send + Sync {
    /// Track of the target with truth name `name`.
    fn track_by_target(&self, name: &str) -> Option<TrackSnapshot>;

    /// Track with id `track_id`.
    fn track_by_id(&self, track_id: u64) -> Option<TrackSnapshot>;
}

/// Outbound message transport.
pub trait Messenger: Send + Sync {
    /// Sends a task assignment.
    fn send_assignment(&self, message: AssignmentMessage);

    /// Sends a status update.
    fn send_status(&self, message: StatusMessage);

    /// Sends a cancellation for an outstanding assignment.
    fn send_cancel(&self, message: StatusMessage);

    /// Pushes a fresh track to an assignee working on `task_id`.
    fn send_track_update(&self, assignee: PlatformIndex, task_id: TaskId, track: TrackSnapshot);
}

/// Future callbacks on the simulation clock.
pub trait Scheduler: Send + Sync {
    /// Requests `event` to be delivered back through the tasker's timer handler at `at`.
    fn schedule(&self, at: SimTime, event: TimerEvent);
}

/// Callback delivered by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    /// Periodic track push for an accepted assignment.
    TrackUpdate {
        /// Task being worked.
        task_id: TaskId,
        /// Platform working it.
        assignee: PlatformIndex,
    },
}

/// Task assignment sent from an assigner to an assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentMessage {
    /// Protocol-level assignment id.
    pub assignment_id: u64,
    /// Sending platform.
    pub assigner: PlatformIndex,
    /// Receiving platform.
    pub assignee: PlatformIndex,
    /// Task with assignment fields populated.
    pub task: Task,
    /// Assigner's track of the target, when known.
    pub track: Option<TrackSnapshot>,
    /// Comm channel used.
    pub comm_channel: String,
    /// Send time.
    pub time: SimTime,
}

/// Status report about an assignment, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Task the status refers to.
    pub task_id: TaskId,
    /// Platform that assigned the task.
    pub assigner: PlatformIndex,
    /// Platform the task was assigned to.
    pub assignee: PlatformIndex,
    /// Reported status.
    pub status: TaskStatus,
    /// Optional free-form detail.
    #[serde(default)]
    pub sub_status: Option<String>,
    /// Send time.
    pub time: SimTime,
}

impl StatusMessage {
    /// Creates a status message without sub-status.
    #[must_use]
    pub const fn new(
        task_id: TaskId,
        assigner: PlatformIndex,
        assignee: PlatformIndex,
        status: TaskStatus,
        time: SimTime,
    ) -> Self {
        Self {
            task_id,
            assigner,
            assignee,
            status,
            sub_status: None,
            time,
        }
    }

    /// Adds a sub-status.
    #[must_use]
    pub fn with_sub_status(mut self, sub_status: impl Into<String>) -> Self {
        self.sub_status = Some(sub_status.into());
        self
    }
}

/// Handles to every collaborator the tasker talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Perception source.
    pub perception: Arc<dyn PerceptionProvider>,
    /// Track lookup.
    pub tracks: Arc<dyn TrackProvider>,
    /// Message transport.
    pub messenger: Arc<dyn Messenger>,
    /// Simulation scheduler.
    pub scheduler: Arc<dyn Scheduler>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Uses one object for all four roles.
    pub fn from_world<W>(world: &Arc<W>) -> Self
    where
        W: PerceptionProvider + TrackProvider + Messenger + Scheduler + 'static,
    {
        Self {
            perception: Arc::clone(world) as Arc<dyn PerceptionProvider>,
            tracks: Arc::clone(world) as Arc<dyn TrackProvider>,
            messenger: Arc::clone(world) as Arc<dyn Messenger>,
            scheduler: Arc::clone(world) as Arc<dyn Scheduler>,
        }
    }
}
