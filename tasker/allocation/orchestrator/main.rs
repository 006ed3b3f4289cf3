//! Per-cycle allocation control loop and assignment message handling.

/// Collaborator interfaces and message types.
pub mod collaborators;
/// Assignment bookkeeping.
pub mod ledger;
/// Builder.
pub mod maker;
/// Cross-cycle retention policies.
pub mod reallocation;

use std::{collections::HashSet, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_logging::LogLevel;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    allocator::Allocator,
    config::TaskerConfig,
    error::TaskerError,
    evaluator::Evaluator,
    generator::Generator,
    matrix::{Matrix, MatrixSnapshot},
    model::{Asset, AssetKey, PlatformIndex, SimTime, Task, TaskId, TaskStatus, TrackSnapshot},
    telemetry::{
        TaskerTelemetry, ASSIGNMENT_CANCELED, ASSIGNMENT_SENT, CYCLE_COMPLETED, STATUS_RECEIVED,
    },
};

use collaborators::{AssignmentMessage, Collaborators, StatusMessage, TimerEvent};
use ledger::{AssignmentKey, AssignmentLedger, PurgeReason, ReceivedTask, TransmittedTask};
use maker::QuantumTaskerBuilder;
use reallocation::{ChangeEvents, ReallocationPolicy, RetentionContext, RetentionMap};

/// Primary allocator, optionally restricted to one task type.
pub(crate) struct ScopedAllocator {
    pub(crate) allocator: Box<dyn Allocator>,
    pub(crate) task_type: Option<String>,
}

/// Strategy slots filled from configuration.
pub(crate) struct Strategies {
    pub(crate) generator: Option<Box<dyn Generator>>,
    pub(crate) evaluator: Option<Box<dyn Evaluator>>,
    pub(crate) primary: Vec<ScopedAllocator>,
    pub(crate) extra_tasks: Option<Box<dyn Allocator>>,
    pub(crate) extra_assets: Option<Box<dyn Allocator>>,
    pub(crate) policy: Box<dyn ReallocationPolicy>,
}

/// One committed (task, asset) pairing of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Task identity.
    pub task_id: TaskId,
    /// Task label for display.
    pub task: String,
    /// Asset holding the task.
    pub asset: AssetKey,
    /// Carried over from the previous cycle by the reallocation policy.
    pub held: bool,
}

/// Outcome of one `update` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Unique cycle id.
    pub cycle_id: Uuid,
    /// Sequence number, starting at 1.
    pub cycle: u64,
    /// Simulation time of the cycle.
    pub time: SimTime,
    /// Wall-clock time the cycle finished.
    pub recorded_at: DateTime<Utc>,
    /// Tasks generated.
    pub tasks: usize,
    /// Matrix assets.
    pub assets: usize,
    /// Final committed pairings.
    pub committed: Vec<Commitment>,
    /// Assignments sent this cycle.
    pub sent: Vec<AssignmentKey>,
    /// Assignments canceled this cycle.
    pub canceled: Vec<AssignmentKey>,
    /// Scored matrix.
    pub matrix: MatrixSnapshot,
}

/// Allocation orchestrator for one assigning platform.
///
/// Each [`update`](Self::update) runs the full cycle: snapshot assets and tasks, score,
/// allocate, cancel assignments that are no longer wanted, then send new ones. The only
/// state kept across cycles is the retention map and the assignment ledger.
pub struct QuantumTasker {
    owner: PlatformIndex,
    collaborators: Collaborators,
    config: TaskerConfig,
    strategies: Strategies,
    config_errors: Vec<TaskerError>,
    telemetry: Option<TaskerTelemetry>,
    matrix: Matrix,
    retention: RetentionMap,
    ledger: AssignmentLedger,
    previous_tasks: HashSet<TaskId>,
    previous_assets: HashSet<AssetKey>,
    rejection_pending: bool,
    cycles: u64,
}

impl fmt::Debug for QuantumTasker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantumTasker")
            .field("owner", &self.owner)
            .field("generator", &self.generator_name())
            .field("evaluator", &self.evaluator_name())
            .field("allocators", &self.allocator_names())
            .field("policy", &self.strategies.policy.name())
            .field("in_flight", &self.ledger.len())
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl QuantumTasker {
    /// Returns a builder.
    #[must_use]
    pub fn builder(owner: PlatformIndex, collaborators: Collaborators) -> QuantumTaskerBuilder {
        QuantumTaskerBuilder::new(owner, collaborators)
    }

    pub(crate) fn from_parts(
        owner: PlatformIndex,
        collaborators: Collaborators,
        config: TaskerConfig,
        strategies: Strategies,
        config_errors: Vec<TaskerError>,
        telemetry: Option<TaskerTelemetry>,
    ) -> Self {
        Self {
            owner,
            collaborators,
            config,
            strategies,
            config_errors,
            telemetry,
            matrix: Matrix::new(),
            retention: RetentionMap::new(),
            ledger: AssignmentLedger::default(),
            previous_tasks: HashSet::new(),
            previous_assets: HashSet::new(),
            rejection_pending: false,
            cycles: 0,
        }
    }

    /// Runs one allocation cycle at `time`.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub fn update(&mut self, time: SimTime) -> CycleReport {
        self.cycles += 1;
        let perception = Arc::clone(&self.collaborators.perception);
        let assets = self
            .config
            .asset_representation
            .expand(perception.perceived_assets(time));
        let mut threats = perception.perceived_threats(time);
        if self.config.ignore_ally_tracks {
            threats.retain(|track| !track.iff.is_ally());
        }
        let tasks = self.generate_tasks(time, &threats, &assets);
        self.matrix = Matrix::with(tasks, assets);

        let changes = ChangeEvents::between(
            &self.previous_tasks,
            &self.previous_assets,
            self.matrix.tasks(),
            self.matrix.assets(),
            self.rejection_pending,
        );
        let held = self.strategies.policy.retention_set(&RetentionContext {
            previous: &self.retention,
            ledger: &self.ledger,
            tasks: self.matrix.tasks(),
            assets: self.matrix.assets(),
            changes,
        });

        if let Some(evaluator) = &self.strategies.evaluator {
            self.matrix.update_evaluations(time, evaluator.as_ref(), &threats);
        }
        self.mask_rejected();

        let committed = self.allocate(&held);
        let retention = self.retention_of(&committed);
        let canceled = self.cancel_dropped(time, &retention);
        let sent = self.send_assignments(time, &committed);

        let report = CycleReport {
            cycle_id: Uuid::new_v4(),
            cycle: self.cycles,
            time,
            recorded_at: Utc::now(),
            tasks: self.matrix.tasks().len(),
            assets: self.matrix.assets().len(),
            committed: committed
                .iter()
                .map(|pair| Commitment {
                    task_id: self.matrix.tasks()[pair.row].id,
                    task: self.matrix.tasks()[pair.row].label(),
                    asset: self.matrix.assets()[pair.column].key(),
                    held: pair.held,
                })
                .collect(),
            sent,
            canceled,
            matrix: self.matrix.snapshot(),
        };
        self.emit(
            time,
            LogLevel::Info,
            CYCLE_COMPLETED,
            json!({
                "cycle": report.cycle,
                "recorded_at": report.recorded_at.to_rfc3339(),
                "tasks": report.tasks,
                "assets": report.assets,
                "committed": report.committed.len(),
                "sent": report.sent.len(),
                "canceled": report.canceled.len(),
            }),
        );

        let current: HashSet<TaskId> = self.matrix.tasks().iter().map(|task| task.id).collect();
        let live: HashSet<TaskId> = current.union(&self.previous_tasks).copied().collect();
        let pruned = self.ledger.prune(&live);
        if pruned > 0 {
            debug!(pruned, "ledger history of retired tasks dropped");
        }
        self.previous_tasks = current;
        self.previous_assets = self.matrix.assets().iter().map(Asset::key).collect();
        self.retention = retention;
        self.rejection_pending = false;
        report
    }

    fn generate_tasks(&self, time: SimTime, threats: &[TrackSnapshot], assets: &[Asset]) -> Vec<Task> {
        let Some(generator) = &self.strategies.generator else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        generator
            .generate_tasks(time, threats, assets)
            .into_iter()
            .filter(|task| {
                let fresh = seen.insert(task.id);
                if !fresh {
                    warn!(task = %task.id, label = %task.label(), "duplicate task id dropped");
                }
                fresh
            })
            .collect()
    }

    fn mask_rejected(&mut self) {
        let mut cells = Vec::new();
        for (row, task) in self.matrix.tasks().iter().enumerate() {
            for (column, asset) in self.matrix.assets().iter().enumerate() {
                if self.ledger.is_rejected(&(task.id, asset.platform)) {
                    cells.push((row, column));
                }
            }
        }
        for (row, column) in cells {
            self.matrix.mask(row, column);
        }
    }

    /// Seeds held pairs, then runs the primary, extra-tasks and extra-assets passes.
    fn allocate(&mut self, held: &RetentionMap) -> Vec<Pair> {
        let rows = self.matrix.tasks().len();
        let columns = self.matrix.assets().len();
        let mut state = PassState {
            committed: Vec::new(),
            task_assigned: vec![false; rows],
            asset_assigned: vec![false; columns],
        };
        for (task_id, keys) in held {
            let Some(row) = self.matrix.task_index(*task_id) else {
                continue;
            };
            for key in keys {
                if let Some(column) = self.matrix.asset_index(key) {
                    state.commit(row, column, true);
                }
            }
        }

        let matrix = &self.matrix;
        for scoped in &mut self.strategies.primary {
            let task_rows: Vec<usize> = (0..rows)
                .filter(|&row| !state.task_assigned[row])
                .filter(|&row| {
                    scoped
                        .task_type
                        .as_ref()
                        .map_or(true, |task_type| &matrix.tasks()[row].task_type == task_type)
                })
                .collect();
            let asset_columns: Vec<usize> = (0..columns).filter(|&c| !state.asset_assigned[c]).collect();
            run_pass(matrix, scoped.allocator.as_mut(), &task_rows, &asset_columns, &mut state);
        }

        if let Some(allocator) = &mut self.strategies.extra_tasks {
            let task_rows: Vec<usize> = (0..rows).filter(|&row| !state.task_assigned[row]).collect();
            let asset_columns: Vec<usize> = (0..columns).collect();
            run_pass(matrix, allocator.as_mut(), &task_rows, &asset_columns, &mut state);
        }

        if let Some(allocator) = &mut self.strategies.extra_assets {
            let task_rows: Vec<usize> = (0..rows).filter(|&row| state.task_assigned[row]).collect();
            let asset_columns: Vec<usize> = (0..columns).filter(|&c| !state.asset_assigned[c]).collect();
            run_pass(matrix, allocator.as_mut(), &task_rows, &asset_columns, &mut state);
        }

        let ledger = &self.ledger;
        state.committed.retain(|pair| {
            let key = (matrix.tasks()[pair.row].id, matrix.assets()[pair.column].platform);
            !ledger.is_rejected(&key)
        });
        state.committed
    }

    fn retention_of(&self, committed: &[Pair]) -> RetentionMap {
        let mut retention = RetentionMap::new();
        for pair in committed {
            let asset = self.matrix.assets()[pair.column].key();
            let assets = retention
                .entry(self.matrix.tasks()[pair.row].id)
                .or_default();
            if !assets.contains(&asset) {
                assets.push(asset);
            }
        }
        retention
    }

    /// Cancels every in-flight assignment whose (task, assignee) is absent from `retention`.
    fn cancel_dropped(&mut self, time: SimTime, retention: &RetentionMap) -> Vec<AssignmentKey> {
        let mut canceled = Vec::new();
        for key in self.ledger.outstanding_keys() {
            let (task_id, assignee) = key;
            let wanted = retention
                .get(&task_id)
                .is_some_and(|assets| assets.iter().any(|asset| asset.platform == assignee));
            if wanted {
                continue;
            }
            let Some(record) = self.ledger.purge(&key, PurgeReason::Canceled) else {
                continue;
            };
            self.collaborators.messenger.send_cancel(StatusMessage::new(
                task_id,
                self.owner,
                assignee,
                TaskStatus::Canceled,
                time,
            ));
            debug!(task = %task_id, %assignee, "assignment canceled");
            self.emit(
                time,
                LogLevel::Info,
                ASSIGNMENT_CANCELED,
                json!({
                    "task": task_id.to_string(),
                    "label": record.task.label(),
                    "assignee": assignee.0,
                    "assignment_id": record.assignment_id,
                }),
            );
            canceled.push(key);
        }
        canceled
    }

    fn send_assignments(&mut self, time: SimTime, committed: &[Pair]) -> Vec<AssignmentKey> {
        let mut handled = HashSet::new();
        let mut sent = Vec::new();
        for pair in committed {
            let asset = &self.matrix.assets()[pair.column];
            let mut task = self.matrix.tasks()[pair.row].clone();
            let key = (task.id, asset.platform);
            if !handled.insert(key) {
                continue;
            }
            let existing = self.ledger.in_flight(&key).cloned();
            if existing.is_some() && !self.config.update_assignments {
                continue;
            }

            if task.resource.name.is_empty() {
                if let Some(system) = asset.system_for(&task.resource) {
                    task.resource.name.clone_from(&system.name);
                }
            }
            let track = self.resolve_track(&task);
            if track.is_none() {
                debug!(task = %task.id, label = %task.label(), "no local track for assignment");
            }
            task.assigner = Some(self.owner);
            task.assignee = Some(asset.platform);
            task.status = existing.as_ref().map_or(TaskStatus::Assigned, |r| r.status);
            task.assign_time = Some(existing.as_ref().map_or(time, |r| r.sent_at));
            task.update_time = Some(time);

            let assignment_id = match &existing {
                Some(record) => record.assignment_id,
                None => self.ledger.next_assignment_id(),
            };
            self.collaborators.messenger.send_assignment(AssignmentMessage {
                assignment_id,
                assigner: self.owner,
                assignee: asset.platform,
                task: task.clone(),
                track,
                comm_channel: self.config.comm_channel.clone(),
                time,
            });
            let payload = json!({
                "task": task.id.to_string(),
                "label": task.label(),
                "assignee": asset.platform.0,
                "asset": asset.key().to_string(),
                "assignment_id": assignment_id,
                "resend": existing.is_some(),
            });
            let record = match existing {
                Some(mut record) => {
                    record.task = task;
                    record.asset = asset.key();
                    record.updated_at = time;
                    record
                }
                None => TransmittedTask {
                    assignment_id,
                    status: TaskStatus::Assigned,
                    assignee: asset.platform,
                    asset: asset.key(),
                    comm_channel: self.config.comm_channel.clone(),
                    sent_at: time,
                    updated_at: time,
                    track_updates: false,
                    task,
                },
            };
            self.ledger.record_sent(record);
            self.emit(time, LogLevel::Info, ASSIGNMENT_SENT, payload);
            sent.push(key);
        }
        sent
    }

    fn resolve_track(&self, task: &Task) -> Option<TrackSnapshot> {
        let tracks = &self.collaborators.tracks;
        task.target
            .as_deref()
            .and_then(|name| tracks.track_by_target(name))
            .or_else(|| task.track_id.and_then(|id| tracks.track_by_id(id)))
    }

    /// Handles a task assignment addressed to this platform.
    #[instrument(skip(self, message), fields(owner = %self.owner, task = %message.task.id))]
    pub fn on_task_assign_message(&mut self, time: SimTime, message: &AssignmentMessage) {
        if message.assignee != self.owner {
            warn!(assignee = %message.assignee, "assignment addressed to another platform ignored");
            return;
        }
        let accept = self.config.auto_accept_received;
        let status = if accept { TaskStatus::Accepted } else { TaskStatus::Assigned };
        let mut task = message.task.clone();
        task.status = status;
        self.ledger.record_received(ReceivedTask {
            assignment_id: message.assignment_id,
            task,
            assigner: message.assigner,
            status,
            received_at: time,
            updated_at: time,
        });
        if accept {
            self.collaborators.messenger.send_status(StatusMessage::new(
                message.task.id,
                message.assigner,
                self.owner,
                TaskStatus::Accepted,
                time,
            ));
        }
    }

    /// Handles a status message about an assignment this platform sent or received.
    #[instrument(skip(self, message), fields(owner = %self.owner, task = %message.task_id))]
    pub fn on_task_status_message(&mut self, time: SimTime, message: &StatusMessage) {
        self.emit(
            time,
            LogLevel::Debug,
            STATUS_RECEIVED,
            json!({
                "task": message.task_id.to_string(),
                "assigner": message.assigner.0,
                "assignee": message.assignee.0,
                "status": message.status,
                "sub_status": message.sub_status,
            }),
        );
        let mine = message.assigner == self.owner;
        let received = message.assignee == self.owner;
        if mine {
            self.on_transmitted_status(time, message);
        }
        if received {
            self.on_received_status(time, message);
        }
        if !mine && !received {
            warn!(
                assigner = %message.assigner,
                assignee = %message.assignee,
                "status message for another platform ignored"
            );
        }
    }

    fn on_transmitted_status(&mut self, time: SimTime, message: &StatusMessage) {
        let key = (message.task_id, message.assignee);
        let Some(record) = self.ledger.in_flight_mut(&key) else {
            match self.ledger.purge_reason(&key) {
                Some(reason) => {
                    warn!(?reason, status = ?message.status, "late or duplicate status for purged assignment");
                }
                None => warn!(status = ?message.status, assignee = %message.assignee, "status for unknown assignment"),
            }
            return;
        };
        record.updated_at = time;
        record.task.update_time = Some(time);
        record.task.sub_status.clone_from(&message.sub_status);
        match message.status {
            TaskStatus::Accepted | TaskStatus::InProgress => {
                record.status = message.status;
                record.task.status = message.status;
                let interval = self.config.track_update_interval;
                if message.status == TaskStatus::Accepted && interval > 0.0 && !record.track_updates {
                    record.track_updates = true;
                    self.collaborators.scheduler.schedule(
                        time + interval,
                        TimerEvent::TrackUpdate {
                            task_id: message.task_id,
                            assignee: message.assignee,
                        },
                    );
                }
            }
            TaskStatus::Completed => {
                self.ledger.purge(&key, PurgeReason::Completed);
                self.collaborators.messenger.send_status(StatusMessage::new(
                    message.task_id,
                    self.owner,
                    message.assignee,
                    TaskStatus::CompleteAcknowledged,
                    time,
                ));
            }
            TaskStatus::Rejected => {
                self.ledger.purge(&key, PurgeReason::Rejected);
                self.rejection_pending = true;
                debug!(assignee = %message.assignee, "assignment rejected");
            }
            TaskStatus::Canceled => {
                self.ledger.purge(&key, PurgeReason::Canceled);
            }
            TaskStatus::Unassigned | TaskStatus::Assigned | TaskStatus::CompleteAcknowledged => {
                debug!(status = ?message.status, "status not expected from an assignee");
            }
        }
    }

    fn on_received_status(&mut self, time: SimTime, message: &StatusMessage) {
        let key = (message.task_id, message.assigner);
        match message.status {
            TaskStatus::Canceled | TaskStatus::CompleteAcknowledged => {
                if self.ledger.remove_received(&key).is_none() && message.assigner != self.owner {
                    warn!(status = ?message.status, "status for unknown received assignment");
                }
            }
            _ if message.assigner == self.owner => {}
            status => match self.ledger.received_mut(&key) {
                Some(record) => {
                    record.status = status;
                    record.updated_at = time;
                }
                None => warn!(?status, "status for unknown received assignment"),
            },
        }
    }

    /// Reports progress on a received assignment back to its assigner.
    ///
    /// Returns false when no such assignment was received.
    pub fn report_received_status(
        &mut self,
        time: SimTime,
        task_id: TaskId,
        assigner: PlatformIndex,
        status: TaskStatus,
        sub_status: Option<String>,
    ) -> bool {
        let key = (task_id, assigner);
        let Some(record) = self.ledger.received_mut(&key) else {
            warn!(task = %task_id, %assigner, "no received assignment to report on");
            return false;
        };
        record.status = status;
        record.task.status = status;
        record.updated_at = time;
        let mut message = StatusMessage::new(task_id, assigner, self.owner, status, time);
        if let Some(sub_status) = sub_status {
            message = message.with_sub_status(sub_status);
        }
        self.collaborators.messenger.send_status(message);
        if matches!(status, TaskStatus::Rejected | TaskStatus::Canceled) {
            self.ledger.remove_received(&key);
        }
        true
    }

    /// Handles a callback previously requested from the scheduler.
    pub fn on_timer(&mut self, time: SimTime, event: &TimerEvent) {
        match event {
            TimerEvent::TrackUpdate { task_id, assignee } => {
                let key = (*task_id, *assignee);
                let Some(record) = self.ledger.in_flight(&key).filter(|r| r.track_updates) else {
                    debug!(task = %task_id, %assignee, "track updates stopped");
                    return;
                };
                match self.resolve_track(&record.task) {
                    Some(track) => self
                        .collaborators
                        .messenger
                        .send_track_update(*assignee, *task_id, track),
                    None => debug!(task = %task_id, "no local track to push"),
                }
                let interval = self.config.track_update_interval;
                if interval > 0.0 {
                    self.collaborators.scheduler.schedule(time + interval, event.clone());
                }
            }
        }
    }

    /// Platform this tasker assigns from.
    #[must_use]
    pub const fn owner(&self) -> PlatformIndex {
        self.owner
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TaskerConfig {
        &self.config
    }

    /// Setup errors that left strategy slots unset.
    #[must_use]
    pub fn config_errors(&self) -> &[TaskerError] {
        &self.config_errors
    }

    /// Matrix of the most recent cycle.
    #[must_use]
    pub const fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Pairs committed in the most recent cycle.
    #[must_use]
    pub const fn retention(&self) -> &RetentionMap {
        &self.retention
    }

    /// Platforms currently holding `task_id`.
    #[must_use]
    pub fn assignees_for_task(&self, task_id: TaskId) -> Vec<PlatformIndex> {
        self.ledger
            .outstanding()
            .filter(|record| record.task.id == task_id)
            .map(|record| record.assignee)
            .collect()
    }

    /// Outstanding sent assignments.
    pub fn in_flight(&self) -> impl Iterator<Item = &TransmittedTask> {
        self.ledger.outstanding()
    }

    /// Assignments received from other platforms.
    pub fn received(&self) -> impl Iterator<Item = &ReceivedTask> {
        self.ledger.received()
    }

    /// Assignment ledger.
    #[must_use]
    pub const fn ledger(&self) -> &AssignmentLedger {
        &self.ledger
    }

    /// Configured allocators, primary first, then the extra passes.
    #[must_use]
    pub fn allocator_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .strategies
            .primary
            .iter()
            .map(|scoped| match &scoped.task_type {
                Some(task_type) => format!("{} [{task_type}]", scoped.allocator.name()),
                None => scoped.allocator.name().to_owned(),
            })
            .collect();
        if let Some(allocator) = &self.strategies.extra_tasks {
            names.push(format!("{} (extra_tasks)", allocator.name()));
        }
        if let Some(allocator) = &self.strategies.extra_assets {
            names.push(format!("{} (extra_assets)", allocator.name()));
        }
        names
    }

    /// Configured evaluator.
    #[must_use]
    pub fn evaluator_name(&self) -> Option<&str> {
        self.strategies.evaluator.as_ref().map(|evaluator| evaluator.name())
    }

    /// Configured generator.
    #[must_use]
    pub fn generator_name(&self) -> Option<&str> {
        self.strategies.generator.as_ref().map(|generator| generator.name())
    }

    /// Reallocation policy name.
    #[must_use]
    pub fn reallocation_name(&self) -> &str {
        self.strategies.policy.name()
    }

    /// Number of completed cycles.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    fn emit(&self, time: SimTime, level: LogLevel, event_type: &str, payload: Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(time, level, event_type, payload.clone());
            let _ = tel.event(time, event_type, payload);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pair {
    row: usize,
    column: usize,
    held: bool,
}

struct PassState {
    committed: Vec<Pair>,
    task_assigned: Vec<bool>,
    asset_assigned: Vec<bool>,
}

impl PassState {
    fn commit(&mut self, row: usize, column: usize, held: bool) {
        if self
            .committed
            .iter()
            .any(|pair| pair.row == row && pair.column == column)
        {
            return;
        }
        self.committed.push(Pair { row, column, held });
        self.task_assigned[row] = true;
        self.asset_assigned[column] = true;
    }
}

/// Runs `allocator` on the selected rows and columns and maps results back.
fn run_pass(
    matrix: &Matrix,
    allocator: &mut dyn Allocator,
    task_rows: &[usize],
    asset_columns: &[usize],
    state: &mut PassState,
) {
    if task_rows.is_empty() || asset_columns.is_empty() {
        return;
    }
    let view = matrix.subset(task_rows, asset_columns);
    for allocation in allocator.make_allocations(&view) {
        match (task_rows.get(allocation.task), asset_columns.get(allocation.asset)) {
            (Some(&row), Some(&column)) => state.commit(row, column, false),
            _ => warn!(
                allocator = allocator.name(),
                task = allocation.task,
                asset = allocation.asset,
                "allocation outside the offered matrix ignored"
            ),
        }
    }
}
