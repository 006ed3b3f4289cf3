//! Scenario runtime driving a tasker against the in-memory world.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;
use tracing::info;

use crate::{
    model::{PlatformIndex, SimTime},
    orchestrator::{collaborators::Collaborators, CycleReport, QuantumTasker},
    registry::StrategyRegistry,
    script::ScriptScope,
    sim::{ScenarioDocument, ScenarioEvent, ScenarioWorld},
    telemetry::TaskerTelemetry,
};

/// Optional extensions applied when a runtime is created.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    registry: Option<Arc<StrategyRegistry>>,
    scope: Option<Arc<ScriptScope>>,
    telemetry: Option<TaskerTelemetry>,
}

impl RuntimeOptions {
    /// Uses a custom registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<StrategyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Provides script functions for `custom` strategies.
    #[must_use]
    pub fn script_scope(mut self, scope: Arc<ScriptScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TaskerTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
}

/// Totals over a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Cycles run.
    pub cycles: u64,
    /// Time of the next cycle.
    pub next_time: SimTime,
    /// Assignment messages sent.
    pub assignments_sent: usize,
    /// Cancellations sent.
    pub cancels_sent: usize,
    /// Status messages sent.
    pub statuses_sent: usize,
    /// Outstanding assignments as (task label, assignee).
    pub in_flight: Vec<(String, PlatformIndex)>,
    /// Strategy setup errors.
    pub config_errors: Vec<String>,
}

/// Tasker wired to a scenario world, advancing on a fixed update interval.
///
/// Each step applies scripted world changes, fires due timers, runs one update and then
/// feeds the assignees' replies back to the tasker.
#[derive(Debug)]
pub struct TaskerRuntime {
    name: String,
    world: Arc<ScenarioWorld>,
    tasker: QuantumTasker,
    events: Vec<ScenarioEvent>,
    time: SimTime,
    interval: f64,
    step: u32,
    telemetry: Option<TaskerTelemetry>,
}

impl TaskerRuntime {
    /// Creates a runtime with the built-in strategies.
    #[must_use]
    pub fn new(document: ScenarioDocument) -> Self {
        Self::with_options(document, RuntimeOptions::default())
    }

    /// Creates a runtime with extensions.
    #[must_use]
    pub fn with_options(document: ScenarioDocument, options: RuntimeOptions) -> Self {
        let world = Arc::new(document.build_world());
        let mut builder =
            QuantumTasker::builder(PlatformIndex(document.owner), Collaborators::from_world(&world))
                .config(document.tasker.clone());
        if let Some(registry) = options.registry {
            builder = builder.registry(registry);
        }
        if let Some(scope) = options.scope {
            builder = builder.script_scope(scope);
        }
        if let Some(tel) = &options.telemetry {
            builder = builder.telemetry(tel.clone());
        }
        Self {
            name: document.name,
            world,
            tasker: builder.build(),
            events: document.events,
            time: document.start_time,
            interval: document.tasker.update_interval,
            step: 0,
            telemetry: options.telemetry,
        }
    }

    /// Runs one cycle.
    pub fn step(&mut self) -> CycleReport {
        self.step += 1;
        let time = self.time;
        for event in self.events.iter().filter(|event| event.cycle == self.step) {
            event.apply(&self.world);
        }
        for timer in self.world.due_timers(time) {
            self.tasker.on_timer(time, &timer);
        }
        let report = self.tasker.update(time);
        for reply in self.world.respond(time) {
            self.tasker.on_task_status_message(time, &reply);
        }
        info!(
            cycle = report.cycle,
            time,
            committed = report.committed.len(),
            sent = report.sent.len(),
            canceled = report.canceled.len(),
            "cycle finished"
        );
        self.time += self.interval;
        report
    }

    /// Runs `cycles` cycles.
    pub fn run(&mut self, cycles: u32) -> Vec<CycleReport> {
        let reports: Vec<_> = (0..cycles).map(|_| self.step()).collect();
        if let Some(tel) = &self.telemetry {
            let summary = self.summary();
            let _ = tel.log(
                self.time,
                LogLevel::Info,
                "tasker.run.finished",
                json!({
                    "scenario": summary.scenario,
                    "cycles": summary.cycles,
                    "assignments": summary.assignments_sent,
                    "cancels": summary.cancels_sent,
                }),
            );
        }
        reports
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            scenario: self.name.clone(),
            cycles: self.tasker.cycles(),
            next_time: self.time,
            assignments_sent: self.world.assignments().len(),
            cancels_sent: self.world.cancels().len(),
            statuses_sent: self.world.statuses().len(),
            in_flight: self
                .tasker
                .in_flight()
                .map(|record| (record.task.label(), record.assignee))
                .collect(),
            config_errors: self
                .tasker
                .config_errors()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// The tasker.
    #[must_use]
    pub const fn tasker(&self) -> &QuantumTasker {
        &self.tasker
    }

    /// The world.
    #[must_use]
    pub const fn world(&self) -> &Arc<ScenarioWorld> {
        &self.world
    }

    /// Time of the next cycle.
    #[must_use]
    pub const fn time(&self) -> SimTime {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_logging::MemoryLogger;

    const SCENARIO: &str = r#"
name = "strike"
owner = 100

[tasker]
generator = "simple_weapon"
evaluator = "distance"
track_update_interval = 2.0

[[tasker.allocator]]
strategy = "optimal_profit"

[[asset]]
platform = 1
name = "falcon-1"
position = { x = 0.0, y = 0.0, z = 0.0 }
behavior = { complete_after = 3 }

[[asset.system]]
kind = "weapon"
name = "aim-120"

[[asset]]
platform = 2
name = "falcon-2"
position = { x = 5000.0, y = 0.0, z = 0.0 }
behavior = "reject"

[[threat]]
track_id = 11
name = "bogey-1"
position = { x = 100.0, y = 0.0, z = 0.0 }

[[threat]]
track_id = 12
name = "bogey-2"
position = { x = 4900.0, y = 0.0, z = 0.0 }

[[event]]
cycle = 3
remove_threat = "bogey-2"
"#;

    #[test]
    fn runs_a_scenario_end_to_end() {
        let document = ScenarioDocument::from_toml_str(SCENARIO).unwrap();
        let memory = Arc::new(MemoryLogger::new(64));
        let telemetry = TaskerTelemetry::builder("tasker")
            .memory_sink(memory.clone())
            .build()
            .unwrap();
        let mut runtime = TaskerRuntime::with_options(document, RuntimeOptions::default().telemetry(telemetry));

        let first = runtime.step();
        assert_eq!(first.sent.len(), 2);
        // falcon-2 rejected bogey-2; the only remaining asset is busy under static retention.
        let second = runtime.step();
        assert!(second.sent.is_empty());
        assert_eq!(second.committed.len(), 1);

        let reports = runtime.run(3);
        assert_eq!(reports.len(), 3);
        let summary = runtime.summary();
        assert_eq!(summary.cycles, 5);
        assert!((summary.next_time - 5.0).abs() < f64::EPSILON);
        assert!(summary.config_errors.is_empty());
        assert!(runtime
            .world()
            .statuses()
            .iter()
            .any(|status| status.status == crate::model::TaskStatus::CompleteAcknowledged));
        assert!(!runtime.world().track_pushes().is_empty());
        assert!(memory
            .snapshot()
            .iter()
            .any(|record| record.message == "tasker.run.finished"));
    }

    #[test]
    fn bundled_demo_runs_clean() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/strike.toml");
        let document = ScenarioDocument::load(path).unwrap();
        let cycles = document.cycles;
        assert_eq!(document.assets.len(), 3);
        assert_eq!(document.threats.len(), 3);
        let mut runtime = TaskerRuntime::new(document);
        runtime.run(cycles);
        let summary = runtime.summary();
        assert_eq!(summary.cycles, u64::from(cycles));
        assert!(summary.config_errors.is_empty());
        assert_eq!(runtime.tasker().reallocation_name(), "response");
    }
}
