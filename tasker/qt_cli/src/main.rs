use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use quantum_tasker::{
    CycleReport, RunSummary, RuntimeOptions, ScenarioDocument, StrategyRegistry, TaskerRuntime,
    TaskerTelemetry,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_event_bus::{EventPublisher, EventRecord, FileEventPublisher};
use shared_logging::{JsonLogger, LogLevel, LogRecord, LogSink};
use tokio::runtime::Runtime;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "qtask", version, about = "Quantum tasker scenario runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a scenario through the tasker.
    Run(RunArgs),
    /// Parses a scenario and reports what it contains.
    Validate {
        scenario: PathBuf,
    },
    /// Lists the built-in strategies.
    Registry,
    /// Lists recent runs.
    History {
        /// Number of entries to display.
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "logs/qtask/runs.jsonl")]
        manifest: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    scenario: PathBuf,
    /// Overrides the scenario's cycle count.
    #[arg(long)]
    cycles: Option<u32>,
    /// JSON-lines tasker log.
    #[arg(long)]
    log: Option<PathBuf>,
    /// JSON-lines event log.
    #[arg(long)]
    event_log: Option<PathBuf>,
    /// Writes every cycle report as a JSON line.
    #[arg(long)]
    reports: Option<PathBuf>,
    #[arg(long, default_value = "logs/qtask/runs.jsonl")]
    manifest: PathBuf,
    /// Prints the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct RunManifestEntry {
    run_id: String,
    started_at: DateTime<Utc>,
    scenario: PathBuf,
    cycles: u32,
    status: String,
    #[serde(default)]
    summary: Option<RunSummary>,
}

impl RunManifestEntry {
    fn new(scenario: PathBuf, cycles: u32) -> Self {
        Self {
            run_id: format!("run-{}", Uuid::new_v4()),
            started_at: Utc::now(),
            scenario,
            cycles,
            status: "running".into(),
            summary: None,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(args),
        Commands::Validate { scenario } => handle_validate(&scenario),
        Commands::Registry => {
            let registry = StrategyRegistry::with_builtins();
            println!("generators: {}", registry.generator_names().join(", "));
            println!("evaluators: {}", registry.evaluator_names().join(", "));
            println!("allocators: {}", registry.allocator_names().join(", "));
            Ok(())
        }
        Commands::History { limit, manifest } => {
            for entry in read_manifest(&manifest)?.into_iter().rev().take(limit) {
                let sent = entry
                    .summary
                    .as_ref()
                    .map_or(0, |summary| summary.assignments_sent);
                println!(
                    "{} | {} | {} | {} cycles | {} sent | {}",
                    entry.run_id,
                    entry.scenario.display(),
                    entry.status,
                    entry.cycles,
                    sent,
                    entry.started_at
                );
            }
            Ok(())
        }
    }
}

fn handle_validate(path: &Path) -> Result<()> {
    let document = ScenarioDocument::load(path)?;
    let runtime = TaskerRuntime::new(document.clone());
    let tasker = runtime.tasker();
    println!(
        "{}: owner {} | {} assets | {} threats | {} events | {} cycles",
        document.name,
        document.owner,
        document.assets.len(),
        document.threats.len(),
        document.events.len(),
        document.cycles
    );
    println!(
        "generator: {} | evaluator: {} | reallocation: {}",
        tasker.generator_name().unwrap_or("-"),
        tasker.evaluator_name().unwrap_or("-"),
        tasker.reallocation_name()
    );
    println!("allocators: {}", tasker.allocator_names().join(", "));
    let errors = tasker.config_errors();
    anyhow::ensure!(
        errors.is_empty(),
        "{} strategy slot(s) could not be created: {}",
        errors.len(),
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    );
    Ok(())
}

fn handle_run(args: RunArgs) -> Result<()> {
    let document = ScenarioDocument::load(&args.scenario)?;
    let cycles = args.cycles.unwrap_or(document.cycles);
    let mut entry = RunManifestEntry::new(args.scenario.clone(), cycles);
    append_manifest(&args.manifest, &entry)?;

    let event_sink = args.event_log.as_deref().map(EventSink::new).transpose()?;
    let run_log = args
        .log
        .as_deref()
        .map(JsonLogger::new)
        .transpose()?
        .map(Arc::new);

    let mut options = RuntimeOptions::default();
    if run_log.is_some() || event_sink.is_some() {
        let mut builder = TaskerTelemetry::builder(format!("tasker-{}", document.owner));
        if let Some(logger) = &run_log {
            builder = builder.log_sink(logger.clone());
        }
        if let Some(sink) = &event_sink {
            builder = builder.event_publisher(sink.publisher.clone());
        }
        options = options.telemetry(builder.build()?);
    }

    publish_run_event(
        event_sink.as_ref(),
        "qtask.run.started",
        &entry,
        json!({ "scenario": document.name, "cycles": cycles }),
    )?;

    let mut runtime = TaskerRuntime::with_options(document, options);
    let mut report_writer = args
        .reports
        .as_deref()
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening report log {}", path.display()))
        })
        .transpose()?;

    for _ in 0..cycles {
        let report = runtime.step();
        if let Some(writer) = report_writer.as_mut() {
            serde_json::to_writer(&mut *writer, &report)?;
            writer.write_all(b"\n")?;
        }
        if !args.json {
            print_cycle(&report);
        }
    }

    let summary = runtime.summary();
    if let Some(logger) = &run_log {
        logger.write(
            &LogRecord::new("qtask", LogLevel::Info, "run completed").with_metadata(json!({
                "run_id": entry.run_id,
                "cycles": summary.cycles,
                "assignments": summary.assignments_sent,
            })),
        )?;
    }
    publish_run_event(
        event_sink.as_ref(),
        "qtask.run.completed",
        &entry,
        serde_json::to_value(&summary)?,
    )?;

    entry.status = if summary.config_errors.is_empty() {
        "completed".into()
    } else {
        "degraded".into()
    };
    entry.summary = Some(summary.clone());
    append_manifest(&args.manifest, &entry)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{}: {} cycles | {} assignments | {} cancels | {} statuses | {} in flight",
            summary.scenario,
            summary.cycles,
            summary.assignments_sent,
            summary.cancels_sent,
            summary.statuses_sent,
            summary.in_flight.len()
        );
        for error in &summary.config_errors {
            println!("config error: {error}");
        }
    }
    Ok(())
}

fn print_cycle(report: &CycleReport) {
    println!(
        "cycle {:>3} t={:>7.2} | {} tasks x {} assets | {} committed | {} sent | {} canceled",
        report.cycle,
        report.time,
        report.tasks,
        report.assets,
        report.committed.len(),
        report.sent.len(),
        report.canceled.len()
    );
    for commitment in &report.committed {
        println!(
            "    {} -> {}{}",
            commitment.task,
            commitment.asset,
            if commitment.held { " (held)" } else { "" }
        );
    }
}

fn append_manifest(path: &Path, entry: &RunManifestEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening manifest {}", path.display()))?;
    serde_json::to_writer(&mut file, entry)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Reads the manifest, keeping the latest line per run.
fn read_manifest(path: &Path) -> Result<Vec<RunManifestEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut entries: Vec<RunManifestEntry> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: RunManifestEntry = serde_json::from_str(&line)?;
        match entries.iter_mut().find(|known| known.run_id == entry.run_id) {
            Some(known) => *known = entry,
            None => entries.push(entry),
        }
    }
    Ok(entries)
}

struct EventSink {
    runtime: Runtime,
    publisher: Arc<FileEventPublisher>,
}

impl EventSink {
    fn new(path: &Path) -> Result<Self> {
        let publisher = Arc::new(FileEventPublisher::new(path)?);
        let runtime = Runtime::new()?;
        Ok(Self { runtime, publisher })
    }

    fn publish(&self, event: EventRecord) -> Result<()> {
        self.runtime.block_on(self.publisher.publish(event))
    }
}

fn publish_run_event(
    sink: Option<&EventSink>,
    event_type: &str,
    entry: &RunManifestEntry,
    payload: Value,
) -> Result<()> {
    let Some(sink) = sink else {
        return Ok(());
    };
    let payload = match payload {
        Value::Object(mut map) => {
            map.insert("run_id".into(), Value::String(entry.run_id.clone()));
            Value::Object(map)
        }
        other => json!({ "run_id": entry.run_id, "value": other }),
    };
    sink.publish(EventRecord::new("qtask", event_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_keeps_latest_entry_per_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        let mut entry = RunManifestEntry::new(PathBuf::from("demo.toml"), 3);
        append_manifest(&path, &entry).unwrap();
        entry.status = "completed".into();
        append_manifest(&path, &entry).unwrap();
        append_manifest(&path, &RunManifestEntry::new(PathBuf::from("other.toml"), 1)).unwrap();

        let entries = read_manifest(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, "completed");
        assert_eq!(entries[1].status, "running");
    }

    #[test]
    fn missing_manifest_reads_empty() {
        let dir = tempdir().unwrap();
        assert!(read_manifest(&dir.path().join("absent.jsonl")).unwrap().is_empty());
    }

    #[test]
    fn run_event_carries_run_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let sink = EventSink::new(&path).unwrap();
        let entry = RunManifestEntry::new(PathBuf::from("demo.toml"), 2);
        publish_run_event(Some(&sink), "qtask.run.started", &entry, json!({ "cycles": 2 }))
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let record: EventRecord = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(record.event_type, "qtask.run.started");
        assert_eq!(record.payload["run_id"], json!(entry.run_id));
        assert_eq!(record.payload["cycles"], json!(2));
    }

    #[test]
    fn cli_parses_run_arguments() {
        let cli = Cli::try_parse_from(["qtask", "run", "demo.toml", "--cycles", "4", "--json"])
            .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.cycles, Some(4));
                assert!(args.json);
                assert_eq!(args.scenario, PathBuf::from("demo.toml"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
