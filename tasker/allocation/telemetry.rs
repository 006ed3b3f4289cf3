use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{JsonLogger, LogLevel, LogRecord, LogSink, MemoryLogger};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::model::SimTime;

/// Event emitted after every `update` call.
pub const CYCLE_COMPLETED: &str = "tasker.cycle.completed";
/// Event emitted for each assignment message sent.
pub const ASSIGNMENT_SENT: &str = "tasker.assignment.sent";
/// Event emitted for each cancellation sent.
pub const ASSIGNMENT_CANCELED: &str = "tasker.assignment.canceled";
/// Event emitted for each inbound status message.
pub const STATUS_RECEIVED: &str = "tasker.status.received";
/// Event emitted when a strategy slot could not be filled.
pub const CONFIG_DEGRADED: &str = "tasker.config.degraded";

/// Builder for tasker telemetry sinks.
pub struct TaskerTelemetryBuilder {
    component: String,
    log_path: Option<PathBuf>,
    memory: Option<Arc<MemoryLogger>>,
    shared: Vec<Arc<dyn LogSink>>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl TaskerTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            log_path: None,
            memory: None,
            shared: Vec::new(),
            event_publisher: None,
        }
    }

    /// Appends JSON-lines records to `path`.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Also keeps records in memory.
    #[must_use]
    pub fn memory_sink(mut self, logger: Arc<MemoryLogger>) -> Self {
        self.memory = Some(logger);
        self
    }

    /// Writes through a sink the caller also holds, so both share one file handle.
    #[must_use]
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.shared.push(sink);
        self
    }

    /// Sets the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<TaskerTelemetry> {
        let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();
        if let Some(path) = self.log_path {
            sinks.push(Arc::new(JsonLogger::new(path)?));
        }
        if let Some(memory) = self.memory {
            sinks.push(memory);
        }
        sinks.extend(self.shared);
        let event = self.event_publisher.map(EventHandle::new).transpose()?;
        Ok(TaskerTelemetry {
            inner: Arc::new(TelemetryInner {
                component: self.component,
                sinks,
                event,
            }),
        })
    }
}

/// Telemetry handle shared by the tasker and its runtime.
#[derive(Clone)]
pub struct TaskerTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for TaskerTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskerTelemetry")
            .field("component", &self.inner.component)
            .field("sinks", &self.inner.sinks.len())
            .field("events", &self.inner.event.is_some())
            .finish()
    }
}

struct TelemetryInner {
    component: String,
    sinks: Vec<Arc<dyn LogSink>>,
    event: Option<EventHandle>,
}

struct EventHandle {
    runtime: Runtime,
    publisher: Arc<dyn EventPublisher>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime, publisher })
    }

    fn publish(&self, record: EventRecord) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            let publisher = Arc::clone(&self.publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(record).await {
                    tracing::warn!(error = ?err, "telemetry event publish failed");
                }
            });
            Ok(())
        } else {
            self.runtime.block_on(self.publisher.publish(record))
        }
    }
}

impl TaskerTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> TaskerTelemetryBuilder {
        TaskerTelemetryBuilder::new(component)
    }

    /// Component name stamped on records.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.inner.component
    }

    /// Writes a structured record to every sink.
    pub fn log(&self, time: SimTime, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if self.inner.sinks.is_empty() {
            return Ok(());
        }
        let record = LogRecord::new(&self.inner.component, level, message)
            .at(time)
            .with_metadata(metadata);
        for sink in &self.inner.sinks {
            sink.write(&record)?;
        }
        Ok(())
    }

    /// Emits an event on the bus.
    pub fn event(&self, time: SimTime, event_type: &str, payload: Value) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(EventRecord::new(&self.inner.component, event_type, payload).at(time))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_event_bus::MemoryEventBus;
    use tempfile::tempdir;

    #[test]
    fn telemetry_writes_log_and_event() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tasker.log");
        let bus = Arc::new(MemoryEventBus::new(16));
        let memory = Arc::new(MemoryLogger::new(8));
        let telemetry = TaskerTelemetry::builder("tasker")
            .log_path(&path)
            .memory_sink(memory.clone())
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        telemetry
            .log(2.0, LogLevel::Warn, "tasker.lookup_miss", json!({ "task": "00ff" }))
            .unwrap();
        telemetry.event(2.0, CYCLE_COMPLETED, json!({ "committed": 2 })).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("tasker.lookup_miss"));
        assert_eq!(memory.count_at_least(LogLevel::Warn), 1);
        let events = bus.filtered("tasker.cycle");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sim_time, Some(2.0));
    }

    #[test]
    fn shared_sink_keeps_records_in_write_order() {
        let tmp = tempdir().unwrap();
        let logger = Arc::new(JsonLogger::new(tmp.path().join("run.log")).unwrap());
        let telemetry = TaskerTelemetry::builder("tasker")
            .log_sink(logger.clone())
            .build()
            .unwrap();
        telemetry.log(1.0, LogLevel::Info, "cycle one", Value::Null).unwrap();
        logger.write(&LogRecord::new("qtask", LogLevel::Info, "run completed")).unwrap();
        telemetry.log(2.0, LogLevel::Info, "cycle two", Value::Null).unwrap();

        let content = std::fs::read_to_string(logger.path()).unwrap();
        let messages: Vec<String> = content
            .lines()
            .map(|line| serde_json::from_str::<LogRecord>(line).unwrap().message)
            .collect();
        assert_eq!(messages, vec!["cycle one", "run completed", "cycle two"]);
    }

    #[test]
    fn empty_telemetry_is_a_no_op() {
        let telemetry = TaskerTelemetry::builder("tasker").build().unwrap();
        telemetry.log(0.0, LogLevel::Info, "ignored", Value::Null).unwrap();
        telemetry.event(0.0, CYCLE_COMPLETED, Value::Null).unwrap();
        assert_eq!(telemetry.component(), "tasker");
    }
}
