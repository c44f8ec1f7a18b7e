use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use once_cell::sync::OnceCell;
use serde_json::Value;
use shared_event_bus::{EventRecord, EventSink};
use shared_logging::{JsonLogger, LogLevel, LogRecord, RepeatThrottle};
use tokio::runtime::{Handle, Runtime};

/// Builder for actuation telemetry sinks.
pub struct ActuationTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl ActuationTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            event_sink: None,
        }
    }

    /// Sets the log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the audit event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<ActuationTelemetry> {
        ActuationTelemetry::new(self.module, self.log_path, self.event_sink)
    }
}

/// Telemetry handle shared across dispatch components.
///
/// Lease rejections and normalization warnings can repeat many times per
/// second, so log writes pass through a [`RepeatThrottle`]; audit events are
/// never throttled.
#[derive(Clone)]
pub struct ActuationTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for ActuationTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActuationTelemetry")
            .field("module", &self.inner.module)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
    throttle: RepeatThrottle,
    event: Option<EventHandle>,
}

struct EventHandle {
    // Lazy: only built when publishing from outside a runtime, so the
    // handle can be dropped inside one without tripping tokio's drop guard.
    runtime: OnceCell<Runtime>,
    sink: Arc<dyn EventSink>,
}

impl EventHandle {
    fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            runtime: OnceCell::new(),
            sink,
        }
    }

    fn publish(&self, record: EventRecord) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            let sink = Arc::clone(&self.sink);
            handle.spawn(async move {
                if let Err(err) = sink.publish(record).await {
                    eprintln!("telemetry event publish failed: {err:?}");
                }
            });
            Ok(())
        } else {
            let runtime = self.runtime.get_or_try_init(Runtime::new)?;
            runtime.block_on(self.sink.publish(record))
        }
    }
}

impl ActuationTelemetry {
    fn new(
        module: impl Into<String>,
        log_path: Option<PathBuf>,
        event_sink: Option<Arc<dyn EventSink>>,
    ) -> Result<Self> {
        let logger = if let Some(path) = log_path {
            Some(JsonLogger::new(path)?)
        } else {
            None
        };
        let event = event_sink.map(EventHandle::new);
        Ok(Self {
            inner: Arc::new(TelemetryInner {
                module: module.into(),
                logger,
                throttle: RepeatThrottle::default(),
                event,
            }),
        })
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> ActuationTelemetryBuilder {
        ActuationTelemetryBuilder::new(module)
    }

    /// Logs structured metadata. Repeats inside the throttle window are
    /// dropped silently.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let mut record = LogRecord::new(&self.inner.module, level, message);
            if !self.inner.throttle.admit(&record.throttle_key()) {
                return Ok(());
            }
            if let Some(obj) = metadata.as_object() {
                record.metadata = obj.clone();
            }
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Emits an audit event.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(EventRecord::new(
                self.inner.module.clone(),
                event_type,
                payload,
            ))?;
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
        let path = tmp.path().join("actuation.log");
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = ActuationTelemetry::builder("actuation")
            .log_path(&path)
            .event_sink(bus.clone())
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Info, "dispatch.normalized", json!({ "warnings": 0 }))
            .unwrap();
        telemetry
            .event("actuation.dispatch.completed", json!({ "success": true }))
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("dispatch.normalized"));
        assert_eq!(bus.snapshot().len(), 1);
    }

    #[test]
    fn repeated_log_lines_are_throttled() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("actuation.log");
        let telemetry = ActuationTelemetry::builder("actuation")
            .log_path(&path)
            .build()
            .unwrap();
        for _ in 0..5 {
            telemetry
                .log(LogLevel::Warn, "lease.busy", json!({ "holder": "explore" }))
                .unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
