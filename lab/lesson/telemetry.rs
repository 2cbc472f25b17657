use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    events::{EventSink, LessonEvent},
    journal::{JsonLogger, LogLevel, LogRecord},
};

/// Telemetry builder for lesson sessions.
pub struct LessonTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl LessonTelemetryBuilder {
    /// Creates a new builder scoped to a module label.
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

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Builds telemetry.
    pub fn build(self) -> Result<LessonTelemetry> {
        let logger = self.log_path.map(JsonLogger::new).transpose()?;
        Ok(LessonTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
                sink: self.event_sink,
            }),
        })
    }
}

/// Telemetry handle shared across lesson components.
#[derive(Clone)]
pub struct LessonTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for LessonTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LessonTelemetry")
            .field("module", &self.inner.module)
            .field("logging", &self.inner.logger.is_some())
            .field("events", &self.inner.sink.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
    sink: Option<Arc<dyn EventSink>>,
}

impl LessonTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> LessonTelemetryBuilder {
        LessonTelemetryBuilder::new(module)
    }

    /// Module label.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.module
    }

    /// Logs metadata, stamped with the tick it happened on.
    pub fn log(&self, level: LogLevel, message: &str, tick: u64, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let mut record = LogRecord::new(&self.inner.module, level, message).at_tick(tick);
            if let Value::Object(fields) = metadata {
                record.metadata = fields;
            }
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Emits events.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        if let Some(sink) = &self.inner.sink {
            sink.publish(LessonEvent {
                id: format!("evt-{}", Uuid::new_v4()),
                source: self.inner.module.clone(),
                event_type: event_type.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                payload,
            })?;
        }
        Ok(())
    }
}
