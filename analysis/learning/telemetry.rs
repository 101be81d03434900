use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use uuid::Uuid;

/// Builder configuring analysis telemetry sinks.
pub struct AnalysisTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    run_id: Option<Uuid>,
}

impl AnalysisTelemetryBuilder {
    /// Creates a new builder for the given module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            run_id: None,
        }
    }

    /// Sets the JSON log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops records below `level`.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Reuses an existing run id instead of generating one.
    #[must_use]
    pub const fn run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Result<AnalysisTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::with_min_level(path, self.min_level)?),
            None => None,
        };
        Ok(AnalysisTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                run_id: self.run_id.unwrap_or_else(Uuid::new_v4),
                logger,
            }),
        })
    }
}

/// Telemetry handle shared by the pipeline steps of one run.
#[derive(Clone)]
pub struct AnalysisTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for AnalysisTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisTelemetry")
            .field("module", &self.inner.module)
            .field("run_id", &self.inner.run_id)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    run_id: Uuid,
    logger: Option<JsonLogger>,
}

impl AnalysisTelemetry {
    /// Returns a builder for this telemetry helper.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> AnalysisTelemetryBuilder {
        AnalysisTelemetryBuilder::new(module)
    }

    /// Identifier stamped on every record of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    /// Logs a structured record; object metadata is merged into the record.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let mut record = LogRecord::new(&self.inner.module, level, message)
                .with_field("run_id", self.inner.run_id.to_string());
            if let Value::Object(fields) = metadata {
                record.metadata.extend(fields);
            }
            logger.log(&record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn telemetry_logs_with_run_id() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("analysis.log");
        let telemetry = AnalysisTelemetry::builder("pipeline")
            .log_path(&log_path)
            .min_level(LogLevel::Info)
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Info, "pipeline.split", json!({ "test_rows": 30 }))
            .unwrap();
        telemetry
            .log(LogLevel::Debug, "pipeline.noise", json!({}))
            .unwrap();

        let records = shared_logging::read_records(&log_path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata["test_rows"], json!(30));
        assert_eq!(
            records[0].metadata["run_id"],
            json!(telemetry.run_id().to_string())
        );
    }

    #[test]
    fn without_path_nothing_is_written() {
        let telemetry = AnalysisTelemetry::builder("pipeline").build().unwrap();
        assert!(telemetry.log(LogLevel::Error, "ignored", json!(null)).is_ok());
    }
}
