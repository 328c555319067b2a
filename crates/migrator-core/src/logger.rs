//! Migration event logging.
//!
//! The core emits [`MigrationEvent`]s to a [`MigrationLogger`] passed in at
//! construction time. [`TracingLogger`] forwards them to `tracing`.

use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Something worth reporting during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    /// A run is about to execute its plan.
    RunStarted {
        /// Highest applied version before the run.
        start: i64,
        /// Requested target version.
        target: i64,
    },
    /// A forward step is starting.
    MigrateUp {
        /// Migration version.
        version: i64,
        /// Migration name.
        name: String,
    },
    /// A reverse step is starting.
    MigrateDown {
        /// Migration version.
        version: i64,
        /// Migration name.
        name: String,
    },
    /// A step failed.
    Exception {
        /// Migration version.
        version: i64,
        /// Migration name.
        name: String,
        /// Error message.
        error: String,
    },
    /// The failed step's transaction was rolled back.
    RollingBack {
        /// Version the database stays at.
        version: i64,
    },
    /// A statement is about to be executed.
    Sql {
        /// Statement text.
        sql: String,
    },
    /// Non-fatal condition.
    Warning {
        /// Message.
        message: String,
    },
    /// A run finished without error.
    RunFinished {
        /// Number of executed steps.
        executed: usize,
    },
}

/// Receives migration events.
pub trait MigrationLogger: Send + Sync {
    /// Handle one event.
    fn log(&self, event: &MigrationEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl MigrationLogger for TracingLogger {
    fn log(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::RunStarted { start, target } => {
                tracing::info!(start, target, "Starting migration run");
            }
            MigrationEvent::MigrateUp { version, name } => {
                tracing::info!(version, name = %name, "Applying migration");
            }
            MigrationEvent::MigrateDown { version, name } => {
                tracing::info!(version, name = %name, "Reverting migration");
            }
            MigrationEvent::Exception {
                version,
                name,
                error,
            } => {
                tracing::error!(version, name = %name, error = %error, "Migration failed");
            }
            MigrationEvent::RollingBack { version } => {
                tracing::warn!(version, "Rolling back to version");
            }
            MigrationEvent::Sql { sql } => {
                tracing::debug!(sql = %sql, "Executing SQL");
            }
            MigrationEvent::Warning { message } => {
                tracing::warn!("{}", message);
            }
            MigrationEvent::RunFinished { executed } => {
                tracing::info!(executed, "Migration run finished");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<MigrationEvent>>,
}

impl RecordingLogger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded events other than executed SQL.
    #[must_use]
    pub fn lifecycle_events(&self) -> Vec<MigrationEvent> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, MigrationEvent::Sql { .. }))
            .collect()
    }

    /// Executed statements, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MigrationEvent::Sql { sql } => Some(sql),
                _ => None,
            })
            .collect()
    }
}

impl MigrationLogger for RecordingLogger {
    fn log(&self, event: &MigrationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Default logger.
#[must_use]
pub fn default_logger() -> Arc<dyn MigrationLogger> {
    Arc::new(TracingLogger)
}
