//! Migration error types.

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Migration error type.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(String),

    /// SQL execution error reported by the driver.
    #[error("SQL execution error: {0}")]
    Execution(String),

    /// A planned version has no registered migration unit.
    #[error("Migration not found: {version}")]
    MissingMigration {
        /// Migration version that was not found.
        version: i64,
    },

    /// Available versions below the applied high-water mark were never applied.
    #[error("Inconsistent migration versions, not applied below the current version: {}", join_versions(.versions))]
    VersionConsistency {
        /// Every offending version, ascending.
        versions: Vec<i64>,
    },

    /// The dialect lacks the requested capability. No SQL was issued.
    #[error("{dialect} does not support {operation}")]
    NotSupported {
        /// Dialect name.
        dialect: String,
        /// Operation that was requested.
        operation: String,
    },

    /// Migration has no reverse operation.
    #[error("Migration {version} does not support rollback")]
    RollbackNotSupported {
        /// Migration version.
        version: i64,
    },

    /// Two migrations were registered under the same version.
    #[error("Duplicate migration version: {version}")]
    DuplicateVersion {
        /// Migration version.
        version: i64,
    },

    /// Migration unit reported a failure of its own.
    #[error("Migration {version} failed: {reason}")]
    Failed {
        /// Migration version.
        version: i64,
        /// Failure reason.
        reason: String,
    },

    /// Invalid arguments passed to a provider operation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeout error.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

fn join_versions(versions: &[i64]) -> String {
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl MigrationError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an execution error.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not-supported error.
    pub fn not_supported(dialect: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::NotSupported {
            dialect: dialect.into(),
            operation: operation.into(),
        }
    }

    /// Check if the error is retryable.
    ///
    /// Migrations are assumed non-idempotent, so SQL failures never are.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(e) => Self::Config(e.to_string()),
            sqlx::Error::Database(e) => Self::Execution(e.to_string()),
            sqlx::Error::Io(e) => Self::Io(e),
            sqlx::Error::PoolTimedOut => Self::Timeout("Connection timed out".to_string()),
            sqlx::Error::Tls(e) => Self::Connection(e.to_string()),
            _ => Self::Execution(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for MigrationError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for MigrationError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
