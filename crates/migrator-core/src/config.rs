//! Migration configuration.

use crate::connection::DEFAULT_CONNECT_TIMEOUT;
use crate::dialect::DialectKind;
use crate::error::{MigrationError, Result};
use crate::provider::DEFAULT_LEDGER_TABLE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Migration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Database connection URL.
    #[serde(default)]
    pub connection_string: String,

    /// SQL dialect (detected from the URL when built with the builder).
    #[serde(default)]
    pub dialect: DialectKind,

    /// Ledger table name.
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// Key that namespaces this migration set in the ledger.
    #[serde(default)]
    pub key: String,

    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Whether each step runs in its own transaction.
    #[serde(default = "default_true")]
    pub use_transactions: bool,
}

fn default_ledger_table() -> String {
    DEFAULT_LEDGER_TABLE.to_string()
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_true() -> bool {
    true
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            dialect: DialectKind::default(),
            ledger_table: default_ledger_table(),
            key: String::new(),
            connect_timeout: default_connect_timeout(),
            use_transactions: true,
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> MigrationConfigBuilder {
        MigrationConfigBuilder::new()
    }

    /// Load from a TOML or YAML file, chosen by extension.
    ///
    /// The dialect is detected from the connection string when the file
    /// does not name one.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let (mut config, names_dialect): (Self, bool) = match extension.as_deref() {
            Some("toml") => {
                let value: toml::Value = toml::from_str(&text)?;
                let names_dialect = value.get("dialect").is_some();
                (toml::from_str(&text)?, names_dialect)
            }
            Some("yaml" | "yml") => {
                let value: serde_yaml::Value = serde_yaml::from_str(&text)?;
                let names_dialect = value.get("dialect").is_some();
                (serde_yaml::from_str(&text)?, names_dialect)
            }
            _ => {
                return Err(MigrationError::config(format!(
                    "Unsupported config file format: {}",
                    path.display()
                )))
            }
        };

        if !names_dialect {
            if let Some(kind) = DialectKind::from_url(&config.connection_string) {
                config.dialect = kind;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(MigrationError::config("Connection string is required"));
        }

        if self.ledger_table.trim().is_empty() {
            return Err(MigrationError::config("Ledger table name is required"));
        }

        Ok(())
    }
}

/// Builder for migration configuration.
#[derive(Debug, Default)]
pub struct MigrationConfigBuilder {
    config: MigrationConfig,
}

impl MigrationConfigBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection string.
    #[must_use]
    pub fn connection_string(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        // Auto-detect dialect if possible
        if let Some(kind) = DialectKind::from_url(&url) {
            self.config.dialect = kind;
        }
        self.config.connection_string = url;
        self
    }

    /// Set the dialect.
    #[must_use]
    pub fn dialect(mut self, kind: DialectKind) -> Self {
        self.config.dialect = kind;
        self
    }

    /// Set the ledger table name.
    #[must_use]
    pub fn ledger_table(mut self, name: impl Into<String>) -> Self {
        self.config.ledger_table = name.into();
        self
    }

    /// Set the ledger key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.config.key = key.into();
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Enable or disable per-step transactions.
    #[must_use]
    pub fn use_transactions(mut self, use_tx: bool) -> Self {
        self.config.use_transactions = use_tx;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<MigrationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
