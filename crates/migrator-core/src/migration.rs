//! Migration units.

use crate::error::{MigrationError, Result};
use crate::provider::TransformationProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version and name of an available migration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MigrationInfo {
    /// Migration version.
    pub version: i64,
    /// Migration name.
    pub name: String,
}

impl MigrationInfo {
    /// Create migration info.
    #[must_use]
    pub fn new(version: i64, name: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
        }
    }
}

impl fmt::Display for MigrationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{} - {}", self.version, self.name)
    }
}

/// A reversible schema change.
///
/// Units are instantiated fresh for every step and run inside the step's
/// transaction; returning an error rolls the step back.
#[async_trait]
pub trait MigrationUnit: Send + Sync {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Apply the change.
    async fn up(&self, provider: &mut TransformationProvider) -> Result<()>;

    /// Revert the change.
    async fn down(&self, provider: &mut TransformationProvider) -> Result<()>;
}

/// A migration defined by forward and reverse batch scripts.
#[derive(Debug, Clone)]
pub struct SqlMigration {
    /// Migration version.
    pub version: i64,
    /// Migration name.
    pub name: String,
    /// Script applied going up.
    pub up_sql: String,
    /// Script applied going down, if the migration is reversible.
    pub down_sql: Option<String>,
}

impl SqlMigration {
    /// Create a migration with no reverse script.
    #[must_use]
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            up_sql: up_sql.into(),
            down_sql: None,
        }
    }

    /// Create a migration builder.
    #[must_use]
    pub fn builder(version: i64, name: impl Into<String>) -> SqlMigrationBuilder {
        SqlMigrationBuilder::new(version, name)
    }

    /// Set the reverse script.
    #[must_use]
    pub fn with_down(mut self, down_sql: impl Into<String>) -> Self {
        self.down_sql = Some(down_sql.into());
        self
    }

    /// Check if rollback is supported.
    #[must_use]
    pub fn supports_rollback(&self) -> bool {
        self.down_sql.is_some()
    }

    /// Version and name.
    #[must_use]
    pub fn info(&self) -> MigrationInfo {
        MigrationInfo::new(self.version, self.name.clone())
    }
}

impl fmt::Display for SqlMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{} - {}", self.version, self.name)
    }
}

#[async_trait]
impl MigrationUnit for SqlMigration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn up(&self, provider: &mut TransformationProvider) -> Result<()> {
        provider.execute_batch(&self.up_sql).await.map(drop)
    }

    async fn down(&self, provider: &mut TransformationProvider) -> Result<()> {
        let script = self
            .down_sql
            .as_deref()
            .ok_or(MigrationError::RollbackNotSupported {
                version: self.version,
            })?;
        provider.execute_batch(script).await.map(drop)
    }
}

/// Builder for script migrations.
#[derive(Debug)]
pub struct SqlMigrationBuilder {
    version: i64,
    name: String,
    up_sql: Option<String>,
    down_sql: Option<String>,
}

impl SqlMigrationBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(version: i64, name: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            up_sql: None,
            down_sql: None,
        }
    }

    /// Set the forward script.
    #[must_use]
    pub fn up(mut self, sql: impl Into<String>) -> Self {
        self.up_sql = Some(sql.into());
        self
    }

    /// Set the reverse script.
    #[must_use]
    pub fn down(mut self, sql: impl Into<String>) -> Self {
        self.down_sql = Some(sql.into());
        self
    }

    /// Build the migration. The forward script is required.
    pub fn build(self) -> Result<SqlMigration> {
        let up_sql = self.up_sql.ok_or_else(|| {
            MigrationError::invalid_input(format!(
                "Migration {} ({}) has no forward script",
                self.version, self.name
            ))
        })?;

        Ok(SqlMigration {
            version: self.version,
            name: self.name,
            up_sql,
            down_sql: self.down_sql,
        })
    }
}
