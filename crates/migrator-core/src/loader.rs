//! Migration sources.
//!
//! A [`MigrationLoader`] lists available versions and hands out a fresh
//! [`MigrationUnit`] per step. [`MigrationRegistry`] is the explicit,
//! in-memory implementation: each version maps to a unit factory.

use crate::error::{MigrationError, Result};
use crate::migration::{MigrationInfo, MigrationUnit, SqlMigration};
use std::collections::BTreeMap;
use std::fmt;

/// Source of migration units.
pub trait MigrationLoader: Send + Sync {
    /// Available migrations, ascending by version.
    fn available_migrations(&self) -> Vec<MigrationInfo>;

    /// A new unit for `version`. Fails with `MissingMigration` when unknown.
    fn instantiate(&self, version: i64) -> Result<Box<dyn MigrationUnit>>;

    /// Highest available version, or 0.
    fn last_version(&self) -> i64 {
        self.available_migrations()
            .iter()
            .map(|m| m.version)
            .max()
            .unwrap_or(0)
    }

    /// Available versions, ascending.
    fn available_versions(&self) -> Vec<i64> {
        self.available_migrations().iter().map(|m| m.version).collect()
    }
}

type UnitFactory = Box<dyn Fn() -> Box<dyn MigrationUnit> + Send + Sync>;

struct Entry {
    name: String,
    factory: UnitFactory,
}

/// Explicit version to unit-factory mapping.
#[derive(Default)]
pub struct MigrationRegistry {
    entries: BTreeMap<i64, Entry>,
}

impl MigrationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit factory. Fails with `DuplicateVersion` if the version
    /// is taken.
    pub fn register<F, U>(&mut self, version: i64, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> U + Send + Sync + 'static,
        U: MigrationUnit + 'static,
    {
        if self.entries.contains_key(&version) {
            return Err(MigrationError::DuplicateVersion { version });
        }
        self.entries.insert(
            version,
            Entry {
                name: name.into(),
                factory: Box::new(move || -> Box<dyn MigrationUnit> { Box::new(factory()) }),
            },
        );
        Ok(())
    }

    /// Register a script migration.
    pub fn register_sql(&mut self, migration: SqlMigration) -> Result<()> {
        let version = migration.version;
        let name = migration.name.clone();
        self.register(version, name, move || migration.clone())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F, U>(mut self, version: i64, name: impl Into<String>, factory: F) -> Result<Self>
    where
        F: Fn() -> U + Send + Sync + 'static,
        U: MigrationUnit + 'static,
    {
        self.register(version, name, factory)?;
        Ok(self)
    }

    /// Number of registered migrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MigrationLoader for MigrationRegistry {
    fn available_migrations(&self) -> Vec<MigrationInfo> {
        self.entries
            .iter()
            .map(|(version, entry)| MigrationInfo::new(*version, entry.name.clone()))
            .collect()
    }

    fn instantiate(&self, version: i64) -> Result<Box<dyn MigrationUnit>> {
        self.entries
            .get(&version)
            .map(|entry| (entry.factory)())
            .ok_or(MigrationError::MissingMigration { version })
    }

    fn last_version(&self) -> i64 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("versions", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
