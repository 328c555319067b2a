//! Migration runner.
//!
//! The [`Migrator`] reads applied versions from the ledger, asks the loader
//! what is available, builds a plan and executes it one transaction per step.
//! A failing step is rolled back and aborts the run; steps committed before
//! it stay committed.

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::loader::MigrationLoader;
use crate::logger::{MigrationEvent, MigrationLogger};
use crate::migration::MigrationUnit;
use crate::plan::{build_plan, Direction, MigrationPlan};
use crate::provider::TransformationProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Migration version.
    pub version: i64,
    /// Migration name.
    pub name: String,
    /// Whether the step applied or reverted the migration.
    pub direction: Direction,
    /// Wall-clock time spent in the step, commit included.
    pub elapsed_ms: u64,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    /// Highest applied version before the run.
    pub start_version: i64,
    /// Requested target.
    pub target_version: i64,
    /// Direction of the run.
    pub direction: Direction,
    /// Executed steps, in order.
    pub steps: Vec<StepOutcome>,
}

impl MigrationOutcome {
    /// Whether the run had nothing to do.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Applied state of one known version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// Migration version.
    pub version: i64,
    /// Migration name, if the loader knows the version.
    pub name: Option<String>,
    /// Whether the ledger records the version as applied.
    pub applied: bool,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.applied { "applied" } else { "pending" };
        match &self.name {
            Some(name) => write!(f, "V{} - {} [{}]", self.version, name, state),
            None => write!(f, "V{} [{}]", self.version, state),
        }
    }
}

/// Plans and executes migrations against one provider.
pub struct Migrator {
    provider: TransformationProvider,
    loader: Box<dyn MigrationLoader>,
    key: String,
    logger: Arc<dyn MigrationLogger>,
    use_transactions: bool,
}

impl Migrator {
    /// Create a migrator over an open provider. Events go to the provider's
    /// logger.
    pub fn new(
        provider: TransformationProvider,
        loader: impl MigrationLoader + 'static,
        key: impl Into<String>,
    ) -> Self {
        let logger = provider.logger();
        Self {
            provider,
            loader: Box::new(loader),
            key: key.into(),
            logger,
            use_transactions: true,
        }
    }

    /// Connect using a configuration.
    pub async fn connect(
        config: &MigrationConfig,
        loader: impl MigrationLoader + 'static,
        logger: Arc<dyn MigrationLogger>,
    ) -> Result<Self> {
        let provider = TransformationProvider::connect(config, logger).await?;
        Ok(Self::new(provider, loader, config.key.clone()).with_transactions(config.use_transactions))
    }

    /// Enable or disable the per-step transaction.
    #[must_use]
    pub fn with_transactions(mut self, enabled: bool) -> Self {
        self.use_transactions = enabled;
        self
    }

    /// Ledger key of this migration set.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying provider.
    pub fn provider_mut(&mut self) -> &mut TransformationProvider {
        &mut self.provider
    }

    /// Give back the provider.
    #[must_use]
    pub fn into_provider(self) -> TransformationProvider {
        self.provider
    }

    /// Applied versions under this migrator's key, ascending.
    pub async fn applied_migrations(&mut self) -> Result<Vec<i64>> {
        self.provider.get_applied_migrations(&self.key).await
    }

    /// Compute the plan for `target` without executing it.
    ///
    /// With no target the loader's last version is used.
    pub async fn plan(&mut self, target: Option<i64>) -> Result<MigrationPlan> {
        let target = target.unwrap_or_else(|| self.loader.last_version());
        let applied = self.applied_migrations().await?;
        let available = self.loader.available_versions();
        build_plan(target, &applied, &available)
    }

    /// Bring the database to `target`.
    ///
    /// Steps run in plan order. The first failure is re-raised after its
    /// step is rolled back, and the remaining steps are skipped.
    pub async fn migrate(&mut self, target: Option<i64>) -> Result<MigrationOutcome> {
        let plan = self.plan(target).await?;
        let direction = plan.direction();

        self.logger.log(&MigrationEvent::RunStarted {
            start: plan.start_version,
            target: plan.target_version,
        });

        let mut steps = Vec::with_capacity(plan.len());
        for &version in &plan.versions {
            let step = self.execute_migration(version, plan.start_version).await?;
            steps.push(step);
        }

        self.logger.log(&MigrationEvent::RunFinished {
            executed: steps.len(),
        });

        Ok(MigrationOutcome {
            start_version: plan.start_version,
            target_version: plan.target_version,
            direction,
            steps,
        })
    }

    /// Run a single step.
    ///
    /// The step reverts `version` when `version <= current_version` and
    /// applies it otherwise. The unit and its ledger write share one
    /// transaction.
    pub async fn execute_migration(
        &mut self,
        version: i64,
        current_version: i64,
    ) -> Result<StepOutcome> {
        let direction = if version <= current_version {
            Direction::Down
        } else {
            Direction::Up
        };
        let started = Instant::now();

        let unit = match self.loader.instantiate(version) {
            Ok(unit) => unit,
            Err(e) => {
                let name = self.known_name(version).unwrap_or_default();
                self.log_failure(version, &name, &e);
                return Err(e);
            }
        };
        let name = unit.name().to_string();

        if self.use_transactions {
            if let Err(e) = self.provider.begin_transaction().await {
                self.log_failure(version, &name, &e);
                return Err(e);
            }
        }

        match self.run_step(unit.as_ref(), version, direction).await {
            Ok(()) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                debug!(version, name = %name, %direction, elapsed_ms, "Migration step committed");
                Ok(StepOutcome {
                    version,
                    name,
                    direction,
                    elapsed_ms,
                })
            }
            Err(e) => {
                self.log_failure(version, &name, &e);
                if let Err(rollback_err) = self.provider.rollback().await {
                    self.logger.log(&MigrationEvent::Warning {
                        message: format!("Rollback of version {version} failed: {rollback_err}"),
                    });
                }
                self.logger.log(&MigrationEvent::RollingBack {
                    version: current_version,
                });
                Err(e)
            }
        }
    }

    async fn run_step(
        &mut self,
        unit: &dyn MigrationUnit,
        version: i64,
        direction: Direction,
    ) -> Result<()> {
        let name = unit.name().to_string();
        match direction {
            Direction::Up => {
                self.logger.log(&MigrationEvent::MigrateUp { version, name });
                unit.up(&mut self.provider).await?;
                self.provider.migration_applied(version, &self.key).await?;
            }
            Direction::Down => {
                self.logger.log(&MigrationEvent::MigrateDown { version, name });
                unit.down(&mut self.provider).await?;
                self.provider.migration_unapplied(version, &self.key).await?;
            }
        }
        if self.provider.in_transaction() {
            self.provider.commit().await?;
        }
        Ok(())
    }

    /// Every known version, available or applied, with its applied flag.
    pub async fn status(&mut self) -> Result<Vec<MigrationStatus>> {
        let applied = self.applied_migrations().await?;

        let mut known: BTreeMap<i64, Option<String>> = self
            .loader
            .available_migrations()
            .into_iter()
            .map(|m| (m.version, Some(m.name)))
            .collect();
        for version in &applied {
            known.entry(*version).or_insert(None);
        }

        Ok(known
            .into_iter()
            .map(|(version, name)| MigrationStatus {
                version,
                name,
                applied: applied.binary_search(&version).is_ok(),
            })
            .collect())
    }

    fn known_name(&self, version: i64) -> Option<String> {
        self.loader
            .available_migrations()
            .into_iter()
            .find(|m| m.version == version)
            .map(|m| m.name)
    }

    fn log_failure(&self, version: i64, name: &str, error: &MigrationError) {
        self.logger.log(&MigrationEvent::Exception {
            version,
            name: name.to_string(),
            error: error.to_string(),
        });
    }
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("provider", &self.provider)
            .field("key", &self.key)
            .field("available", &self.loader.available_versions())
            .field("use_transactions", &self.use_transactions)
            .finish()
    }
}
