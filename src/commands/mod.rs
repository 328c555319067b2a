//! CLI commands module.

pub mod exec;
pub mod migrate;
pub mod plan;
pub mod status;

use anyhow::{Context, Result};
use migrator_core::{default_logger, MigrationConfig, Migrator};
use std::path::Path;

use crate::output::{CommandResult, OutputFormat};
use crate::scripts;

/// Load the scripts directory and connect a migrator.
pub(crate) async fn open_migrator(config: &MigrationConfig, scripts_dir: &Path) -> Result<Migrator> {
    let registry = scripts::load_registry(scripts_dir)?;
    Migrator::connect(config, registry, default_logger())
        .await
        .context("Failed to connect")
}

/// Report a failure as JSON when asked to, then hand it back to the caller.
pub(crate) fn report_failure(
    error: migrator_core::MigrationError,
    context: &'static str,
    format: OutputFormat,
) -> anyhow::Error {
    if format == OutputFormat::Json {
        let result: CommandResult<()> = CommandResult::failure(format!("{context}: {error}"));
        if let Err(print_err) = result.print(format) {
            tracing::warn!(error = %print_err, "Failed to print result");
        }
    }
    anyhow::Error::new(error).context(context)
}
