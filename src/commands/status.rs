//! Status command - list applied and pending migrations.

use anyhow::Result;
use clap::Args;
use migrator_core::{MigrationConfig, MigrationStatus};
use serde::Serialize;
use std::path::PathBuf;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Directory of migration scripts
    #[arg(short, long, env = "MIGRATOR_SCRIPTS", default_value = "migrations")]
    pub scripts: PathBuf,
}

/// Status output.
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub key: String,
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    pub migrations: Vec<MigrationStatus>,
}

/// Execute the status command.
pub async fn execute(args: StatusArgs, config: &MigrationConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let mut migrator = super::open_migrator(config, &args.scripts).await?;

    let migrations = migrator
        .status()
        .await
        .map_err(|e| super::report_failure(e, "Failed to get status", format))?;
    let applied = migrations.iter().filter(|m| m.applied).count();

    let status = StatusOutput {
        key: config.key.clone(),
        total: migrations.len(),
        applied,
        pending: migrations.len() - applied,
        migrations,
    };

    match format {
        OutputFormat::Json => CommandResult::success(&status).print(format)?,
        OutputFormat::Text => {
            output::section("Migration Status");
            output::key_value("Key", if status.key.is_empty() { "(default)" } else { status.key.as_str() });
            output::key_value("Total", &status.total.to_string());
            output::key_value("Applied", &status.applied.to_string());
            output::key_value("Pending", &status.pending.to_string());

            if !status.migrations.is_empty() {
                println!();
                for m in &status.migrations {
                    output::status(&m.to_string(), m.applied);
                }
            }
        }
    }

    Ok(())
}
