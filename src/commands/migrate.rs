//! Migrate command - bring the database to a target version.

use anyhow::Result;
use clap::Args;
use migrator_core::MigrationConfig;
use std::path::PathBuf;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the migrate command.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Target version (defaults to the latest script)
    #[arg(short, long)]
    pub target: Option<i64>,

    /// Dry run - show what would be done
    #[arg(long)]
    pub dry_run: bool,

    /// Directory of migration scripts
    #[arg(short, long, env = "MIGRATOR_SCRIPTS", default_value = "migrations")]
    pub scripts: PathBuf,
}

/// Execute the migrate command.
pub async fn execute(args: MigrateArgs, config: &MigrationConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let mut migrator = super::open_migrator(config, &args.scripts).await?;

    if args.dry_run {
        let plan = migrator
            .plan(args.target)
            .await
            .map_err(|e| super::report_failure(e, "Failed to build plan", format))?;
        return super::plan::print_plan(&plan, format);
    }

    let outcome = migrator
        .migrate(args.target)
        .await
        .map_err(|e| super::report_failure(e, "Migration failed", format))?;

    match format {
        OutputFormat::Json => CommandResult::success(&outcome).print(format)?,
        OutputFormat::Text => {
            if outcome.is_noop() {
                output::success(&format!(
                    "Database is up to date at version {}",
                    outcome.start_version
                ));
            } else {
                output::success(&format!(
                    "Migrated {} from version {} to {} ({} step(s))",
                    outcome.direction,
                    outcome.start_version,
                    outcome.target_version,
                    outcome.steps.len()
                ));
                for step in &outcome.steps {
                    output::key_value(
                        &format!("V{}", step.version),
                        &format!("{} {} ({}ms)", step.direction, step.name, step.elapsed_ms),
                    );
                }
            }
        }
    }

    Ok(())
}
