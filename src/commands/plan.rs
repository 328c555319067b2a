//! Plan command - show what a migration run would do.

use anyhow::Result;
use clap::Args;
use migrator_core::{MigrationConfig, MigrationPlan};
use std::path::PathBuf;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the plan command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Target version (defaults to the latest script)
    #[arg(short, long)]
    pub target: Option<i64>,

    /// Directory of migration scripts
    #[arg(short, long, env = "MIGRATOR_SCRIPTS", default_value = "migrations")]
    pub scripts: PathBuf,
}

/// Execute the plan command.
pub async fn execute(args: PlanArgs, config: &MigrationConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let mut migrator = super::open_migrator(config, &args.scripts).await?;

    let plan = migrator
        .plan(args.target)
        .await
        .map_err(|e| super::report_failure(e, "Failed to build plan", format))?;

    print_plan(&plan, format)
}

/// Print a plan as text or JSON.
pub(crate) fn print_plan(plan: &MigrationPlan, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => CommandResult::success(serde_json::json!({
            "start_version": plan.start_version,
            "target_version": plan.target_version,
            "direction": plan.direction(),
            "versions": plan.versions,
        }))
        .print(format),
        OutputFormat::Text => {
            if plan.is_empty() {
                output::success(&format!(
                    "Nothing to do, database is at version {}",
                    plan.start_version
                ));
                return Ok(());
            }
            output::info(&format!(
                "{} step(s) {} from version {} to {}:",
                plan.len(),
                plan.direction(),
                plan.start_version,
                plan.target_version
            ));
            for version in &plan.versions {
                output::key_value(&format!("V{version}"), &plan.direction().to_string());
            }
            Ok(())
        }
    }
}
