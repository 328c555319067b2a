//! Exec command - run a batch script against the database.

use anyhow::{Context, Result};
use clap::Args;
use migrator_core::{default_logger, MigrationConfig, TransformationProvider};
use std::path::PathBuf;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the exec command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Script file; statements are separated by lines holding only `GO`
    pub script: PathBuf,

    /// Run the whole script in one transaction
    #[arg(long)]
    pub transaction: bool,
}

/// Execute the exec command.
pub async fn execute(args: ExecArgs, config: &MigrationConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let mut provider = TransformationProvider::connect(config, default_logger())
        .await
        .context("Failed to connect")?;

    if args.transaction {
        provider.begin_transaction().await?;
    }
    let executed = match provider.execute_script_file(&args.script).await {
        Ok(count) => count,
        Err(e) => {
            provider.rollback().await?;
            return Err(super::report_failure(e, "Script failed", format));
        }
    };
    if provider.in_transaction() {
        provider.commit().await?;
    }

    match format {
        OutputFormat::Json => CommandResult::success(serde_json::json!({
            "script": args.script.display().to_string(),
            "statements": executed,
        }))
        .print(format)?,
        OutputFormat::Text => output::success(&format!(
            "Executed {} statement(s) from {}",
            executed,
            args.script.display()
        )),
    }

    Ok(())
}
