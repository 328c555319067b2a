//! CLI argument definitions using clap.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use migrator_core::{DialectKind, MigrationConfig};
use std::path::PathBuf;

use crate::commands;

/// Schema Migrator - versioned, reversible database migrations
#[derive(Parser, Debug)]
#[command(name = "schema-migrator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Database connection URL
    #[arg(short = 'c', long, env = "MIGRATOR_CONNECTION", global = true)]
    pub connection: Option<String>,

    /// SQL dialect (detected from the connection URL when omitted)
    #[arg(short = 'd', long, env = "MIGRATOR_DIALECT", global = true)]
    pub dialect: Option<DialectKind>,

    /// Ledger key that namespaces this migration set
    #[arg(short = 'k', long, env = "MIGRATOR_KEY", global = true)]
    pub key: Option<String>,

    /// Ledger table name
    #[arg(long, env = "MIGRATOR_LEDGER_TABLE", global = true)]
    pub ledger_table: Option<String>,

    /// Configuration file (TOML or YAML)
    #[arg(long, env = "MIGRATOR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate the database to a target version
    #[command(visible_alias = "up")]
    Migrate(commands::migrate::MigrateArgs),

    /// Show the steps a migration would execute
    Plan(commands::plan::PlanArgs),

    /// Show applied and pending migrations
    Status(commands::status::StatusArgs),

    /// Execute a batch script
    Exec(commands::exec::ExecArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let config = self.migration_config()?;
        match self.command {
            Commands::Migrate(args) => commands::migrate::execute(args, &config, self.json).await,
            Commands::Plan(args) => commands::plan::execute(args, &config, self.json).await,
            Commands::Status(args) => commands::status::execute(args, &config, self.json).await,
            Commands::Exec(args) => commands::exec::execute(args, &config, self.json).await,
        }
    }

    /// Merge the configuration file, if any, with command-line overrides.
    pub fn migration_config(&self) -> Result<MigrationConfig> {
        let mut config = match &self.config {
            Some(path) => MigrationConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => MigrationConfig::default(),
        };

        if let Some(url) = &self.connection {
            config.connection_string.clone_from(url);
            if let Some(kind) = DialectKind::from_url(url) {
                config.dialect = kind;
            }
        }
        if let Some(kind) = self.dialect {
            config.dialect = kind;
        }
        if let Some(key) = &self.key {
            config.key.clone_from(key);
        }
        if let Some(table) = &self.ledger_table {
            config.ledger_table.clone_from(table);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
