//! # Migrator Core
//!
//! Versioned, reversible schema migrations.
//!
//! This crate provides:
//! - A transformation provider that renders dialect-correct DDL and DML
//! - SQLite and PostgreSQL dialects with type maps and identifier quoting
//! - A key-scoped ledger of applied versions
//! - Deterministic forward and backward planning
//! - A migrator that runs each step in its own transaction
//!
//! ## Example
//!
//! ```rust,no_run
//! use migrator_core::{default_logger, MigrationConfig, MigrationRegistry, Migrator, SqlMigration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MigrationConfig::builder()
//!         .connection_string("sqlite://app.db?mode=rwc")
//!         .key("app")
//!         .build()?;
//!
//!     let mut registry = MigrationRegistry::new();
//!     registry.register_sql(
//!         SqlMigration::builder(1, "create_users")
//!             .up("CREATE TABLE users (id INTEGER PRIMARY KEY)")
//!             .down("DROP TABLE users")
//!             .build()?,
//!     )?;
//!
//!     let mut migrator = Migrator::connect(&config, registry, default_logger()).await?;
//!     migrator.migrate(None).await?;
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod formatter;
pub mod ledger;
pub mod loader;
pub mod logger;
pub mod migration;
pub mod migrator;
pub mod plan;
pub mod provider;
pub mod schema;
pub mod script;

pub use config::{MigrationConfig, MigrationConfigBuilder};
pub use ddl::DdlRenderer;
pub use dialect::{Dialect, DialectKind, TypeMap};
pub use error::{MigrationError, Result};
pub use formatter::{SqlFormatter, Token};
pub use loader::{MigrationLoader, MigrationRegistry};
pub use logger::{default_logger, MigrationEvent, MigrationLogger, RecordingLogger, TracingLogger};
pub use migration::{MigrationInfo, MigrationUnit, SqlMigration, SqlMigrationBuilder};
pub use migrator::{MigrationOutcome, MigrationStatus, Migrator, StepOutcome};
pub use plan::{build_plan, Direction, MigrationPlan};
pub use provider::{TransformationProvider, DEFAULT_LEDGER_TABLE};
pub use schema::{Column, ColumnProperty, ColumnType, DbType, ForeignKey, ForeignKeyAction, Value};
pub use script::{split_batch, ScriptBundle};

pub use async_trait::async_trait;

/// Re-export sqlx types for convenience
pub use sqlx;
