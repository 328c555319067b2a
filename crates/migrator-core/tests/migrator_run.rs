//! End-to-end migrator runs against an in-memory SQLite database.

use migrator_core::{
    async_trait, default_logger, Column, ColumnProperty, DbType, Direction, MigrationError, MigrationEvent,
    MigrationRegistry, MigrationUnit, Migrator, RecordingLogger, Result, SqlMigration,
    TransformationProvider,
};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Creates a table going up and drops it going down.
struct CreateTable(&'static str);

#[async_trait]
impl MigrationUnit for CreateTable {
    fn name(&self) -> &str {
        self.0
    }

    async fn up(&self, provider: &mut TransformationProvider) -> Result<()> {
        provider
            .add_table(
                self.0,
                &[Column::new("Id", DbType::Int64).with_property(ColumnProperty::PRIMARY_KEY_WITH_IDENTITY)],
            )
            .await
    }

    async fn down(&self, provider: &mut TransformationProvider) -> Result<()> {
        provider.remove_table(self.0).await
    }
}

/// Does real work, then fails.
struct Broken;

#[async_trait]
impl MigrationUnit for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    async fn up(&self, provider: &mut TransformationProvider) -> Result<()> {
        provider
            .add_table("HalfDone", &[Column::new("Id", DbType::Int32)])
            .await?;
        Err(MigrationError::Failed {
            version: 2,
            reason: "boom".to_string(),
        })
    }

    async fn down(&self, _provider: &mut TransformationProvider) -> Result<()> {
        Ok(())
    }
}

fn tables_registry() -> MigrationRegistry {
    MigrationRegistry::new()
        .with(1, "Users", || CreateTable("Users"))
        .and_then(|r| r.with(2, "Orders", || CreateTable("Orders")))
        .and_then(|r| r.with(3, "Invoices", || CreateTable("Invoices")))
        .unwrap()
}

fn broken_registry() -> MigrationRegistry {
    MigrationRegistry::new()
        .with(1, "Users", || CreateTable("Users"))
        .and_then(|r| r.with(2, "broken", || Broken))
        .and_then(|r| r.with(3, "Invoices", || CreateTable("Invoices")))
        .unwrap()
}

async fn migrator(registry: MigrationRegistry) -> (Migrator, Arc<RecordingLogger>) {
    let logger = RecordingLogger::new();
    let provider = TransformationProvider::create("sqlite", "sqlite::memory:", logger.clone())
        .await
        .unwrap();
    (Migrator::new(provider, registry, ""), logger)
}

#[tokio::test]
async fn test_forward_run_applies_every_version() {
    let (mut migrator, _) = migrator(tables_registry()).await;

    let outcome = migrator.migrate(None).await.unwrap();

    assert_eq!(outcome.start_version, 0);
    assert_eq!(outcome.target_version, 3);
    assert_eq!(outcome.direction, Direction::Up);
    let versions: Vec<i64> = outcome.steps.iter().map(|s| s.version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert_eq!(migrator.applied_migrations().await.unwrap(), vec![1, 2, 3]);

    let provider = migrator.provider_mut();
    for table in ["Users", "Orders", "Invoices"] {
        assert!(provider.table_exists(table).await.unwrap());
    }
}

#[tokio::test]
async fn test_second_run_is_a_noop() {
    let (mut migrator, _) = migrator(tables_registry()).await;
    migrator.migrate(None).await.unwrap();

    let outcome = migrator.migrate(None).await.unwrap();
    assert!(outcome.is_noop());
    assert_eq!(outcome.start_version, 3);
}

#[tokio::test]
async fn test_backward_run_unwinds_newest_first() {
    let (mut migrator, logger) = migrator(tables_registry()).await;
    migrator.migrate(None).await.unwrap();

    let outcome = migrator.migrate(Some(1)).await.unwrap();

    assert_eq!(outcome.direction, Direction::Down);
    let versions: Vec<i64> = outcome.steps.iter().map(|s| s.version).collect();
    assert_eq!(versions, vec![3, 2]);
    assert!(outcome.steps.iter().all(|s| s.direction == Direction::Down));
    assert_eq!(migrator.applied_migrations().await.unwrap(), vec![1]);

    let downs: Vec<MigrationEvent> = logger
        .lifecycle_events()
        .into_iter()
        .filter(|e| matches!(e, MigrationEvent::MigrateDown { .. }))
        .collect();
    assert_eq!(
        downs,
        vec![
            MigrationEvent::MigrateDown { version: 3, name: "Invoices".to_string() },
            MigrationEvent::MigrateDown { version: 2, name: "Orders".to_string() },
        ]
    );

    let provider = migrator.provider_mut();
    assert!(provider.table_exists("Users").await.unwrap());
    assert!(!provider.table_exists("Orders").await.unwrap());
    assert!(!provider.table_exists("Invoices").await.unwrap());
}

#[tokio::test]
async fn test_failed_step_is_rolled_back_and_aborts_run() {
    let (mut migrator, logger) = migrator(broken_registry()).await;

    let err = migrator.migrate(None).await.unwrap_err();
    assert!(matches!(err, MigrationError::Failed { version: 2, .. }));

    // Step 1 stays committed, step 2 left nothing behind, step 3 never ran.
    assert_eq!(migrator.applied_migrations().await.unwrap(), vec![1]);
    let provider = migrator.provider_mut();
    assert!(provider.table_exists("Users").await.unwrap());
    assert!(!provider.table_exists("HalfDone").await.unwrap());
    assert!(!provider.table_exists("Invoices").await.unwrap());
    assert!(!provider.in_transaction());

    assert_eq!(
        logger.lifecycle_events(),
        vec![
            MigrationEvent::RunStarted { start: 0, target: 3 },
            MigrationEvent::MigrateUp { version: 1, name: "Users".to_string() },
            MigrationEvent::MigrateUp { version: 2, name: "broken".to_string() },
            MigrationEvent::Exception {
                version: 2,
                name: "broken".to_string(),
                error: "Migration 2 failed: boom".to_string(),
            },
            MigrationEvent::RollingBack { version: 0 },
        ]
    );
}

#[tokio::test]
async fn test_failed_commit_is_rolled_back() {
    let mut registry = MigrationRegistry::new();
    registry
        .register_sql(SqlMigration::new(
            1,
            "orphans",
            "CREATE TABLE parents (id INTEGER PRIMARY KEY)\nGO\n\
             CREATE TABLE children (parent_id INTEGER REFERENCES parents(id) DEFERRABLE INITIALLY DEFERRED)\nGO\n\
             INSERT INTO children VALUES (5)",
        ))
        .unwrap();
    let (mut migrator, logger) = migrator(registry).await;

    // The deferred foreign key only fails at COMMIT.
    let err = migrator.migrate(None).await.unwrap_err();
    assert!(matches!(err, MigrationError::Execution(ref msg) if msg.contains("COMMIT")));
    assert!(logger
        .lifecycle_events()
        .contains(&MigrationEvent::RollingBack { version: 0 }));

    assert!(!migrator.provider_mut().in_transaction());
    assert!(migrator.applied_migrations().await.unwrap().is_empty());
    let provider = migrator.provider_mut();
    assert!(!provider.table_exists("parents").await.unwrap());
    assert!(!provider.table_exists("children").await.unwrap());

    provider.begin_transaction().await.unwrap();
    provider.rollback().await.unwrap();
}

#[tokio::test]
async fn test_run_events_in_order() {
    let (mut migrator, logger) = migrator(tables_registry()).await;
    migrator.migrate(Some(2)).await.unwrap();

    assert_eq!(
        logger.lifecycle_events(),
        vec![
            MigrationEvent::RunStarted { start: 0, target: 2 },
            MigrationEvent::MigrateUp { version: 1, name: "Users".to_string() },
            MigrationEvent::MigrateUp { version: 2, name: "Orders".to_string() },
            MigrationEvent::RunFinished { executed: 2 },
        ]
    );
}

#[tokio::test]
async fn test_missing_unit_is_fatal() {
    let registry = MigrationRegistry::new()
        .with(1, "Users", || CreateTable("Users"))
        .and_then(|r| r.with(3, "Invoices", || CreateTable("Invoices")))
        .unwrap();
    let (mut migrator, logger) = migrator(registry).await;
    migrator.migrate(None).await.unwrap();
    migrator.provider_mut().migration_applied(2, "").await.unwrap();

    let err = migrator.migrate(Some(0)).await.unwrap_err();

    assert!(matches!(err, MigrationError::MissingMigration { version: 2 }));
    assert!(!err.is_retryable());
    assert_eq!(migrator.applied_migrations().await.unwrap(), vec![1, 2]);
    assert!(logger
        .lifecycle_events()
        .iter()
        .any(|e| matches!(e, MigrationEvent::Exception { version: 2, .. })));
}

#[tokio::test]
async fn test_inconsistent_versions_abort_before_execution() {
    let (mut migrator, logger) = migrator(tables_registry()).await;
    {
        let provider = migrator.provider_mut();
        provider.migration_applied(1, "").await.unwrap();
        provider.migration_applied(3, "").await.unwrap();
    }

    let err = migrator.migrate(None).await.unwrap_err();

    match err {
        MigrationError::VersionConsistency { versions } => assert_eq!(versions, vec![2]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!logger
        .lifecycle_events()
        .iter()
        .any(|e| matches!(e, MigrationEvent::RunStarted { .. })));
    assert!(!migrator.provider_mut().table_exists("Orders").await.unwrap());
}

#[tokio::test]
async fn test_plan_is_a_dry_run() {
    let (mut migrator, _) = migrator(tables_registry()).await;

    let plan = migrator.plan(None).await.unwrap();
    assert_eq!(plan.versions, vec![1, 2, 3]);

    assert!(migrator.applied_migrations().await.unwrap().is_empty());
    assert!(!migrator.provider_mut().table_exists("Users").await.unwrap());
}

#[tokio::test]
async fn test_status_lists_known_versions() {
    let (mut migrator, _) = migrator(tables_registry()).await;
    migrator.migrate(Some(1)).await.unwrap();
    migrator.provider_mut().migration_applied(9, "").await.unwrap();

    let status = migrator.status().await.unwrap();
    let summary: Vec<(i64, bool)> = status.iter().map(|s| (s.version, s.applied)).collect();
    assert_eq!(summary, vec![(1, true), (2, false), (3, false), (9, true)]);
    assert_eq!(status[0].name.as_deref(), Some("Users"));
    assert_eq!(status[3].name, None);
}

#[tokio::test]
async fn test_keys_scope_runs() {
    let logger = RecordingLogger::new();
    let provider = TransformationProvider::create("sqlite", "sqlite::memory:", logger.clone())
        .await
        .unwrap();
    let mut billing = Migrator::new(provider, tables_registry(), "billing");
    billing.migrate(Some(1)).await.unwrap();
    assert_eq!(billing.key(), "billing");

    let provider = billing.into_provider();
    let registry = MigrationRegistry::new()
        .with(1, "Audit", || CreateTable("Audit"))
        .unwrap();
    let mut audit = Migrator::new(provider, registry, "audit");
    let outcome = audit.migrate(None).await.unwrap();

    assert_eq!(outcome.start_version, 0);
    assert_eq!(audit.applied_migrations().await.unwrap(), vec![1]);
    assert_eq!(
        audit.provider_mut().get_applied_migrations("billing").await.unwrap(),
        vec![1]
    );
}

#[tokio::test]
async fn test_execute_single_step() {
    let (mut migrator, _) = migrator(tables_registry()).await;

    let step = migrator.execute_migration(1, 0).await.unwrap();
    assert_eq!(step.direction, Direction::Up);
    assert_eq!(migrator.applied_migrations().await.unwrap(), vec![1]);

    let step = migrator.execute_migration(1, 1).await.unwrap();
    assert_eq!(step.direction, Direction::Down);
    assert!(migrator.applied_migrations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_script_migrations() {
    let mut registry = MigrationRegistry::new();
    registry
        .register_sql(
            SqlMigration::builder(1, "notes")
                .up("CREATE TABLE notes (id INTEGER)\nGO\nINSERT INTO notes VALUES (1)")
                .down("DROP TABLE notes")
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_sql(SqlMigration::new(2, "tags", "CREATE TABLE tags (id INTEGER)"))
        .unwrap();
    let (mut migrator, _) = migrator(registry).await;

    migrator.migrate(None).await.unwrap();
    let rows: i64 = migrator
        .provider_mut()
        .execute_scalar("SELECT COUNT(*) FROM notes")
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let err = migrator.migrate(Some(0)).await.unwrap_err();
    assert!(matches!(err, MigrationError::RollbackNotSupported { version: 2 }));
    assert_eq!(migrator.applied_migrations().await.unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_without_transactions_failure_keeps_partial_work() {
    let (migrator, _) = migrator(broken_registry()).await;
    let mut migrator = migrator.with_transactions(false);

    migrator.migrate(None).await.unwrap_err();

    assert_eq!(migrator.applied_migrations().await.unwrap(), vec![1]);
    assert!(migrator.provider_mut().table_exists("HalfDone").await.unwrap());
}

/// Collects formatted `tracing` output.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_tracing_logger_reports_each_event_once() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let provider = TransformationProvider::create("sqlite", "sqlite::memory:", default_logger())
        .await
        .unwrap();
    let mut migrator = Migrator::new(provider, broken_registry(), "");
    migrator.migrate(None).await.unwrap_err();

    let output = capture.text();
    assert_eq!(output.matches("Starting migration run").count(), 1);
    assert_eq!(output.matches("Migration failed").count(), 1);
    assert_eq!(output.matches("Rolling back to version").count(), 1);
}
