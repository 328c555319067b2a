//! Provider and ledger behaviour against an in-memory SQLite database.

use migrator_core::{
    Column, ColumnProperty, DbType, ForeignKey, MigrationError, MigrationEvent, RecordingLogger,
    ScriptBundle, TransformationProvider, Value,
};
use std::io::Write;
use std::sync::Arc;

async fn provider() -> (TransformationProvider, Arc<RecordingLogger>) {
    let logger = RecordingLogger::new();
    let provider = TransformationProvider::create("sqlite", "sqlite::memory:", logger.clone())
        .await
        .unwrap();
    (provider, logger)
}

fn test_columns() -> Vec<Column> {
    vec![
        Column::new("Id", DbType::Int32).with_property(ColumnProperty::PRIMARY_KEY_WITH_IDENTITY),
        Column::new("Title", DbType::String.with_size(100)).with_property(ColumnProperty::NULL),
        Column::new("NumberColumn", DbType::Int32).with_property(ColumnProperty::NULL),
    ]
}

async fn count(provider: &mut TransformationProvider, sql: &str) -> i64 {
    provider.execute_scalar::<i64>(sql).await.unwrap()
}

#[tokio::test]
async fn test_add_and_remove_table() {
    let (mut provider, _) = provider().await;

    provider.add_table("Test", &test_columns()).await.unwrap();
    assert!(provider.table_exists("Test").await.unwrap());
    assert!(provider.table_exists("test").await.unwrap());
    assert!(provider.column_exists("Test", "Title").await.unwrap());
    assert!(!provider.column_exists("Test", "Missing").await.unwrap());

    provider.remove_table("Test").await.unwrap();
    assert!(!provider.table_exists("Test").await.unwrap());
}

#[tokio::test]
async fn test_introspection_is_false_for_missing_objects() {
    let (mut provider, _) = provider().await;

    assert!(!provider.table_exists("Nope").await.unwrap());
    assert!(!provider.column_exists("Nope", "Id").await.unwrap());
    assert!(!provider.constraint_exists("Nope", "PK_Nope").await.unwrap());
    assert!(!provider.index_exists("Nope", "IX_Nope").await.unwrap());
}

#[tokio::test]
async fn test_compound_primary_key_is_named() {
    let (mut provider, _) = provider().await;

    provider
        .add_table(
            "Test",
            &[
                Column::new("PersonId", DbType::Int32).with_property(ColumnProperty::PRIMARY_KEY),
                Column::new("AddressId", DbType::Int32).with_property(ColumnProperty::PRIMARY_KEY),
            ],
        )
        .await
        .unwrap();

    assert!(provider.constraint_exists("Test", "PK_Test").await.unwrap());
    assert!(!provider.constraint_exists("Test", "PK_Other").await.unwrap());
}

#[tokio::test]
async fn test_column_operations() {
    let (mut provider, _) = provider().await;
    provider.add_table("Test", &test_columns()).await.unwrap();

    provider
        .add_column(
            "Test",
            &Column::new("Flag", DbType::Boolean)
                .with_property(ColumnProperty::NOT_NULL)
                .with_default(false),
        )
        .await
        .unwrap();
    assert!(provider.column_exists("Test", "Flag").await.unwrap());

    provider.rename_column("Test", "Flag", "Enabled").await.unwrap();
    assert!(!provider.column_exists("Test", "Flag").await.unwrap());
    assert!(provider.column_exists("Test", "Enabled").await.unwrap());

    provider.remove_column("Test", "Enabled").await.unwrap();
    assert!(!provider.column_exists("Test", "Enabled").await.unwrap());
}

#[tokio::test]
async fn test_rename_table() {
    let (mut provider, _) = provider().await;
    provider.add_table("Test", &test_columns()).await.unwrap();

    provider.rename_table("Test", "Renamed").await.unwrap();
    assert!(!provider.table_exists("Test").await.unwrap());
    assert!(provider.table_exists("Renamed").await.unwrap());
}

#[tokio::test]
async fn test_indexes() {
    let (mut provider, _) = provider().await;
    provider.add_table("Test", &test_columns()).await.unwrap();

    provider.add_index("IX_Test_Title", "Test", &["Title"], true).await.unwrap();
    assert!(provider.index_exists("Test", "IX_Test_Title").await.unwrap());

    provider.remove_index("Test", "IX_Test_Title").await.unwrap();
    assert!(!provider.index_exists("Test", "IX_Test_Title").await.unwrap());
}

#[tokio::test]
async fn test_unsupported_operations_emit_no_sql() {
    let (mut provider, logger) = provider().await;
    provider.add_table("Test", &test_columns()).await.unwrap();
    let before = logger.statements().len();

    let err = provider
        .add_check_constraint("CK_Test_Number", "Test", "\"NumberColumn\" > 0")
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::NotSupported { .. }));

    let err = provider
        .add_foreign_key(&ForeignKey::new("FK_Test_Self", "Test", &["NumberColumn"], "Test", &["Id"]))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::NotSupported { .. }));

    let err = provider
        .change_column("Test", &Column::new("Title", DbType::String.with_size(200)))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::NotSupported { .. }));

    assert_eq!(logger.statements().len(), before);
    assert!(provider.column_exists("Test", "NumberColumn").await.unwrap());
}

#[tokio::test]
async fn test_insert_null_is_sql_null() {
    let (mut provider, _) = provider().await;
    provider.add_table("Test", &test_columns()).await.unwrap();

    provider
        .insert("Test", &["Title", "NumberColumn"], &[Value::Null, Value::Int(1)])
        .await
        .unwrap();
    provider
        .insert("Test", &["Title", "NumberColumn"], &[Value::from("null"), Value::Int(2)])
        .await
        .unwrap();

    assert_eq!(count(&mut provider, r#"SELECT COUNT(*) FROM "Test" WHERE "Title" IS NULL"#).await, 1);
    assert_eq!(count(&mut provider, r#"SELECT COUNT(*) FROM "Test" WHERE "Title" = 'null'"#).await, 1);
}

#[tokio::test]
async fn test_insert_escapes_quotes() {
    let (mut provider, _) = provider().await;
    provider.add_table("Test", &test_columns()).await.unwrap();

    provider
        .insert("Test", &["Title"], &[Value::from("O'Brien")])
        .await
        .unwrap();
    let title: String = provider
        .execute_scalar(r#"SELECT "Title" FROM "Test""#)
        .await
        .unwrap();
    assert_eq!(title, "O'Brien");
}

#[tokio::test]
async fn test_update_and_delete() {
    let (mut provider, _) = provider().await;
    provider.add_table("Test", &test_columns()).await.unwrap();
    for n in 1..=3 {
        provider
            .insert("Test", &["Title", "NumberColumn"], &[Value::from("row"), Value::Int(n)])
            .await
            .unwrap();
    }

    let updated = provider
        .update("Test", &["Title"], &[Value::from("first")], Some("\"NumberColumn\" = 1"))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let deleted = provider
        .delete("Test", &["Title", "NumberColumn"], &[Value::from("row"), Value::Int(2)])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(count(&mut provider, r#"SELECT COUNT(*) FROM "Test""#).await, 2);

    let deleted = provider.delete("Test", &[], &[]).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(count(&mut provider, r#"SELECT COUNT(*) FROM "Test""#).await, 0);
}

#[tokio::test]
async fn test_mismatched_arrays_are_rejected() {
    let (mut provider, logger) = provider().await;
    provider.add_table("Test", &test_columns()).await.unwrap();
    let before = logger.statements().len();

    let err = provider
        .insert("Test", &["Title", "NumberColumn"], &[Value::Int(1)])
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::InvalidInput(_)));
    assert_eq!(logger.statements().len(), before);
}

#[tokio::test]
async fn test_execute_batch_skips_blank_segments() {
    let (mut provider, _) = provider().await;

    let script = "CREATE TABLE a (id INTEGER)\nGO\ngo\n\nGO\nCREATE TABLE b (id INTEGER)\n  GO  \n";
    let executed = provider.execute_batch(script).await.unwrap();

    assert_eq!(executed, 2);
    assert!(provider.table_exists("a").await.unwrap());
    assert!(provider.table_exists("b").await.unwrap());
}

#[tokio::test]
async fn test_execute_batch_stops_at_failure() {
    let (mut provider, _) = provider().await;

    let script = "CREATE TABLE a (id INTEGER)\nGO\nNOT VALID SQL\nGO\nCREATE TABLE b (id INTEGER)";
    let err = provider.execute_batch(script).await.unwrap_err();

    assert!(matches!(err, MigrationError::Execution(ref msg) if msg.contains("NOT VALID SQL")));
    assert!(provider.table_exists("a").await.unwrap());
    assert!(!provider.table_exists("b").await.unwrap());
}

#[tokio::test]
async fn test_execute_script_file() {
    let (mut provider, _) = provider().await;
    let mut file = tempfile::Builder::new().suffix(".sql").tempfile().unwrap();
    writeln!(file, "CREATE TABLE from_file (id INTEGER)\nGO\nINSERT INTO from_file VALUES (1)").unwrap();

    let executed = provider.execute_script_file(file.path()).await.unwrap();
    assert_eq!(executed, 2);
    assert_eq!(count(&mut provider, "SELECT COUNT(*) FROM from_file").await, 1);
}

#[tokio::test]
async fn test_execute_from_resource() {
    let (mut provider, _) = provider().await;
    let bundle = ScriptBundle::new().with_script("seed", "CREATE TABLE seeded (id INTEGER)");

    provider.execute_from_resource(&bundle, "seed").await.unwrap();
    assert!(provider.table_exists("seeded").await.unwrap());

    let err = provider.execute_from_resource(&bundle, "missing").await.unwrap_err();
    assert!(matches!(err, MigrationError::InvalidInput(_)));
}

#[tokio::test]
async fn test_get_tables() {
    let (mut provider, _) = provider().await;
    provider.add_table("Zeta", &test_columns()).await.unwrap();
    provider.add_table("Alpha", &test_columns()).await.unwrap();

    assert_eq!(provider.get_tables().await.unwrap(), vec!["Alpha", "Zeta"]);
}

#[tokio::test]
async fn test_statements_are_logged() {
    let (mut provider, logger) = provider().await;
    provider.execute_non_query("CREATE TABLE logged (id INTEGER)").await.unwrap();

    assert!(logger.events().contains(&MigrationEvent::Sql {
        sql: "CREATE TABLE logged (id INTEGER)".to_string(),
    }));
}

#[tokio::test]
async fn test_transaction_rollback_discards_work() {
    let (mut provider, _) = provider().await;

    provider.begin_transaction().await.unwrap();
    assert!(provider.in_transaction());
    provider.add_table("Temp", &test_columns()).await.unwrap();
    provider.rollback().await.unwrap();

    assert!(!provider.in_transaction());
    assert!(!provider.table_exists("Temp").await.unwrap());

    assert!(matches!(provider.commit().await, Err(MigrationError::InvalidInput(_))));
    provider.rollback().await.unwrap();
}

// =============================================================================
// Ledger
// =============================================================================

#[tokio::test]
async fn test_ledger_is_created_lazily() {
    let (mut provider, _) = provider().await;
    assert!(!provider.table_exists("SchemaInfo").await.unwrap());

    assert!(provider.get_applied_migrations("").await.unwrap().is_empty());
    assert!(provider.table_exists("SchemaInfo").await.unwrap());
    assert!(provider.constraint_exists("SchemaInfo", "PK_SchemaInfo").await.unwrap());

    // A second call finds the table and leaves it alone.
    assert!(provider.get_applied_migrations("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ledger_apply_and_unapply() {
    let (mut provider, _) = provider().await;

    provider.migration_applied(3, "").await.unwrap();
    provider.migration_applied(1, "").await.unwrap();
    provider.migration_applied(2, "").await.unwrap();
    assert_eq!(provider.get_applied_migrations("").await.unwrap(), vec![1, 2, 3]);

    provider.migration_unapplied(2, "").await.unwrap();
    assert_eq!(provider.get_applied_migrations("").await.unwrap(), vec![1, 3]);
}

#[tokio::test]
async fn test_ledger_keys_are_isolated() {
    let (mut provider, _) = provider().await;

    provider.migration_applied(1, "billing").await.unwrap();
    provider.migration_applied(2, "billing").await.unwrap();
    provider.migration_applied(1, "").await.unwrap();

    assert_eq!(provider.get_applied_migrations("billing").await.unwrap(), vec![1, 2]);
    assert_eq!(provider.get_applied_migrations("").await.unwrap(), vec![1]);

    provider.migration_unapplied(1, "billing").await.unwrap();
    assert_eq!(provider.get_applied_migrations("billing").await.unwrap(), vec![2]);
    assert_eq!(provider.get_applied_migrations("").await.unwrap(), vec![1]);
}

#[tokio::test]
async fn test_ledger_table_name_is_configurable() {
    let (provider, _) = provider().await;
    let mut provider = provider.with_ledger_table("Applied");

    provider.migration_applied(7, "").await.unwrap();
    assert!(provider.table_exists("Applied").await.unwrap());
    assert!(!provider.table_exists("SchemaInfo").await.unwrap());
}

#[tokio::test]
async fn test_ledger_creation_joins_open_transaction() {
    let (mut provider, _) = provider().await;

    provider.begin_transaction().await.unwrap();
    provider.migration_applied(1, "").await.unwrap();
    provider.rollback().await.unwrap();

    assert!(!provider.table_exists("SchemaInfo").await.unwrap());
}
