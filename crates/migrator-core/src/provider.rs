//! Transformation provider.
//!
//! [`TransformationProvider`] executes dialect-rendered DDL and DML on one
//! exclusively owned connection. Statements run strictly one after another;
//! transactions are explicit and at most one is open at a time.

use crate::config::MigrationConfig;
use crate::connection;
use crate::ddl::DdlRenderer;
use crate::dialect::{Dialect, DialectKind};
use crate::error::{MigrationError, Result};
use crate::formatter::{SqlFormatter, Token};
use crate::logger::{MigrationEvent, MigrationLogger};
use crate::schema::{Column, ForeignKey, Value};
use crate::script::{split_batch, ScriptBundle};
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, Executor};
use std::path::Path;
use std::sync::Arc;

/// Default ledger table name.
pub const DEFAULT_LEDGER_TABLE: &str = "SchemaInfo";

/// Executes schema operations against a live database.
pub struct TransformationProvider {
    dialect: Dialect,
    conn: AnyConnection,
    logger: Arc<dyn MigrationLogger>,
    pub(crate) ledger_table: String,
    in_transaction: bool,
}

impl TransformationProvider {
    /// Wrap an open connection.
    #[must_use]
    pub fn new(dialect: Dialect, conn: AnyConnection, logger: Arc<dyn MigrationLogger>) -> Self {
        Self {
            dialect,
            conn,
            logger,
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            in_transaction: false,
        }
    }

    /// Resolve a dialect identifier and connect.
    pub async fn create(
        dialect_id: &str,
        connection_string: &str,
        logger: Arc<dyn MigrationLogger>,
    ) -> Result<Self> {
        let kind: DialectKind = dialect_id.parse()?;
        let conn = connection::connect(connection_string, connection::DEFAULT_CONNECT_TIMEOUT).await?;
        Ok(Self::new(Dialect::for_kind(kind), conn, logger))
    }

    /// Connect using a validated configuration.
    pub async fn connect(config: &MigrationConfig, logger: Arc<dyn MigrationLogger>) -> Result<Self> {
        config.validate()?;
        let conn = connection::connect(&config.connection_string, config.connect_timeout).await?;
        Ok(Self::new(Dialect::for_kind(config.dialect), conn, logger)
            .with_ledger_table(config.ledger_table.clone()))
    }

    /// Use a different ledger table name.
    #[must_use]
    pub fn with_ledger_table(mut self, name: impl Into<String>) -> Self {
        self.ledger_table = name.into();
        self
    }

    /// The dialect.
    #[must_use]
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Formatter bound to the dialect.
    #[must_use]
    pub fn formatter(&self) -> SqlFormatter<'_> {
        self.dialect.formatter()
    }

    /// Statement renderer bound to the dialect.
    #[must_use]
    pub fn ddl(&self) -> DdlRenderer<'_> {
        DdlRenderer::new(&self.dialect)
    }

    /// The event sink.
    #[must_use]
    pub fn logger(&self) -> Arc<dyn MigrationLogger> {
        Arc::clone(&self.logger)
    }

    /// Ledger table name.
    #[must_use]
    pub fn ledger_table(&self) -> &str {
        &self.ledger_table
    }

    /// The underlying connection.
    pub fn connection_mut(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }

    /// Render a template with the dialect's escaping.
    pub fn format_sql(&self, template: &str, tokens: &[Token<'_>]) -> Result<String> {
        self.formatter().format(template, tokens)
    }

    /// Render `a = 'x', b = 'y'` pairs.
    pub fn join_columns_and_values(&self, columns: &[&str], values: &[Value]) -> Result<String> {
        self.formatter().join_columns_and_values(columns, values)
    }

    // =====================================================================
    // Transactions
    // =====================================================================

    /// Whether a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Open a transaction.
    pub async fn begin_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(MigrationError::invalid_input("A transaction is already open"));
        }
        self.run_raw("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the open transaction.
    ///
    /// A failed `COMMIT` leaves the transaction marked open so that
    /// [`rollback`](Self::rollback) still ends it.
    pub async fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(MigrationError::invalid_input("No transaction to commit"));
        }
        self.run_raw("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    /// Roll back the open transaction. Does nothing when none is open.
    pub async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.run_raw("ROLLBACK").await
    }

    async fn run_raw(&mut self, sql: &str) -> Result<()> {
        self.logger.log(&MigrationEvent::Sql {
            sql: sql.to_string(),
        });
        self.conn
            .execute(sql)
            .await
            .map_err(|e| MigrationError::execution(format!("{e} (SQL: {sql})")))?;
        Ok(())
    }

    // =====================================================================
    // Raw execution
    // =====================================================================

    /// Execute one statement, returning the affected row count.
    pub async fn execute_non_query(&mut self, sql: &str) -> Result<u64> {
        self.logger.log(&MigrationEvent::Sql {
            sql: sql.to_string(),
        });
        let result = self
            .conn
            .execute(sql)
            .await
            .map_err(|e| MigrationError::execution(format!("{e} (SQL: {sql})")))?;
        Ok(result.rows_affected())
    }

    /// Execute a query and decode the first column of its first row.
    pub async fn execute_scalar<T>(&mut self, sql: &str) -> Result<T>
    where
        T: Send + Unpin,
        (T,): for<'r> sqlx::FromRow<'r, AnyRow>,
    {
        self.logger.log(&MigrationEvent::Sql {
            sql: sql.to_string(),
        });
        sqlx::query_scalar::<_, T>(sql)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| MigrationError::execution(format!("{e} (SQL: {sql})")))
    }

    /// Execute a query and return every row.
    pub async fn execute_query(&mut self, sql: &str) -> Result<Vec<AnyRow>> {
        self.logger.log(&MigrationEvent::Sql {
            sql: sql.to_string(),
        });
        sqlx::query(sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| MigrationError::execution(format!("{e} (SQL: {sql})")))
    }

    async fn execute_all(&mut self, statements: Vec<String>) -> Result<()> {
        for sql in statements {
            self.execute_non_query(&sql).await?;
        }
        Ok(())
    }

    /// Execute a multi-statement script split on the batch separator.
    ///
    /// Statements run in order; a failure leaves earlier statements applied
    /// unless the caller opened a transaction. Returns the number executed.
    pub async fn execute_batch(&mut self, script: &str) -> Result<usize> {
        let statements = split_batch(script, self.dialect.batch_separator());
        let count = statements.len();
        self.execute_all(statements).await?;
        Ok(count)
    }

    /// Read a script file and execute it as a batch.
    pub async fn execute_script_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let script = tokio::fs::read_to_string(path.as_ref()).await?;
        self.execute_batch(&script).await
    }

    /// Execute a named script from a bundle as a batch.
    pub async fn execute_from_resource(&mut self, bundle: &ScriptBundle, name: &str) -> Result<usize> {
        let script = bundle.get(name)?.to_string();
        self.execute_batch(&script).await
    }

    // =====================================================================
    // Introspection
    // =====================================================================

    async fn count(&mut self, sql: String) -> Result<bool> {
        Ok(self.execute_scalar::<i64>(&sql).await? > 0)
    }

    /// Whether a table exists.
    pub async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let sql = (self.dialect.catalog().table_exists)(&self.formatter(), table);
        self.count(sql).await
    }

    /// Whether a column exists. False when the table itself is missing.
    pub async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        let sql = (self.dialect.catalog().column_exists)(&self.formatter(), table, column);
        self.count(sql).await
    }

    /// Whether a named constraint exists on a table.
    pub async fn constraint_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        let sql = (self.dialect.catalog().constraint_exists)(&self.formatter(), table, name);
        self.count(sql).await
    }

    /// Whether a named index exists on a table.
    pub async fn index_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        let sql = (self.dialect.catalog().index_exists)(&self.formatter(), table, name);
        self.count(sql).await
    }

    /// User tables, sorted by name.
    pub async fn get_tables(&mut self) -> Result<Vec<String>> {
        let sql = (self.dialect.catalog().list_tables)(&self.formatter());
        self.logger.log(&MigrationEvent::Sql { sql: sql.clone() });
        sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| MigrationError::execution(format!("{e} (SQL: {sql})")))
    }

    // =====================================================================
    // Tables and columns
    // =====================================================================

    /// Create a table.
    pub async fn add_table(&mut self, table: &str, columns: &[Column]) -> Result<()> {
        let sql = self.ddl().create_table(table, columns)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Drop a table.
    pub async fn remove_table(&mut self, table: &str) -> Result<()> {
        let sql = self.ddl().drop_table(table)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Rename a table.
    pub async fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let sql = self.ddl().rename_table(old_name, new_name)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Add a column.
    pub async fn add_column(&mut self, table: &str, column: &Column) -> Result<()> {
        let sql = self.ddl().add_column(table, column)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Drop a column.
    pub async fn remove_column(&mut self, table: &str, column: &str) -> Result<()> {
        let sql = self.ddl().remove_column(table, column)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Rename a column.
    pub async fn rename_column(&mut self, table: &str, old_name: &str, new_name: &str) -> Result<()> {
        let sql = self.ddl().rename_column(table, old_name, new_name)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Change a column's type, nullability and default.
    pub async fn change_column(&mut self, table: &str, column: &Column) -> Result<()> {
        let statements = self.ddl().change_column(table, column)?;
        self.execute_all(statements).await
    }

    // =====================================================================
    // Constraints and indexes
    // =====================================================================

    /// Add a primary key.
    pub async fn add_primary_key(&mut self, name: &str, table: &str, columns: &[&str]) -> Result<()> {
        let sql = self.ddl().add_primary_key(name, table, columns)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Add a foreign key.
    pub async fn add_foreign_key(&mut self, key: &ForeignKey) -> Result<()> {
        let sql = self.ddl().add_foreign_key(key)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Add a unique constraint.
    pub async fn add_unique_constraint(
        &mut self,
        name: &str,
        table: &str,
        columns: &[&str],
    ) -> Result<()> {
        let sql = self.ddl().add_unique_constraint(name, table, columns)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Add a check constraint.
    pub async fn add_check_constraint(&mut self, name: &str, table: &str, check_sql: &str) -> Result<()> {
        let sql = self.ddl().add_check_constraint(name, table, check_sql)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Drop a named constraint.
    pub async fn remove_constraint(&mut self, table: &str, name: &str) -> Result<()> {
        let sql = self.ddl().remove_constraint(table, name)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Create an index.
    pub async fn add_index(
        &mut self,
        name: &str,
        table: &str,
        columns: &[&str],
        unique: bool,
    ) -> Result<()> {
        let sql = self.ddl().add_index(name, table, columns, unique)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    /// Drop an index.
    pub async fn remove_index(&mut self, table: &str, name: &str) -> Result<()> {
        tracing::trace!(table, index = name, "Dropping index");
        let sql = self.ddl().remove_index(name)?;
        self.execute_non_query(&sql).await.map(drop)
    }

    // =====================================================================
    // Data
    // =====================================================================

    /// Insert one row.
    pub async fn insert(&mut self, table: &str, columns: &[&str], values: &[Value]) -> Result<u64> {
        let sql = self.ddl().insert(table, columns, values)?;
        self.execute_non_query(&sql).await
    }

    /// Update rows matching an optional WHERE clause.
    pub async fn update(
        &mut self,
        table: &str,
        columns: &[&str],
        values: &[Value],
        where_clause: Option<&str>,
    ) -> Result<u64> {
        let sql = self.ddl().update(table, columns, values, where_clause)?;
        self.execute_non_query(&sql).await
    }

    /// Delete rows matching every column/value pair; no pairs deletes all rows.
    pub async fn delete(&mut self, table: &str, columns: &[&str], values: &[Value]) -> Result<u64> {
        let sql = self.ddl().delete(table, columns, values)?;
        self.execute_non_query(&sql).await
    }

    /// Delete rows matching an optional WHERE clause.
    pub async fn delete_where(&mut self, table: &str, where_clause: Option<&str>) -> Result<u64> {
        let sql = self.ddl().delete_where(table, where_clause)?;
        self.execute_non_query(&sql).await
    }
}

impl std::fmt::Debug for TransformationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationProvider")
            .field("dialect", &self.dialect.name())
            .field("ledger_table", &self.ledger_table)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}
