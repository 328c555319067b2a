//! Applied-migration ledger.
//!
//! One row per applied `(Version, Key)`. The table is created on first use,
//! inside whatever transaction is open at the time.

use crate::error::Result;
use crate::formatter::Token;
use crate::provider::TransformationProvider;
use crate::schema::{Column, ColumnProperty, DbType, Value};
use sqlx::Row;

/// Version column name.
pub const VERSION_COLUMN: &str = "Version";
/// Key column name.
pub const KEY_COLUMN: &str = "Key";
/// Maximum key length.
pub const KEY_LENGTH: u32 = 200;

/// Ledger table columns.
#[must_use]
pub fn ledger_columns() -> Vec<Column> {
    vec![
        Column::new(VERSION_COLUMN, DbType::Int64).with_property(ColumnProperty::PRIMARY_KEY),
        Column::new(KEY_COLUMN, DbType::String.with_size(KEY_LENGTH))
            .with_property(ColumnProperty::PRIMARY_KEY)
            .with_default(""),
    ]
}

impl TransformationProvider {
    /// Create the ledger table unless it exists.
    pub async fn ensure_ledger(&mut self) -> Result<()> {
        let table = self.ledger_table.clone();
        if self.table_exists(&table).await? {
            return Ok(());
        }
        tracing::info!(table = %table, "Creating migration ledger table");
        self.add_table(&table, &ledger_columns()).await
    }

    /// Applied versions for `key`, ascending.
    pub async fn get_applied_migrations(&mut self, key: &str) -> Result<Vec<i64>> {
        self.ensure_ledger().await?;
        let sql = self.format_sql(
            "SELECT {0} FROM {1} WHERE {2} = {3} ORDER BY {0}",
            &[
                Token::Identifier(VERSION_COLUMN),
                Token::Identifier(&self.ledger_table),
                Token::Identifier(KEY_COLUMN),
                Token::literal(key),
            ],
        )?;
        let rows = self.execute_query(&sql).await?;
        rows.iter()
            .map(|row| row.try_get::<i64, _>(0).map_err(Into::into))
            .collect()
    }

    /// Record `version` as applied under `key`.
    pub async fn migration_applied(&mut self, version: i64, key: &str) -> Result<()> {
        self.ensure_ledger().await?;
        let table = self.ledger_table.clone();
        self.insert(
            &table,
            &[VERSION_COLUMN, KEY_COLUMN],
            &[Value::Int(version), Value::from(key)],
        )
        .await
        .map(drop)
    }

    /// Remove the record of `version` under `key`.
    pub async fn migration_unapplied(&mut self, version: i64, key: &str) -> Result<()> {
        self.ensure_ledger().await?;
        let table = self.ledger_table.clone();
        self.delete(
            &table,
            &[VERSION_COLUMN, KEY_COLUMN],
            &[Value::Int(version), Value::from(key)],
        )
        .await
        .map(drop)
    }
}
