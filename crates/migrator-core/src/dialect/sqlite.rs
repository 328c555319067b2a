//! SQLite dialect.

use super::{Capabilities, CatalogQueries, Dialect, DialectKind, IdentityRule, QuoteRule, TypeMap};
use crate::formatter::SqlFormatter;
use crate::schema::DbType;

impl Dialect {
    /// SQLite: every identifier quoted, no in-place constraint changes.
    #[must_use]
    pub fn sqlite() -> Self {
        Self {
            kind: DialectKind::SQLite,
            name: "SQLite",
            type_map: type_map(),
            quote_rule: QuoteRule::Always,
            quote_open: '"',
            quote_close: '"',
            reserved_words: &[],
            capabilities: Capabilities {
                rename_table: true,
                rename_column: true,
                remove_column: true,
                change_column: false,
                add_primary_key: false,
                add_foreign_key: false,
                add_unique_constraint: false,
                add_check_constraint: false,
                remove_constraint: false,
                on_update_actions: true,
            },
            identity: IdentityRule::InlinePrimaryKey("INTEGER PRIMARY KEY AUTOINCREMENT"),
            true_literal: "1",
            false_literal: "0",
            batch_separator: "GO",
            catalog: CatalogQueries {
                table_exists,
                column_exists,
                constraint_exists,
                index_exists,
                list_tables,
            },
            change_column: None,
        }
    }
}

fn type_map() -> TypeMap {
    let mut map = TypeMap::new();
    map.register(DbType::AnsiStringFixedLength, "TEXT")
        .register_sized(DbType::AnsiStringFixedLength, 8000, "CHAR($l)")
        .register(DbType::AnsiString, "TEXT")
        .register_sized(DbType::AnsiString, 8000, "VARCHAR($l)")
        .register(DbType::StringFixedLength, "TEXT")
        .register_sized(DbType::StringFixedLength, 4000, "NCHAR($l)")
        .register(DbType::String, "TEXT")
        .register_sized(DbType::String, 4000, "NVARCHAR($l)")
        .register(DbType::Binary, "BLOB")
        .register(DbType::Boolean, "INTEGER")
        .register(DbType::Byte, "INTEGER")
        .register(DbType::Int16, "INTEGER")
        .register(DbType::Int32, "INTEGER")
        .register(DbType::Int64, "INTEGER")
        .register(DbType::Single, "REAL")
        .register(DbType::Double, "REAL")
        .register(DbType::Currency, "NUMERIC")
        .register(DbType::Decimal, "NUMERIC")
        .register_scaled(DbType::Decimal, 38, "NUMERIC($l, $s)", 0)
        .register(DbType::Date, "DATE")
        .register(DbType::DateTime, "DATETIME")
        .register(DbType::Time, "TIME")
        .register(DbType::Guid, "TEXT");
    map
}

fn table_exists(f: &SqlFormatter<'_>, table: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND lower(name) = lower({})",
        f.text(table)
    )
}

fn column_exists(f: &SqlFormatter<'_>, table: &str, column: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM pragma_table_info({}) WHERE lower(name) = lower({})",
        f.text(table),
        f.text(column)
    )
}

// Constraints only exist inside the table's CREATE statement.
fn constraint_exists(f: &SqlFormatter<'_>, table: &str, name: &str) -> String {
    let needle = format!("CONSTRAINT {}", f.quote(name));
    format!(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND lower(name) = lower({}) \
         AND instr(sql, {}) > 0",
        f.text(table),
        f.text(&needle)
    )
}

fn index_exists(f: &SqlFormatter<'_>, table: &str, name: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' \
         AND lower(tbl_name) = lower({}) AND lower(name) = lower({})",
        f.text(table),
        f.text(name)
    )
}

fn list_tables(_: &SqlFormatter<'_>) -> String {
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
     ORDER BY name"
        .to_string()
}
