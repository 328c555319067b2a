//! PostgreSQL dialect.
//!
//! Unquoted identifiers are folded to lower case by the server, so names are
//! only quoted when folding would change them or they collide with a keyword.

use super::{Capabilities, CatalogQueries, Dialect, DialectKind, IdentityRule, QuoteRule, TypeMap};
use crate::formatter::SqlFormatter;
use crate::schema::{Column, ColumnProperty, DbType};

const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
    "case", "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false",
    "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "initially",
    "intersect", "into", "lateral", "leading", "limit", "localtime",
    "localtimestamp", "not", "null", "offset", "on", "only", "or", "order", "placing",
    "primary", "references", "returning", "select", "session_user", "some", "symmetric",
    "table", "then", "to", "trailing", "true", "union", "unique", "user", "using",
    "variadic", "when", "where", "window", "with",
];

impl Dialect {
    /// PostgreSQL: quoting on demand, full constraint support.
    #[must_use]
    pub fn postgres() -> Self {
        Self {
            kind: DialectKind::PostgreSQL,
            name: "PostgreSQL",
            type_map: type_map(),
            quote_rule: QuoteRule::WhenNeeded,
            quote_open: '"',
            quote_close: '"',
            reserved_words: RESERVED_WORDS,
            capabilities: Capabilities {
                rename_table: true,
                rename_column: true,
                remove_column: true,
                change_column: true,
                add_primary_key: true,
                add_foreign_key: true,
                add_unique_constraint: true,
                add_check_constraint: true,
                remove_constraint: true,
                on_update_actions: true,
            },
            identity: IdentityRule::Suffix("GENERATED BY DEFAULT AS IDENTITY"),
            true_literal: "TRUE",
            false_literal: "FALSE",
            batch_separator: "GO",
            catalog: CatalogQueries {
                table_exists,
                column_exists,
                constraint_exists,
                index_exists,
                list_tables,
            },
            change_column: Some(change_column),
        }
    }
}

fn type_map() -> TypeMap {
    let mut map = TypeMap::new();
    map.register(DbType::AnsiStringFixedLength, "CHAR(255)")
        .register_sized(DbType::AnsiStringFixedLength, 10_485_760, "CHAR($l)")
        .register(DbType::AnsiString, "VARCHAR(255)")
        .register_sized(DbType::AnsiString, 10_485_760, "VARCHAR($l)")
        .register(DbType::StringFixedLength, "CHAR(255)")
        .register_sized(DbType::StringFixedLength, 10_485_760, "CHAR($l)")
        .register(DbType::String, "VARCHAR(255)")
        .register_sized(DbType::String, 10_485_760, "VARCHAR($l)")
        .register_sized(DbType::String, 1_073_741_823, "TEXT")
        .register(DbType::Binary, "BYTEA")
        .register(DbType::Boolean, "BOOLEAN")
        .register(DbType::Byte, "SMALLINT")
        .register(DbType::Int16, "SMALLINT")
        .register(DbType::Int32, "INTEGER")
        .register(DbType::Int64, "BIGINT")
        .register(DbType::Single, "REAL")
        .register(DbType::Double, "DOUBLE PRECISION")
        .register(DbType::Currency, "MONEY")
        .register(DbType::Decimal, "NUMERIC(19, 5)")
        .register_scaled(DbType::Decimal, 1000, "NUMERIC($l, $s)", 0)
        .register(DbType::Date, "DATE")
        .register(DbType::DateTime, "TIMESTAMP")
        .register(DbType::Time, "TIME")
        .register(DbType::Guid, "UUID");
    map
}

fn change_column(f: &SqlFormatter<'_>, table: &str, column: &Column, sql_type: &str) -> Vec<String> {
    let prefix = format!(
        "ALTER TABLE {} ALTER COLUMN {}",
        f.quote(table),
        f.quote(&column.name)
    );
    let not_null = column.properties.contains(ColumnProperty::NOT_NULL) || column.is_primary_key();

    let mut statements = vec![format!("{prefix} TYPE {sql_type}")];
    statements.push(if not_null {
        format!("{prefix} SET NOT NULL")
    } else {
        format!("{prefix} DROP NOT NULL")
    });
    statements.push(match &column.default {
        Some(value) => format!("{prefix} SET DEFAULT {}", f.literal(value)),
        None => format!("{prefix} DROP DEFAULT"),
    });
    statements
}

fn table_exists(f: &SqlFormatter<'_>, table: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = {}",
        f.text(table)
    )
}

fn column_exists(f: &SqlFormatter<'_>, table: &str, column: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = {} AND column_name = {}",
        f.text(table),
        f.text(column)
    )
}

fn constraint_exists(f: &SqlFormatter<'_>, table: &str, name: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM information_schema.table_constraints \
         WHERE table_schema = current_schema() AND table_name = {} AND constraint_name = {}",
        f.text(table),
        f.text(name)
    )
}

fn index_exists(f: &SqlFormatter<'_>, table: &str, name: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM pg_indexes \
         WHERE schemaname = current_schema() AND tablename = {} AND indexname = {}",
        f.text(table),
        f.text(name)
    )
}

fn list_tables(_: &SqlFormatter<'_>) -> String {
    "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' ORDER BY table_name"
        .to_string()
}
