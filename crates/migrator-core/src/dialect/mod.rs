//! SQL dialects.
//!
//! A [`Dialect`] is plain data: a type map, a quoting rule, capability flags
//! and a handful of strategy functions for catalog queries. The
//! transformation provider is generic over it; per-database differences never
//! require a new provider type.

mod postgres;
mod sqlite;
pub mod typemap;

pub use typemap::TypeMap;

use crate::error::{MigrationError, Result};
use crate::formatter::SqlFormatter;
use crate::schema::{Column, ColumnType, ForeignKeyAction, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// SQLite.
    #[default]
    SQLite,
    /// PostgreSQL.
    #[serde(alias = "postgres")]
    PostgreSQL,
}

impl DialectKind {
    /// Parse from a database URL.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("sqlite://") || url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostgreSQL => write!(f, "postgresql"),
            Self::SQLite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for DialectKind {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::SQLite),
            "postgres" | "postgresql" | "pg" => Ok(Self::PostgreSQL),
            other => Err(MigrationError::config(format!("Unknown dialect: {other}"))),
        }
    }
}

/// When identifiers are wrapped in delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteRule {
    /// Every identifier is quoted.
    Always,
    /// Only identifiers that would otherwise be folded or parsed as keywords.
    WhenNeeded,
}

/// How a database-generated column is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRule {
    /// Appended after the column type.
    Suffix(&'static str),
    /// Declared inline with the primary key; only valid on a single-column key.
    InlinePrimaryKey(&'static str),
}

/// Optional features of a dialect. An operation whose flag is off fails with
/// [`MigrationError::NotSupported`] before any SQL is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// `ALTER TABLE .. RENAME TO`.
    pub rename_table: bool,
    /// `ALTER TABLE .. RENAME COLUMN`.
    pub rename_column: bool,
    /// `ALTER TABLE .. DROP COLUMN`.
    pub remove_column: bool,
    /// Changing a column's type, nullability or default.
    pub change_column: bool,
    /// Adding a primary key to an existing table.
    pub add_primary_key: bool,
    /// Adding a foreign key to an existing table.
    pub add_foreign_key: bool,
    /// Adding a unique constraint to an existing table.
    pub add_unique_constraint: bool,
    /// Adding a check constraint to an existing table.
    pub add_check_constraint: bool,
    /// Dropping a named constraint.
    pub remove_constraint: bool,
    /// ON UPDATE referential actions.
    pub on_update_actions: bool,
}

/// Catalog query strategies. Each returns a query whose single row holds a
/// count, except `list_tables` which returns one table name per row.
#[derive(Clone, Copy)]
pub struct CatalogQueries {
    /// Tables named `table`.
    pub table_exists: fn(&SqlFormatter<'_>, &str) -> String,
    /// Columns named `column` in `table`.
    pub column_exists: fn(&SqlFormatter<'_>, &str, &str) -> String,
    /// Constraints named `name` on `table`.
    pub constraint_exists: fn(&SqlFormatter<'_>, &str, &str) -> String,
    /// Indexes named `name` on `table`.
    pub index_exists: fn(&SqlFormatter<'_>, &str, &str) -> String,
    /// User tables.
    pub list_tables: fn(&SqlFormatter<'_>) -> String,
}

impl fmt::Debug for CatalogQueries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogQueries").finish_non_exhaustive()
    }
}

/// Renders the statements that change a column in place.
/// Arguments: formatter, table, new column definition, rendered SQL type.
pub type ChangeColumnFn = fn(&SqlFormatter<'_>, &str, &Column, &str) -> Vec<String>;

/// Description of one database engine.
#[derive(Debug, Clone)]
pub struct Dialect {
    pub(crate) kind: DialectKind,
    pub(crate) name: &'static str,
    pub(crate) type_map: TypeMap,
    pub(crate) quote_rule: QuoteRule,
    pub(crate) quote_open: char,
    pub(crate) quote_close: char,
    pub(crate) reserved_words: &'static [&'static str],
    pub(crate) capabilities: Capabilities,
    pub(crate) identity: IdentityRule,
    pub(crate) true_literal: &'static str,
    pub(crate) false_literal: &'static str,
    pub(crate) batch_separator: &'static str,
    pub(crate) catalog: CatalogQueries,
    pub(crate) change_column: Option<ChangeColumnFn>,
}

impl Dialect {
    /// Dialect for an engine.
    #[must_use]
    pub fn for_kind(kind: DialectKind) -> Self {
        match kind {
            DialectKind::SQLite => Self::sqlite(),
            DialectKind::PostgreSQL => Self::postgres(),
        }
    }

    /// Engine this dialect describes.
    #[must_use]
    pub fn kind(&self) -> DialectKind {
        self.kind
    }

    /// Human-readable engine name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type map.
    #[must_use]
    pub fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    /// Capability flags.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Identity column rule.
    #[must_use]
    pub fn identity(&self) -> IdentityRule {
        self.identity
    }

    /// Batch separator token, matched case-insensitively on its own line.
    #[must_use]
    pub fn batch_separator(&self) -> &'static str {
        self.batch_separator
    }

    /// Catalog query strategies.
    #[must_use]
    pub fn catalog(&self) -> &CatalogQueries {
        &self.catalog
    }

    /// Change-column strategy, if the engine has one.
    #[must_use]
    pub fn change_column_strategy(&self) -> Option<ChangeColumnFn> {
        self.change_column
    }

    /// Formatter bound to this dialect.
    #[must_use]
    pub fn formatter(&self) -> SqlFormatter<'_> {
        SqlFormatter::new(self)
    }

    /// Render the SQL type for a column type.
    pub fn render_type(&self, column_type: ColumnType) -> Result<String> {
        self.type_map.render(column_type)
    }

    /// Whether the dialect requires delimiters around `name`.
    #[must_use]
    pub fn needs_quote(&self, name: &str) -> bool {
        match self.quote_rule {
            QuoteRule::Always => true,
            QuoteRule::WhenNeeded => {
                let mut chars = name.chars();
                let simple = chars
                    .next()
                    .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
                    && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
                !simple || self.reserved_words.contains(&name)
            }
        }
    }

    /// Quote an identifier if the dialect requires it.
    ///
    /// Embedded closing delimiters are doubled. Input that is already quoted
    /// is quoted again.
    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        if !self.needs_quote(name) {
            return name.to_string();
        }
        let close = self.quote_close.to_string();
        let escaped = name.replace(&close, &close.repeat(2));
        format!("{}{}{}", self.quote_open, escaped, self.quote_close)
    }

    /// Render a value as a SQL literal.
    #[must_use]
    pub fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => self.true_literal.to_string(),
            Value::Bool(false) => self.false_literal.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Render a `DEFAULT` clause.
    #[must_use]
    pub fn default_clause(&self, value: &Value) -> String {
        format!("DEFAULT {}", self.literal(value))
    }

    /// Render a referential action.
    #[must_use]
    pub fn foreign_key_action(&self, action: ForeignKeyAction) -> &'static str {
        match action {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Fail with `NotSupported` unless `supported`.
    pub(crate) fn require(&self, supported: bool, operation: &str) -> Result<()> {
        if supported {
            Ok(())
        } else {
            Err(MigrationError::not_supported(self.name, operation))
        }
    }
}
