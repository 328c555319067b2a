//! DDL and DML rendering.
//!
//! [`DdlRenderer`] turns schema descriptors into SQL for one dialect without
//! touching a connection. Capability checks run before any rendering, so an
//! unsupported operation never yields SQL.

use crate::dialect::{Dialect, IdentityRule};
use crate::error::{MigrationError, Result};
use crate::formatter::{check_arity, check_value, check_values, SqlFormatter, Token};
use crate::schema::{Column, ColumnProperty, ForeignKey, Value};

/// Renders statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct DdlRenderer<'d> {
    dialect: &'d Dialect,
    fmt: SqlFormatter<'d>,
}

impl<'d> DdlRenderer<'d> {
    /// Create a renderer.
    #[must_use]
    pub fn new(dialect: &'d Dialect) -> Self {
        Self {
            dialect,
            fmt: dialect.formatter(),
        }
    }

    /// Column definition as used in CREATE TABLE and ADD COLUMN.
    ///
    /// `inline_key` marks a column that carries the whole primary key on its
    /// own, which is the only place an inline identity may appear.
    pub fn column_sql(&self, column: &Column, inline_key: bool) -> Result<String> {
        let name = self.fmt.quote(&column.name);

        if column.is_identity() {
            if let IdentityRule::InlinePrimaryKey(clause) = self.dialect.identity() {
                if !inline_key {
                    return Err(MigrationError::not_supported(
                        self.dialect.name(),
                        "identity columns outside a single-column primary key",
                    ));
                }
                return Ok(format!("{name} {clause}"));
            }
        }

        let mut parts = vec![name, self.dialect.render_type(column.column_type)?];

        if column.is_identity() {
            if let IdentityRule::Suffix(suffix) = self.dialect.identity() {
                parts.push(suffix.to_string());
            }
        }

        if column.is_primary_key() || column.properties.contains(ColumnProperty::NOT_NULL) {
            parts.push("NOT NULL".to_string());
        } else if column.properties.contains(ColumnProperty::NULL) {
            parts.push("NULL".to_string());
        }

        if column.properties.contains(ColumnProperty::UNIQUE) {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default) = &column.default {
            check_value(default)?;
            parts.push(self.dialect.default_clause(default));
        }

        Ok(parts.join(" "))
    }

    /// `CREATE TABLE` with a table-level primary key when needed.
    pub fn create_table(&self, table: &str, columns: &[Column]) -> Result<String> {
        if columns.is_empty() {
            return Err(MigrationError::invalid_input(format!(
                "Table {table} needs at least one column"
            )));
        }

        let keys: Vec<&str> = columns
            .iter()
            .filter(|c| c.is_primary_key())
            .map(|c| c.name.as_str())
            .collect();
        let inline = matches!(self.dialect.identity(), IdentityRule::InlinePrimaryKey(_))
            && keys.len() == 1
            && columns.iter().any(|c| c.is_primary_key() && c.is_identity());

        let mut definitions = columns
            .iter()
            .map(|c| self.column_sql(c, inline && c.is_primary_key()))
            .collect::<Result<Vec<_>>>()?;

        if !keys.is_empty() && !inline {
            definitions.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.fmt.quote(&primary_key_name(table)),
                self.fmt.quote_list(&keys)
            ));
        }

        self.fmt.format(
            "CREATE TABLE {} ({})",
            &[Token::Identifier(table), Token::Plain(definitions.join(", "))],
        )
    }

    /// `DROP TABLE`.
    pub fn drop_table(&self, table: &str) -> Result<String> {
        self.fmt.format("DROP TABLE {}", &[Token::Identifier(table)])
    }

    /// `ALTER TABLE .. RENAME TO`.
    pub fn rename_table(&self, old_name: &str, new_name: &str) -> Result<String> {
        self.dialect
            .require(self.dialect.capabilities().rename_table, "renaming tables")?;
        self.fmt.format(
            "ALTER TABLE {} RENAME TO {}",
            &[Token::Identifier(old_name), Token::Identifier(new_name)],
        )
    }

    /// `ALTER TABLE .. ADD COLUMN`.
    pub fn add_column(&self, table: &str, column: &Column) -> Result<String> {
        let definition = self.column_sql(column, false)?;
        self.fmt.format(
            "ALTER TABLE {} ADD COLUMN {}",
            &[Token::Identifier(table), Token::Plain(definition)],
        )
    }

    /// `ALTER TABLE .. DROP COLUMN`.
    pub fn remove_column(&self, table: &str, column: &str) -> Result<String> {
        self.dialect
            .require(self.dialect.capabilities().remove_column, "removing columns")?;
        self.fmt.format(
            "ALTER TABLE {} DROP COLUMN {}",
            &[Token::Identifier(table), Token::Identifier(column)],
        )
    }

    /// `ALTER TABLE .. RENAME COLUMN`.
    pub fn rename_column(&self, table: &str, old_name: &str, new_name: &str) -> Result<String> {
        self.dialect
            .require(self.dialect.capabilities().rename_column, "renaming columns")?;
        self.fmt.format(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            &[
                Token::Identifier(table),
                Token::Identifier(old_name),
                Token::Identifier(new_name),
            ],
        )
    }

    /// Statements that bring a column to the given definition.
    pub fn change_column(&self, table: &str, column: &Column) -> Result<Vec<String>> {
        let strategy = match self.dialect.change_column_strategy() {
            Some(f) if self.dialect.capabilities().change_column => f,
            _ => {
                return Err(MigrationError::not_supported(
                    self.dialect.name(),
                    "changing columns",
                ))
            }
        };
        if let Some(default) = &column.default {
            check_value(default)?;
        }
        let sql_type = self.dialect.render_type(column.column_type)?;
        Ok(strategy(&self.fmt, table, column, &sql_type))
    }

    /// `ADD CONSTRAINT .. PRIMARY KEY`.
    pub fn add_primary_key(&self, name: &str, table: &str, columns: &[&str]) -> Result<String> {
        self.dialect
            .require(self.dialect.capabilities().add_primary_key, "adding primary keys")?;
        non_empty(columns, "primary key")?;
        self.fmt.format(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            &[
                Token::Identifier(table),
                Token::Identifier(name),
                Token::idents(columns),
            ],
        )
    }

    /// `ADD CONSTRAINT .. FOREIGN KEY .. REFERENCES`.
    pub fn add_foreign_key(&self, key: &ForeignKey) -> Result<String> {
        let caps = self.dialect.capabilities();
        self.dialect
            .require(caps.add_foreign_key, "adding foreign keys")?;
        if key.on_update.is_some() {
            self.dialect
                .require(caps.on_update_actions, "ON UPDATE actions")?;
        }
        non_empty(&key.columns, "foreign key")?;
        check_arity(key.columns.len(), key.ref_columns.len())?;

        let mut sql = self.fmt.format(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            &[
                Token::Identifier(&key.table),
                Token::Identifier(&key.name),
                Token::idents(&key.columns),
                Token::Identifier(&key.ref_table),
                Token::idents(&key.ref_columns),
            ],
        )?;
        if let Some(action) = key.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(self.dialect.foreign_key_action(action));
        }
        if let Some(action) = key.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(self.dialect.foreign_key_action(action));
        }
        Ok(sql)
    }

    /// `ADD CONSTRAINT .. UNIQUE`.
    pub fn add_unique_constraint(&self, name: &str, table: &str, columns: &[&str]) -> Result<String> {
        self.dialect.require(
            self.dialect.capabilities().add_unique_constraint,
            "adding unique constraints",
        )?;
        non_empty(columns, "unique constraint")?;
        self.fmt.format(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            &[
                Token::Identifier(table),
                Token::Identifier(name),
                Token::idents(columns),
            ],
        )
    }

    /// `ADD CONSTRAINT .. CHECK`. The expression is inserted verbatim.
    pub fn add_check_constraint(&self, name: &str, table: &str, check_sql: &str) -> Result<String> {
        self.dialect.require(
            self.dialect.capabilities().add_check_constraint,
            "adding check constraints",
        )?;
        self.fmt.format(
            "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
            &[
                Token::Identifier(table),
                Token::Identifier(name),
                Token::plain(check_sql),
            ],
        )
    }

    /// `DROP CONSTRAINT`.
    pub fn remove_constraint(&self, table: &str, name: &str) -> Result<String> {
        self.dialect.require(
            self.dialect.capabilities().remove_constraint,
            "removing constraints",
        )?;
        self.fmt.format(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            &[Token::Identifier(table), Token::Identifier(name)],
        )
    }

    /// `CREATE [UNIQUE] INDEX`.
    pub fn add_index(&self, name: &str, table: &str, columns: &[&str], unique: bool) -> Result<String> {
        non_empty(columns, "index")?;
        self.fmt.format(
            "CREATE {}INDEX {} ON {} ({})",
            &[
                Token::plain(if unique { "UNIQUE " } else { "" }),
                Token::Identifier(name),
                Token::Identifier(table),
                Token::idents(columns),
            ],
        )
    }

    /// `DROP INDEX`.
    pub fn remove_index(&self, name: &str) -> Result<String> {
        self.fmt.format("DROP INDEX {}", &[Token::Identifier(name)])
    }

    /// `INSERT` with literal values.
    pub fn insert(&self, table: &str, columns: &[&str], values: &[Value]) -> Result<String> {
        non_empty(columns, "insert")?;
        check_arity(columns.len(), values.len())?;
        check_values(values)?;
        let literals = values
            .iter()
            .map(|v| self.fmt.literal(v))
            .collect::<Vec<_>>()
            .join(", ");
        self.fmt.format(
            "INSERT INTO {} ({}) VALUES ({})",
            &[
                Token::Identifier(table),
                Token::idents(columns),
                Token::Plain(literals),
            ],
        )
    }

    /// `UPDATE` with literal values and an optional raw WHERE clause.
    pub fn update(
        &self,
        table: &str,
        columns: &[&str],
        values: &[Value],
        where_clause: Option<&str>,
    ) -> Result<String> {
        non_empty(columns, "update")?;
        let assignments = self.fmt.join_columns_and_values(columns, values)?;
        let mut sql = self.fmt.format(
            "UPDATE {} SET {}",
            &[Token::Identifier(table), Token::Plain(assignments)],
        )?;
        push_where(&mut sql, where_clause);
        Ok(sql)
    }

    /// `DELETE` of the rows matching every column/value pair. No pairs
    /// deletes every row. NULL values match with `IS NULL`.
    pub fn delete(&self, table: &str, columns: &[&str], values: &[Value]) -> Result<String> {
        check_arity(columns.len(), values.len())?;
        check_values(values)?;
        let conditions = columns
            .iter()
            .zip(values)
            .map(|(c, v)| match v {
                Value::Null => format!("{} IS NULL", self.fmt.quote(c)),
                _ => format!("{} = {}", self.fmt.quote(c), self.fmt.literal(v)),
            })
            .collect::<Vec<_>>();
        let where_clause = (!conditions.is_empty()).then(|| conditions.join(" AND "));
        self.delete_where(table, where_clause.as_deref())
    }

    /// `DELETE` with an optional raw WHERE clause.
    pub fn delete_where(&self, table: &str, where_clause: Option<&str>) -> Result<String> {
        let mut sql = self
            .fmt
            .format("DELETE FROM {}", &[Token::Identifier(table)])?;
        push_where(&mut sql, where_clause);
        Ok(sql)
    }
}

/// Name given to a primary key declared in CREATE TABLE.
#[must_use]
pub fn primary_key_name(table: &str) -> String {
    format!("PK_{table}")
}

fn non_empty<S>(columns: &[S], what: &str) -> Result<()> {
    if columns.is_empty() {
        Err(MigrationError::invalid_input(format!(
            "A {what} needs at least one column"
        )))
    } else {
        Ok(())
    }
}

fn push_where(sql: &mut String, where_clause: Option<&str>) {
    if let Some(clause) = where_clause.map(str::trim).filter(|c| !c.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
}
