//! Database-agnostic schema descriptors.
//!
//! Tables, columns, constraints and indexes are described with value objects
//! that are built per call. The dialect turns them into SQL.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Abstract column type, mapped to SQL type names by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    /// Variable-length non-unicode text.
    AnsiString,
    /// Fixed-length non-unicode text.
    AnsiStringFixedLength,
    /// Binary data.
    Binary,
    /// Boolean.
    Boolean,
    /// Unsigned 8-bit integer.
    Byte,
    /// Monetary value.
    Currency,
    /// Date without time.
    Date,
    /// Date and time.
    DateTime,
    /// Exact numeric with precision and scale.
    Decimal,
    /// Double-precision float.
    Double,
    /// Globally unique identifier.
    Guid,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Single-precision float.
    Single,
    /// Variable-length unicode text.
    String,
    /// Fixed-length unicode text.
    StringFixedLength,
    /// Time of day.
    Time,
}

impl DbType {
    /// Column type with a size (length or precision).
    #[must_use]
    pub fn with_size(self, size: u32) -> ColumnType {
        ColumnType {
            db_type: self,
            size: Some(size),
            scale: None,
        }
    }

    /// Column type with precision and scale.
    #[must_use]
    pub fn with_precision(self, size: u32, scale: u32) -> ColumnType {
        ColumnType {
            db_type: self,
            size: Some(size),
            scale: Some(scale),
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Abstract type plus optional size and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    /// Abstract type.
    pub db_type: DbType,
    /// Length or precision.
    pub size: Option<u32>,
    /// Scale for exact numerics.
    pub scale: Option<u32>,
}

impl From<DbType> for ColumnType {
    fn from(db_type: DbType) -> Self {
        Self {
            db_type,
            size: None,
            scale: None,
        }
    }
}

/// Set of column properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColumnProperty(u8);

impl ColumnProperty {
    /// No properties.
    pub const NONE: Self = Self(0);
    /// Column accepts NULL.
    pub const NULL: Self = Self(1);
    /// Column rejects NULL.
    pub const NOT_NULL: Self = Self(1 << 1);
    /// Column values are unique.
    pub const UNIQUE: Self = Self(1 << 2);
    /// Column values are generated by the database.
    pub const IDENTITY: Self = Self(1 << 3);
    /// Column is part of the primary key.
    pub const PRIMARY_KEY: Self = Self(1 << 4);
    /// Primary key with generated values.
    pub const PRIMARY_KEY_WITH_IDENTITY: Self = Self(1 << 4 | 1 << 3);

    /// Whether every flag in `other` is set.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ColumnProperty {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ColumnProperty {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A SQL value, rendered as a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean, rendered per dialect.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text, rendered quoted with embedded quotes doubled.
    Text(String),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column type.
    pub column_type: ColumnType,
    /// Column properties.
    pub properties: ColumnProperty,
    /// Default value.
    pub default: Option<Value>,
}

impl Column {
    /// Create a column with no properties.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            properties: ColumnProperty::NONE,
            default: None,
        }
    }

    /// Add properties.
    #[must_use]
    pub fn with_property(mut self, property: ColumnProperty) -> Self {
        self.properties |= property;
        self
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Whether the column is part of the primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.properties.contains(ColumnProperty::PRIMARY_KEY)
    }

    /// Whether the column is generated by the database.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.properties.contains(ColumnProperty::IDENTITY)
    }
}

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    /// Reject the change.
    NoAction,
    /// Propagate the change.
    Cascade,
    /// Set referencing columns to NULL.
    SetNull,
    /// Set referencing columns to their defaults.
    SetDefault,
}

/// A foreign key between two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Referencing table.
    pub table: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub ref_table: String,
    /// Referenced columns.
    pub ref_columns: Vec<String>,
    /// ON DELETE action, omitted when `None`.
    pub on_delete: Option<ForeignKeyAction>,
    /// ON UPDATE action, omitted when `None`.
    pub on_update: Option<ForeignKeyAction>,
}

impl ForeignKey {
    /// Create a foreign key with no referential actions.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: &[&str],
        ref_table: impl Into<String>,
        ref_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.iter().map(ToString::to_string).collect(),
            ref_table: ref_table.into(),
            ref_columns: ref_columns.iter().map(ToString::to_string).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    /// Set the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Set the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_property_flags() {
        let p = ColumnProperty::NOT_NULL | ColumnProperty::UNIQUE;
        assert!(p.contains(ColumnProperty::NOT_NULL));
        assert!(p.contains(ColumnProperty::UNIQUE));
        assert!(!p.contains(ColumnProperty::PRIMARY_KEY));

        let pk = ColumnProperty::PRIMARY_KEY_WITH_IDENTITY;
        assert!(pk.contains(ColumnProperty::PRIMARY_KEY));
        assert!(pk.contains(ColumnProperty::IDENTITY));
    }

    #[test]
    fn test_column_builder() {
        let c = Column::new("Name", DbType::String.with_size(30))
            .with_property(ColumnProperty::NOT_NULL)
            .with_default("none");

        assert_eq!(c.column_type.size, Some(30));
        assert!(!c.is_primary_key());
        assert_eq!(c.default, Some(Value::Text("none".to_string())));
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<&str>), Value::Null);
        assert_eq!(Value::from(Some(5)), Value::Int(5));
    }
}
