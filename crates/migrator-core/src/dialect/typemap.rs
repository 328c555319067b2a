//! Abstract type to SQL type name mapping.

use crate::error::{MigrationError, Result};
use crate::schema::{ColumnType, DbType};
use std::collections::HashMap;

/// Length placeholder in type templates.
const LENGTH: &str = "$l";
/// Scale placeholder in type templates.
const SCALE: &str = "$s";

#[derive(Debug, Clone)]
struct SizedType {
    capacity: u32,
    template: String,
    default_scale: Option<u32>,
}

#[derive(Debug, Clone, Default)]
struct TypeEntry {
    unbounded: Option<String>,
    sized: Vec<SizedType>,
}

/// Per-dialect table of SQL type templates keyed by abstract type and size.
///
/// Built once when the dialect is constructed and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    entries: HashMap<DbType, TypeEntry>,
}

impl TypeMap {
    /// Create an empty type map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the type used when no size is given or no sized entry fits.
    pub fn register(&mut self, db_type: DbType, template: impl Into<String>) -> &mut Self {
        self.entries.entry(db_type).or_default().unbounded = Some(template.into());
        self
    }

    /// Register a template used for sizes up to `capacity`.
    pub fn register_sized(
        &mut self,
        db_type: DbType,
        capacity: u32,
        template: impl Into<String>,
    ) -> &mut Self {
        self.push_sized(db_type, capacity, template.into(), None)
    }

    /// Register a sized template with a scale used when the column gives none.
    pub fn register_scaled(
        &mut self,
        db_type: DbType,
        capacity: u32,
        template: impl Into<String>,
        default_scale: u32,
    ) -> &mut Self {
        self.push_sized(db_type, capacity, template.into(), Some(default_scale))
    }

    fn push_sized(
        &mut self,
        db_type: DbType,
        capacity: u32,
        template: String,
        default_scale: Option<u32>,
    ) -> &mut Self {
        self.entries.entry(db_type).or_default().sized.push(SizedType {
            capacity,
            template,
            default_scale,
        });
        self
    }

    /// Whether any template is registered for the type.
    #[must_use]
    pub fn contains(&self, db_type: DbType) -> bool {
        self.entries.contains_key(&db_type)
    }

    /// Render the SQL type for a column type.
    ///
    /// Picks the sized entry with the smallest capacity that holds the
    /// requested size (first registered wins on ties), falling back to the
    /// unbounded entry.
    pub fn render(&self, column_type: ColumnType) -> Result<String> {
        let entry = self.entries.get(&column_type.db_type).ok_or_else(|| {
            MigrationError::config(format!(
                "No SQL type registered for {}",
                column_type.db_type
            ))
        })?;

        if let Some(size) = column_type.size {
            let best = entry
                .sized
                .iter()
                .filter(|s| s.capacity >= size)
                .min_by_key(|s| s.capacity);

            if let Some(sized) = best {
                let scale = column_type.scale.or(sized.default_scale).unwrap_or(0);
                return Ok(sized
                    .template
                    .replace(LENGTH, &size.to_string())
                    .replace(SCALE, &scale.to_string()));
            }
        }

        entry.unbounded.clone().ok_or_else(|| {
            MigrationError::config(format!(
                "No unbounded SQL type registered for {}",
                column_type.db_type
            ))
        })
    }
}
