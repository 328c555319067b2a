//! Batch scripts.
//!
//! A script is plain text whose statements are separated by the dialect's
//! batch separator on a line of its own. Named scripts can be bundled into
//! the binary with [`ScriptBundle`].

use crate::error::{MigrationError, Result};
use std::collections::BTreeMap;

/// Split a script into statements.
///
/// A line whose trimmed text equals `separator` (ignoring case) ends the
/// current statement. Blank statements, including the gap between two
/// consecutive separators, are dropped.
#[must_use]
pub fn split_batch(script: &str, separator: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in script.lines() {
        if line.trim().eq_ignore_ascii_case(separator) {
            push_statement(&mut statements, &mut current);
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_statement(&mut statements, &mut current);

    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    current.clear();
}

/// Named scripts, typically embedded with `include_str!`.
#[derive(Debug, Clone, Default)]
pub struct ScriptBundle {
    scripts: BTreeMap<String, String>,
}

impl ScriptBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script.
    #[must_use]
    pub fn with_script(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Add or replace a script.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.scripts.insert(name.into(), text.into());
    }

    /// Look up a script by name.
    pub fn get(&self, name: &str) -> Result<&str> {
        self.scripts
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| MigrationError::invalid_input(format!("Script not found: {name}")))
    }

    /// Script names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    /// Number of scripts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
