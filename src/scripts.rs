//! Script directory loading.
//!
//! A scripts directory holds `<version>_<name>.up.sql` files and optional
//! `<version>_<name>.down.sql` counterparts. Other files are ignored.

use anyhow::{bail, Context, Result};
use migrator_core::{MigrationRegistry, SqlMigration};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Default)]
struct ScriptPair {
    name: String,
    up: Option<String>,
    down: Option<String>,
}

/// Build a registry from a scripts directory.
pub fn load_registry(dir: &Path) -> Result<MigrationRegistry> {
    let mut pairs: BTreeMap<i64, ScriptPair> = BTreeMap::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read scripts directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((version, name, is_up)) = parse_file_name(file_name) else {
            tracing::debug!(file = %file_name, "Skipping non-migration file");
            continue;
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let pair = pairs.entry(version).or_default();
        if !pair.name.is_empty() && pair.name != name {
            bail!(
                "Version {} has conflicting names: {} and {}",
                version,
                pair.name,
                name
            );
        }
        pair.name = name.to_string();
        let slot = if is_up { &mut pair.up } else { &mut pair.down };
        if slot.replace(text).is_some() {
            bail!("Duplicate script for version {}: {}", version, file_name);
        }
    }

    let mut registry = MigrationRegistry::new();
    for (version, pair) in pairs {
        let mut builder = SqlMigration::builder(version, pair.name);
        if let Some(up) = pair.up {
            builder = builder.up(up);
        }
        if let Some(down) = pair.down {
            builder = builder.down(down);
        }
        registry.register_sql(builder.build()?)?;
    }

    tracing::debug!(dir = %dir.display(), count = registry.len(), "Loaded migration scripts");
    Ok(registry)
}

/// Split `<version>_<name>.(up|down).sql` into its parts.
fn parse_file_name(file_name: &str) -> Option<(i64, &str, bool)> {
    let (stem, is_up) = if let Some(stem) = file_name.strip_suffix(".up.sql") {
        (stem, true)
    } else {
        (file_name.strip_suffix(".down.sql")?, false)
    };
    let (version, name) = stem.split_once('_')?;
    let version = version.parse().ok()?;
    if name.is_empty() {
        return None;
    }
    Some((version, name, is_up))
}
