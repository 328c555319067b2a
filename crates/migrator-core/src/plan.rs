//! Execution planning.
//!
//! [`build_plan`] reconciles applied and available versions with a target.
//! It is pure: the same inputs always give the same plan.

use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Bound::{Excluded, Included};

/// Direction of a planned run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Apply versions, oldest first.
    Up,
    /// Revert versions, newest first.
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Ordered versions to execute from a starting version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Highest applied version, or 0.
    pub start_version: i64,
    /// Requested target.
    pub target_version: i64,
    /// Versions in execution order.
    pub versions: Vec<i64>,
}

impl MigrationPlan {
    /// Direction of every step in the plan.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.target_version < self.start_version {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    /// Whether there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }
}

/// Compute the execution order for reaching `target`.
///
/// Fails with `VersionConsistency` when an available version below the
/// highest applied one was never applied.
pub fn build_plan(target: i64, applied: &[i64], available: &[i64]) -> Result<MigrationPlan> {
    let applied: BTreeSet<i64> = applied.iter().copied().collect();
    let start_version = applied.last().copied().unwrap_or(0);

    let skipped: Vec<i64> = available
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|v| *v < start_version && !applied.contains(v))
        .collect();
    if !skipped.is_empty() {
        return Err(MigrationError::VersionConsistency { versions: skipped });
    }

    let candidates: BTreeSet<i64> = applied.iter().chain(available).copied().collect();

    let versions = if target < start_version {
        candidates
            .range((Excluded(target), Included(start_version)))
            .rev()
            .copied()
            .collect()
    } else {
        candidates
            .range((Excluded(start_version), Included(target)))
            .copied()
            .collect()
    };

    Ok(MigrationPlan {
        start_version,
        target_version: target,
        versions,
    })
}
