//! Column families and garbage-collection rules

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BigcellError, Result};

/// Decides which versions of a column are dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GcRule {
    /// Keep at most N versions (newest first)
    MaxVersions(u32),

    /// Drop cells older than the given age
    MaxAge { micros: i64 },

    /// Collect a cell if ANY child rule collects it
    Union(Vec<GcRule>),

    /// Collect a cell only if ALL child rules collect it
    Intersection(Vec<GcRule>),
}

impl GcRule {
    pub fn max_versions(count: u32) -> Self {
        GcRule::MaxVersions(count)
    }

    pub fn max_age(age: Duration) -> Self {
        GcRule::MaxAge {
            micros: age.as_micros().min(i64::MAX as u128) as i64,
        }
    }

    /// Whether the cell at `index` (0 = newest) of its column is garbage
    pub fn is_garbage(&self, index: usize, timestamp_micros: i64, now_micros: i64) -> bool {
        match self {
            GcRule::MaxVersions(count) => index >= *count as usize,
            GcRule::MaxAge { micros } => now_micros.saturating_sub(timestamp_micros) > *micros,
            GcRule::Union(rules) => rules
                .iter()
                .any(|rule| rule.is_garbage(index, timestamp_micros, now_micros)),
            GcRule::Intersection(rules) => {
                !rules.is_empty()
                    && rules
                        .iter()
                        .all(|rule| rule.is_garbage(index, timestamp_micros, now_micros))
            }
        }
    }

    /// Reject rules the emulator cannot honour
    pub fn validate(&self) -> Result<()> {
        match self {
            GcRule::MaxVersions(0) => Err(BigcellError::InvalidArgument(
                "max versions must be at least 1".to_string(),
            )),
            GcRule::MaxAge { micros } if *micros <= 0 => Err(BigcellError::InvalidArgument(
                "max age must be positive".to_string(),
            )),
            GcRule::Union(rules) | GcRule::Intersection(rules) => {
                rules.iter().try_for_each(GcRule::validate)
            }
            _ => Ok(()),
        }
    }
}

/// Schema entry for a column family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFamily {
    /// `None` keeps every version forever
    pub gc_rule: Option<GcRule>,
}

impl ColumnFamily {
    pub fn new(gc_rule: Option<GcRule>) -> Self {
        Self { gc_rule }
    }

    pub fn is_garbage(&self, index: usize, timestamp_micros: i64, now_micros: i64) -> bool {
        self.gc_rule
            .as_ref()
            .map(|rule| rule.is_garbage(index, timestamp_micros, now_micros))
            .unwrap_or(false)
    }
}
