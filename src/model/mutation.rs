//! Row mutations, read-modify-write rules and schema changes

use serde::{Deserialize, Serialize};

use super::GcRule;
use crate::error::{BigcellError, Result};

/// Timestamp placeholder asking the emulator to stamp the cell itself
pub const SERVER_TIME: i64 = -1;

/// A single change to one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Write a cell (`timestamp_micros == SERVER_TIME` for server time)
    SetCell {
        family: String,
        qualifier: Vec<u8>,
        timestamp_micros: i64,
        value: Vec<u8>,
    },

    /// Delete versions of one column, optionally limited to `[start, end)`
    DeleteFromColumn {
        family: String,
        qualifier: Vec<u8>,
        start_micros: Option<i64>,
        end_micros: Option<i64>,
    },

    /// Delete every column of a family
    DeleteFromFamily { family: String },

    /// Delete the whole row
    DeleteFromRow,
}

impl Mutation {
    pub fn set_cell(
        family: impl Into<String>,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Mutation::SetCell {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_micros: SERVER_TIME,
            value: value.into(),
        }
    }

    /// Family the mutation touches, if any
    pub fn family(&self) -> Option<&str> {
        match self {
            Mutation::SetCell { family, .. }
            | Mutation::DeleteFromColumn { family, .. }
            | Mutation::DeleteFromFamily { family } => Some(family.as_str()),
            Mutation::DeleteFromRow => None,
        }
    }

    /// Check timestamps: server time or non-negative milliseconds
    pub fn validate(&self) -> Result<()> {
        match self {
            Mutation::SetCell {
                timestamp_micros, ..
            } => {
                if *timestamp_micros == SERVER_TIME {
                    return Ok(());
                }
                if *timestamp_micros < 0 {
                    return Err(BigcellError::InvalidArgument(format!(
                        "timestamp {} must be non-negative",
                        timestamp_micros
                    )));
                }
                if timestamp_micros % 1000 != 0 {
                    return Err(BigcellError::InvalidArgument(format!(
                        "timestamp {} must have millisecond granularity",
                        timestamp_micros
                    )));
                }
                Ok(())
            }
            Mutation::DeleteFromColumn {
                start_micros,
                end_micros,
                ..
            } => {
                if start_micros.map_or(false, |t| t < 0) || end_micros.map_or(false, |t| t < 0) {
                    return Err(BigcellError::InvalidArgument(
                        "delete time range must be non-negative".to_string(),
                    ));
                }
                if let (Some(start), Some(end)) = (start_micros, end_micros) {
                    if start >= end {
                        return Err(BigcellError::InvalidArgument(format!(
                            "delete time range start {} must be before end {}",
                            start, end
                        )));
                    }
                }
                Ok(())
            }
            Mutation::DeleteFromFamily { .. } | Mutation::DeleteFromRow => Ok(()),
        }
    }

    /// Replace `SERVER_TIME` with a concrete timestamp
    pub fn resolve_server_time(&mut self, now_micros: i64) {
        if let Mutation::SetCell {
            timestamp_micros, ..
        } = self
        {
            if *timestamp_micros == SERVER_TIME {
                *timestamp_micros = now_micros;
            }
        }
    }
}

/// An atomic read-modify-write on the newest cell of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadModifyWriteRule {
    /// Append bytes to the existing value (or to an empty value)
    AppendValue {
        family: String,
        qualifier: Vec<u8>,
        value: Vec<u8>,
    },

    /// Add to a 64-bit big-endian integer (missing counts as 0)
    IncrementAmount {
        family: String,
        qualifier: Vec<u8>,
        amount: i64,
    },
}

impl ReadModifyWriteRule {
    pub fn family(&self) -> &str {
        match self {
            ReadModifyWriteRule::AppendValue { family, .. }
            | ReadModifyWriteRule::IncrementAmount { family, .. } => family.as_str(),
        }
    }

    pub fn qualifier(&self) -> &[u8] {
        match self {
            ReadModifyWriteRule::AppendValue { qualifier, .. }
            | ReadModifyWriteRule::IncrementAmount { qualifier, .. } => qualifier.as_slice(),
        }
    }
}

/// A change to a table's column families
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnFamilyModification {
    Create { id: String, gc_rule: Option<GcRule> },
    Update { id: String, gc_rule: Option<GcRule> },
    Drop { id: String },
}

impl ColumnFamilyModification {
    pub fn id(&self) -> &str {
        match self {
            ColumnFamilyModification::Create { id, .. }
            | ColumnFamilyModification::Update { id, .. }
            | ColumnFamilyModification::Drop { id } => id.as_str(),
        }
    }
}
