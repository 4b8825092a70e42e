//! Row builders
//!
//! Each builder collects changes for one row and sends them in a single
//! request on `commit`.

use chrono::{DateTime, Utc};

use crate::encoding::CellValue;
use crate::error::Result;
use crate::model::{Mutation, ReadModifyWriteRule, Row, RowFilter};
use crate::protocol::{Command, Reply};

use super::{unexpected, Table};

/// Timestamp in microseconds truncated to whole milliseconds
fn cell_timestamp(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis() * 1000
}

fn delete_cell_mutation(family: &str, qualifier: &[u8]) -> Mutation {
    Mutation::DeleteFromColumn {
        family: family.to_string(),
        qualifier: qualifier.to_vec(),
        start_micros: None,
        end_micros: None,
    }
}

// =============================================================================
// DirectRow
// =============================================================================

/// Unconditional mutations on one row
pub struct DirectRow<'a> {
    table: &'a Table,
    key: Vec<u8>,
    mutations: Vec<Mutation>,
}

impl<'a> DirectRow<'a> {
    pub(crate) fn new(table: &'a Table, key: Vec<u8>) -> Self {
        Self {
            table,
            key,
            mutations: Vec::new(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Mutations not yet committed
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Write a cell stamped by the emulator
    pub fn set_cell(
        &mut self,
        family: &str,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.mutations
            .push(Mutation::set_cell(family, qualifier, value));
        self
    }

    /// Write a cell with an explicit timestamp (millisecond precision)
    pub fn set_cell_at(
        &mut self,
        family: &str,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        timestamp: DateTime<Utc>,
    ) -> &mut Self {
        self.mutations.push(Mutation::SetCell {
            family: family.to_string(),
            qualifier: qualifier.into(),
            timestamp_micros: cell_timestamp(timestamp),
            value: value.into(),
        });
        self
    }

    /// Write a typed value using its cell encoding
    pub fn set_value<T: CellValue>(
        &mut self,
        family: &str,
        qualifier: impl Into<Vec<u8>>,
        value: &T,
    ) -> Result<&mut Self> {
        let bytes = value.to_cell_bytes()?;
        Ok(self.set_cell(family, qualifier, bytes))
    }

    /// Delete the whole row
    pub fn delete(&mut self) -> &mut Self {
        self.mutations.push(Mutation::DeleteFromRow);
        self
    }

    /// Delete every version of one column
    pub fn delete_cell(&mut self, family: &str, qualifier: impl AsRef<[u8]>) -> &mut Self {
        self.mutations
            .push(delete_cell_mutation(family, qualifier.as_ref()));
        self
    }

    /// Delete every version of several columns of one family
    pub fn delete_cells<I, Q>(&mut self, family: &str, qualifiers: I) -> &mut Self
    where
        I: IntoIterator<Item = Q>,
        Q: AsRef<[u8]>,
    {
        for qualifier in qualifiers {
            self.delete_cell(family, qualifier);
        }
        self
    }

    /// Delete every column of a family
    pub fn delete_family(&mut self, family: &str) -> &mut Self {
        self.mutations.push(Mutation::DeleteFromFamily {
            family: family.to_string(),
        });
        self
    }

    /// Send the pending mutations; a row with none is a no-op
    pub fn commit(&mut self) -> Result<()> {
        if self.mutations.is_empty() {
            return Ok(());
        }
        let mutations = std::mem::take(&mut self.mutations);
        self.table.mutate_row(&self.key, mutations)
    }

    /// Drop pending mutations without sending them
    pub fn clear(&mut self) {
        self.mutations.clear();
    }
}

// =============================================================================
// ConditionalRow
// =============================================================================

/// Mutations applied depending on whether a filter matches the row
///
/// Without a filter, the condition is "the row exists".
pub struct ConditionalRow<'a> {
    table: &'a Table,
    key: Vec<u8>,
    filter: Option<RowFilter>,
    true_mutations: Vec<Mutation>,
    false_mutations: Vec<Mutation>,
}

impl<'a> ConditionalRow<'a> {
    pub(crate) fn new(table: &'a Table, key: Vec<u8>, filter: Option<RowFilter>) -> Self {
        Self {
            table,
            key,
            filter,
            true_mutations: Vec::new(),
            false_mutations: Vec::new(),
        }
    }

    fn branch(&mut self, state: bool) -> &mut Vec<Mutation> {
        if state {
            &mut self.true_mutations
        } else {
            &mut self.false_mutations
        }
    }

    pub fn set_cell(
        &mut self,
        family: &str,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        state: bool,
    ) -> &mut Self {
        self.branch(state)
            .push(Mutation::set_cell(family, qualifier, value));
        self
    }

    pub fn delete_cell(&mut self, family: &str, qualifier: impl AsRef<[u8]>, state: bool) -> &mut Self {
        self.branch(state)
            .push(delete_cell_mutation(family, qualifier.as_ref()));
        self
    }

    pub fn delete(&mut self, state: bool) -> &mut Self {
        self.branch(state).push(Mutation::DeleteFromRow);
        self
    }

    /// Send the request; returns whether the filter matched
    pub fn commit(&mut self) -> Result<bool> {
        let command = Command::CheckAndMutateRow {
            name: self.table.name().to_string(),
            key: self.key.clone(),
            predicate: self.filter.clone(),
            true_mutations: std::mem::take(&mut self.true_mutations),
            false_mutations: std::mem::take(&mut self.false_mutations),
        };
        match self.table.client().call(command)? {
            Reply::PredicateMatched(matched) => Ok(matched),
            other => Err(unexpected(&other)),
        }
    }
}

// =============================================================================
// AppendRow
// =============================================================================

/// Atomic appends and increments on one row
pub struct AppendRow<'a> {
    table: &'a Table,
    key: Vec<u8>,
    rules: Vec<ReadModifyWriteRule>,
}

impl<'a> AppendRow<'a> {
    pub(crate) fn new(table: &'a Table, key: Vec<u8>) -> Self {
        Self {
            table,
            key,
            rules: Vec::new(),
        }
    }

    pub fn append_cell_value(
        &mut self,
        family: &str,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.rules.push(ReadModifyWriteRule::AppendValue {
            family: family.to_string(),
            qualifier: qualifier.into(),
            value: value.into(),
        });
        self
    }

    /// Add `amount` to a big-endian i64 cell (missing counts as 0)
    pub fn increment_cell_value(
        &mut self,
        family: &str,
        qualifier: impl Into<Vec<u8>>,
        amount: i64,
    ) -> &mut Self {
        self.rules.push(ReadModifyWriteRule::IncrementAmount {
            family: family.to_string(),
            qualifier: qualifier.into(),
            amount,
        });
        self
    }

    /// Send the rules; returns the cells they produced
    pub fn commit(&mut self) -> Result<Row> {
        if self.rules.is_empty() {
            return Ok(Row::new(self.key.clone()));
        }
        let command = Command::ReadModifyWriteRow {
            name: self.table.name().to_string(),
            key: self.key.clone(),
            rules: std::mem::take(&mut self.rules),
        };
        match self.table.client().call(command)? {
            Reply::ModifiedRow(row) => Ok(row),
            other => Err(unexpected(&other)),
        }
    }
}
