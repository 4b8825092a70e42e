//! Table handle: admin and data operations on one table

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{
    ColumnFamily, ColumnFamilyModification, GcRule, Mutation, Row, RowFilter, RowSet,
};
use crate::protocol::{Command, EntryStatus, ReadRowsRequest, Reply, RowMutations};

use super::{unexpected, AppendRow, Client, ConditionalRow, DirectRow};

/// What to read in a scan
#[derive(Debug, Clone, Default)]
pub struct ReadRowsQuery {
    pub row_set: RowSet,
    pub filter: Option<RowFilter>,
    pub limit: Option<u64>,
}

impl ReadRowsQuery {
    /// Every row of the table
    pub fn all() -> Self {
        Self::default()
    }

    pub fn rows(row_set: RowSet) -> Self {
        Self {
            row_set,
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A table of the client's instance
#[derive(Clone)]
pub struct Table {
    client: Client,
    table_id: String,
    name: String,
}

impl Table {
    pub(crate) fn new(client: Client, table_id: &str, name: String) -> Self {
        Self {
            client,
            table_id: table_id.to_string(),
            name,
        }
    }

    /// Short table id
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    /// Fully qualified table name
    pub fn name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Administration
    // =========================================================================

    pub fn exists(&self) -> Result<bool> {
        match self.client.call(Command::GetTable {
            name: self.name.clone(),
        }) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create the table (`AlreadyExists` if it does)
    pub fn create(&self, families: BTreeMap<String, ColumnFamily>) -> Result<()> {
        self.expect_done(Command::CreateTable {
            name: self.name.clone(),
            families,
        })
    }

    pub fn delete(&self) -> Result<()> {
        self.expect_done(Command::DeleteTable {
            name: self.name.clone(),
        })
    }

    /// Delete every row, keeping the schema
    pub fn truncate(&self) -> Result<u64> {
        self.drop_rows(None)
    }

    /// Delete the rows whose key starts with `prefix`
    pub fn drop_by_prefix(&self, prefix: impl Into<Vec<u8>>) -> Result<u64> {
        self.drop_rows(Some(prefix.into()))
    }

    pub fn column_families(&self) -> Result<BTreeMap<String, ColumnFamily>> {
        match self.client.call(Command::GetTable {
            name: self.name.clone(),
        })? {
            Reply::Table(info) => Ok(info.families),
            other => Err(unexpected(&other)),
        }
    }

    pub fn create_column_family(&self, id: &str, gc_rule: Option<GcRule>) -> Result<()> {
        self.modify_family(ColumnFamilyModification::Create {
            id: id.to_string(),
            gc_rule,
        })
    }

    pub fn update_column_family(&self, id: &str, gc_rule: Option<GcRule>) -> Result<()> {
        self.modify_family(ColumnFamilyModification::Update {
            id: id.to_string(),
            gc_rule,
        })
    }

    /// Drop a family along with all its cells
    pub fn drop_column_family(&self, id: &str) -> Result<()> {
        self.modify_family(ColumnFamilyModification::Drop { id: id.to_string() })
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Read one row; `None` if it does not exist or no cell passes `filter`
    pub fn read_row(&self, key: impl Into<Vec<u8>>, filter: Option<&RowFilter>) -> Result<Option<Row>> {
        let mut row_set = RowSet::new();
        row_set.add_row_key(key);

        let mut rows = self.read_rows(&ReadRowsQuery {
            row_set,
            filter: filter.cloned(),
            limit: Some(1),
        })?;
        Ok(rows.pop())
    }

    /// Scan rows in key order
    pub fn read_rows(&self, query: &ReadRowsQuery) -> Result<Vec<Row>> {
        let request = ReadRowsRequest {
            name: self.name.clone(),
            row_set: query.row_set.clone(),
            filter: query.filter.clone(),
            limit: query.limit,
        };
        match self.client.call(Command::ReadRows(request))? {
            Reply::Rows(rows) => Ok(rows),
            other => Err(unexpected(&other)),
        }
    }

    /// Send the pending mutations of several rows in one batch
    ///
    /// Each row succeeds or fails on its own; one status per row, in order.
    pub fn mutate_rows(&self, rows: &[DirectRow<'_>]) -> Result<Vec<EntryStatus>> {
        let entries = rows
            .iter()
            .map(|row| RowMutations {
                key: row.key().to_vec(),
                mutations: row.mutations().to_vec(),
            })
            .collect();

        match self.client.call(Command::MutateRows {
            name: self.name.clone(),
            entries,
        })? {
            Reply::Statuses(statuses) => Ok(statuses),
            other => Err(unexpected(&other)),
        }
    }

    /// Builder for unconditional mutations on one row
    pub fn direct_row(&self, key: impl Into<Vec<u8>>) -> DirectRow<'_> {
        DirectRow::new(self, key.into())
    }

    /// Builder for mutations chosen by whether `filter` matches the row
    pub fn conditional_row(&self, key: impl Into<Vec<u8>>, filter: Option<RowFilter>) -> ConditionalRow<'_> {
        ConditionalRow::new(self, key.into(), filter)
    }

    /// Builder for atomic appends and increments on one row
    pub fn append_row(&self, key: impl Into<Vec<u8>>) -> AppendRow<'_> {
        AppendRow::new(self, key.into())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn mutate_row(&self, key: &[u8], mutations: Vec<Mutation>) -> Result<()> {
        self.expect_done(Command::MutateRow {
            name: self.name.clone(),
            key: key.to_vec(),
            mutations,
        })
    }

    fn drop_rows(&self, prefix: Option<Vec<u8>>) -> Result<u64> {
        match self.client.call(Command::DropRowRange {
            name: self.name.clone(),
            prefix,
        })? {
            Reply::RowsDropped(count) => Ok(count),
            other => Err(unexpected(&other)),
        }
    }

    fn modify_family(&self, modification: ColumnFamilyModification) -> Result<()> {
        match self.client.call(Command::ModifyColumnFamilies {
            name: self.name.clone(),
            modifications: vec![modification],
        })? {
            Reply::Table(_) => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    fn expect_done(&self, command: Command) -> Result<()> {
        match self.client.call(command)? {
            Reply::Done => Ok(()),
            other => Err(unexpected(&other)),
        }
    }
}
