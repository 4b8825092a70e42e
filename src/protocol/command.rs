//! Command definitions
//!
//! Represents requests from clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    ColumnFamily, ColumnFamilyModification, Mutation, ReadModifyWriteRule, RowFilter, RowSet,
};

/// Command types (first byte of every request frame)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Ping = 0x01,
    CreateTable = 0x02,
    DeleteTable = 0x03,
    GetTable = 0x04,
    ListTables = 0x05,
    ModifyColumnFamilies = 0x06,
    DropRowRange = 0x07,
    MutateRow = 0x08,
    MutateRows = 0x09,
    ReadRows = 0x0a,
    CheckAndMutateRow = 0x0b,
    ReadModifyWriteRow = 0x0c,
}

impl CommandType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        let command_type = match byte {
            0x01 => CommandType::Ping,
            0x02 => CommandType::CreateTable,
            0x03 => CommandType::DeleteTable,
            0x04 => CommandType::GetTable,
            0x05 => CommandType::ListTables,
            0x06 => CommandType::ModifyColumnFamilies,
            0x07 => CommandType::DropRowRange,
            0x08 => CommandType::MutateRow,
            0x09 => CommandType::MutateRows,
            0x0a => CommandType::ReadRows,
            0x0b => CommandType::CheckAndMutateRow,
            0x0c => CommandType::ReadModifyWriteRow,
            _ => return None,
        };
        Some(command_type)
    }
}

/// Mutations for one row inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMutations {
    pub key: Vec<u8>,
    pub mutations: Vec<Mutation>,
}

/// A scan over a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRowsRequest {
    /// Fully qualified table name
    pub name: String,

    /// Rows to read; empty reads the whole table
    pub row_set: RowSet,

    /// Applied to each row; rows left without cells are skipped
    pub filter: Option<RowFilter>,

    /// Maximum rows to return (`None` or 0 = no limit)
    pub limit: Option<u64>,
}

/// A parsed command
///
/// Table names are fully qualified:
/// `projects/{project}/instances/{instance}/tables/{table}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Ping (health check)
    Ping,

    CreateTable {
        name: String,
        families: BTreeMap<String, ColumnFamily>,
    },

    DeleteTable {
        name: String,
    },

    /// Fetch a table's schema (NOT_FOUND if it does not exist)
    GetTable {
        name: String,
    },

    /// List table names under `projects/{project}/instances/{instance}`
    ListTables {
        parent: String,
    },

    ModifyColumnFamilies {
        name: String,
        modifications: Vec<ColumnFamilyModification>,
    },

    /// Drop all rows, or only those whose key starts with `prefix`
    DropRowRange {
        name: String,
        prefix: Option<Vec<u8>>,
    },

    MutateRow {
        name: String,
        key: Vec<u8>,
        mutations: Vec<Mutation>,
    },

    /// Independent per-row mutations; each entry succeeds or fails alone
    MutateRows {
        name: String,
        entries: Vec<RowMutations>,
    },

    ReadRows(ReadRowsRequest),

    /// Apply `true_mutations` if any cell passes `predicate` (or, without
    /// a predicate, if the row exists), else `false_mutations`
    CheckAndMutateRow {
        name: String,
        key: Vec<u8>,
        predicate: Option<RowFilter>,
        true_mutations: Vec<Mutation>,
        false_mutations: Vec<Mutation>,
    },

    ReadModifyWriteRow {
        name: String,
        key: Vec<u8>,
        rules: Vec<ReadModifyWriteRule>,
    },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Ping => CommandType::Ping,
            Command::CreateTable { .. } => CommandType::CreateTable,
            Command::DeleteTable { .. } => CommandType::DeleteTable,
            Command::GetTable { .. } => CommandType::GetTable,
            Command::ListTables { .. } => CommandType::ListTables,
            Command::ModifyColumnFamilies { .. } => CommandType::ModifyColumnFamilies,
            Command::DropRowRange { .. } => CommandType::DropRowRange,
            Command::MutateRow { .. } => CommandType::MutateRow,
            Command::MutateRows { .. } => CommandType::MutateRows,
            Command::ReadRows(_) => CommandType::ReadRows,
            Command::CheckAndMutateRow { .. } => CommandType::CheckAndMutateRow,
            Command::ReadModifyWriteRow { .. } => CommandType::ReadModifyWriteRow,
        }
    }

    /// Whether the command changes state
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Command::Ping
                | Command::GetTable { .. }
                | Command::ListTables { .. }
                | Command::ReadRows(_)
        )
    }
}
