//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::collections::BTreeMap;

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::error::{BigcellError, Result};
use crate::model::{ColumnFamily, ColumnFamilyModification, Mutation};

/// Header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Server time (micros) when the entry was created; replay uses it as
    /// "now" so garbage collection behaves as it did originally
    pub timestamp_micros: i64,
}

/// Operations that can be logged
///
/// Row mutations are logged with concrete timestamps, never `SERVER_TIME`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    CreateTable {
        name: String,
        families: BTreeMap<String, ColumnFamily>,
    },

    DeleteTable {
        name: String,
    },

    ModifyColumnFamilies {
        name: String,
        modifications: Vec<ColumnFamilyModification>,
    },

    /// Drop every row (`prefix == None`) or rows with a key prefix
    DropRowRange {
        name: String,
        prefix: Option<Vec<u8>>,
    },

    MutateRow {
        name: String,
        key: Vec<u8>,
        mutations: Vec<Mutation>,
    },
}

impl WalEntry {
    pub fn new(lsn: u64, operation: Operation, timestamp_micros: i64) -> Self {
        Self {
            lsn,
            operation,
            timestamp_micros,
        }
    }

    /// Encode as a framed record: LSN | CRC | Len | Data
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        if data.len() > u32::MAX as usize {
            return Err(BigcellError::WalWrite(format!(
                "entry of {} bytes is too large",
                data.len()
            )));
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
        frame.put_u64(self.lsn);
        frame.put_u32(crc32fast::hash(&data));
        frame.put_u32(data.len() as u32);
        frame.extend_from_slice(&data);
        Ok(frame)
    }

    /// Decode the data part of a record after checking it against the
    /// header's LSN and CRC
    pub fn decode(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(data);
        if actual != crc {
            return Err(BigcellError::WalCorruption(format!(
                "checksum mismatch at LSN {}: expected {:08x}, got {:08x}",
                lsn, crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)
            .map_err(|e| BigcellError::WalCorruption(format!("undecodable entry at LSN {}: {}", lsn, e)))?;
        if entry.lsn != lsn {
            return Err(BigcellError::WalCorruption(format!(
                "header LSN {} does not match entry LSN {}",
                lsn, entry.lsn
            )));
        }
        Ok(entry)
    }
}
