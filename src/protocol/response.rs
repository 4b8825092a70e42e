//! Response definitions
//!
//! Represents responses to clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BigcellError, Result};
use crate::model::{ColumnFamily, Row};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    AlreadyExists = 0x03,
    InvalidArgument = 0x04,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            0x03 => Some(Status::AlreadyExists),
            0x04 => Some(Status::InvalidArgument),
            _ => None,
        }
    }

    /// Status reported to a client for an emulator-side error
    pub fn for_error(err: &BigcellError) -> Self {
        match err {
            BigcellError::TableNotFound(_)
            | BigcellError::ColumnFamilyNotFound { .. }
            | BigcellError::NotFound(_) => Status::NotFound,
            BigcellError::TableAlreadyExists(_) | BigcellError::AlreadyExists(_) => {
                Status::AlreadyExists
            }
            BigcellError::InvalidArgument(_) | BigcellError::Codec(_) => Status::InvalidArgument,
            _ => Status::Error,
        }
    }

    /// Rebuild a client-side error from a status and message
    pub fn into_error(self, message: String) -> BigcellError {
        match self {
            Status::NotFound => BigcellError::NotFound(message),
            Status::AlreadyExists => BigcellError::AlreadyExists(message),
            Status::InvalidArgument => BigcellError::InvalidArgument(message),
            Status::Ok | Status::Error => BigcellError::Server(message),
        }
    }
}

/// Schema of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub families: BTreeMap<String, ColumnFamily>,
}

/// Outcome of one entry of a `MutateRows` batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatus {
    pub index: usize,
    pub status: Status,
    pub message: Option<String>,
}

/// Successful result of a command (the payload of an OK response)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Pong,

    /// Command applied, nothing to return
    Done,

    Table(TableInfo),

    Tables(Vec<String>),

    Rows(Vec<Row>),

    /// Number of rows removed by `DropRowRange`
    RowsDropped(u64),

    Statuses(Vec<EntryStatus>),

    /// Whether a `CheckAndMutateRow` predicate matched
    PredicateMatched(bool),

    /// Cells written by a `ReadModifyWriteRow`
    ModifiedRow(Row),
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (encoded `Reply` for OK, error message otherwise)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self::with_status(Status::Error, message)
    }

    /// Response carrying a message under the given status
    pub fn with_status(status: Status, message: &str) -> Self {
        Self {
            status,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Response describing an emulator-side error
    pub fn from_error(err: &BigcellError) -> Self {
        Self::with_status(Status::for_error(err), &err.to_string())
    }

    /// Human-readable message carried by a non-OK response
    pub fn message(&self) -> String {
        self.payload
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    /// Turn a non-OK response into the matching client error
    pub fn into_result(self) -> Result<Option<Vec<u8>>> {
        match self.status {
            Status::Ok => Ok(self.payload),
            status => Err(status.into_error(self.message())),
        }
    }
}
