//! Error types for bigcell
//!
//! Provides a unified error type for the emulator, the client and the codecs.

use thiserror::Error;

/// Result type alias using BigcellError
pub type Result<T> = std::result::Result<T, BigcellError>;

/// Unified error type for bigcell operations
#[derive(Debug, Error)]
pub enum BigcellError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Table Errors (raised by the emulator)
    // -------------------------------------------------------------------------
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("Column family {family} not found in table {table}")]
    ColumnFamilyNotFound { table: String, family: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Remote Errors (status codes reported back to a client)
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cell codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Walkthrough Errors
    // -------------------------------------------------------------------------
    #[error("Verification failed: {0}")]
    Verification(String),
}

impl From<bincode::Error> for BigcellError {
    fn from(err: bincode::Error) -> Self {
        BigcellError::Serialization(err.to_string())
    }
}

impl From<bson::ser::Error> for BigcellError {
    fn from(err: bson::ser::Error) -> Self {
        BigcellError::Codec(format!("BSON encode: {}", err))
    }
}

impl From<bson::de::Error> for BigcellError {
    fn from(err: bson::de::Error) -> Self {
        BigcellError::Codec(format!("BSON decode: {}", err))
    }
}

impl BigcellError {
    /// True for errors meaning "the thing asked for does not exist",
    /// whether raised locally or reported by a remote emulator.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BigcellError::NotFound(_)
                | BigcellError::TableNotFound(_)
                | BigcellError::ColumnFamilyNotFound { .. }
        )
    }

    /// True for errors meaning "the thing being created already exists".
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            BigcellError::AlreadyExists(_) | BigcellError::TableAlreadyExists(_)
        )
    }
}
