//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::WalSyncStrategy;
use crate::error::{BigcellError, Result};
use super::{Operation, WalEntry};

/// Writes entries to the WAL file
pub struct WalWriter {
    writer: BufWriter<File>,
    sync_strategy: WalSyncStrategy,

    /// LSN of the last appended entry (0 = none yet)
    current_lsn: u64,

    /// Entries written since the last fsync
    unsynced: usize,
}

impl WalWriter {
    /// Open a WAL file for appending, continuing after `last_lsn`
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy, last_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            sync_strategy,
            current_lsn: last_lsn,
            unsynced: 0,
        })
    }

    /// Create an empty WAL file, replacing any existing one
    pub fn create(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            sync_strategy,
            current_lsn: 0,
            unsynced: 0,
        })
    }

    /// Append an operation; returns its LSN
    ///
    /// The entry is flushed to the OS before returning and fsynced
    /// according to the sync strategy.
    pub fn append(&mut self, operation: Operation, timestamp_micros: i64) -> Result<u64> {
        let lsn = self.current_lsn + 1;
        let frame = WalEntry::new(lsn, operation, timestamp_micros).encode()?;

        self.writer
            .write_all(&frame)
            .and_then(|_| self.writer.flush())
            .map_err(|e| BigcellError::WalWrite(format!("append LSN {}: {}", lsn, e)))?;
        self.current_lsn = lsn;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            self.sync()?;
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN of the last appended entry
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }
}
