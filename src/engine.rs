//! Engine Module
//!
//! The emulator core that coordinates all components.
//!
//! ## Responsibilities
//! - Own the named tablets (one per table)
//! - Route commands to admin and data operations
//! - Log every change to the WAL before applying it (when enabled)
//! - Replay and compact the WAL on startup

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{BigcellError, Result};
use crate::model::{
    now_micros, Cell, ColumnFamily, ColumnFamilyModification, Mutation, ReadModifyWriteRule, Row,
    RowFilter,
};
use crate::protocol::{
    Command, EntryStatus, ReadRowsRequest, Reply, RowMutations, Status, TableInfo,
};
use crate::tablet::Tablet;
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The emulator engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (admin changes, mutations): Serialized by `write_lock`
///   - Only ONE write operation at a time
///   - Must acquire: write_lock → WAL → tablets → tablet internals
///   - Conditional and read-modify-write operations read and write under
///     the same `write_lock`, which makes them atomic
///
/// - **Reads** (get table, list, scans): Concurrent
///   - No write_lock needed
///   - `tables` and every tablet use internal RwLocks
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Tables by fully qualified name
    tables: RwLock<BTreeMap<String, Arc<Tablet>>>,

    /// Write-ahead log; `None` when running purely in memory
    wal: Option<Mutex<WalWriter>>,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// With a data directory:
    /// 1. Create the directory
    /// 2. Replay the WAL if one exists
    /// 3. Rewrite the WAL as a compact snapshot of the replayed state
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        let mut engine = Self {
            config,
            tables: RwLock::new(BTreeMap::new()),
            wal: None,
            write_lock: Mutex::new(()),
        };

        let (data_dir, wal_path) = match (engine.config.data_dir.clone(), engine.config.wal_path()) {
            (Some(dir), Some(path)) => (dir, path),
            _ => {
                tracing::debug!("Engine running in memory only");
                return Ok(engine);
            }
        };

        fs::create_dir_all(&data_dir)?;

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;
            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                    recovery.entries_recovered,
                    recovery.entries_corrupted,
                    recovery.last_lsn
                );
            }

            for entry in entries {
                if let Err(e) = engine.replay(entry.operation, entry.timestamp_micros) {
                    // An entry that failed when first applied was never acknowledged
                    tracing::warn!("Skipping WAL entry LSN {}: {}", entry.lsn, e);
                }
            }
        }

        let writer = engine.compact_wal(&wal_path)?;
        engine.wal = Some(Mutex::new(writer));
        Ok(engine)
    }

    /// Open a persistent engine under `path` (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Open an engine that keeps everything in memory
    pub fn in_memory() -> Self {
        Self {
            config: Config::default(),
            tables: RwLock::new(BTreeMap::new()),
            wal: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Reply> {
        match command {
            Command::Ping => Ok(Reply::Pong),
            Command::CreateTable { name, families } => {
                self.create_table(&name, families)?;
                Ok(Reply::Done)
            }
            Command::DeleteTable { name } => {
                self.delete_table(&name)?;
                Ok(Reply::Done)
            }
            Command::GetTable { name } => Ok(Reply::Table(self.get_table(&name)?)),
            Command::ListTables { parent } => Ok(Reply::Tables(self.list_tables(&parent))),
            Command::ModifyColumnFamilies {
                name,
                modifications,
            } => Ok(Reply::Table(self.modify_column_families(&name, modifications)?)),
            Command::DropRowRange { name, prefix } => {
                let dropped = self.drop_row_range(&name, prefix)?;
                Ok(Reply::RowsDropped(dropped as u64))
            }
            Command::MutateRow {
                name,
                key,
                mutations,
            } => {
                self.mutate_row(&name, &key, mutations)?;
                Ok(Reply::Done)
            }
            Command::MutateRows { name, entries } => {
                Ok(Reply::Statuses(self.mutate_rows(&name, entries)?))
            }
            Command::ReadRows(request) => Ok(Reply::Rows(self.read_rows(&request)?)),
            Command::CheckAndMutateRow {
                name,
                key,
                predicate,
                true_mutations,
                false_mutations,
            } => {
                let matched = self.check_and_mutate_row(
                    &name,
                    &key,
                    predicate.as_ref(),
                    true_mutations,
                    false_mutations,
                )?;
                Ok(Reply::PredicateMatched(matched))
            }
            Command::ReadModifyWriteRow { name, key, rules } => {
                Ok(Reply::ModifiedRow(self.read_modify_write_row(&name, &key, &rules)?))
            }
        }
    }

    // =========================================================================
    // Table Administration
    // =========================================================================

    /// Create a table with the given column families
    pub fn create_table(&self, name: &str, families: BTreeMap<String, ColumnFamily>) -> Result<()> {
        if name.is_empty() {
            return Err(BigcellError::InvalidArgument(
                "table name must not be empty".to_string(),
            ));
        }
        for (id, family) in &families {
            if id.is_empty() {
                return Err(BigcellError::InvalidArgument(
                    "column family name must not be empty".to_string(),
                ));
            }
            if let Some(rule) = &family.gc_rule {
                rule.validate()?;
            }
        }

        let _write_guard = self.lock_writes()?;
        if self.tables.read().contains_key(name) {
            return Err(BigcellError::TableAlreadyExists(name.to_string()));
        }

        let now = now_micros();
        self.log(
            Operation::CreateTable {
                name: name.to_string(),
                families: families.clone(),
            },
            now,
        )?;
        self.apply_create_table(name, families);
        tracing::info!("Created table {}", name);
        Ok(())
    }

    /// Delete a table and all of its rows
    pub fn delete_table(&self, name: &str) -> Result<()> {
        let _write_guard = self.lock_writes()?;
        self.tablet(name)?;

        self.log(
            Operation::DeleteTable {
                name: name.to_string(),
            },
            now_micros(),
        )?;
        self.tables.write().remove(name);
        tracing::info!("Deleted table {}", name);
        Ok(())
    }

    /// Schema of a table
    pub fn get_table(&self, name: &str) -> Result<TableInfo> {
        let tablet = self.tablet(name)?;
        Ok(TableInfo {
            name: name.to_string(),
            families: tablet.families(),
        })
    }

    /// Fully qualified names of the tables under `parent`
    /// (`projects/{project}/instances/{instance}`)
    pub fn list_tables(&self, parent: &str) -> Vec<String> {
        let prefix = format!("{}/tables/", parent);
        self.tables
            .read()
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Create, update or drop column families; returns the new schema
    pub fn modify_column_families(
        &self,
        name: &str,
        modifications: Vec<ColumnFamilyModification>,
    ) -> Result<TableInfo> {
        if modifications.is_empty() {
            return Err(BigcellError::InvalidArgument(
                "at least one column family modification is required".to_string(),
            ));
        }

        let _write_guard = self.lock_writes()?;
        let tablet = self.tablet(name)?;

        // Validate against a scratch copy before logging
        Tablet::new(name, tablet.families()).modify_families(&modifications)?;

        self.log(
            Operation::ModifyColumnFamilies {
                name: name.to_string(),
                modifications: modifications.clone(),
            },
            now_micros(),
        )?;
        tablet.modify_families(&modifications)?;
        tracing::debug!("Modified {} column families of {}", modifications.len(), name);

        Ok(TableInfo {
            name: name.to_string(),
            families: tablet.families(),
        })
    }

    /// Drop all rows (`prefix == None`) or the rows under a key prefix
    pub fn drop_row_range(&self, name: &str, prefix: Option<Vec<u8>>) -> Result<usize> {
        if matches!(prefix.as_deref(), Some([])) {
            return Err(BigcellError::InvalidArgument(
                "row key prefix must not be empty".to_string(),
            ));
        }

        let _write_guard = self.lock_writes()?;
        let tablet = self.tablet(name)?;

        self.log(
            Operation::DropRowRange {
                name: name.to_string(),
                prefix: prefix.clone(),
            },
            now_micros(),
        )?;
        let dropped = tablet.drop_rows(prefix.as_deref());
        tracing::debug!("Dropped {} rows from {}", dropped, name);
        Ok(dropped)
    }

    // =========================================================================
    // Data Operations
    // =========================================================================

    /// Apply mutations to one row atomically
    pub fn mutate_row(&self, name: &str, key: &[u8], mutations: Vec<Mutation>) -> Result<()> {
        let _write_guard = self.lock_writes()?;
        let tablet = self.tablet(name)?;
        self.mutate_locked(&tablet, key, mutations, now_micros())
    }

    /// Apply independent per-row mutations; one status per entry
    pub fn mutate_rows(&self, name: &str, entries: Vec<RowMutations>) -> Result<Vec<EntryStatus>> {
        if entries.is_empty() {
            return Err(BigcellError::InvalidArgument(
                "at least one entry is required".to_string(),
            ));
        }

        let _write_guard = self.lock_writes()?;
        let tablet = self.tablet(name)?;
        let now = now_micros();

        let statuses = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match self.mutate_locked(&tablet, &entry.key, entry.mutations, now) {
                Ok(()) => EntryStatus {
                    index,
                    status: Status::Ok,
                    message: None,
                },
                Err(e) => EntryStatus {
                    index,
                    status: Status::for_error(&e),
                    message: Some(e.to_string()),
                },
            })
            .collect();
        Ok(statuses)
    }

    /// Scan a table
    pub fn read_rows(&self, request: &ReadRowsRequest) -> Result<Vec<Row>> {
        let tablet = self.tablet(&request.name)?;
        Ok(tablet.read_rows(
            &request.row_set,
            request.filter.as_ref(),
            request.limit,
            now_micros(),
        ))
    }

    /// Read a single row; `None` if it has no (visible) cells
    pub fn read_row(&self, name: &str, key: &[u8], filter: Option<&RowFilter>) -> Result<Option<Row>> {
        let tablet = self.tablet(name)?;
        Ok(tablet.read_row(key, filter, now_micros()))
    }

    /// Conditionally mutate a row; returns whether the predicate matched
    pub fn check_and_mutate_row(
        &self,
        name: &str,
        key: &[u8],
        predicate: Option<&RowFilter>,
        true_mutations: Vec<Mutation>,
        false_mutations: Vec<Mutation>,
    ) -> Result<bool> {
        if true_mutations.is_empty() && false_mutations.is_empty() {
            return Err(BigcellError::InvalidArgument(
                "at least one true or false mutation is required".to_string(),
            ));
        }

        let _write_guard = self.lock_writes()?;
        let tablet = self.tablet(name)?;
        let now = now_micros();

        let matched = tablet.row_matches(key, predicate, now);
        let chosen = if matched { true_mutations } else { false_mutations };
        if !chosen.is_empty() {
            self.mutate_locked(&tablet, key, chosen, now)?;
        }
        Ok(matched)
    }

    /// Atomically append to / increment cells; returns the new cells
    pub fn read_modify_write_row(
        &self,
        name: &str,
        key: &[u8],
        rules: &[ReadModifyWriteRule],
    ) -> Result<Row> {
        let _write_guard = self.lock_writes()?;
        let tablet = self.tablet(name)?;
        let now = now_micros();

        let planned = tablet.plan_read_modify_write(key, rules, now)?;
        self.mutate_locked(&tablet, key, planned.clone(), now)?;

        let mut modified = Row::new(key.to_vec());
        for mutation in planned {
            if let Mutation::SetCell {
                family,
                qualifier,
                timestamp_micros,
                value,
            } = mutation
            {
                modified.insert_cell(
                    &family,
                    &qualifier,
                    Cell::new(timestamp_micros, value),
                );
            }
        }
        Ok(modified)
    }

    /// Flush and fsync the WAL, if any
    pub fn sync(&self) -> Result<()> {
        if let Some(wal) = &self.wal {
            let mut wal = wal.lock().map_err(|e| {
                BigcellError::WalWrite(format!("WAL lock poisoned: {}", e))
            })?;
            wal.sync()?;
        }
        Ok(())
    }

    /// Close the engine gracefully
    pub fn close(self) -> Result<()> {
        self.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Number of tables
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Whether changes are being logged
    pub fn is_persistent(&self) -> bool {
        self.wal.is_some()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| BigcellError::Server(format!("Write lock poisoned: {}", e)))
    }

    fn tablet(&self, name: &str) -> Result<Arc<Tablet>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BigcellError::TableNotFound(name.to_string()))
    }

    fn apply_create_table(&self, name: &str, families: BTreeMap<String, ColumnFamily>) {
        self.tables
            .write()
            .insert(name.to_string(), Arc::new(Tablet::new(name, families)));
    }

    /// Validate, log and apply one row's mutations (write lock held)
    fn mutate_locked(
        &self,
        tablet: &Tablet,
        key: &[u8],
        mut mutations: Vec<Mutation>,
        now: i64,
    ) -> Result<()> {
        for mutation in mutations.iter_mut() {
            mutation.resolve_server_time(now);
        }

        // Reject before logging so the WAL only holds applicable mutations
        if key.is_empty() || mutations.is_empty() {
            return tablet.apply_mutations(key, &mutations, now);
        }
        let families = tablet.families();
        for mutation in &mutations {
            mutation.validate()?;
            if let Some(family) = mutation.family() {
                if !families.contains_key(family) {
                    return Err(BigcellError::ColumnFamilyNotFound {
                        table: tablet.name().to_string(),
                        family: family.to_string(),
                    });
                }
            }
        }

        self.log(
            Operation::MutateRow {
                name: tablet.name().to_string(),
                key: key.to_vec(),
                mutations: mutations.clone(),
            },
            now,
        )?;
        tablet.apply_mutations(key, &mutations, now)
    }

    /// Append to the WAL when persistence is enabled
    fn log(&self, operation: Operation, now: i64) -> Result<()> {
        if let Some(wal) = &self.wal {
            let mut wal = wal.lock().map_err(|e| {
                BigcellError::WalWrite(format!("WAL lock poisoned: {}", e))
            })?;
            wal.append(operation, now)?;
        }
        Ok(())
    }

    /// Re-apply a logged operation during recovery
    fn replay(&self, operation: Operation, now: i64) -> Result<()> {
        match operation {
            Operation::CreateTable { name, families } => {
                self.apply_create_table(&name, families);
            }
            Operation::DeleteTable { name } => {
                self.tables.write().remove(&name);
            }
            Operation::ModifyColumnFamilies {
                name,
                modifications,
            } => {
                self.tablet(&name)?.modify_families(&modifications)?;
            }
            Operation::DropRowRange { name, prefix } => {
                self.tablet(&name)?.drop_rows(prefix.as_deref());
            }
            Operation::MutateRow {
                name,
                key,
                mutations,
            } => {
                self.tablet(&name)?.apply_mutations(&key, &mutations, now)?;
            }
        }
        Ok(())
    }

    /// Rewrite the WAL as the minimal set of operations recreating the
    /// current state, then continue appending to it
    fn compact_wal(&self, wal_path: &Path) -> Result<WalWriter> {
        let compact_path = wal_path.with_extension("log.compact");
        let strategy = self.config.wal_sync_strategy;
        let now = now_micros();

        {
            let mut writer = WalWriter::create(&compact_path, strategy)?;
            let tables = self.tables.read();
            for (name, tablet) in tables.iter() {
                writer.append(
                    Operation::CreateTable {
                        name: name.clone(),
                        families: tablet.families(),
                    },
                    now,
                )?;
                for row in tablet.snapshot_rows() {
                    let mutations = row_to_mutations(&row);
                    writer.append(
                        Operation::MutateRow {
                            name: name.clone(),
                            key: row.key,
                            mutations,
                        },
                        now,
                    )?;
                }
            }
            writer.sync()?;
        }

        fs::rename(&compact_path, wal_path)?;
        let recovered = WalRecovery::verify(wal_path)?;
        tracing::debug!(
            "WAL compacted to {} entries ({} tables)",
            recovered.entries_recovered,
            self.table_count()
        );
        WalWriter::open(wal_path, strategy, recovered.last_lsn)
    }
}

/// `SetCell` mutations recreating every cell of a row
fn row_to_mutations(row: &Row) -> Vec<Mutation> {
    row.families
        .iter()
        .flat_map(|(family, columns)| {
            columns.iter().flat_map(move |(qualifier, cells)| {
                cells.iter().map(move |cell| Mutation::SetCell {
                    family: family.clone(),
                    qualifier: qualifier.clone(),
                    timestamp_micros: cell.timestamp_micros,
                    value: cell.value.clone(),
                })
            })
        })
        .collect()
}
