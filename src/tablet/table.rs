//! Tablet implementation
//!
//! BTreeMap-based row store with RwLock for concurrency.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::{BigcellError, Result};
use crate::model::{
    Cell, ColumnFamily, ColumnFamilyModification, Mutation, ReadModifyWriteRule, Row, RowFilter,
    RowSet, SERVER_TIME,
};

/// In-memory storage for one table
pub struct Tablet {
    /// Fully qualified table name (for error messages)
    name: String,

    /// Column family schema
    families: RwLock<BTreeMap<String, ColumnFamily>>,

    /// Rows ordered by key; never holds an empty row
    rows: RwLock<BTreeMap<Vec<u8>, Row>>,
}

impl Tablet {
    /// Create an empty tablet with the given schema
    pub fn new(name: impl Into<String>, families: BTreeMap<String, ColumnFamily>) -> Self {
        Self {
            name: name.into(),
            families: RwLock::new(families),
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the schema
    pub fn families(&self) -> BTreeMap<String, ColumnFamily> {
        self.families.read().clone()
    }

    /// Number of stored rows
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Apply mutations to one row atomically
    ///
    /// Every mutation is validated before any is applied, so a bad family
    /// or timestamp leaves the row untouched.
    pub fn apply_mutations(&self, key: &[u8], mutations: &[Mutation], now_micros: i64) -> Result<()> {
        if key.is_empty() {
            return Err(BigcellError::InvalidArgument(
                "row key must not be empty".to_string(),
            ));
        }
        if mutations.is_empty() {
            return Err(BigcellError::InvalidArgument(
                "at least one mutation is required".to_string(),
            ));
        }

        let families = self.families.read();
        for mutation in mutations {
            mutation.validate()?;
            if let Some(family) = mutation.family() {
                self.require_family(&families, family)?;
            }
        }

        let mut rows = self.rows.write();
        let row = rows
            .entry(key.to_vec())
            .or_insert_with(|| Row::new(key.to_vec()));

        for mutation in mutations {
            apply_one(row, mutation, now_micros);
        }
        collect_garbage(row, &families, now_micros);

        if row.is_empty() {
            rows.remove(key);
        }
        Ok(())
    }

    /// Compute the cell writes a read-modify-write would perform
    ///
    /// Nothing is applied; the caller applies the returned `SetCell`
    /// mutations (with concrete timestamps) while still holding its write
    /// lock.
    pub fn plan_read_modify_write(
        &self,
        key: &[u8],
        rules: &[ReadModifyWriteRule],
        now_micros: i64,
    ) -> Result<Vec<Mutation>> {
        if key.is_empty() {
            return Err(BigcellError::InvalidArgument(
                "row key must not be empty".to_string(),
            ));
        }
        if rules.is_empty() {
            return Err(BigcellError::InvalidArgument(
                "at least one read-modify-write rule is required".to_string(),
            ));
        }

        let families = self.families.read();
        for rule in rules {
            self.require_family(&families, rule.family())?;
        }

        // Expired versions must not feed the new value
        let mut scratch = self
            .rows
            .read()
            .get(key)
            .cloned()
            .unwrap_or_else(|| Row::new(key.to_vec()));
        collect_garbage(&mut scratch, &families, now_micros);

        let mut planned = Vec::with_capacity(rules.len());
        for rule in rules {
            let family = rule.family();
            let qualifier = rule.qualifier();
            let latest = scratch.latest(family, qualifier);
            let timestamp = latest
                .map(|cell| cell.timestamp_micros.max(now_micros))
                .unwrap_or(now_micros);
            let current = latest.map(|cell| cell.value.as_slice()).unwrap_or(&[]);

            let value = match rule {
                ReadModifyWriteRule::AppendValue { value, .. } => {
                    let mut joined = current.to_vec();
                    joined.extend_from_slice(value);
                    joined
                }
                ReadModifyWriteRule::IncrementAmount { amount, .. } => {
                    let base = if current.is_empty() {
                        0
                    } else {
                        let bytes: [u8; 8] = current.try_into().map_err(|_| {
                            BigcellError::InvalidArgument(format!(
                                "cell {}:{} is not a 64-bit big-endian integer",
                                family,
                                String::from_utf8_lossy(qualifier)
                            ))
                        })?;
                        i64::from_be_bytes(bytes)
                    };
                    base.wrapping_add(*amount).to_be_bytes().to_vec()
                }
            };

            scratch.insert_cell(family, qualifier, Cell::new(timestamp, value.clone()));
            planned.push(Mutation::SetCell {
                family: family.to_string(),
                qualifier: qualifier.to_vec(),
                timestamp_micros: timestamp,
                value,
            });
        }
        Ok(planned)
    }

    /// Delete every row, or every row whose key starts with `prefix`
    ///
    /// Returns the number of rows removed.
    pub fn drop_rows(&self, prefix: Option<&[u8]>) -> usize {
        let mut rows = self.rows.write();
        let before = rows.len();
        match prefix {
            None => rows.clear(),
            Some(prefix) => rows.retain(|key, _| !key.starts_with(prefix)),
        }
        before - rows.len()
    }

    /// Apply a batch of column family changes
    ///
    /// The batch is applied in order to a copy of the schema; if any step
    /// fails nothing changes. Dropping a family deletes its cells.
    pub fn modify_families(&self, modifications: &[ColumnFamilyModification]) -> Result<()> {
        let mut families = self.families.write();
        let mut updated = families.clone();
        let mut dropped = Vec::new();

        for modification in modifications {
            match modification {
                ColumnFamilyModification::Create { id, gc_rule } => {
                    if id.is_empty() {
                        return Err(BigcellError::InvalidArgument(
                            "column family name must not be empty".to_string(),
                        ));
                    }
                    if updated.contains_key(id) {
                        return Err(BigcellError::AlreadyExists(format!(
                            "column family {} already exists in table {}",
                            id, self.name
                        )));
                    }
                    if let Some(rule) = gc_rule {
                        rule.validate()?;
                    }
                    updated.insert(id.clone(), ColumnFamily::new(gc_rule.clone()));
                }
                ColumnFamilyModification::Update { id, gc_rule } => {
                    self.require_family(&updated, id)?;
                    if let Some(rule) = gc_rule {
                        rule.validate()?;
                    }
                    updated.insert(id.clone(), ColumnFamily::new(gc_rule.clone()));
                }
                ColumnFamilyModification::Drop { id } => {
                    self.require_family(&updated, id)?;
                    updated.remove(id);
                    dropped.push(id.clone());
                }
            }
        }

        if !dropped.is_empty() {
            let mut rows = self.rows.write();
            for row in rows.values_mut() {
                for id in &dropped {
                    // A family re-created later in the batch starts empty too
                    row.families.remove(id);
                }
            }
            rows.retain(|_, row| !row.is_empty());
        }

        *families = updated;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read one row; `None` if it does not exist or nothing passes the filter
    pub fn read_row(&self, key: &[u8], filter: Option<&RowFilter>, now_micros: i64) -> Option<Row> {
        let families = self.families.read();
        let rows = self.rows.read();
        rows.get(key)
            .and_then(|row| visible(row, &families, filter, now_micros))
    }

    /// Read rows selected by `row_set` in key order
    ///
    /// `limit` of `None` or `Some(0)` returns every matching row.
    pub fn read_rows(
        &self,
        row_set: &RowSet,
        filter: Option<&RowFilter>,
        limit: Option<u64>,
        now_micros: i64,
    ) -> Vec<Row> {
        let limit = match limit {
            None | Some(0) => usize::MAX,
            Some(n) => n.min(usize::MAX as u64) as usize,
        };

        let families = self.families.read();
        let rows = self.rows.read();
        row_set
            .select(&*rows)
            .into_iter()
            .filter_map(|(_, row)| visible(row, &families, filter, now_micros))
            .take(limit)
            .collect()
    }

    /// Whether any cell of the row passes `predicate`
    ///
    /// Without a predicate, whether the row exists at all.
    pub fn row_matches(&self, key: &[u8], predicate: Option<&RowFilter>, now_micros: i64) -> bool {
        self.read_row(key, predicate, now_micros).is_some()
    }

    /// Every stored row (garbage included), in key order
    pub fn snapshot_rows(&self) -> Vec<Row> {
        self.rows.read().values().cloned().collect()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_family(&self, families: &BTreeMap<String, ColumnFamily>, family: &str) -> Result<()> {
        if families.contains_key(family) {
            Ok(())
        } else {
            Err(BigcellError::ColumnFamilyNotFound {
                table: self.name.clone(),
                family: family.to_string(),
            })
        }
    }
}

/// Apply one already-validated mutation
fn apply_one(row: &mut Row, mutation: &Mutation, now_micros: i64) {
    match mutation {
        Mutation::SetCell {
            family,
            qualifier,
            timestamp_micros,
            value,
        } => {
            let timestamp = if *timestamp_micros == SERVER_TIME {
                now_micros
            } else {
                *timestamp_micros
            };
            row.insert_cell(family, qualifier, Cell::new(timestamp, value.clone()));
        }
        Mutation::DeleteFromColumn {
            family,
            qualifier,
            start_micros,
            end_micros,
        } => {
            if let Some(cells) = row.column_mut(family, qualifier) {
                cells.retain(|cell| {
                    let in_range = start_micros.map_or(true, |s| cell.timestamp_micros >= s)
                        && end_micros.map_or(true, |e| cell.timestamp_micros < e);
                    !in_range
                });
            }
            row.prune_empty();
        }
        Mutation::DeleteFromFamily { family } => {
            row.families.remove(family);
        }
        Mutation::DeleteFromRow => row.families.clear(),
    }
}

/// Drop versions the family GC rules no longer keep
fn collect_garbage(row: &mut Row, families: &BTreeMap<String, ColumnFamily>, now_micros: i64) {
    row.retain_cells(|family, _, index, cell| {
        families
            .get(family)
            .map(|cf| !cf.is_garbage(index, cell.timestamp_micros, now_micros))
            .unwrap_or(false)
    });
}

/// The row as a reader sees it: GC applied, then the filter
fn visible(
    row: &Row,
    families: &BTreeMap<String, ColumnFamily>,
    filter: Option<&RowFilter>,
    now_micros: i64,
) -> Option<Row> {
    let mut view = row.clone();
    collect_garbage(&mut view, families, now_micros);
    if let Some(filter) = filter {
        filter.apply_in_place(&mut view);
    }
    if view.is_empty() {
        None
    } else {
        Some(view)
    }
}
