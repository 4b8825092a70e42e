//! Cells and rows

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::encoding::CellValue;
use crate::error::{BigcellError, Result};

/// A single timestamped value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Microseconds since the epoch, millisecond granularity
    pub timestamp_micros: i64,

    /// Raw value bytes
    pub value: Vec<u8>,
}

impl Cell {
    pub fn new(timestamp_micros: i64, value: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp_micros,
            value: value.into(),
        }
    }
}

/// Cells of one column, newest first
pub(crate) type Column = Vec<Cell>;

/// A row: key plus family → qualifier → cells
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: Vec<u8>,
    pub families: BTreeMap<String, BTreeMap<Vec<u8>, Column>>,
}

impl Row {
    /// Create an empty row
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            families: BTreeMap::new(),
        }
    }

    /// All versions of a column, newest first (empty if the column is absent)
    pub fn cells(&self, family: &str, qualifier: &[u8]) -> &[Cell] {
        self.families
            .get(family)
            .and_then(|columns| columns.get(qualifier))
            .map(|cells| cells.as_slice())
            .unwrap_or(&[])
    }

    /// Newest cell of a column
    pub fn latest(&self, family: &str, qualifier: &[u8]) -> Option<&Cell> {
        self.cells(family, qualifier).first()
    }

    /// Value of the newest cell of a column
    pub fn cell_value(&self, family: &str, qualifier: &[u8]) -> Option<&[u8]> {
        self.latest(family, qualifier).map(|cell| cell.value.as_slice())
    }

    /// Decode the newest cell of a column as a typed value
    ///
    /// A missing column is a `NotFound` error.
    pub fn decode<T: CellValue>(&self, family: &str, qualifier: &[u8]) -> Result<T> {
        let bytes = self.cell_value(family, qualifier).ok_or_else(|| {
            BigcellError::NotFound(format!(
                "cell {}:{} in row {}",
                family,
                String::from_utf8_lossy(qualifier),
                String::from_utf8_lossy(&self.key)
            ))
        })?;
        T::from_cell_bytes(bytes)
    }

    /// Total number of cells across all columns
    pub fn cell_count(&self) -> usize {
        self.families
            .values()
            .flat_map(|columns| columns.values())
            .map(|cells| cells.len())
            .sum()
    }

    /// A row with no cells does not exist
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Insert a cell keeping newest-first order; same timestamp overwrites
    pub(crate) fn insert_cell(&mut self, family: &str, qualifier: &[u8], cell: Cell) {
        let cells = self
            .families
            .entry(family.to_string())
            .or_default()
            .entry(qualifier.to_vec())
            .or_default();

        match cells.binary_search_by(|c| cell.timestamp_micros.cmp(&c.timestamp_micros)) {
            Ok(pos) => cells[pos] = cell,
            Err(pos) => cells.insert(pos, cell),
        }
    }

    /// Mutable access to a column, if present
    pub(crate) fn column_mut(&mut self, family: &str, qualifier: &[u8]) -> Option<&mut Column> {
        self.families
            .get_mut(family)
            .and_then(|columns| columns.get_mut(qualifier))
    }

    /// Keep only cells accepted by `keep(family, qualifier, index, cell)`
    pub(crate) fn retain_cells<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &[u8], usize, &Cell) -> bool,
    {
        for (family, columns) in self.families.iter_mut() {
            for (qualifier, cells) in columns.iter_mut() {
                let mut index = 0;
                cells.retain(|cell| {
                    let kept = keep(family, qualifier, index, cell);
                    index += 1;
                    kept
                });
            }
        }
        self.prune_empty();
    }

    /// Remove empty columns and empty families
    pub(crate) fn prune_empty(&mut self) {
        for columns in self.families.values_mut() {
            columns.retain(|_, cells| !cells.is_empty());
        }
        self.families.retain(|_, columns| !columns.is_empty());
    }
}
