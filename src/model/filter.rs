//! Row filters applied on read

use serde::{Deserialize, Serialize};

use super::Row;

/// Restricts which cells of a row are returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowFilter {
    /// Every cell
    PassAll,

    /// Cells of one family
    FamilyName(String),

    /// Cells of one qualifier (in any family)
    ColumnQualifier(Vec<u8>),

    /// Newest N cells of each column
    CellsPerColumnLimit(u32),

    /// Cells with `start <= timestamp < end`
    TimestampRange {
        start_micros: Option<i64>,
        end_micros: Option<i64>,
    },

    /// Cells whose value equals the given bytes
    ValueEquals(Vec<u8>),

    /// Apply each filter to the output of the previous one
    Chain(Vec<RowFilter>),
}

impl RowFilter {
    /// Filtered copy of `row`; may be empty
    pub fn apply(&self, row: &Row) -> Row {
        let mut out = row.clone();
        self.apply_in_place(&mut out);
        out
    }

    /// Whether any cell of `row` passes the filter
    pub fn matches(&self, row: &Row) -> bool {
        !self.apply(row).is_empty()
    }

    pub(crate) fn apply_in_place(&self, row: &mut Row) {
        match self {
            RowFilter::PassAll => {}
            RowFilter::FamilyName(name) => row.retain_cells(|family, _, _, _| family == name.as_str()),
            RowFilter::ColumnQualifier(wanted) => {
                row.retain_cells(|_, qualifier, _, _| qualifier == wanted.as_slice())
            }
            RowFilter::CellsPerColumnLimit(limit) => {
                row.retain_cells(|_, _, index, _| index < *limit as usize)
            }
            RowFilter::TimestampRange {
                start_micros,
                end_micros,
            } => row.retain_cells(|_, _, _, cell| {
                start_micros.map_or(true, |start| cell.timestamp_micros >= start)
                    && end_micros.map_or(true, |end| cell.timestamp_micros < end)
            }),
            RowFilter::ValueEquals(value) => row.retain_cells(|_, _, _, cell| &cell.value == value),
            RowFilter::Chain(filters) => {
                for filter in filters {
                    filter.apply_in_place(row);
                }
            }
        }
    }
}
