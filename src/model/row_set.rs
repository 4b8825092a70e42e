//! Row sets: explicit keys plus key ranges

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

/// Separator between the entity part and the version part of a row key
/// (`"123#1"`, `"123#2"`)
pub const KEY_SEPARATOR: u8 = b'#';

/// A contiguous range of row keys
///
/// Missing keys mean unbounded. By default the start is inclusive and the
/// end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start_key: Option<Vec<u8>>,
    pub end_key: Option<Vec<u8>>,
    pub start_inclusive: bool,
    pub end_inclusive: bool,
}

impl RowRange {
    /// `[start, end)`
    pub fn new(start_key: Option<Vec<u8>>, end_key: Option<Vec<u8>>) -> Self {
        Self {
            start_key,
            end_key,
            start_inclusive: true,
            end_inclusive: false,
        }
    }

    /// Every key starting with `prefix`
    pub fn with_prefix(prefix: impl AsRef<[u8]>) -> Self {
        let prefix = prefix.as_ref();
        let start = if prefix.is_empty() {
            None
        } else {
            Some(prefix.to_vec())
        };
        Self::new(start, prefix_end(prefix))
    }

    /// Whether `key` falls inside the range
    pub fn contains(&self, key: &[u8]) -> bool {
        let after_start = match &self.start_key {
            None => true,
            Some(start) if self.start_inclusive => key >= start.as_slice(),
            Some(start) => key > start.as_slice(),
        };
        let before_end = match &self.end_key {
            None => true,
            Some(end) if self.end_inclusive => key <= end.as_slice(),
            Some(end) => key < end.as_slice(),
        };
        after_start && before_end
    }

    /// True when no key can satisfy the range
    pub fn is_empty(&self) -> bool {
        match (&self.start_key, &self.end_key) {
            (Some(start), Some(end)) => {
                start > end || (start == end && !(self.start_inclusive && self.end_inclusive))
            }
            _ => false,
        }
    }

    /// Bounds usable with `BTreeMap::range`
    pub(crate) fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let start = match &self.start_key {
            None => Bound::Unbounded,
            Some(key) if self.start_inclusive => Bound::Included(key.as_slice()),
            Some(key) => Bound::Excluded(key.as_slice()),
        };
        let end = match &self.end_key {
            None => Bound::Unbounded,
            Some(key) if self.end_inclusive => Bound::Included(key.as_slice()),
            Some(key) => Bound::Excluded(key.as_slice()),
        };
        (start, end)
    }
}

/// Smallest key greater than every key with the given prefix
///
/// Trailing 0xFF bytes cannot be incremented and are dropped; an all-0xFF
/// (or empty) prefix has no upper bound.
fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// A union of row keys and row ranges
///
/// An empty set selects every row of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    pub row_keys: Vec<Vec<u8>>,
    pub row_ranges: Vec<RowRange>,
}

impl RowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row_key(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.row_keys.push(key.into());
        self
    }

    pub fn add_row_range(&mut self, range: RowRange) -> &mut Self {
        self.row_ranges.push(range);
        self
    }

    pub fn add_row_range_from_keys(
        &mut self,
        start_key: Option<Vec<u8>>,
        end_key: Option<Vec<u8>>,
        start_inclusive: bool,
        end_inclusive: bool,
    ) -> &mut Self {
        self.add_row_range(RowRange {
            start_key,
            end_key,
            start_inclusive,
            end_inclusive,
        })
    }

    pub fn add_row_range_with_prefix(&mut self, prefix: impl AsRef<[u8]>) -> &mut Self {
        self.add_row_range(RowRange::with_prefix(prefix))
    }

    /// No keys and no ranges: the whole table
    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty() && self.row_ranges.is_empty()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.is_empty()
            || self.row_keys.iter().any(|k| k.as_slice() == key)
            || self.row_ranges.iter().any(|range| range.contains(key))
    }

    /// Select matching entries of an ordered map, in key order, without
    /// duplicates from overlapping ranges
    pub(crate) fn select<'a, V>(&self, rows: &'a BTreeMap<Vec<u8>, V>) -> Vec<(&'a Vec<u8>, &'a V)> {
        if self.is_empty() {
            return rows.iter().collect();
        }

        let mut selected: BTreeMap<&'a Vec<u8>, &'a V> = BTreeMap::new();
        for key in &self.row_keys {
            if let Some((k, v)) = rows.get_key_value(key.as_slice()) {
                selected.insert(k, v);
            }
        }
        for range in &self.row_ranges {
            if range.is_empty() {
                continue;
            }
            for (k, v) in rows.range::<[u8], _>(range.bounds()) {
                selected.insert(k, v);
            }
        }
        selected.into_iter().collect()
    }
}

/// Row set of every key in the `prefix#...` family of keys
///
/// `prefix_row_set("123")` matches `123#1` and `123#2` but not `1234#1`.
pub fn prefix_row_set(prefix: impl AsRef<[u8]>) -> RowSet {
    let mut full = prefix.as_ref().to_vec();
    full.push(KEY_SEPARATOR);
    let mut set = RowSet::new();
    set.add_row_range_with_prefix(full);
    set
}
