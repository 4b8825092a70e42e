//! Data Model
//!
//! The wide-column data model shared by the emulator and the client.
//!
//! ```text
//! table ─┬─ row "123#1" ─┬─ family "W" ─┬─ qualifier "col_bool" ─ [cell@t2, cell@t1]
//!        │               │              └─ qualifier "col_int"  ─ [cell@t1]
//!        │               └─ family "X" ── ...
//!        └─ row "123#2" ── ...
//! ```
//!
//! Rows are ordered by key bytes. Cells inside a column are ordered
//! newest-first. A row without any cell does not exist.

mod cell;
mod filter;
mod gc;
mod mutation;
mod row_set;

pub use cell::{Cell, Row};
pub use filter::RowFilter;
pub use gc::{ColumnFamily, GcRule};
pub use mutation::{ColumnFamilyModification, Mutation, ReadModifyWriteRule, SERVER_TIME};
pub use row_set::{prefix_row_set, RowRange, RowSet, KEY_SEPARATOR};

/// Current wall-clock time in microseconds, truncated to millisecond
/// granularity (the only granularity tables accept).
pub fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_millis() * 1000
}

/// `projects/{project}/instances/{instance}`
pub fn instance_path(project: &str, instance: &str) -> String {
    format!("projects/{}/instances/{}", project, instance)
}

/// `projects/{project}/instances/{instance}/tables/{table}`
pub fn table_path(project: &str, instance: &str, table: &str) -> String {
    format!("{}/tables/{}", instance_path(project, instance), table)
}

/// Extract the short table id from a fully qualified table name.
///
/// Names without a `/tables/` segment are returned unchanged.
pub fn table_id(path: &str) -> &str {
    match path.rfind("/tables/") {
        Some(pos) => &path[pos + "/tables/".len()..],
        None => path,
    }
}
