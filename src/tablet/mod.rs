//! Tablet Module
//!
//! In-memory storage for one table.
//!
//! ## Responsibilities
//! - Hold the column-family schema and the rows
//! - Apply row mutations atomically (validate everything, then apply)
//! - Run per-family garbage collection on write and on read
//! - Serve point reads and ordered scans with row sets and filters
//!
//! ## Data Structure Choice
//! A `BTreeMap` keyed by row bytes, wrapped in a `parking_lot::RwLock`:
//! - Ordered keys give ordered scans and cheap prefix ranges
//! - Many concurrent readers, one writer at a time
//!
//! Lock order is always `families` before `rows`.

mod table;

pub use table::Tablet;
