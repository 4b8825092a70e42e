//! # bigcell
//!
//! A local wide-column store emulator and its client:
//! - Tables of rows, column families and timestamped cells
//! - Garbage-collection rules, row sets, filters and conditional writes
//! - Optional Write-Ahead Logging (WAL) with crash recovery
//! - Single-writer/multi-reader concurrency model
//! - TCP-based client protocol and a blocking client library
//! - Typed cell codecs (numbers, booleans, datetimes, BSON, string lists)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          Client library  /  bigcell-cli  /  smoke            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ framed bincode over TCP
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (thread per client)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │   Tablets   │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod model;
pub mod encoding;
pub mod tablet;
pub mod wal;
pub mod protocol;
pub mod network;
pub mod engine;
pub mod client;
pub mod smoke;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BigcellError, Result};
pub use config::Config;
pub use engine::Engine;
pub use client::{Client, Table};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bigcell
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
