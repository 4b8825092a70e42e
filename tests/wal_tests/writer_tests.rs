//! Tests for WAL Writer and Reader
//!
//! These tests verify:
//! - Writing entries to WAL
//! - LSN generation and sequencing
//! - Appending to an existing log
//! - Truncation
//! - Entry framing and checksum validation
//! - Reading entries back (directly and via iterator)

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use bigcell::config::WalSyncStrategy;
use bigcell::model::Mutation;
use bigcell::wal::{Operation, WalEntry, WalReader, WalWriter, HEADER_SIZE};
use bigcell::BigcellError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn set_cell(key: &str, value: &str) -> Operation {
    Operation::MutateRow {
        name: "projects/p/instances/i/tables/t".to_string(),
        key: key.as_bytes().to_vec(),
        mutations: vec![Mutation::SetCell {
            family: "cf".to_string(),
            qualifier: b"q".to_vec(),
            timestamp_micros: 1_000,
            value: value.as_bytes().to_vec(),
        }],
    }
}

fn read_all(path: &PathBuf) -> Vec<WalEntry> {
    WalReader::open(path)
        .unwrap()
        .entries()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(set_cell("row1", "value1"), 5_000).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 1);

    let entries = read_all(&wal_path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].lsn, 1);
    assert_eq!(entries[0].timestamp_micros, 5_000);
    assert_eq!(entries[0].operation, set_cell("row1", "value1"));
}

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsns: Vec<u64> = (0..50)
        .map(|i| writer.append(set_cell(&format!("row{}", i), "v"), 0).unwrap())
        .collect();

    assert_eq!(lsns, (1..=50).collect::<Vec<u64>>());
}

#[test]
fn test_every_operation_kind_is_readable() {
    let (_temp, wal_path) = setup_temp_wal();
    let name = "projects/p/instances/i/tables/t".to_string();

    let operations = vec![
        Operation::CreateTable {
            name: name.clone(),
            families: Default::default(),
        },
        set_cell("a", "1"),
        Operation::DropRowRange {
            name: name.clone(),
            prefix: Some(b"a".to_vec()),
        },
        Operation::ModifyColumnFamilies {
            name: name.clone(),
            modifications: vec![],
        },
        Operation::DeleteTable { name },
    ];

    let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    for op in &operations {
        writer.append(op.clone(), 0).unwrap();
    }

    let read: Vec<Operation> = read_all(&wal_path).into_iter().map(|e| e.operation).collect();
    assert_eq!(read, operations);
}

#[test]
fn test_open_continues_after_last_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(set_cell("a", "1"), 0).unwrap();
        writer.append(set_cell("b", "2"), 0).unwrap();
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, 2).unwrap();
    assert_eq!(writer.append(set_cell("c", "3"), 0).unwrap(), 3);

    let lsns: Vec<u64> = read_all(&wal_path).iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![1, 2, 3]);
}

#[test]
fn test_create_discards_existing_log() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(set_cell("old", "1"), 0).unwrap();
    }

    let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(set_cell("new", "1"), 0).unwrap();

    let entries = read_all(&wal_path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation, set_cell("new", "1"));
}

#[test]
fn test_every_n_entries_still_readable_after_sync() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer =
        WalWriter::create(&wal_path, WalSyncStrategy::EveryNEntries { count: 5 }).unwrap();
    for i in 0..7 {
        writer.append(set_cell(&format!("k{}", i), "v"), 0).unwrap();
    }
    writer.sync().unwrap();

    assert_eq!(read_all(&wal_path).len(), 7);
}

// =============================================================================
// Entry Framing Tests
// =============================================================================

#[test]
fn test_entry_frame_layout() {
    let entry = WalEntry::new(7, set_cell("row", "value"), 1_000);
    let frame = entry.encode().unwrap();

    let lsn = u64::from_be_bytes(frame[0..8].try_into().unwrap());
    let crc = u32::from_be_bytes(frame[8..12].try_into().unwrap());
    let len = u32::from_be_bytes(frame[12..16].try_into().unwrap()) as usize;

    assert_eq!(lsn, 7);
    assert_eq!(frame.len(), HEADER_SIZE + len);
    assert_eq!(WalEntry::decode(lsn, crc, &frame[HEADER_SIZE..]).unwrap(), entry);
}

#[test]
fn test_entry_checksum_mismatch_detected() {
    let entry = WalEntry::new(1, set_cell("row", "value"), 0);
    let mut frame = entry.encode().unwrap();
    let crc = u32::from_be_bytes(frame[8..12].try_into().unwrap());

    let last = frame.len() - 1;
    frame[last] ^= 0xFF;

    let result = WalEntry::decode(1, crc, &frame[HEADER_SIZE..]);
    assert!(matches!(result, Err(BigcellError::WalCorruption(_))));
}

#[test]
fn test_entry_lsn_mismatch_detected() {
    let frame = WalEntry::new(3, set_cell("row", "value"), 0).encode().unwrap();
    let crc = u32::from_be_bytes(frame[8..12].try_into().unwrap());

    let result = WalEntry::decode(4, crc, &frame[HEADER_SIZE..]);
    assert!(matches!(result, Err(BigcellError::WalCorruption(_))));
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn test_reader_tracks_position() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(set_cell("a", "1"), 0).unwrap();
    writer.append(set_cell("b", "2"), 0).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    reader.next_entry().unwrap();
    reader.next_entry().unwrap();
    assert_eq!(reader.position(), fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_partial_header_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(set_cell("a", "1"), 0).unwrap();
    }
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0u8; HEADER_SIZE - 4]).unwrap();

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(BigcellError::WalCorruption(_))));
}

#[test]
fn test_partial_data_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();

    let frame = WalEntry::new(1, set_cell("a", "1"), 0).encode().unwrap();
    fs::write(&wal_path, &frame[..frame.len() - 3]).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(matches!(
        reader.next_entry(),
        Err(BigcellError::WalCorruption(_))
    ));
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_large_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let big = "x".repeat(256 * 1024);

    let mut writer = WalWriter::create(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(set_cell("big", &big), 0).unwrap();

    let entries = read_all(&wal_path);
    assert_eq!(entries[0].operation, set_cell("big", &big));
}
