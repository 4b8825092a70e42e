//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean WAL (no corruption)
//! - Recovery from an empty WAL
//! - Recovery with partial writes (truncated tail)
//! - Recovery with corrupted entries (CRC mismatch)
//! - Recovery with out-of-order LSNs
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use bigcell::config::WalSyncStrategy;
use bigcell::model::Mutation;
use bigcell::wal::{Operation, WalEntry, WalRecovery, WalWriter, HEADER_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn set_cell(i: usize) -> Operation {
    Operation::MutateRow {
        name: "projects/p/instances/i/tables/t".to_string(),
        key: format!("row{}", i).into_bytes(),
        mutations: vec![Mutation::SetCell {
            family: "cf".to_string(),
            qualifier: b"q".to_vec(),
            timestamp_micros: 1_000,
            value: format!("value{}", i).into_bytes(),
        }],
    }
}

/// Write entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::create(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer.append(set_cell(i), 0).unwrap();
    }
}

/// Write raw framed entries directly to a file (for crafting corruption)
fn write_raw_entries(path: &PathBuf, entries: &[WalEntry]) -> Vec<usize> {
    let mut file = File::create(path).unwrap();
    let mut offsets = Vec::new();
    let mut offset = 0;
    for entry in entries {
        let bytes = entry.encode().unwrap();
        offsets.push(offset);
        offset += bytes.len();
        file.write_all(&bytes).unwrap();
    }
    file.sync_all().unwrap();
    offsets
}

fn file_len(path: &PathBuf) -> u64 {
    fs::metadata(path).unwrap().len()
}

// =============================================================================
// Recover: Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.last_lsn, 10);
    assert!(!result.was_truncated);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.lsn, (i + 1) as u64);
        assert_eq!(entry.operation, set_cell(i));
    }
}

// =============================================================================
// Recover: Torn Tail Tests
// =============================================================================

#[test]
fn test_recover_partial_header_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    let clean_len = file_len(&wal_path);

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0xAB; HEADER_SIZE / 2]).unwrap();
    drop(file);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(result.entries_corrupted, 1);
    assert!(result.was_truncated);
    assert_eq!(file_len(&wal_path), clean_len);
}

#[test]
fn test_recover_partial_data_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries: Vec<WalEntry> = (0..3)
        .map(|i| WalEntry::new(i as u64 + 1, set_cell(i), 0))
        .collect();
    let offsets = write_raw_entries(&wal_path, &entries);

    // Cut the last entry in half
    let cut = (offsets[2] + HEADER_SIZE + 4) as u64;
    OpenOptions::new()
        .write(true)
        .open(&wal_path)
        .unwrap()
        .set_len(cut)
        .unwrap();

    let (recovered, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(recovered.len(), 2);
    assert_eq!(result.last_lsn, 2);
    assert!(result.was_truncated);
    assert_eq!(file_len(&wal_path), offsets[2] as u64);
}

#[test]
fn test_recovered_log_accepts_new_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(b"garbage").unwrap();
    drop(file);

    let (_, result) = WalRecovery::recover(&wal_path).unwrap();
    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite, result.last_lsn).unwrap();
    writer.append(set_cell(2), 0).unwrap();
    drop(writer);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(result.entries_corrupted, 0);
}

// =============================================================================
// Recover: Corruption Tests
// =============================================================================

#[test]
fn test_recover_corrupted_entry_stops_replay() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries: Vec<WalEntry> = (0..4)
        .map(|i| WalEntry::new(i as u64 + 1, set_cell(i), 0))
        .collect();
    let offsets = write_raw_entries(&wal_path, &entries);

    // Flip a payload byte of the second entry
    let mut bytes = fs::read(&wal_path).unwrap();
    bytes[offsets[1] + HEADER_SIZE + 2] ^= 0xFF;
    fs::write(&wal_path, &bytes).unwrap();

    let (recovered, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(recovered.len(), 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);
    assert_eq!(file_len(&wal_path), offsets[1] as u64);
}

#[test]
fn test_recover_corruption_at_first_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);

    let mut bytes = fs::read(&wal_path).unwrap();
    bytes[HEADER_SIZE] ^= 0xFF;
    fs::write(&wal_path, &bytes).unwrap();

    let (recovered, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(recovered.is_empty());
    assert!(result.was_truncated);
    assert_eq!(file_len(&wal_path), 0);
}

#[test]
fn test_recover_rejects_non_increasing_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries = vec![
        WalEntry::new(1, set_cell(0), 0),
        WalEntry::new(2, set_cell(1), 0),
        WalEntry::new(2, set_cell(2), 0),
    ];
    let offsets = write_raw_entries(&wal_path, &entries);

    let (recovered, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(recovered.len(), 2);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(file_len(&wal_path), offsets[2] as u64);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_clean_wal() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 5);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 5);
}

#[test]
fn test_verify_does_not_truncate() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    drop(file);
    let len_before = file_len(&wal_path);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_corrupted, 1);
    assert!(!result.was_truncated);
    assert_eq!(file_len(&wal_path), len_before);
}

#[test]
fn test_recover_and_verify_agree() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 4);

    let verified = WalRecovery::verify(&wal_path).unwrap();
    let (_, recovered) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(verified, recovered);
}
