//! Cell Codec Tests
//!
//! Tests for the typed cell encodings: exact byte layouts, width checks,
//! datetime precision, BSON documents and string-list literals.

use std::collections::BTreeMap;

use bigcell::encoding::{
    format_str_list, from_bson_bytes, parse_str_list, to_bson_bytes, CellValue,
};
use bigcell::model::{Cell, Row};
use bigcell::BigcellError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

fn naive(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, micro: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_micro_opt(h, min, s, micro)
        .unwrap()
}

// =============================================================================
// Fixed-Width Layout Tests
// =============================================================================

#[test]
fn test_float_layout() {
    assert_eq!(1.0f64.to_cell_bytes().unwrap(), vec![0x3F, 0xF0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(f64::from_cell_bytes(&[0x3F, 0xF0, 0, 0, 0, 0, 0, 0]).unwrap(), 1.0);
}

#[test]
fn test_int_layout() {
    assert_eq!(1i64.to_cell_bytes().unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
    assert_eq!((-2i64).to_cell_bytes().unwrap(), vec![0xFF; 7].into_iter().chain([0xFE]).collect::<Vec<u8>>());
    assert_eq!(i64::from_cell_bytes(&[0xFF; 8]).unwrap(), -1);
}

#[test]
fn test_bool_layout() {
    assert_eq!(true.to_cell_bytes().unwrap(), vec![1]);
    assert_eq!(false.to_cell_bytes().unwrap(), vec![0]);
    assert!(bool::from_cell_bytes(&[7]).unwrap());
    assert!(!bool::from_cell_bytes(&[0]).unwrap());
}

#[test]
fn test_wrong_width_rejected() {
    assert!(matches!(f64::from_cell_bytes(&[0; 4]), Err(BigcellError::Codec(_))));
    assert!(matches!(i64::from_cell_bytes(&[0; 9]), Err(BigcellError::Codec(_))));
    assert!(matches!(bool::from_cell_bytes(&[]), Err(BigcellError::Codec(_))));
    assert!(matches!(bool::from_cell_bytes(&[0, 1]), Err(BigcellError::Codec(_))));
}

#[test]
fn test_string_cells() {
    assert_eq!("str".to_string().to_cell_bytes().unwrap(), b"str".to_vec());
    assert_eq!(String::from_cell_bytes("héllo".as_bytes()).unwrap(), "héllo");
    assert!(matches!(String::from_cell_bytes(&[0xC3, 0x28]), Err(BigcellError::Codec(_))));
}

// =============================================================================
// Datetime Tests
// =============================================================================

#[test]
fn test_datetime_is_posix_seconds_float() {
    let value = naive(2022, 1, 1, 0, 0, 0, 0);
    let bytes = value.to_cell_bytes().unwrap();

    assert_eq!(f64::from_cell_bytes(&bytes).unwrap(), 1_640_995_200.0);
    assert_eq!(NaiveDateTime::from_cell_bytes(&bytes).unwrap(), value);
}

#[test]
fn test_datetime_keeps_microseconds() {
    let value = naive(2023, 6, 15, 12, 34, 56, 789_012);
    let decoded = NaiveDateTime::from_cell_bytes(&value.to_cell_bytes().unwrap()).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_utc_datetime_matches_naive() {
    let naive_value = naive(1999, 12, 31, 23, 59, 59, 500_000);
    let utc_value: DateTime<Utc> = naive_value.and_utc();

    assert_eq!(
        utc_value.to_cell_bytes().unwrap(),
        naive_value.to_cell_bytes().unwrap()
    );
    assert_eq!(
        DateTime::<Utc>::from_cell_bytes(&naive_value.to_cell_bytes().unwrap()).unwrap(),
        utc_value
    );
}

#[test]
fn test_datetime_before_epoch() {
    let value = naive(1960, 3, 1, 6, 0, 0, 250_000);
    let decoded = NaiveDateTime::from_cell_bytes(&value.to_cell_bytes().unwrap()).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_non_finite_datetime_rejected() {
    let bytes = f64::NAN.to_cell_bytes().unwrap();
    assert!(matches!(NaiveDateTime::from_cell_bytes(&bytes), Err(BigcellError::Codec(_))));
}

// =============================================================================
// BSON Tests
// =============================================================================

#[test]
fn test_document_cells() {
    let doc = bson::doc! { "a": "b", "n": 3_i32 };
    let bytes = doc.to_cell_bytes().unwrap();

    assert_eq!(bson::Document::from_cell_bytes(&bytes).unwrap(), doc);
    assert!(bson::Document::from_cell_bytes(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn test_bson_helpers_with_maps() {
    let map: BTreeMap<String, String> = [("a".to_string(), "b".to_string())].into_iter().collect();
    let bytes = to_bson_bytes(&map).unwrap();

    let doc = bson::Document::from_cell_bytes(&bytes).unwrap();
    assert_eq!(doc, bson::doc! { "a": "b" });
    assert_eq!(from_bson_bytes::<BTreeMap<String, String>>(&bytes).unwrap(), map);
}

// =============================================================================
// String List Tests
// =============================================================================

#[test]
fn test_list_literal_format() {
    assert_eq!(format_str_list(&["a", "b"]), "['a', 'b']");
    assert_eq!(format_str_list::<&str>(&[]), "[]");
    assert_eq!(format_str_list(&["it's"]), "[\"it's\"]");
}

#[test]
fn test_list_literal_parse() {
    assert_eq!(parse_str_list("['a', 'b']").unwrap(), vec!["a", "b"]);
    assert_eq!(parse_str_list("[\"a\",'b',]").unwrap(), vec!["a", "b"]);
    assert_eq!(parse_str_list("  [ ]  ").unwrap(), Vec::<String>::new());
    assert_eq!(parse_str_list(r"['tab\there', 'q\'s']").unwrap(), vec!["tab\there", "q's"]);
}

#[test]
fn test_list_literal_rejects_garbage() {
    assert!(parse_str_list("['a'").is_err());
    assert!(parse_str_list("a, b").is_err());
    assert!(parse_str_list("[1, 2]").is_err());
}

#[test]
fn test_list_cells_round_trip_awkward_strings() {
    let items = vec![
        "plain".to_string(),
        "quote ' and \" both".to_string(),
        "back\\slash\nnewline".to_string(),
        "ünïcödé".to_string(),
    ];
    let decoded = Vec::<String>::from_cell_bytes(&items.to_cell_bytes().unwrap()).unwrap();
    assert_eq!(decoded, items);
}

// =============================================================================
// Row Decoding Tests
// =============================================================================

#[test]
fn test_row_decode_typed_value() {
    let mut row = Row::new(b"r".to_vec());
    row.families
        .entry("W".to_string())
        .or_default()
        .insert(b"col_int".to_vec(), vec![Cell::new(1_000, 7i64.to_cell_bytes().unwrap())]);

    assert_eq!(row.decode::<i64>("W", b"col_int").unwrap(), 7);
    assert!(row.decode::<i64>("W", b"missing").unwrap_err().is_not_found());
    assert!(matches!(row.decode::<bool>("W", b"col_int"), Err(BigcellError::Codec(_))));
}
