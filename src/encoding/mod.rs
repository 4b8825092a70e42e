//! Cell Value Encoding
//!
//! Cells store raw bytes. This module fixes how typed values are laid out
//! so that every writer and reader of a table agrees:
//!
//! | Type                 | Layout                                       |
//! |----------------------|----------------------------------------------|
//! | `f64`                | 8 bytes, big-endian IEEE-754                 |
//! | `i64`                | 8 bytes, big-endian two's complement         |
//! | `bool`               | 1 byte, `0x00` / `0x01` (non-zero is true)   |
//! | `String`             | UTF-8                                        |
//! | datetimes            | POSIX seconds as a big-endian `f64`, UTC     |
//! | `bson::Document`     | BSON document                                |
//! | `Vec<String>`        | list literal text, e.g. `['a', 'b']`         |
//!
//! Fixed-width decoders reject inputs of any other length.

mod datetime;
mod document;
mod literal;

use bytes::{Buf, BufMut};

use crate::error::{BigcellError, Result};

pub use document::{from_bson_bytes, to_bson_bytes};
pub use literal::{format_str_list, parse_str_list};

/// A type that can be stored in (and read back from) a cell
pub trait CellValue: Sized {
    fn to_cell_bytes(&self) -> Result<Vec<u8>>;
    fn from_cell_bytes(bytes: &[u8]) -> Result<Self>;
}

/// Ensure a fixed-width cell has exactly `width` bytes
pub(crate) fn expect_width(bytes: &[u8], width: usize, kind: &str) -> Result<()> {
    if bytes.len() != width {
        return Err(BigcellError::Codec(format!(
            "{} cell must be {} bytes, got {}",
            kind,
            width,
            bytes.len()
        )));
    }
    Ok(())
}

impl CellValue for f64 {
    fn to_cell_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(8);
        buf.put_f64(*self);
        Ok(buf)
    }

    fn from_cell_bytes(mut bytes: &[u8]) -> Result<Self> {
        expect_width(bytes, 8, "float")?;
        Ok(bytes.get_f64())
    }
}

impl CellValue for i64 {
    fn to_cell_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(8);
        buf.put_i64(*self);
        Ok(buf)
    }

    fn from_cell_bytes(mut bytes: &[u8]) -> Result<Self> {
        expect_width(bytes, 8, "integer")?;
        Ok(bytes.get_i64())
    }
}

impl CellValue for bool {
    fn to_cell_bytes(&self) -> Result<Vec<u8>> {
        Ok(vec![u8::from(*self)])
    }

    fn from_cell_bytes(bytes: &[u8]) -> Result<Self> {
        expect_width(bytes, 1, "boolean")?;
        Ok(bytes[0] != 0)
    }
}

impl CellValue for String {
    fn to_cell_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }

    fn from_cell_bytes(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| BigcellError::Codec(format!("string cell is not UTF-8: {}", e)))
    }
}

impl CellValue for Vec<String> {
    fn to_cell_bytes(&self) -> Result<Vec<u8>> {
        Ok(format_str_list(self.as_slice()).into_bytes())
    }

    fn from_cell_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| BigcellError::Codec(format!("list cell is not UTF-8: {}", e)))?;
        parse_str_list(text)
    }
}
