//! Datetime cells
//!
//! Stored as POSIX seconds in a big-endian `f64`. Naive datetimes are taken
//! to be UTC. Decoding rounds to the nearest microsecond.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use super::CellValue;
use crate::error::{BigcellError, Result};

fn to_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.nanosecond() / 1000) / 1_000_000.0
}

fn from_seconds(seconds: f64) -> Result<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(BigcellError::Codec(format!(
            "datetime cell holds a non-finite timestamp: {}",
            seconds
        )));
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros.abs() >= i64::MAX as f64 {
        return Err(BigcellError::Codec(format!(
            "datetime cell timestamp out of range: {}",
            seconds
        )));
    }
    let micros = micros as i64;
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
        BigcellError::Codec(format!("datetime cell timestamp out of range: {}", seconds))
    })
}

impl CellValue for DateTime<Utc> {
    fn to_cell_bytes(&self) -> Result<Vec<u8>> {
        to_seconds(self).to_cell_bytes()
    }

    fn from_cell_bytes(bytes: &[u8]) -> Result<Self> {
        from_seconds(f64::from_cell_bytes(bytes)?)
    }
}

impl CellValue for NaiveDateTime {
    fn to_cell_bytes(&self) -> Result<Vec<u8>> {
        self.and_utc().to_cell_bytes()
    }

    fn from_cell_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(DateTime::<Utc>::from_cell_bytes(bytes)?.naive_utc())
    }
}
