//! BSON document cells

use bson::Document;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::CellValue;
use crate::error::Result;

/// Encode any serializable map-like value as a BSON document
pub fn to_bson_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bson::to_vec(value)?)
}

/// Decode a BSON document into any deserializable type
pub fn from_bson_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bson::from_slice(bytes)?)
}

impl CellValue for Document {
    fn to_cell_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;
        Ok(buf)
    }

    fn from_cell_bytes(mut bytes: &[u8]) -> Result<Self> {
        Ok(Document::from_reader(&mut bytes)?)
    }
}
