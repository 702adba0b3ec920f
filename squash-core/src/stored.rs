//! JSON columns.
//!
//! `blobs` and `metadata` are double-encoded: the column holds a JSON string
//! literal whose contents are the JSON document. This looks like an artifact
//! of how the first clients submitted data; check real databases before
//! switching to a single stage. The other JSON columns are stored as plain
//! JSON text.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub fn encode_twice<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&serde_json::to_string(value)?)
}

pub fn decode_twice<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let inner: String = serde_json::from_str(raw)?;
    serde_json::from_str(&inner)
}

/// Decodes a double-encoded column, logging and dropping malformed contents.
pub fn decode_column<T: DeserializeOwned>(column: &str, raw: Option<&str>) -> Option<T> {
    let raw = raw?;
    match decode_twice(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("malformed stored {}: {}", column, e);
            None
        }
    }
}

pub fn encode_plain(value: &Option<Value>) -> Result<Option<String>, serde_json::Error> {
    value.as_ref().map(serde_json::to_string).transpose()
}

pub fn decode_plain(column: &str, raw: Option<&str>) -> Option<Value> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("malformed stored {}: {}", column, e);
            None
        }
    }
}
