//! JSON payload codec
//!
//! serde_json output is plain text: control characters inside strings
//! are escaped, so a payload never contains a raw NUL byte.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

use super::{Codec, Record, RecordId};

/// Codec storing records as compact JSON
pub struct JsonCodec<R> {
    _marker: PhantomData<fn() -> R>,
}

impl<R> JsonCodec<R> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<R> Default for JsonCodec<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Codec<R> for JsonCodec<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    fn encode(&self, record: &R) -> Result<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| StoreError::Encoding(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<R> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Decoding(e.to_string()))
    }
}

// =============================================================================
// Schemaless Document
// =============================================================================

/// A JSON object with an `id` field, for callers (and the CLI) that have
/// no typed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: RecordId,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// A document with an unset id
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            id: RecordId::nil(),
            fields,
        }
    }

    /// Build from an arbitrary JSON value; must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(StoreError::Decoding(
                "document must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| StoreError::Decoding(e.to_string()))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl Record for Document {
    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}
