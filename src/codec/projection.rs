//! Projected fields
//!
//! A projector copies the handful of fields a record type wants indexed
//! into a small value stored next to the offset in every index record.
//! Projections are encoded with bincode; index records are length
//! prefixed, so NUL bytes are fine here.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Derives the projected fields of a record
///
/// Must be a pure function of the record: the engine regenerates the
/// projection on every create/update and on index rebuild.
pub trait Projector<R>: Send + Sync + 'static {
    type Fields: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;

    fn project(&self, record: &R) -> Self::Fields;
}

/// Projector for collections that index nothing but the offset
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProjection;

impl<R> Projector<R> for NoProjection {
    type Fields = ();

    fn project(&self, _record: &R) -> Self::Fields {}
}

/// Encode projected fields for an index record
pub fn encode_projection<F: Serialize>(fields: &F) -> Result<Vec<u8>> {
    bincode::serialize(fields)
        .map_err(|e| StoreError::Encoding(format!("projected fields: {}", e)))
}

/// Decode projected fields from an index record
pub fn decode_projection<F: DeserializeOwned>(bytes: &[u8]) -> Result<F> {
    bincode::deserialize(bytes)
        .map_err(|e| StoreError::Decoding(format!("projected fields: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ChatFields {
        owner: String,
        archived: bool,
    }

    #[test]
    fn test_projection_bytes_round_trip() {
        let fields = ChatFields {
            owner: "ana".to_string(),
            archived: true,
        };

        let bytes = encode_projection(&fields).unwrap();
        let back: ChatFields = decode_projection(&bytes).unwrap();

        assert_eq!(back, fields);
    }

    #[test]
    fn test_unit_projection_is_empty() {
        let bytes = encode_projection(&()).unwrap();
        assert!(bytes.is_empty());
        let _: () = decode_projection(&bytes).unwrap();
    }

    #[test]
    fn test_truncated_projection_fails() {
        let bytes = encode_projection(&ChatFields {
            owner: "someone".to_string(),
            archived: false,
        })
        .unwrap();

        let result: Result<ChatFields> = decode_projection(&bytes[..3]);
        assert!(matches!(result, Err(StoreError::Decoding(_))));
    }
}
