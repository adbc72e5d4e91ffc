//! Value codecs for session payloads.

use crate::error::{SessionError, SessionResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Converts session values to and from the bytes stored in a hash field.
pub trait ValueCodec: Send + Sync + 'static {
    /// Encode a value.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> SessionResult<Vec<u8>>;

    /// Decode a value. Fails on payloads written by an incompatible type or
    /// codec.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> SessionResult<T>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> SessionResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> SessionResult<T> {
        serde_json::from_slice(bytes).map_err(|e| SessionError::Deserialization(e.to_string()))
    }
}
