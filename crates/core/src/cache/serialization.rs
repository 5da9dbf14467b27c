//! Pure functions for encoding cached values and version counters.
//!
//! Values are stored as JSON so cache contents stay human-readable. Counters
//! are stored as decimal strings, which keeps them compatible with native
//! increment commands such as Redis `INCR`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
    /// A version counter did not hold a decimal integer.
    #[error("Invalid counter value: {0}")]
    InvalidCounter(String),
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes a value to JSON bytes.
pub fn serialize_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to a value.
pub fn deserialize_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

/// Encodes a counter as decimal bytes.
pub fn encode_counter(value: u64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Decodes decimal bytes to a counter.
///
/// # Examples
///
/// ```
/// use folio_core::cache::{decode_counter, encode_counter};
///
/// assert_eq!(decode_counter(&encode_counter(42)).unwrap(), 42);
/// assert!(decode_counter(b"forty-two").is_err());
/// ```
pub fn decode_counter(bytes: &[u8]) -> Result<u64> {
    let text = String::from_utf8_lossy(bytes);
    text.trim()
        .parse()
        .map_err(|_| SerializationError::InvalidCounter(text.into_owned()))
}
