//! Opaque value encoding for `result` fields.
//!
//! Results are arbitrary structured values. At the storage boundary they
//! become bytes via [`encode`] and come back via [`decode`]; nothing else in
//! the crate inspects them. The encoding is JSON (`serde_json`), symmetric
//! within a deployment, and round-trips integers, strings, lists, nested
//! maps and `null`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TrackingError;

/// Encodes a value into the opaque byte form stored in `result` fields.
///
/// # Errors
///
/// [`TrackingError::Encode`] if the value cannot be serialized (for
/// example a map with non-string keys).
///
/// # Examples
///
/// ```
/// use retsu::codec::{decode, encode};
///
/// let bytes = encode(&vec![1, 2, 3]).unwrap();
/// let back: Vec<i32> = decode(&bytes).unwrap();
/// assert_eq!(back, vec![1, 2, 3]);
/// ```
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, TrackingError> {
    serde_json::to_vec(value).map_err(|e| TrackingError::Encode(e.to_string()))
}

/// Decodes bytes produced by [`encode`].
///
/// # Errors
///
/// [`TrackingError::Decode`] if the bytes are not a valid encoding of `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TrackingError> {
    serde_json::from_slice(bytes).map_err(|e| TrackingError::Decode(e.to_string()))
}

/// Decodes a text field (such as `status`) as UTF-8.
///
/// # Errors
///
/// [`TrackingError::Decode`] if the bytes are not valid UTF-8.
pub fn decode_text(bytes: Vec<u8>) -> Result<String, TrackingError> {
    String::from_utf8(bytes).map_err(|e| TrackingError::Decode(e.to_string()))
}
