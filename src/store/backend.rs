//! Low-level key-value backend trait and supporting types.
//!
//! The [`KeyValueBackend`] trait defines the contract every storage engine
//! implements: hash-like records (field to bytes maps) addressed by a record
//! key, with atomic field reads and writes.
//!
//! Domain logic (status validation, timestamps, result encoding, key shapes)
//! does **not** belong here. Backends are dumb stores; the record stores in
//! [`crate::task`] and [`crate::step`] build on top of them.
//!
//! # Atomicity
//!
//! Each method is atomic with respect to a single record. There is no
//! transaction or locking primitive spanning calls: two writers racing on
//! the same field resolve as last-write-wins.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

/// All fields of a single record, keyed by field name.
///
/// An absent record reads as an empty map.
pub type RecordFields = BTreeMap<String, Vec<u8>>;

/// Errors raised by a storage backend.
///
/// Backend failures are fatal to the calling operation and are never
/// retried by this crate. The underlying client error, when there is one,
/// is available through [`std::error::Error::source()`].
///
/// # Examples
///
/// ```
/// use retsu::store::backend::StorageError;
///
/// let err = StorageError::backend("connection refused");
/// assert_eq!(err.to_string(), "backend error: connection refused");
/// ```
#[derive(Debug)]
pub enum StorageError {
    /// An I/O or backend-specific error occurred (network failure,
    /// protocol error, wrong value type under the key, ...).
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StorageError {
    /// Builds a [`StorageError::Backend`] without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { message, .. } => write!(f, "backend error: {message}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend {
                source: Some(src), ..
            } => Some(src.as_ref()),
            Self::Backend { source: None, .. } => None,
        }
    }
}

/// Hash-record key-value backend.
///
/// Implementations must be `Send + Sync`: a single backend handle is shared
/// (behind an `Arc`) by every store and by concurrently running workers.
///
/// Keys are stored and returned verbatim. Field values are opaque bytes.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Reads one field of a record. Returns `None` when either the record
    /// or the field is absent.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Reads every field of a record. An absent record yields an empty map.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn get_all_fields(&self, key: &str) -> Result<RecordFields, StorageError>;

    /// Writes several fields of a record in one atomic operation, creating
    /// the record if needed. Fields not named are left untouched.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn set_fields(&self, key: &str, fields: &RecordFields) -> Result<(), StorageError>;

    /// Writes a single field of a record.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn set_field(&self, key: &str, field: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Atomically replaces the whole record with `fields`. Fields of a
    /// previous record under the same key do not survive. An empty map
    /// removes the record.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] on I/O or backend-specific failures.
    async fn replace_fields(&self, key: &str, fields: &RecordFields) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display_backend() {
        let err = StorageError::Backend {
            message: "connection timeout".to_string(),
            source: None,
        };
        assert_eq!(err.to_string(), "backend error: connection timeout");
    }

    #[test]
    fn storage_error_source_backend_with_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = StorageError::Backend {
            message: "hget failed".to_string(),
            source: Some(Box::new(inner)),
        };
        let source = std::error::Error::source(&err);
        assert!(source.is_some_and(|s| s.to_string().contains("timed out")));
    }

    #[test]
    fn storage_error_source_backend_without_source() {
        let err = StorageError::backend("unknown");
        assert!(std::error::Error::source(&err).is_none());
    }
}
