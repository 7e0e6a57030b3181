//! In-memory storage backend.
//!
//! [`InMemoryBackend`] provides a thread-safe [`KeyValueBackend`] using
//! `DashMap<String, RecordFields>`. Each record sits behind its shard lock,
//! so every trait method is atomic per record, matching what a networked
//! hash store guarantees. Useful for tests and single-process deployments.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use retsu::store::memory::InMemoryBackend;
//! use retsu::ResultTracker;
//!
//! let backend = Arc::new(InMemoryBackend::new());
//! let tracker = ResultTracker::new(backend.clone());
//! assert!(backend.is_empty());
//! ```

use async_trait::async_trait;
use dashmap::DashMap;

use crate::store::backend::{KeyValueBackend, RecordFields, StorageError};

/// Thread-safe in-memory backend using [`DashMap`].
///
/// Holds **no domain logic**; it stores opaque field bytes under verbatim
/// keys.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: DashMap<String, RecordFields>,
}

impl InMemoryBackend {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Returns the number of records stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the backend contains no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns every stored record key, sorted.
    ///
    /// # Examples
    ///
    /// ```
    /// use retsu::store::memory::InMemoryBackend;
    ///
    /// assert!(InMemoryBackend::new().keys().is_empty());
    /// ```
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .data
            .get(key)
            .and_then(|record| record.value().get(field).cloned()))
    }

    async fn get_all_fields(&self, key: &str) -> Result<RecordFields, StorageError> {
        Ok(self
            .data
            .get(key)
            .map(|record| record.value().clone())
            .unwrap_or_default())
    }

    async fn set_fields(&self, key: &str, fields: &RecordFields) -> Result<(), StorageError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut record = self.data.entry(key.to_string()).or_default();
        for (field, value) in fields {
            record.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn set_field(&self, key: &str, field: &str, value: &[u8]) -> Result<(), StorageError> {
        self.data
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_vec());
        Ok(())
    }

    async fn replace_fields(&self, key: &str, fields: &RecordFields) -> Result<(), StorageError> {
        if fields.is_empty() {
            self.data.remove(key);
        } else {
            self.data.insert(key.to_string(), fields.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(pairs: &[(&str, &str)]) -> RecordFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn get_field_missing_record_returns_none() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.get_field("nope", "status").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_all_fields_missing_record_is_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.get_all_fields("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_fields_merges_into_existing_record() {
        let backend = InMemoryBackend::new();
        backend
            .set_fields("k", &fields(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();
        backend.set_fields("k", &fields(&[("b", "3")])).await.unwrap();

        let all = backend.get_all_fields("k").await.unwrap();
        assert_eq!(all, fields(&[("a", "1"), ("b", "3")]));
    }

    #[tokio::test]
    async fn set_fields_empty_does_not_create_record() {
        let backend = InMemoryBackend::new();
        backend.set_fields("k", &RecordFields::new()).await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn set_field_creates_record() {
        let backend = InMemoryBackend::new();
        backend.set_field("k", "status", b"started").await.unwrap();
        assert_eq!(
            backend.get_field("k", "status").await.unwrap(),
            Some(b"started".to_vec())
        );
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn replace_fields_drops_previous_fields() {
        let backend = InMemoryBackend::new();
        backend
            .set_fields("k", &fields(&[("old", "x"), ("status", "pending")]))
            .await
            .unwrap();
        backend
            .replace_fields("k", &fields(&[("status", "started")]))
            .await
            .unwrap();

        let all = backend.get_all_fields("k").await.unwrap();
        assert_eq!(all, fields(&[("status", "started")]));
    }

    #[tokio::test]
    async fn replace_fields_empty_removes_record() {
        let backend = InMemoryBackend::new();
        backend.set_field("k", "a", b"1").await.unwrap();
        backend.replace_fields("k", &RecordFields::new()).await.unwrap();
        assert!(backend.is_empty());
        assert!(backend.keys().is_empty());
    }
}
