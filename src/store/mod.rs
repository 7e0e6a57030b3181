//! Storage backends.
//!
//! # Architecture
//!
//! 1. **[`KeyValueBackend`]** -- dumb hash-record trait that backends
//!    implement. No domain logic.
//! 2. **[`TaskMetadataStore`](crate::task::TaskMetadataStore) /
//!    [`StepMetadataStore`](crate::step::StepMetadataStore)** -- record
//!    shapes, timestamps and status rules on top of any backend.
//! 3. **[`ResultTracker`](crate::tracker::ResultTracker)** -- the
//!    client-facing facade composing both stores.
//!
//! One backend is constructed per process and shared as `Arc<B>` by every
//! store.
//!
//! # Backends
//!
//! - [`InMemoryBackend`](crate::store::memory::InMemoryBackend) --
//!   thread-safe in-memory backend using `DashMap`.
//! - [`RedisBackend`](crate::store::redis::RedisBackend) -- Redis hashes.
//!   Available behind the `redis` feature flag (enabled by default).

pub mod backend;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use backend::{KeyValueBackend, RecordFields, StorageError};

/// Current local time as RFC 3339 text, written to timestamp fields.
pub(crate) fn timestamp_now() -> Vec<u8> {
    chrono::Local::now().to_rfc3339().into_bytes()
}

/// Collects caller-supplied `(field, value)` pairs into a record.
pub(crate) fn collect_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> RecordFields
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_rfc3339() {
        let ts = String::from_utf8(timestamp_now()).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn collect_fields_accepts_text_and_bytes() {
        let fields = collect_fields([("status", "started"), ("owner", "worker-1")]);
        assert_eq!(fields.get("status").unwrap(), b"started");

        let fields = collect_fields(vec![("blob".to_string(), vec![0u8, 1, 2])]);
        assert_eq!(fields.get("blob").unwrap(), &vec![0u8, 1, 2]);
    }
}
