//! Per-task metadata records.
//!
//! [`TaskMetadataStore`] manages the record stored under
//! `task:{task_id}:metadata`: a caller-defined `status`, the encoded
//! `result`, `created_at`/`updated_at` timestamps, and any extra fields the
//! dispatcher supplies at creation time.
//!
//! Unlike steps, task statuses are not restricted: `queued`, `failed` or any
//! other domain status is stored as given.

use std::sync::Arc;

use crate::constants::{task_key, CREATED_AT_FIELD, UPDATED_AT_FIELD};
use crate::error::TrackingError;
use crate::store::backend::{KeyValueBackend, RecordFields};
use crate::store::{collect_fields, timestamp_now};

/// Store for task records, sharing a backend handle.
///
/// Cloning is cheap (an `Arc` bump) and yields a handle to the same backend.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use retsu::store::memory::InMemoryBackend;
/// use retsu::task::TaskMetadataStore;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let tasks = TaskMetadataStore::new(Arc::new(InMemoryBackend::new()));
/// tasks.create("t1", [("status", "pending")]).await.unwrap();
/// tasks.update("t1", "status", "queued").await.unwrap();
/// assert_eq!(tasks.get("t1", "status").await.unwrap(), Some(b"queued".to_vec()));
/// # });
/// ```
#[derive(Debug)]
pub struct TaskMetadataStore<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: ?Sized> Clone for TaskMetadataStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: KeyValueBackend + ?Sized> TaskMetadataStore<B> {
    /// Creates a store over the given backend.
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Writes the initial record for a task, replacing any existing record
    /// under the same key.
    ///
    /// `created_at` and `updated_at` are stamped with the current time
    /// unless the caller supplied them.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend write fails.
    pub async fn create<K, V>(
        &self,
        task_id: &str,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), TrackingError>
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let mut record = collect_fields(fields);
        let now = timestamp_now();
        record
            .entry(CREATED_AT_FIELD.to_string())
            .or_insert_with(|| now.clone());
        record.entry(UPDATED_AT_FIELD.to_string()).or_insert(now);

        self.backend
            .replace_fields(&task_key(task_id), &record)
            .await?;
        tracing::debug!(task_id, fields = record.len(), "task record created");
        Ok(())
    }

    /// Writes one attribute and refreshes `updated_at` in the same call.
    ///
    /// Any status value is accepted.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend write fails.
    pub async fn update(
        &self,
        task_id: &str,
        attribute: &str,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), TrackingError> {
        let mut fields = RecordFields::new();
        fields.insert(attribute.to_string(), value.into());
        fields.insert(UPDATED_AT_FIELD.to_string(), timestamp_now());

        self.backend.set_fields(&task_key(task_id), &fields).await?;
        tracing::debug!(task_id, attribute, "task record updated");
        Ok(())
    }

    /// Reads one attribute of a task record.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend read fails.
    pub async fn get(&self, task_id: &str, attribute: &str) -> Result<Option<Vec<u8>>, TrackingError> {
        Ok(self.backend.get_field(&task_key(task_id), attribute).await?)
    }

    /// Reads every field of a task record. Empty if the task does not exist.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend read fails.
    pub async fn get_all(&self, task_id: &str) -> Result<RecordFields, TrackingError> {
        Ok(self.backend.get_all_fields(&task_key(task_id)).await?)
    }
}
