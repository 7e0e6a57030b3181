//! Per-step metadata records.
//!
//! A step is a named phase of a task tracked under
//! `task:{task_id}:step:{step_id}`. Step records follow a fixed two-state
//! protocol: `status` is either `started` or `completed`, and any other
//! value is rejected with [`TrackingError::InvalidStepStatus`] before it
//! reaches the backend.
//!
//! Steps of the same task are independent records; writing one never
//! touches another.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{step_key, STATUS_FIELD, UPDATED_AT_FIELD};
use crate::error::TrackingError;
use crate::store::backend::{KeyValueBackend, RecordFields};
use crate::store::{collect_fields, timestamp_now};

/// The two states a step can be in.
///
/// # Examples
///
/// ```
/// use retsu::StepStatus;
///
/// assert_eq!("started".parse::<StepStatus>().unwrap(), StepStatus::Started);
/// assert_eq!(StepStatus::Completed.to_string(), "completed");
/// assert!("failed".parse::<StepStatus>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The step function has been entered.
    Started,
    /// The step function returned and its result was recorded.
    Completed,
}

impl StepStatus {
    /// Wire representation stored in the `status` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            other => Err(TrackingError::InvalidStepStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// Store for step records, sharing a backend handle.
#[derive(Debug)]
pub struct StepMetadataStore<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: ?Sized> Clone for StepMetadataStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: KeyValueBackend + ?Sized> StepMetadataStore<B> {
    /// Creates a store over the given backend.
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Writes the initial record for a step, replacing any existing record
    /// under the same key.
    ///
    /// # Errors
    ///
    /// [`TrackingError::InvalidStepStatus`] if `fields` carries a `status`
    /// outside the two-state protocol; [`TrackingError::Storage`] if the
    /// backend write fails.
    pub async fn create<K, V>(
        &self,
        task_id: &str,
        step_id: &str,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), TrackingError>
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let record = collect_fields(fields);
        if let Some(status) = record.get(STATUS_FIELD) {
            validate_status(status)?;
        }
        self.backend
            .replace_fields(&step_key(task_id, step_id), &record)
            .await?;
        tracing::debug!(task_id, step_id, "step record created");
        Ok(())
    }

    /// Writes one attribute and refreshes `updated_at` in the same call.
    ///
    /// # Errors
    ///
    /// [`TrackingError::InvalidStepStatus`] if `attribute` is `status` and
    /// `value` is neither `started` nor `completed`. Nothing is written in
    /// that case. [`TrackingError::Storage`] if the backend write fails.
    pub async fn update(
        &self,
        task_id: &str,
        step_id: &str,
        attribute: &str,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), TrackingError> {
        let value = value.into();
        if attribute == STATUS_FIELD {
            if let Err(err) = validate_status(&value) {
                tracing::warn!(task_id, step_id, error = %err, "rejected step status");
                return Err(err);
            }
        }

        let mut fields = RecordFields::new();
        fields.insert(attribute.to_string(), value);
        fields.insert(UPDATED_AT_FIELD.to_string(), timestamp_now());

        self.backend
            .set_fields(&step_key(task_id, step_id), &fields)
            .await?;
        tracing::debug!(task_id, step_id, attribute, "step record updated");
        Ok(())
    }

    /// Typed form of `update(task_id, step_id, "status", ...)`.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend write fails.
    pub async fn update_status(
        &self,
        task_id: &str,
        step_id: &str,
        status: StepStatus,
    ) -> Result<(), TrackingError> {
        self.update(task_id, step_id, STATUS_FIELD, status.as_str())
            .await
    }

    /// Reads one attribute of a step record.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend read fails.
    pub async fn get(
        &self,
        task_id: &str,
        step_id: &str,
        attribute: &str,
    ) -> Result<Option<Vec<u8>>, TrackingError> {
        Ok(self
            .backend
            .get_field(&step_key(task_id, step_id), attribute)
            .await?)
    }

    /// Reads every field of a step record. Empty if the step does not exist.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend read fails.
    pub async fn get_all(&self, task_id: &str, step_id: &str) -> Result<RecordFields, TrackingError> {
        Ok(self
            .backend
            .get_all_fields(&step_key(task_id, step_id))
            .await?)
    }

    /// Reads and parses the step status. `None` if the step has no record.
    ///
    /// # Errors
    ///
    /// [`TrackingError::InvalidStepStatus`] if another writer stored a value
    /// outside the protocol; [`TrackingError::Storage`] on backend failure.
    pub async fn status(&self, task_id: &str, step_id: &str) -> Result<Option<StepStatus>, TrackingError> {
        match self.get(task_id, step_id, STATUS_FIELD).await? {
            Some(raw) => validate_status(&raw).map(Some),
            None => Ok(None),
        }
    }
}

fn validate_status(raw: &[u8]) -> Result<StepStatus, TrackingError> {
    match std::str::from_utf8(raw) {
        Ok(text) => text.parse(),
        Err(_) => Err(TrackingError::InvalidStepStatus {
            value: String::from_utf8_lossy(raw).into_owned(),
        }),
    }
}
