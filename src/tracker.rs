//! Client-facing result tracking facade.
//!
//! [`ResultTracker`] composes a [`TaskMetadataStore`] and a
//! [`StepMetadataStore`] over one shared backend and exposes the operations
//! dispatchers and clients use: create a task record, query its status,
//! save its result, block until the result is ready, and load the raw
//! record for inspection.
//!
//! # Blocking Protocol
//!
//! [`ResultTracker::get`] polls the task status every
//! [`POLL_INTERVAL`] until it reads `completed`:
//!
//! - without a timeout it checks exactly once and fails fast with
//!   [`TrackingError::ResultNotReady`];
//! - with a timeout it keeps polling and fails with
//!   [`TrackingError::ResultTimeout`] once the timeout has elapsed.
//!
//! Polling is the only coordination mechanism; the backend needs no pub/sub
//! support. Reads are idempotent, so any number of clients may wait on the
//! same task.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use retsu::store::memory::InMemoryBackend;
//! use retsu::ResultTracker;
//! use serde_json::{json, Value};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let tracker = ResultTracker::new(Arc::new(InMemoryBackend::new()));
//!
//! tracker.create("t1", [("status", "started")]).await.unwrap();
//! tracker.save("t1", &json!({"x": 1})).await.unwrap();
//! tracker.update_status("t1", "completed").await.unwrap();
//!
//! let result: Option<Value> = tracker.get("t1", Some(Duration::from_secs(5))).await.unwrap();
//! assert_eq!(result, Some(json!({"x": 1})));
//! # });
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

use crate::codec;
use crate::constants::{POLL_INTERVAL, RESULT_FIELD, STATUS_COMPLETED, STATUS_FIELD};
use crate::error::TrackingError;
use crate::instrument::StepTracker;
use crate::step::StepMetadataStore;
use crate::store::backend::{KeyValueBackend, RecordFields};
use crate::task::TaskMetadataStore;

/// Result tracking facade over a shared backend.
///
/// Holds no state besides the backend handle. Cloning is cheap and every
/// clone talks to the same backend.
#[derive(Debug)]
pub struct ResultTracker<B: ?Sized> {
    tasks: TaskMetadataStore<B>,
    steps: StepMetadataStore<B>,
}

impl<B: ?Sized> Clone for ResultTracker<B> {
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
            steps: self.steps.clone(),
        }
    }
}

#[cfg(feature = "redis")]
impl ResultTracker<crate::store::redis::RedisBackend> {
    /// Connects to Redis with the given settings.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Config`] if the settings are invalid;
    /// [`TrackingError::Storage`] if the connection cannot be established.
    pub async fn connect(config: &crate::config::TrackingConfig) -> Result<Self, TrackingError> {
        config.validate()?;
        let backend = crate::store::redis::RedisBackend::from_config(config).await?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// Connects to Redis with settings read from the `RETSU_REDIS_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub async fn from_env() -> Result<Self, TrackingError> {
        Self::connect(&crate::config::TrackingConfig::from_env()).await
    }
}

impl<B: KeyValueBackend + ?Sized> ResultTracker<B> {
    /// Creates a tracker over the given backend.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            tasks: TaskMetadataStore::new(Arc::clone(&backend)),
            steps: StepMetadataStore::new(backend),
        }
    }

    /// The task record store.
    pub fn tasks(&self) -> &TaskMetadataStore<B> {
        &self.tasks
    }

    /// The step record store.
    pub fn steps(&self) -> &StepMetadataStore<B> {
        &self.steps
    }

    /// A step instrumentation wrapper writing to the same backend.
    pub fn step_tracker(&self) -> StepTracker<B> {
        StepTracker::new(self.steps.clone())
    }

    /// Creates the task record. The metadata should include a `status`
    /// (typically `pending` or `started`); any other fields are stored
    /// verbatim.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend write fails.
    pub async fn create<K, V>(
        &self,
        task_id: &str,
        metadata: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), TrackingError>
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        self.tasks.create(task_id, metadata).await
    }

    /// Reads the task status.
    ///
    /// # Errors
    ///
    /// - [`TrackingError::TaskNotFound`] if the record has no status (the
    ///   task was never created).
    /// - [`TrackingError::Decode`] if the status is not UTF-8.
    /// - [`TrackingError::Storage`] if the backend read fails.
    pub async fn status(&self, task_id: &str) -> Result<String, TrackingError> {
        let raw = self
            .tasks
            .get(task_id, STATUS_FIELD)
            .await?
            .ok_or_else(|| TrackingError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;
        codec::decode_text(raw)
    }

    /// Sets the task status. Any value is accepted; writing `completed`
    /// releases clients blocked in [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend write fails.
    pub async fn update_status(&self, task_id: &str, status: &str) -> Result<(), TrackingError> {
        self.tasks.update(task_id, STATUS_FIELD, status).await
    }

    /// Encodes `result` and stores it in the task's `result` field.
    ///
    /// Saving does not change the status; the worker marks the task
    /// `completed` separately.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Encode`] if the value cannot be encoded;
    /// [`TrackingError::Storage`] if the backend write fails.
    pub async fn save<T: Serialize + ?Sized>(&self, task_id: &str, result: &T) -> Result<(), TrackingError> {
        let encoded = codec::encode(result)?;
        self.tasks.update(task_id, RESULT_FIELD, encoded).await
    }

    /// Returns the task result once the task is `completed`.
    ///
    /// With `timeout` unset (or zero) the status is checked once. With a
    /// timeout the status is polled every 500 ms until it reads
    /// `completed` or the timeout has elapsed. A timeout too large to be
    /// represented as a deadline (such as `Duration::MAX`) waits
    /// indefinitely.
    ///
    /// An absent or empty `result` field yields `Ok(None)` without
    /// decoding.
    ///
    /// # Errors
    ///
    /// - [`TrackingError::ResultNotReady`] when checked once and not
    ///   completed.
    /// - [`TrackingError::ResultTimeout`] when the timeout elapsed first,
    ///   carrying the last observed status.
    /// - [`TrackingError::TaskNotFound`], [`TrackingError::Decode`],
    ///   [`TrackingError::Storage`] as for [`status`](Self::status).
    pub async fn get<T: DeserializeOwned>(
        &self,
        task_id: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<T>, TrackingError> {
        match timeout.filter(|t| !t.is_zero()) {
            None => {
                let status = self.status(task_id).await?;
                if status != STATUS_COMPLETED {
                    return Err(TrackingError::ResultNotReady {
                        task_id: task_id.to_string(),
                        status,
                    });
                }
            },
            Some(timeout) => self.wait_for_completion(task_id, timeout).await?,
        }

        match self.tasks.get(task_id, RESULT_FIELD).await? {
            Some(bytes) if !bytes.is_empty() => codec::decode(&bytes).map(Some),
            _ => Ok(None),
        }
    }

    /// Returns every raw field of the task record.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Storage`] if the backend read fails.
    pub async fn load(&self, task_id: &str) -> Result<RecordFields, TrackingError> {
        self.tasks.get_all(task_id).await
    }

    async fn wait_for_completion(&self, task_id: &str, timeout: Duration) -> Result<(), TrackingError> {
        // None when the deadline overflows the clock: poll without one.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let status = self.status(task_id).await?;
            if status == STATUS_COMPLETED {
                return Ok(());
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::debug!(task_id, status = %status, ?timeout, "gave up waiting for result");
                return Err(TrackingError::ResultTimeout {
                    task_id: task_id.to_string(),
                    status,
                    timeout,
                });
            }
            tracing::trace!(task_id, status = %status, "result not ready, polling again");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
