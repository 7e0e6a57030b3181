//! Error types for tracking operations.
//!
//! Provides [`TrackingError`], returned by every store, the result tracker,
//! and the step instrumentation wrapper.

use std::time::Duration;

use thiserror::Error;

use crate::store::backend::StorageError;

/// Errors that can occur while tracking tasks and steps.
///
/// Each variant carries enough context (task ID, last observed status) to
/// diagnose the failure from the message alone.
///
/// # Examples
///
/// ```
/// use retsu::TrackingError;
///
/// let err = TrackingError::ResultNotReady {
///     task_id: "t1".to_string(),
///     status: "started".to_string(),
/// };
/// assert!(err.to_string().contains("t1"));
/// assert!(err.to_string().contains("started"));
/// ```
#[derive(Debug, Error)]
pub enum TrackingError {
    /// A step status other than `started` or `completed` was written.
    #[error("invalid step status {value:?}: status should be started or completed")]
    InvalidStepStatus {
        /// The rejected value, lossily decoded as text.
        value: String,
    },

    /// The result was requested without a timeout before the task completed.
    #[error("task result is not ready yet: {task_id} (status: {status})")]
    ResultNotReady {
        /// The task ID.
        task_id: String,
        /// The status observed at the time of the check.
        status: String,
    },

    /// The timeout elapsed before the task completed.
    #[error("timed out after {timeout:?} waiting for task result: {task_id} (status: {status})")]
    ResultTimeout {
        /// The task ID.
        task_id: String,
        /// The last status observed before giving up.
        status: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The task record has no status field; it was never created.
    #[error("task not found: {task_id}")]
    TaskNotFound {
        /// The task ID that was not found.
        task_id: String,
    },

    /// A value could not be encoded for storage.
    #[error("failed to encode value: {0}")]
    Encode(String),

    /// Stored bytes could not be decoded.
    #[error("failed to decode value: {0}")]
    Decode(String),

    /// Invalid connection settings.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Backend storage error, propagated unmodified.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = TrackingError::TaskNotFound {
            task_id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "task not found: abc");

        let err = TrackingError::InvalidStepStatus {
            value: "failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid step status \"failed\": status should be started or completed"
        );

        let err = TrackingError::ResultTimeout {
            task_id: "t9".to_string(),
            status: "pending".to_string(),
            timeout: Duration::from_secs(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("t9"));
        assert!(msg.contains("pending"));
        assert!(msg.contains("2s"));
    }

    #[test]
    fn storage_errors_are_transparent() {
        let err: TrackingError = StorageError::backend("connection reset").into();
        assert_eq!(err.to_string(), "backend error: connection reset");
        assert!(matches!(err, TrackingError::Storage(_)));
    }
}
