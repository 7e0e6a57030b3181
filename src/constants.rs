//! Key shapes, field names, and status literals shared by every store.
//!
//! Key formats are part of the wire contract with existing stores and must
//! stay bit-exact: tasks live under `task:{task_id}:metadata` and steps under
//! `task:{task_id}:step:{step_id}`.

use std::time::Duration;

/// Field holding the record status.
pub const STATUS_FIELD: &str = "status";

/// Field holding the opaque encoded result.
pub const RESULT_FIELD: &str = "result";

/// Field holding the creation timestamp (RFC 3339).
pub const CREATED_AT_FIELD: &str = "created_at";

/// Field refreshed on every update (RFC 3339).
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Task status that unblocks [`ResultTracker::get`](crate::ResultTracker::get).
pub const STATUS_COMPLETED: &str = "completed";

/// Task status conventionally written when work starts.
pub const STATUS_STARTED: &str = "started";

/// Task status conventionally written before work is picked up.
pub const STATUS_PENDING: &str = "pending";

/// Interval between status checks while blocking on a result.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Builds the record key for a task.
///
/// # Examples
///
/// ```
/// use retsu::constants::task_key;
///
/// assert_eq!(task_key("t1"), "task:t1:metadata");
/// ```
pub fn task_key(task_id: &str) -> String {
    format!("task:{task_id}:metadata")
}

/// Builds the record key for a step of a task.
///
/// # Examples
///
/// ```
/// use retsu::constants::step_key;
///
/// assert_eq!(step_key("t1", "clean"), "task:t1:step:clean");
/// ```
pub fn step_key(task_id: &str, step_id: &str) -> String {
    format!("task:{task_id}:step:{step_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_key_shape() {
        assert_eq!(task_key("abc-123"), "task:abc-123:metadata");
        assert_eq!(task_key(""), "task::metadata");
    }

    #[test]
    fn step_key_shape() {
        assert_eq!(step_key("abc", "load"), "task:abc:step:load");
        assert_eq!(step_key("a:b", "c"), "task:a:b:step:c");
    }

    #[test]
    fn task_and_step_keys_never_collide() {
        assert_ne!(task_key("t1"), step_key("t1", "metadata"));
    }

    #[test]
    fn poll_interval_is_half_a_second() {
        assert_eq!(POLL_INTERVAL, Duration::from_millis(500));
    }
}
