//! Step instrumentation around worker-side functions.
//!
//! [`StepTracker`] wraps a step function so each call is recorded in the
//! step store: status `started` before the function runs, then status
//! `completed` and the encoded return value after it returns. The value is
//! handed back to the caller unchanged.
//!
//! The step ID comes from the call-time [`StepInvocation`] when given, else
//! from the wrapped function's name.
//!
//! # Failure
//!
//! There is no recovery. If the step function returns an error, nothing
//! else is written and the error is returned as-is, leaving the step in
//! `started`. The same holds when the returned value cannot be encoded.
//! Monitoring should read a `started` step with a stale
//! `updated_at` as a probable failure.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use retsu::instrument::StepInvocation;
//! use retsu::store::memory::InMemoryBackend;
//! use retsu::{ResultTracker, StepStatus, TrackingError};
//!
//! async fn answer(base: i64) -> Result<i64, TrackingError> {
//!     Ok(base * 2)
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let tracker = ResultTracker::new(Arc::new(InMemoryBackend::new()));
//! let step = tracker.step_tracker().wrap(answer);
//! assert_eq!(step.name(), "answer");
//!
//! let value = step.call(&StepInvocation::new("t1"), 21).await.unwrap();
//! assert_eq!(value, 42);
//! assert_eq!(
//!     tracker.steps().status("t1", "answer").await.unwrap(),
//!     Some(StepStatus::Completed)
//! );
//! # });
//! ```

use std::future::Future;

use serde::Serialize;

use crate::codec;
use crate::constants::RESULT_FIELD;
use crate::error::TrackingError;
use crate::step::{StepMetadataStore, StepStatus};
use crate::store::backend::KeyValueBackend;

/// Call-time identity of a step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInvocation {
    task_id: String,
    step_id: Option<String>,
}

impl StepInvocation {
    /// Identifies a call by task; the step ID defaults to the wrapped
    /// function's name.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            step_id: None,
        }
    }

    /// Overrides the step ID for this call.
    pub fn with_step_id(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    /// The task this call belongs to.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The explicit step ID, if any.
    pub fn step_id(&self) -> Option<&str> {
        self.step_id.as_deref()
    }
}

/// Records step progress around async work.
#[derive(Debug)]
pub struct StepTracker<B: ?Sized> {
    steps: StepMetadataStore<B>,
}

impl<B: ?Sized> Clone for StepTracker<B> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<B: KeyValueBackend + ?Sized> StepTracker<B> {
    /// Creates a tracker writing to the given step store.
    pub fn new(steps: StepMetadataStore<B>) -> Self {
        Self { steps }
    }

    /// Wraps `func`, naming the step after the function.
    ///
    /// The name is the last segment of the function's type path; closures
    /// take the name of the function they are defined in. The compiler does
    /// not guarantee the exact type path, so use
    /// [`wrap_named`](Self::wrap_named) when the step ID must be stable
    /// across toolchains.
    pub fn wrap<F>(&self, func: F) -> TrackedStep<B, F> {
        self.wrap_named(default_step_name::<F>(), func)
    }

    /// Wraps `func` under an explicit step name.
    pub fn wrap_named<F>(&self, name: impl Into<String>, func: F) -> TrackedStep<B, F> {
        TrackedStep {
            tracker: self.clone(),
            name: name.into(),
            func,
        }
    }

    /// Runs one future as step `step_id` of `task_id`, recording
    /// `started`, then `completed` and the encoded output.
    ///
    /// # Errors
    ///
    /// Returns the future's own error unchanged (the step stays
    /// `started`), or a [`TrackingError`] converted into `E` if a record
    /// write or the result encoding fails.
    pub async fn run<Fut, T, E>(&self, task_id: &str, step_id: &str, work: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: From<TrackingError>,
    {
        self.steps
            .update_status(task_id, step_id, StepStatus::Started)
            .await?;

        let value = match work.await {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(task_id, step_id, "step failed, left in started state");
                return Err(err);
            },
        };

        // An unencodable value must leave the step in started.
        let encoded = codec::encode(&value)?;
        self.steps
            .update_status(task_id, step_id, StepStatus::Completed)
            .await?;
        self.steps
            .update(task_id, step_id, RESULT_FIELD, encoded)
            .await?;
        Ok(value)
    }
}

/// A step function bound to a [`StepTracker`] and a default step name.
///
/// Calling it has the same inputs and output as the wrapped function, plus
/// the [`StepInvocation`] identifying the task.
#[derive(Debug)]
pub struct TrackedStep<B: ?Sized, F> {
    tracker: StepTracker<B>,
    name: String,
    func: F,
}

impl<B: ?Sized, F: Clone> Clone for TrackedStep<B, F> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<B: KeyValueBackend + ?Sized, F> TrackedStep<B, F> {
    /// The default step ID used when the invocation does not set one.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the wrapped function with `args`, recording progress under
    /// the invocation's task.
    ///
    /// # Errors
    ///
    /// See [`StepTracker::run`].
    pub async fn call<A, Fut, T, E>(&self, invocation: &StepInvocation, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: From<TrackingError>,
    {
        let step_id = invocation.step_id().unwrap_or(&self.name);
        self.tracker
            .run(invocation.task_id(), step_id, (self.func)(args))
            .await
    }
}

/// Derives a step name from a function's type path: generic arguments are
/// dropped and closure segments (`{{closure}}`) are skipped.
fn default_step_name<F>() -> String {
    let full = std::any::type_name::<F>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::")
        .find(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn clean_up(_: ()) -> Result<(), TrackingError> {
        Ok(())
    }

    fn generic_step<T>(_: T) -> std::future::Ready<Result<(), TrackingError>> {
        std::future::ready(Ok(()))
    }

    #[test]
    fn default_name_of_fn_item() {
        assert_eq!(default_step_name_of(&clean_up), "clean_up");
    }

    #[test]
    fn default_name_drops_generic_arguments() {
        assert_eq!(default_step_name_of(&generic_step::<u8>), "generic_step");
    }

    #[test]
    fn default_name_of_closure_uses_enclosing_fn() {
        let closure = |x: i32| async move { Ok::<_, TrackingError>(x) };
        assert_eq!(
            default_step_name_of(&closure),
            "default_name_of_closure_uses_enclosing_fn"
        );
    }

    #[test]
    fn invocation_step_id_override() {
        let invocation = StepInvocation::new("t1");
        assert_eq!(invocation.task_id(), "t1");
        assert_eq!(invocation.step_id(), None);
        assert_eq!(invocation.with_step_id("s").step_id(), Some("s"));
    }

    fn default_step_name_of<F>(_: &F) -> String {
        default_step_name::<F>()
    }
}
