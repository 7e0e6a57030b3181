//! Task and step state tracking over a shared key-value store.
//!
//! Workers in an external pool execute tasks; this crate records what they
//! do. Each task has a metadata record (status, encoded result, timestamps,
//! caller fields) and each named step of a task has its own record
//! following a two-state `started`/`completed` protocol. Clients block on
//! a task's result by polling its status with an optional timeout.
//!
//! Coordination relies only on the backend's per-record atomic field
//! writes. There is no in-process locking and no central coordinator;
//! concurrent workers writing different steps never interfere, and at most
//! one writer should own a given task or step record at a time.
//!
//! # Module Organization
//!
//! - [`store`] - Key-value backend trait with Redis and in-memory backends
//! - [`task`] - Task metadata records
//! - [`step`] - Step metadata records and [`StepStatus`]
//! - [`tracker`] - [`ResultTracker`], the client-facing facade
//! - [`instrument`] - [`StepTracker`], recording progress around step functions
//! - [`codec`] - Opaque encoding of result values
//! - [`config`] - Backend connection settings from the environment
//! - [`error`] - [`TrackingError`]
//! - [`constants`] - Record key shapes, field names, and status literals
//!
//! # Feature Flags
//!
//! - `redis` (default) - [`store::redis::RedisBackend`] and
//!   [`ResultTracker::connect`]
//! - `logging` (default) - [`logging::init`] subscriber helper
//! - `redis-tests` - Redis contract tests against a live server

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod instrument;
#[cfg(feature = "logging")]
pub mod logging;
pub mod step;
pub mod store;
pub mod task;
pub mod tracker;

pub use config::TrackingConfig;
pub use error::TrackingError;
pub use instrument::{StepInvocation, StepTracker, TrackedStep};
pub use step::{StepMetadataStore, StepStatus};
pub use store::{KeyValueBackend, RecordFields, StorageError};
pub use task::TaskMetadataStore;
pub use tracker::ResultTracker;
