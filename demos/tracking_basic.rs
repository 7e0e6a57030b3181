//! Dispatcher, worker and client sharing one tracker
//!
//! A dispatcher creates a task record, a worker runs two tracked steps and
//! publishes the task result, and a client blocks until the result is ready.
//! Everything runs over the in-memory backend; swap in
//! `ResultTracker::from_env()` to run against Redis.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run --example tracking_basic
//! ```

use std::sync::Arc;
use std::time::Duration;

use retsu::store::memory::InMemoryBackend;
use retsu::{ResultTracker, StepInvocation, TrackingError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Summary {
    rows: usize,
    total: i64,
}

async fn load_rows(count: usize) -> Result<Vec<i64>, TrackingError> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok((1..=count as i64).collect())
}

async fn summarize(rows: Vec<i64>) -> Result<Summary, TrackingError> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(Summary {
        rows: rows.len(),
        total: rows.iter().sum(),
    })
}

async fn worker(tracker: ResultTracker<InMemoryBackend>, task_id: String) -> Result<(), TrackingError> {
    tracker.update_status(&task_id, "started").await?;

    let steps = tracker.step_tracker();
    let invocation = StepInvocation::new(task_id.as_str());
    let rows = steps.wrap(load_rows).call(&invocation, 10).await?;
    let summary = steps.wrap(summarize).call(&invocation, rows).await?;

    tracker.save(&task_id, &summary).await?;
    tracker.update_status(&task_id, "completed").await?;
    tracing::info!(task_id, "worker finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), TrackingError> {
    retsu::logging::init();

    let tracker = ResultTracker::new(Arc::new(InMemoryBackend::new()));
    let task_id = "demo-task".to_string();

    // Dispatcher
    tracker
        .create(&task_id, [("status", "pending"), ("requested_by", "demo")])
        .await?;
    let handle = tokio::spawn(worker(tracker.clone(), task_id.clone()));

    // Client
    let summary: Option<Summary> = tracker.get(&task_id, Some(Duration::from_secs(5))).await?;
    tracing::info!(?summary, "result ready");

    for step in ["load_rows", "summarize"] {
        let status = tracker.steps().status(&task_id, step).await?;
        tracing::info!(step, ?status, "step state");
    }

    match handle.await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "worker panicked");
            Ok(())
        },
    }
}
