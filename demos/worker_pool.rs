//! # Example: worker_pool
//!
//! Runs one cancellable worker per task and aborts a group of them by status.
//!
//! Shows how to:
//! - Turn a [`WorkerFn`] into `ready` / `abort` effects with [`WorkerPool`].
//! - Report timeouts as `failed` and fatal errors as `invalid`.
//! - Abort every `pending` task without blocking the mailbox.
//!
//! ## Flow
//! ```text
//! submit ─► ready ─► (effect) pending + spawn worker
//!                                   ├─ Ok      ─► done
//!                                   ├─ timeout ─► failed
//!                                   └─ Fatal   ─► invalid
//! abort_status("pending") ─► queued abort per task ─► worker cancelled
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example worker_pool
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskwarden::{
    FieldIdentity, LogWriter, Message, Subscribe, Supervisor, SupervisorConfig, TaskStatus,
    WorkerError, WorkerFn, WorkerPool,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let pool = WorkerPool::new(WorkerFn::arc(|task, cancel| async move {
        let ms = task.payload["ms"].as_u64().unwrap_or(0);
        if ms == 0 {
            return Err(WorkerError::Fatal {
                error: "missing duration".into(),
            });
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(WorkerError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(json!({ "tookMs": ms })),
        }
    }))
    .with_timeout(Duration::from_millis(500));

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
    let sup = Supervisor::builder(SupervisorConfig::named("sleepers"), FieldIdentity::new("id"))
        .with_effect(TaskStatus::Ready, pool.ready_effect())
        .with_effect(TaskStatus::Abort, pool.abort_effect())
        .with_subscribers(subs)
        .build()?;
    let (handle, exit) = sup.start();

    for (id, ms) in [("quick", 50), ("slow", 2_000), ("broken", 0), ("long-1", 300), ("long-2", 400)] {
        handle.dispatch(Message::submit(json!({ "id": id, "ms": ms })))?;
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    let reply = handle
        .query(Message::abort_status("pending", false), Duration::from_secs(1))
        .await?;
    println!("[main] abort: {reply:?}");

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snap = handle.snapshot(Duration::from_secs(1)).await?;
    for status in TaskStatus::ALL {
        println!("[main] {status:>8}: {:?}", snap.ids_in(status));
    }
    println!("[main] workers still running: {}", pool.running());

    handle.shutdown();
    exit.await?;
    Ok(())
}
