use std::time::Duration;

use serde_json::json;
use taskwarden::{
    FieldIdentity, Message, Reply, Supervisor, SupervisorConfig, SupervisorHandle, TaskStatus,
    WorkerError, WorkerFn, WorkerPool,
};
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(5);

fn start(pool: &WorkerPool) -> (SupervisorHandle, JoinHandle<taskwarden::ActorExit>) {
    Supervisor::builder(SupervisorConfig::named("pool"), FieldIdentity::new("id"))
        .with_effect(TaskStatus::Ready, pool.ready_effect())
        .with_effect(TaskStatus::Abort, pool.abort_effect())
        .build()
        .unwrap()
        .start()
}

/// Worker sleeping for `payload.ms`, failing fatally on `payload.fatal`.
fn sleeper() -> WorkerPool {
    WorkerPool::new(WorkerFn::arc(|task, cancel| async move {
        if task.payload["fatal"].as_bool() == Some(true) {
            return Err(WorkerError::Fatal {
                error: "bad descriptor".into(),
            });
        }
        let ms = task.payload["ms"].as_u64().unwrap_or(0);
        tokio::select! {
            _ = cancel.cancelled() => Err(WorkerError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(json!({ "slept": ms })),
        }
    }))
}

#[tokio::test(start_paused = true)]
async fn workers_move_tasks_through_pending_to_done() {
    let pool = sleeper();
    let (handle, _exit) = start(&pool);
    let mut events = handle.subscribe();

    handle
        .query(Message::submit(json!({ "id": "a", "ms": 200 })), WAIT)
        .await
        .unwrap();
    let snap = handle.snapshot(WAIT).await.unwrap();
    assert_eq!(snap.status_of("a"), Some(TaskStatus::Pending));
    assert!(pool.is_running("a"));

    tokio::time::sleep(Duration::from_millis(500)).await;
    let snap = handle.snapshot(WAIT).await.unwrap();
    let task = snap.get("a").unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.state, json!({ "slept": 200 }));
    assert_eq!(pool.running(), 0);

    let mut path = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if let (Some(from), Some(to)) = (ev.from, ev.to) {
            path.push((from, to));
        }
    }
    assert_eq!(
        path,
        vec![
            (TaskStatus::Init, TaskStatus::Ready),
            (TaskStatus::Ready, TaskStatus::Pending),
            (TaskStatus::Pending, TaskStatus::Done),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn timeouts_fail_the_task_and_fatal_errors_invalidate_it() {
    let pool = sleeper().with_timeout(Duration::from_millis(100));
    let (handle, _exit) = start(&pool);

    handle
        .dispatch(Message::submit(json!({ "id": "slow", "ms": 10_000 })))
        .unwrap();
    handle
        .dispatch(Message::submit(json!({ "id": "broken", "fatal": true })))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let snap = handle.snapshot(WAIT).await.unwrap();
    let slow = snap.get("slow").unwrap();
    assert_eq!(slow.status, TaskStatus::Failed);
    assert!(slow.error.as_deref().unwrap().contains("timed out"));
    let broken = snap.get("broken").unwrap();
    assert_eq!(broken.status, TaskStatus::Invalid);
    assert!(broken.error.as_deref().unwrap().contains("bad descriptor"));
}

#[tokio::test(start_paused = true)]
async fn abort_cancels_the_running_worker() {
    let pool = sleeper();
    let (handle, _exit) = start(&pool);

    for id in ["a", "b"] {
        handle
            .query(Message::submit(json!({ "id": id, "ms": 1_000 })), WAIT)
            .await
            .unwrap();
    }
    let reply = handle.query(Message::abort("a"), WAIT).await.unwrap();
    assert_eq!(reply, Reply::Aborted { count: 1 });
    assert!(!pool.is_running("a"));
    assert!(pool.is_running("b"));

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snap = handle.snapshot(WAIT).await.unwrap();
    assert_eq!(snap.status_of("a"), Some(TaskStatus::Abort));
    assert_eq!(snap.status_of("b"), Some(TaskStatus::Done));
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_the_previous_run() {
    let pool = sleeper();
    let (handle, _exit) = start(&pool);

    handle
        .query(Message::submit(json!({ "id": "a", "ms": 300 })), WAIT)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.query(Message::restart("a"), WAIT).await.unwrap();

    // the first run would have finished at 300ms
    tokio::time::sleep(Duration::from_millis(200)).await;
    let snap = handle.snapshot(WAIT).await.unwrap();
    assert_eq!(snap.status_of("a"), Some(TaskStatus::Pending));
    assert_eq!(pool.running(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        handle.snapshot(WAIT).await.unwrap().status_of("a"),
        Some(TaskStatus::Done)
    );
}
