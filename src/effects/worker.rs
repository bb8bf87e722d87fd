//! # Worker pool: effects that run one cancellable worker per task.
//!
//! [`WorkerPool`] turns an async [`Worker`] into two effects:
//!
//! ```text
//! ready effect:
//!   dispatch update(pending) ──► spawn worker(task, child token, timeout)
//!                                     │
//!                                     ├─ Ok(state)        ─► update(done, state)
//!                                     ├─ Err(Fail)        ─► update(failed, error)
//!                                     ├─ Err(Timeout)     ─► update(failed, error)
//!                                     ├─ Err(Fatal)       ─► update(invalid, error)
//!                                     └─ Err(Canceled)    ─► nothing
//!
//! abort effect:
//!   cancel the task's token (if a worker is running)
//! ```
//!
//! ## Rules
//! - `pending` is queued before the worker is spawned, so the worker's result is
//!   always handled after `pending`.
//! - One worker per task id: a second `ready` (restart) cancels the previous run.
//! - A worker that ignores its token is still abandoned on cancel or timeout.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::action::Message;
use crate::core::{Context, RegistryView};
use crate::effects::effect::{Effect, NextState};
use crate::error::{EffectFailure, WorkerError};
use crate::tasks::{Task, TaskId, TaskMessage, TaskPatch, TaskStatus};

/// Sender label used for result updates.
const POOL_SENDER: &str = "worker-pool";

/// # Asynchronous, cancelable unit of work for one task.
///
/// Receives a copy of the task as it entered `ready` and returns the task's new
/// opaque state on success.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use tokio_util::sync::CancellationToken;
/// use taskwarden::{Task, Worker, WorkerError};
///
/// struct Mailer;
///
/// #[async_trait]
/// impl Worker for Mailer {
///     async fn run(&self, task: Task, ctx: CancellationToken) -> Result<Value, WorkerError> {
///         if ctx.is_cancelled() {
///             return Err(WorkerError::Canceled);
///         }
///         Ok(json!({ "sentTo": task.payload["recipient"] }))
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Runs the work for `task` until completion or cancellation.
    async fn run(&self, task: Task, ctx: CancellationToken) -> Result<Value, WorkerError>;
}

/// Function-backed worker.
///
/// Wraps a closure that *creates* a new future per run.
#[derive(Debug)]
pub struct WorkerFn<F> {
    f: F,
}

impl<F> WorkerFn<F> {
    /// Creates the worker and returns it as a shared handle.
    pub fn arc<Fut>(f: F) -> Arc<Self>
    where
        F: Fn(Task, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, WorkerError>> + Send + 'static,
    {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl<F, Fut> Worker for WorkerFn<F>
where
    F: Fn(Task, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, WorkerError>> + Send + 'static,
{
    async fn run(&self, task: Task, ctx: CancellationToken) -> Result<Value, WorkerError> {
        (self.f)(task, ctx).await
    }
}

struct Running {
    generation: u64,
    token: CancellationToken,
}

struct PoolInner {
    worker: Arc<dyn Worker>,
    timeout: Option<Duration>,
    root: CancellationToken,
    running: Mutex<HashMap<TaskId, Running>>,
    generation: AtomicU64,
}

impl PoolInner {
    /// Registers a fresh token for `id`, cancelling a previous run.
    fn register(&self, id: &TaskId) -> (u64, CancellationToken) {
        let generation = self.generation.fetch_add(1, AtomicOrdering::Relaxed);
        let token = self.root.child_token();
        let previous = self.lock().insert(
            id.clone(),
            Running {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        (generation, token)
    }

    /// Forgets `id` if it still belongs to `generation`.
    fn release(&self, id: &TaskId, generation: u64) {
        let mut running = self.lock();
        if running.get(id).is_some_and(|r| r.generation == generation) {
            running.remove(id);
        }
    }

    fn cancel(&self, id: &TaskId) -> bool {
        match self.lock().remove(id) {
            Some(running) => {
                running.token.cancel();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Executes one run of the worker with cancellation and an optional timeout.
    async fn run_once(&self, task: Task, token: &CancellationToken) -> Result<Value, WorkerError> {
        let run = self.worker.run(task, token.clone());
        let res = if let Some(dur) = self.timeout.filter(|d| *d > Duration::ZERO) {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(WorkerError::Canceled),
                r = time::timeout(dur, run) => match r {
                    Ok(r) => r,
                    Err(_elapsed) => Err(WorkerError::Timeout { timeout: dur }),
                },
            }
        } else {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(WorkerError::Canceled),
                r = run => r,
            }
        };
        token.cancel();
        res
    }
}

/// Outcome of one run, as the patch to report.
fn report(id: TaskId, res: Result<Value, WorkerError>) -> Option<TaskPatch> {
    match res {
        Ok(state) => Some(TaskPatch::new(id, TaskStatus::Done).with_state(state)),
        Err(WorkerError::Canceled) => None,
        Err(e) if e.is_retryable() => {
            Some(TaskPatch::new(id, TaskStatus::Failed).with_error(e.to_string()))
        }
        Err(e) => Some(TaskPatch::new(id, TaskStatus::Invalid).with_error(e.to_string())),
    }
}

/// Pool of per-task workers driven by `ready` and `abort` effects.
///
/// ## Example
/// ```no_run
/// use std::time::Duration;
/// use serde_json::json;
/// use taskwarden::{FieldIdentity, Supervisor, SupervisorConfig, TaskStatus, WorkerFn, WorkerPool};
///
/// let pool = WorkerPool::new(WorkerFn::arc(|task, _ctx| async move {
///     Ok(json!({ "echo": task.payload }))
/// }))
/// .with_timeout(Duration::from_secs(30));
///
/// let supervisor = Supervisor::builder(SupervisorConfig::named("echo"), FieldIdentity::new("id"))
///     .with_effect(TaskStatus::Ready, pool.ready_effect())
///     .with_effect(TaskStatus::Abort, pool.abort_effect())
///     .build();
/// ```
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Creates a pool running `worker` without a timeout.
    pub fn new(worker: Arc<dyn Worker>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                worker,
                timeout: None,
                root: CancellationToken::new(),
                running: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Sets a per-run timeout (`Duration::ZERO` disables it).
    ///
    /// Must be called before the effects are handed out.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.timeout = Some(timeout);
                inner
            }
            Err(shared) => PoolInner {
                worker: Arc::clone(&shared.worker),
                timeout: Some(timeout),
                root: shared.root.clone(),
                running: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            },
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Effect for [`TaskStatus::Ready`].
    pub fn ready_effect(&self) -> Arc<dyn Effect> {
        Arc::new(ReadyEffect {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Effect for [`TaskStatus::Abort`].
    pub fn abort_effect(&self) -> Arc<dyn Effect> {
        Arc::new(AbortEffect {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Number of workers currently running.
    pub fn running(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if a worker runs for `id`.
    pub fn is_running(&self, id: &str) -> bool {
        self.inner.lock().contains_key(id)
    }

    /// Cancels every running worker; none of them reports a result.
    pub fn shutdown(&self) {
        self.inner.root.cancel();
        self.inner.lock().clear();
    }
}

struct ReadyEffect {
    inner: Arc<PoolInner>,
}

#[async_trait]
impl Effect for ReadyEffect {
    async fn apply(
        &self,
        _view: &RegistryView<'_>,
        msg: &TaskMessage,
        ctx: &Context,
    ) -> Result<NextState, EffectFailure> {
        let id = msg.task.task_id.clone();
        ctx.me()
            .dispatch_as(ctx.name(), Message::transition(id.clone(), TaskStatus::Pending))
            .map_err(|e| EffectFailure::new(e.to_string()))?;

        let (generation, token) = self.inner.register(&id);
        let inner = Arc::clone(&self.inner);
        let me = ctx.me().clone();
        let task = msg.task.clone();

        tokio::spawn(async move {
            let res = inner.run_once(task, &token).await;
            inner.release(&id, generation);
            let Some(patch) = report(id, res) else {
                return;
            };
            if let Err(e) = me.dispatch_as(POOL_SENDER, Message::update(patch)) {
                debug!(actor = me.name(), error = %e, "worker result dropped");
            }
        });
        Ok(NextState::Unchanged)
    }
}

struct AbortEffect {
    inner: Arc<PoolInner>,
}

#[async_trait]
impl Effect for AbortEffect {
    async fn apply(
        &self,
        _view: &RegistryView<'_>,
        msg: &TaskMessage,
        ctx: &Context,
    ) -> Result<NextState, EffectFailure> {
        if self.inner.cancel(&msg.task.task_id) {
            ctx.debug().info(format_args!("cancelled worker for {}", msg.task.task_id));
        }
        Ok(NextState::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool_with(worker: Arc<dyn Worker>, timeout: Option<Duration>) -> PoolInner {
        PoolInner {
            worker,
            timeout,
            root: CancellationToken::new(),
            running: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn task() -> Task {
        Task::new("t-1".into(), json!({ "id": "t-1" }))
    }

    #[tokio::test(start_paused = true)]
    async fn run_once_times_out_slow_workers() {
        let inner = pool_with(
            WorkerFn::arc(|_task, _ctx| async {
                time::sleep(Duration::from_secs(60)).await;
                Ok(Value::Null)
            }),
            Some(Duration::from_secs(1)),
        );
        let (_, token) = inner.register(&"t-1".into());
        let res = inner.run_once(task(), &token).await;
        assert_eq!(
            res,
            Err(WorkerError::Timeout {
                timeout: Duration::from_secs(1)
            })
        );
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_workers_that_ignore_their_token() {
        let inner = Arc::new(pool_with(
            WorkerFn::arc(|_task, _ctx| async {
                time::sleep(Duration::from_secs(3600)).await;
                Ok(json!("late"))
            }),
            None,
        ));
        let id = TaskId::from("t-1");
        let (_, token) = inner.register(&id);
        let runner = {
            let inner = Arc::clone(&inner);
            tokio::spawn(async move { inner.run_once(task(), &token).await })
        };
        tokio::task::yield_now().await;
        assert!(inner.cancel(&id));
        assert_eq!(runner.await.unwrap(), Err(WorkerError::Canceled));
        assert!(!inner.cancel(&id));
    }

    #[test]
    fn second_registration_cancels_the_first() {
        let inner = pool_with(WorkerFn::arc(|_t, _c| async { Ok(Value::Null) }), None);
        let id = TaskId::from("t-1");
        let (first_gen, first) = inner.register(&id);
        let (second_gen, second) = inner.register(&id);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        inner.release(&id, first_gen);
        assert_eq!(inner.lock().len(), 1);
        inner.release(&id, second_gen);
        assert!(inner.lock().is_empty());
    }

    #[test]
    fn results_map_to_statuses() {
        let id = || TaskId::from("t");
        assert_eq!(report(id(), Ok(json!(1))).unwrap().status, Some(TaskStatus::Done));
        assert_eq!(
            report(id(), Err(WorkerError::Fail { error: "x".into() }))
                .unwrap()
                .status,
            Some(TaskStatus::Failed)
        );
        assert_eq!(
            report(id(), Err(WorkerError::Fatal { error: "x".into() }))
                .unwrap()
                .status,
            Some(TaskStatus::Invalid)
        );
        assert!(report(id(), Err(WorkerError::Canceled)).is_none());
    }
}
