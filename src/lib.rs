//! # taskwarden
//!
//! **Taskwarden** is a task-lifecycle supervisor for Rust.
//!
//! One supervisor actor tracks many tasks and drives each of them through a closed
//! set of statuses. Entering a status runs the effect bound to it; effects may queue
//! further transitions, spawn workers or fail. Tasks can be restarted or aborted in
//! bulk by status, and every accepted update can be journaled and replayed after a
//! crash.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   SupervisorHandle::{dispatch, query, block, snapshot}
//!                 │
//!                 ▼
//!        ┌──────────────────┐         ┌─────────────────────────────────┐
//!        │ mailbox (FIFO)   │◄────────│ self-addressed `@update`        │
//!        └────────┬─────────┘         │ (restart ready, bulk abort,     │
//!                 ▼                   │  worker results)                │
//! ┌───────────────────────────────────┴─────────────────────────────────┤
//! │  Supervisor actor (one tokio task)                                  │
//! │  - ActionDirectory (name ◄─► token ◄─► handler)                     │
//! │  - TaskRegistry (tasks + by_status index)                           │
//! │  - submit / update / restart / abort                                │
//! │  - effect[status] ─► reducer ─► validate ─► commit / roll back      │
//! │  - Journal (persist, replay on start)                               │
//! │  - SupervisionPolicy (stop / resume / retry)                        │
//! └──────┬──────────────────────────────────────────────────────────────┘
//!        │ publishes Event
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │              (capacity: SupervisorConfig::bus_capacity)           │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//! ```
//!
//! ### Task lifecycle
//! ```text
//! submit ─► init ─► ready ─► pending ─┬─► done
//!                                     ├─► failed
//!                                     └─► invalid
//! restart:  {init, ready, pending} ─► init ─► (queued) ready
//! abort:    any ─► abort
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | Start a supervisor and talk to it.                       | [`Supervisor`], [`SupervisorHandle`]        |
//! | **Effects**       | Per-status side effects and a pure reducer.              | [`Effect`], [`EffectFn`], [`Reducer`]       |
//! | **Workers**       | Cancellable background work per `ready` task.            | [`Worker`], [`WorkerPool`]                  |
//! | **Addressing**    | Action names and tokens that survive persistence.        | [`ActionDirectory`], [`ActionTag`]          |
//! | **Persistence**   | Journal accepted updates, replay on start.               | [`Journal`], [`InMemoryJournal`]            |
//! | **Policies**      | Fault handling, backoff and transition rules.            | [`SupervisionPolicy`], [`TransitionPolicy`] |
//! | **Subscriber API**| Hook into lifecycle events.                              | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed errors for callers and crash hooks.                | [`SupervisorError`], [`EffectError`]        |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use serde_json::json;
//! use taskwarden::{
//!     FieldIdentity, LogWriter, Message, Subscribe, Supervisor, SupervisorConfig, TaskStatus,
//!     WorkerFn, WorkerPool,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = WorkerPool::new(WorkerFn::arc(|task, _cancel| async move {
//!         Ok(json!({ "echo": task.payload }))
//!     }));
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
//!     let sup = Supervisor::builder(SupervisorConfig::named("echo"), FieldIdentity::new("id"))
//!         .with_effect(TaskStatus::Ready, pool.ready_effect())
//!         .with_effect(TaskStatus::Abort, pool.abort_effect())
//!         .with_subscribers(subs)
//!         .build()?;
//!     let (handle, exit) = sup.start();
//!
//!     handle.dispatch(Message::submit(json!({ "id": "a" })))?;
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!
//!     let snap = handle.snapshot(Duration::from_secs(1)).await?;
//!     assert_eq!(snap.status_of("a"), Some(TaskStatus::Done));
//!
//!     handle.shutdown();
//!     exit.await?;
//!     Ok(())
//! }
//! ```
mod action;
mod core;
mod effects;
mod error;
mod events;
mod journal;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use action::{ActionDirectory, ActionTag, ActionToken, Message, Reply, TOKEN_SIGIL, Tagged};
pub use core::{
    ActorExit, Context, CrashHook, DEFAULT_RESTART_ON, DebugLog, FATAL_HANG_TIME,
    RegistrySnapshot, RegistryView, Supervisor, SupervisorAction, SupervisorBuilder,
    SupervisorConfig, SupervisorHandle, TaskRegistry,
};
pub use effects::{
    Effect, EffectFn, Identity, NextState, Reducer, ReducerFn, Worker, WorkerFn, WorkerPool,
};
pub use error::{
    DirectoryError, EffectError, EffectFailure, EffectStage, JournalError, SupervisorError,
    WorkerError,
};
pub use events::{Bus, Event, EventKind};
pub use journal::{InMemoryJournal, Journal, PersistedMessage};
pub use policies::{BackoffPolicy, JitterPolicy, SupervisionPolicy, TransitionPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{FieldIdentity, Task, TaskId, TaskIdentity, TaskMessage, TaskPatch, TaskStatus, is_status};
