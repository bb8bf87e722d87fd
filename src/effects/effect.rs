//! # Status effects.
//!
//! An [`Effect`] is the side-effecting step bound to one [`TaskStatus`](crate::TaskStatus).
//! It runs after a task entered that status, sees a copy of the task and a read-only
//! registry view, and returns a [`NextState`].
//!
//! ```text
//! update(to) ─► set + reindex ─► effects[to].apply(view, msg, ctx) ─► NextState
//!                                        │
//!                                        └─ Err(EffectFailure) ─► EffectError (rolled back)
//! ```
//!
//! ## Rules
//! - Effects never run while the supervisor replays its journal.
//! - Effects may dispatch further messages through [`Context::me`]; those are queued
//!   and handled after the current message.
//! - [`NextState::Write`] may only rewrite tasks that exist, and may not change their
//!   status. Status changes go through `update` messages.

use std::future::Future;

use async_trait::async_trait;

use crate::core::{Context, RegistryView};
use crate::error::EffectFailure;
use crate::tasks::{Task, TaskMessage};

/// What an effect or reducer wants written back to the registry.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum NextState {
    /// No further change.
    #[default]
    Unchanged,
    /// Replacement records for existing tasks.
    Write(Vec<Task>),
}

impl NextState {
    /// Writes back a single task.
    pub fn write(task: Task) -> Self {
        NextState::Write(vec![task])
    }

    /// Returns `true` for [`NextState::Unchanged`] and empty writes.
    pub fn is_unchanged(&self) -> bool {
        match self {
            NextState::Unchanged => true,
            NextState::Write(tasks) => tasks.is_empty(),
        }
    }

    /// Records to write, in order.
    pub fn into_writes(self) -> Vec<Task> {
        match self {
            NextState::Unchanged => Vec::new(),
            NextState::Write(tasks) => tasks,
        }
    }
}

/// Side-effecting step run when a task enters a status.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::json;
/// use taskwarden::{Context, Effect, EffectFailure, NextState, RegistryView, TaskMessage};
///
/// struct Stamp;
///
/// #[async_trait]
/// impl Effect for Stamp {
///     async fn apply(
///         &self,
///         _view: &RegistryView<'_>,
///         msg: &TaskMessage,
///         _ctx: &Context,
///     ) -> Result<NextState, EffectFailure> {
///         let mut task = msg.task.clone();
///         task.state = json!({ "stamped": true });
///         Ok(NextState::write(task))
///     }
/// }
/// ```
#[async_trait]
pub trait Effect: Send + Sync + 'static {
    /// Runs the effect for `msg.task`, which already has its new status.
    async fn apply(
        &self,
        view: &RegistryView<'_>,
        msg: &TaskMessage,
        ctx: &Context,
    ) -> Result<NextState, EffectFailure>;
}

/// Function-backed effect.
///
/// Wraps a closure `F: Fn(TaskMessage, Context) -> Fut` that receives owned copies,
/// so the returned future can be `'static`. Implement [`Effect`] directly when the
/// registry view is needed.
#[derive(Debug)]
pub struct EffectFn<F> {
    f: F,
}

impl<F, Fut> EffectFn<F>
where
    F: Fn(TaskMessage, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<NextState, EffectFailure>> + Send + 'static,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps `f` and returns it as a shared effect.
    pub fn arc(f: F) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Effect for EffectFn<F>
where
    F: Fn(TaskMessage, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<NextState, EffectFailure>> + Send + 'static,
{
    async fn apply(
        &self,
        _view: &RegistryView<'_>,
        msg: &TaskMessage,
        ctx: &Context,
    ) -> Result<NextState, EffectFailure> {
        (self.f)(msg.clone(), ctx.clone()).await
    }
}
