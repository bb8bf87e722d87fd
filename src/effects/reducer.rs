//! # Reducers.
//!
//! The reducer runs after every accepted transition, whether or not an effect is
//! bound to the new status, and also while the journal is replayed. It is pure: it
//! only maps the effect's [`NextState`] to the state that gets committed.

use crate::core::RegistryView;
use crate::effects::effect::NextState;
use crate::error::EffectFailure;
use crate::tasks::TaskMessage;

/// Pure post-processing of an effect's output.
pub trait Reducer: Send + Sync + 'static {
    /// Maps `next` to the state to commit.
    fn reduce(
        &self,
        view: &RegistryView<'_>,
        msg: &TaskMessage,
        next: NextState,
    ) -> Result<NextState, EffectFailure>;
}

/// Reducer that passes the effect output through.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Reducer for Identity {
    fn reduce(
        &self,
        _view: &RegistryView<'_>,
        _msg: &TaskMessage,
        next: NextState,
    ) -> Result<NextState, EffectFailure> {
        Ok(next)
    }
}

/// Function-backed reducer.
///
/// ## Example
/// ```rust
/// use taskwarden::{NextState, ReducerFn, TaskStatus};
///
/// // Stamp every failed task with its previous status.
/// let reducer = ReducerFn::new(|_view, msg, next| {
///     if msg.task.status != TaskStatus::Failed || !next.is_unchanged() {
///         return Ok(next);
///     }
///     let mut task = msg.task.clone();
///     task.reason = Some(format!("failed while {}", msg.previous));
///     Ok(NextState::write(task))
/// });
/// # let _ = reducer;
/// ```
#[derive(Debug)]
pub struct ReducerFn<F> {
    f: F,
}

impl<F> ReducerFn<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self
    where
        F: Fn(&RegistryView<'_>, &TaskMessage, NextState) -> Result<NextState, EffectFailure>
            + Send
            + Sync
            + 'static,
    {
        Self { f }
    }
}

impl<F> Reducer for ReducerFn<F>
where
    F: Fn(&RegistryView<'_>, &TaskMessage, NextState) -> Result<NextState, EffectFailure>
        + Send
        + Sync
        + 'static,
{
    fn reduce(
        &self,
        view: &RegistryView<'_>,
        msg: &TaskMessage,
        next: NextState,
    ) -> Result<NextState, EffectFailure> {
        (self.f)(view, msg, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskRegistry;
    use crate::tasks::{Task, TaskStatus};
    use serde_json::json;

    fn message() -> TaskMessage {
        let mut task = Task::new("t".into(), json!({}));
        task.status = TaskStatus::Failed;
        TaskMessage {
            task,
            previous: TaskStatus::Pending,
        }
    }

    #[test]
    fn identity_passes_through() {
        let reg = TaskRegistry::new();
        let next = Identity
            .reduce(&reg.view(), &message(), NextState::Unchanged)
            .unwrap();
        assert_eq!(next, NextState::Unchanged);
    }

    #[test]
    fn closure_reducer_sees_the_message() {
        let reg = TaskRegistry::new();
        let reducer = ReducerFn::new(|_view, msg, _next| {
            let mut task = msg.task.clone();
            task.reason = Some(format!("from {}", msg.previous));
            Ok(NextState::write(task))
        });
        let out = reducer
            .reduce(&reg.view(), &message(), NextState::Unchanged)
            .unwrap()
            .into_writes();
        assert_eq!(out[0].reason.as_deref(), Some("from pending"));
    }
}
