//! Error types used by the supervisor, its effects and its journal.
//!
//! This module defines:
//!
//! - [`SupervisorError`]: everything a handled message can fail with.
//! - [`EffectError`]: a transition whose effect or reducer failed or damaged
//!   the registry; always a fault.
//! - [`EffectFailure`]: the error an [`Effect`](crate::Effect) returns.
//! - [`WorkerError`]: the error a pooled [`Worker`](crate::Worker) returns.
//! - [`DirectoryError`]: an action table rejected at construction time.
//! - [`JournalError`]: a persistence backend failure.
//!
//! Both [`SupervisorError`] and [`EffectError`] provide helper methods
//! (`as_label`, `as_message`) for logging, and [`SupervisorError::is_fault`]
//! separates input-validation failures from invariant violations.

use std::time::Duration;
use thiserror::Error;

use crate::tasks::{TaskId, TaskStatus};

/// Which stage of the pipeline produced an [`EffectError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectStage {
    /// The per-status effect.
    Effect,
    /// The always-present reducer.
    Reducer,
}

impl EffectStage {
    /// Returns a short label (`"effect"` / `"reducer"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectStage::Effect => "effect",
            EffectStage::Reducer => "reducer",
        }
    }
}

/// What went wrong inside the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectFault {
    /// The stage returned an error of its own.
    Failed,
    /// The stage returned a next state that violates registry invariants.
    DamagedState,
}

/// # Transition failure caused by application-supplied effect or reducer logic.
///
/// The transition that produced it is rolled back before the error escapes, so the
/// registry is left exactly as it was before the message.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("taskId:{task_id}: {} on task status {status} {}: {detail}", .stage.as_str(), fault_text(.fault))]
pub struct EffectError {
    /// Task whose transition failed.
    pub task_id: TaskId,
    /// Status the task was transitioning into.
    pub status: TaskStatus,
    /// Stage that failed.
    pub stage: EffectStage,
    /// Kind of failure.
    pub fault: EffectFault,
    /// Human-readable detail.
    pub detail: String,
}

fn fault_text(fault: &EffectFault) -> &'static str {
    match fault {
        EffectFault::Failed => "failed",
        EffectFault::DamagedState => "damaged supervisor state",
    }
}

impl EffectError {
    pub(crate) fn failed(
        task_id: TaskId,
        status: TaskStatus,
        stage: EffectStage,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            status,
            stage,
            fault: EffectFault::Failed,
            detail: detail.into(),
        }
    }

    pub(crate) fn damaged(
        task_id: TaskId,
        status: TaskStatus,
        stage: EffectStage,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            status,
            stage,
            fault: EffectFault::DamagedState,
            detail: detail.into(),
        }
    }

    /// Returns `true` if the stage returned an invalid next state.
    pub fn is_damaged_state(&self) -> bool {
        self.fault == EffectFault::DamagedState
    }
}

/// Error returned by an [`Effect`](crate::Effect) implementation.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{detail}")]
pub struct EffectFailure {
    /// Human-readable detail.
    pub detail: String,
}

impl EffectFailure {
    /// Creates a failure with the given detail.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// # Errors produced while handling a supervisor message.
///
/// Validation failures (`UnknownTask`, `UnspecifiedStatus`, `InvalidTask`, `UnknownStatus`,
/// `UnknownAction`, `MalformedMessage`, `IllegalTransition`) are raised before any mutation.
/// `Effect` and `Journal` are faults and are handed to the supervision policy.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SupervisorError {
    /// Update targeted a task id that is not in the registry.
    #[error("taskId:{task_id}: attempt to update task which does not exist")]
    UnknownTask {
        /// The missing task id.
        task_id: TaskId,
    },

    /// Update carried no status.
    #[error("taskId:{task_id}: unspecified task status")]
    UnspecifiedStatus {
        /// The task the update targeted.
        task_id: TaskId,
    },

    /// Submitted descriptor was rejected by the validity predicate.
    #[error("new task {} is not a valid task", display_id(.task_id))]
    InvalidTask {
        /// Id derived from the descriptor, if any.
        task_id: Option<TaskId>,
    },

    /// A string did not match any status encoding.
    #[error("unknown task status {value:?}")]
    UnknownStatus {
        /// The offending string.
        value: String,
    },

    /// Message tag resolved to no handler of this supervisor.
    #[error("no handler for action {tag:?}")]
    UnknownAction {
        /// The tag in its stable string form.
        tag: String,
    },

    /// Message lacks a field its action requires.
    #[error("action {action} expects {field}")]
    MalformedMessage {
        /// Action name.
        action: &'static str,
        /// Missing field.
        field: &'static str,
    },

    /// Transition forbidden by the strict transition policy.
    #[error("taskId:{task_id}: transition {from} -> {to} is not allowed")]
    IllegalTransition {
        /// Task id.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// Effect or reducer failed or damaged the registry.
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// Persisting a message before applying it failed.
    #[error("journal: {reason}")]
    Journal {
        /// Backend error message.
        reason: String,
    },

    /// Query was not answered within the caller-supplied timeout.
    #[error("query timed out after {after:?}")]
    Timeout {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// Blocking call exceeded [`FATAL_HANG_TIME`](crate::FATAL_HANG_TIME).
    #[error("application hang: blocking query timed out ({after:?}); are you sure you want temporally coupled actors?")]
    Hang {
        /// The hang threshold.
        after: Duration,
    },

    /// Supervisor mailbox is closed (actor stopped or shut down).
    #[error("supervisor mailbox closed")]
    Closed,
}

fn display_id(id: &Option<TaskId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "<no id>".to_string(),
    }
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use taskwarden::SupervisorError;
    ///
    /// let err = SupervisorError::UnknownTask { task_id: "t-1".into() };
    /// assert_eq!(err.as_label(), "unknown_task");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::UnknownTask { .. } => "unknown_task",
            SupervisorError::UnspecifiedStatus { .. } => "unspecified_status",
            SupervisorError::InvalidTask { .. } => "invalid_task",
            SupervisorError::UnknownStatus { .. } => "unknown_status",
            SupervisorError::UnknownAction { .. } => "unknown_action",
            SupervisorError::MalformedMessage { .. } => "malformed_message",
            SupervisorError::IllegalTransition { .. } => "illegal_transition",
            SupervisorError::Effect(_) => "effect_error",
            SupervisorError::Journal { .. } => "journal_error",
            SupervisorError::Timeout { .. } => "query_timeout",
            SupervisorError::Hang { .. } => "application_hang",
            SupervisorError::Closed => "mailbox_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// Returns the task this error is tied to, if any.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            SupervisorError::UnknownTask { task_id }
            | SupervisorError::UnspecifiedStatus { task_id }
            | SupervisorError::IllegalTransition { task_id, .. } => Some(task_id),
            SupervisorError::InvalidTask { task_id } => task_id.as_ref(),
            SupervisorError::Effect(e) => Some(&e.task_id),
            _ => None,
        }
    }

    /// Indicates whether the error is a fault for the supervision policy.
    ///
    /// Returns `true` for [`SupervisorError::Effect`] and [`SupervisorError::Journal`],
    /// `false` for validation failures and caller-side conditions.
    ///
    /// # Example
    /// ```
    /// use taskwarden::SupervisorError;
    ///
    /// let journal = SupervisorError::Journal { reason: "disk full".into() };
    /// assert!(journal.is_fault());
    ///
    /// let invalid = SupervisorError::InvalidTask { task_id: None };
    /// assert!(!invalid.is_fault());
    /// ```
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            SupervisorError::Effect(_) | SupervisorError::Journal { .. }
        )
    }
}

impl From<JournalError> for SupervisorError {
    fn from(e: JournalError) -> Self {
        SupervisorError::Journal {
            reason: e.to_string(),
        }
    }
}

/// # Errors produced by a pooled worker.
///
/// [`WorkerPool`](crate::WorkerPool) reports `Fail` and `Timeout` as `failed`,
/// `Fatal` as `invalid`, and sends nothing for `Canceled`.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum WorkerError {
    /// Worker exceeded the pool timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The task can never succeed as described.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// This run failed; a restart may succeed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The run was cancelled by `abort` or shutdown.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Timeout { .. } => "worker_timeout",
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Indicates whether a restart of the task may succeed.
    ///
    /// # Example
    /// ```
    /// use taskwarden::WorkerError;
    ///
    /// assert!(WorkerError::Fail { error: "smtp 451".into() }.is_retryable());
    /// assert!(!WorkerError::Fatal { error: "no recipient".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Fail { .. } | WorkerError::Timeout { .. })
    }
}

/// Action table rejected by [`ActionDirectory::build`](crate::ActionDirectory::build).
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum DirectoryError {
    /// Two entries share a name.
    #[error("duplicate action name {0:?}")]
    DuplicateName(String),
    /// The same handler is listed under two names.
    #[error("handler for {0:?} is already registered as {1:?}")]
    DuplicateHandler(String, String),
    /// Name is empty or starts with the token sigil.
    #[error("invalid action name {0:?}")]
    InvalidName(String),
}

/// Persistence backend failure.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Backend could not store or load records.
    #[error("backend: {0}")]
    Backend(String),
    /// A stored record could not be decoded.
    #[error("corrupt record #{index}: {source}")]
    Corrupt {
        /// Record position in the journal.
        index: usize,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A record could not be encoded.
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_level_errors_expose_their_task() {
        let err = SupervisorError::UnspecifiedStatus {
            task_id: "t-9".into(),
        };
        assert_eq!(err.task_id().map(TaskId::as_str), Some("t-9"));
        assert!(SupervisorError::Closed.task_id().is_none());
    }

    #[test]
    fn effect_error_is_a_task_error_and_a_fault() {
        let inner = EffectError::damaged(
            "t-1".into(),
            TaskStatus::Done,
            EffectStage::Effect,
            "write changes status",
        );
        assert!(inner.is_damaged_state());
        let err = SupervisorError::from(inner);
        assert!(err.is_fault());
        assert_eq!(err.as_label(), "effect_error");
        assert_eq!(err.task_id().map(TaskId::as_str), Some("t-1"));
        assert!(
            err.to_string()
                .contains("effect on task status done damaged supervisor state")
        );
    }

    #[test]
    fn invalid_task_message_without_id() {
        let err = SupervisorError::InvalidTask { task_id: None };
        assert_eq!(err.to_string(), "new task <no id> is not a valid task");
    }
}
