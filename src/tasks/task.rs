//! # Task record and patches.
//!
//! A [`Task`] is the supervisor's view of one unit of work: its id, its
//! [`TaskStatus`], the application descriptor it was submitted with, and an opaque
//! `state` owned by effects. The supervisor never interprets `payload` or `state`.
//!
//! A [`TaskPatch`] is the partial update carried by `update` messages. Merging is a
//! shallow overwrite: every `Some` field replaces the stored value, `None` keeps it.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tasks::status::TaskStatus;

/// Supervisor-local task identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A task tracked by the supervisor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identity derived from the descriptor at submit time.
    pub task_id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Application descriptor as submitted.
    pub payload: Value,
    /// Opaque state owned by effects.
    pub state: Value,
    /// Last failure detail.
    pub error: Option<String>,
    /// Human-readable reason for the current status.
    pub reason: Option<String>,
}

impl Task {
    /// Creates a task in [`TaskStatus::Init`].
    pub fn new(task_id: TaskId, payload: Value) -> Self {
        Self {
            task_id,
            status: TaskStatus::Init,
            payload,
            state: Value::Null,
            error: None,
            reason: None,
        }
    }

    /// Returns a copy with `patch` applied on top.
    ///
    /// The task id is never changed by a patch.
    pub fn merged(&self, patch: &TaskPatch) -> Task {
        let mut next = self.clone();
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(payload) = &patch.payload {
            next.payload = payload.clone();
        }
        if let Some(state) = &patch.state {
            next.state = state.clone();
        }
        if let Some(error) = &patch.error {
            next.error = Some(error.clone());
        }
        if let Some(reason) = &patch.reason {
            next.reason = Some(reason.clone());
        }
        next
    }
}

/// Partial task carried by `submit` and `update` messages.
///
/// ## Example
/// ```rust
/// use serde_json::json;
/// use taskwarden::{TaskPatch, TaskStatus};
///
/// let patch = TaskPatch::new("t-1", TaskStatus::Done).with_state(json!({ "sent": 3 }));
/// assert_eq!(patch.status, Some(TaskStatus::Done));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// Target task; required by `update` unless derivable from `payload`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Requested status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Application descriptor (the whole task on `submit`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Replacement for the opaque state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TaskPatch {
    /// Patch moving `task_id` to `status`.
    pub fn new(task_id: impl Into<TaskId>, status: TaskStatus) -> Self {
        Self {
            task_id: Some(task_id.into()),
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch carrying only an application descriptor (used by `submit`).
    pub fn descriptor(payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }

    /// Sets the opaque state.
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the failure detail.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Single-task message handed to effects and reducers.
///
/// `task` is a copy taken after the transition was applied; effects never see the
/// registry's own records.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskMessage {
    /// The task as it is after the transition.
    pub task: Task,
    /// Status the task left.
    pub previous: TaskStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_only_present_fields() {
        let task = Task::new("t-1".into(), json!({ "foreignId": "00001" }));
        let patch = TaskPatch::new("ignored", TaskStatus::Failed).with_error("boom");
        let next = task.merged(&patch);

        assert_eq!(next.task_id.as_str(), "t-1");
        assert_eq!(next.status, TaskStatus::Failed);
        assert_eq!(next.error.as_deref(), Some("boom"));
        assert_eq!(next.payload, task.payload);
        assert_eq!(next.state, Value::Null);

        let later = next.merged(&TaskPatch::new("t-1", TaskStatus::Ready));
        assert_eq!(later.error.as_deref(), Some("boom"));
    }

    #[test]
    fn patch_serializes_compactly() {
        let patch = TaskPatch::new("t-1", TaskStatus::Ready);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, json!({ "taskId": "t-1", "status": "ready" }));
    }
}
