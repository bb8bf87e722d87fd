//! # Supervisor messages and replies.
//!
//! [`Message`] is the logical message shape every supervisor action receives:
//!
//! ```text
//! { type: name-or-token, task?: TaskPatch, taskId?, status?, blocking? }
//! ```
//!
//! Constructors cover the four supervisor actions; each uses the plain action
//! name as its tag. Messages the supervisor sends to itself carry the `update`
//! token instead, and are converted to `@update` before they are persisted.

use serde_json::Value;

use crate::action::directory::{ActionTag, Tagged};
use crate::core::SupervisorAction;
use crate::tasks::{TaskId, TaskPatch, TaskStatus};

/// A message addressed to a supervisor.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Action identity.
    pub tag: ActionTag,
    /// Task descriptor (`submit`) or patch (`update`).
    pub task: Option<TaskPatch>,
    /// Target task (`restart`, `abort`).
    pub task_id: Option<TaskId>,
    /// Target status name (`abort`).
    pub status: Option<String>,
    /// Sequential processing for bulk `abort`.
    pub blocking: bool,
}

impl Message {
    /// Empty message with the given tag.
    pub fn new(tag: ActionTag) -> Self {
        Self {
            tag,
            task: None,
            task_id: None,
            status: None,
            blocking: false,
        }
    }

    fn action(action: SupervisorAction) -> Self {
        Self::new(ActionTag::named(action.name()))
    }

    /// `submit` with an application descriptor.
    pub fn submit(payload: Value) -> Self {
        Self {
            task: Some(TaskPatch::descriptor(payload)),
            ..Self::action(SupervisorAction::Submit)
        }
    }

    /// `update` with a patch.
    pub fn update(patch: TaskPatch) -> Self {
        Self {
            task: Some(patch),
            ..Self::action(SupervisorAction::Update)
        }
    }

    /// `update` moving `task_id` to `status`.
    pub fn transition(task_id: impl Into<TaskId>, status: TaskStatus) -> Self {
        Self::update(TaskPatch::new(task_id, status))
    }

    /// `restart` of a single task.
    pub fn restart(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            ..Self::action(SupervisorAction::Restart)
        }
    }

    /// `restart` of every task in a restartable status.
    pub fn restart_all() -> Self {
        Self::action(SupervisorAction::Restart)
    }

    /// `abort` of a single task.
    pub fn abort(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            ..Self::action(SupervisorAction::Abort)
        }
    }

    /// `abort` of every task currently in `status`.
    pub fn abort_status(status: impl Into<String>, blocking: bool) -> Self {
        Self {
            status: Some(status.into()),
            blocking,
            ..Self::action(SupervisorAction::Abort)
        }
    }

    /// Replaces the tag.
    pub fn with_tag(mut self, tag: ActionTag) -> Self {
        self.tag = tag;
        self
    }
}

impl Tagged for Message {
    fn tag(&self) -> &ActionTag {
        &self.tag
    }

    fn set_tag(&mut self, tag: ActionTag) {
        self.tag = tag;
    }
}

/// Outcome of a successfully handled message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// New task admitted and moved to `ready`.
    Submitted {
        /// The new task.
        task_id: TaskId,
    },
    /// Task id already known; nothing changed.
    Duplicate {
        /// The existing task.
        task_id: TaskId,
    },
    /// Message skipped on purpose.
    Ignored {
        /// Why it was skipped.
        reason: String,
    },
    /// Task changed status.
    Transitioned {
        /// The task.
        task_id: TaskId,
        /// Previous status.
        from: TaskStatus,
        /// New status.
        to: TaskStatus,
    },
    /// Task already had the requested status.
    Unchanged {
        /// The task.
        task_id: TaskId,
    },
    /// Tasks sent back through `init` with their `ready` update queued.
    Restarted {
        /// Number of tasks restarted.
        count: usize,
    },
    /// Tasks moved to `abort` while handling the message.
    Aborted {
        /// Number of tasks aborted.
        count: usize,
    },
    /// Independent `abort` updates queued to the supervisor's own mailbox.
    Queued {
        /// Number of queued updates.
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_use_plain_action_names() {
        assert_eq!(
            Message::submit(json!({ "foreignId": "1" })).tag,
            ActionTag::named("submit")
        );
        assert_eq!(
            Message::transition("t", TaskStatus::Done).tag,
            ActionTag::named("update")
        );
        assert_eq!(Message::restart_all().tag, ActionTag::named("restart"));
        let abort = Message::abort_status("pending", true);
        assert_eq!(abort.tag, ActionTag::named("abort"));
        assert!(abort.blocking);
        assert_eq!(abort.status.as_deref(), Some("pending"));
    }
}
