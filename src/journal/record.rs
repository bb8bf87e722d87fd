//! # Persisted message record.
//!
//! Wire form of a [`Message`]: the action tag is a string (`"update"`, `"@update"`),
//! statuses are their encoded names and field names are camelCase.
//!
//! ```json
//! { "type": "@update", "task": { "taskId": "00001", "status": "ready" } }
//! ```
//!
//! A `rollback` record follows a persisted message whose effect or reducer failed.
//! It carries the task as it was before that message (or nothing, if the message
//! was the `submit` that admitted it), and replay restores exactly that:
//!
//! ```json
//! { "type": "rollback", "taskId": "00001", "restore": { "taskId": "00001", "status": "ready", ... } }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

use crate::action::{ActionDirectory, ActionTag, Message};
use crate::tasks::{Task, TaskId, TaskPatch};

/// Serializable form of a [`Message`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedMessage {
    /// Action name or stable token string.
    #[serde(rename = "type")]
    pub kind: String,
    /// Descriptor or patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskPatch>,
    /// Target task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Target status name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Sequential bulk processing.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub blocking: bool,
    /// Record restored by a `rollback`; `None` removes the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore: Option<Task>,
}

impl PersistedMessage {
    /// `type` of a rollback record.
    pub const ROLLBACK: &'static str = "rollback";

    /// Record undoing the last persisted message for `task_id`.
    pub fn rollback(task_id: TaskId, restore: Option<Task>) -> Self {
        Self {
            kind: Self::ROLLBACK.to_string(),
            task: None,
            task_id: Some(task_id),
            status: None,
            blocking: false,
            restore,
        }
    }

    /// Returns `true` for records built by [`rollback`](Self::rollback).
    pub fn is_rollback(&self) -> bool {
        self.kind == Self::ROLLBACK
    }

    /// Encodes `msg`, turning a token tag of `dir` into its stable string.
    pub fn encode<A>(dir: &ActionDirectory<A>, msg: &Message) -> Self
    where
        A: Copy + Eq + Hash + Debug,
    {
        let msg = dir.encode_message(msg.clone());
        Self {
            kind: msg.tag.to_string(),
            task: msg.task,
            task_id: msg.task_id,
            status: msg.status,
            blocking: msg.blocking,
            restore: None,
        }
    }

    /// Decodes into a [`Message`], turning a stable token string of `dir` back into
    /// its token.
    pub fn decode<A>(self, dir: &ActionDirectory<A>) -> Message
    where
        A: Copy + Eq + Hash + Debug,
    {
        let msg = Message {
            tag: ActionTag::named(self.kind),
            task: self.task,
            task_id: self.task_id,
            status: self.status,
            blocking: self.blocking,
        };
        dir.decode_message(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SupervisorAction;
    use crate::tasks::TaskStatus;
    use serde_json::json;

    fn dir() -> ActionDirectory<SupervisorAction> {
        ActionDirectory::build(&SupervisorAction::TABLE).unwrap()
    }

    #[test]
    fn token_tags_persist_as_stable_strings() {
        let d = dir();
        let tag = d.tag_of(SupervisorAction::Update).unwrap();
        let msg = Message::transition("00001", TaskStatus::Ready).with_tag(tag);

        let record = PersistedMessage::encode(&d, &msg);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "type": "@update", "task": { "taskId": "00001", "status": "ready" } })
        );

        let fresh = dir();
        let back = record.decode(&fresh);
        assert_eq!(
            back.tag,
            ActionTag::Token(fresh.token_of(SupervisorAction::Update).unwrap())
        );
        assert_eq!(fresh.resolve(&back.tag), Some(SupervisorAction::Update));
    }

    #[test]
    fn plain_names_pass_through() {
        let d = dir();
        let record = PersistedMessage::encode(&d, &Message::abort_status("pending", true));
        assert_eq!(record.kind, "abort");
        assert!(record.blocking);
        let back = record.decode(&d);
        assert_eq!(back.tag, ActionTag::named("abort"));
        assert_eq!(back.status.as_deref(), Some("pending"));
    }

    #[test]
    fn rollback_records_carry_the_prior_task() {
        let prior = Task::new("00001".into(), json!({ "foreignId": "00001" }));
        let record = PersistedMessage::rollback("00001".into(), Some(prior.clone()));
        let line = serde_json::to_string(&record).unwrap();
        let back: PersistedMessage = serde_json::from_str(&line).unwrap();
        assert!(back.is_rollback());
        assert_eq!(back.restore, Some(prior));

        let removal = PersistedMessage::rollback("00002".into(), None);
        assert_eq!(
            serde_json::to_value(&removal).unwrap(),
            json!({ "type": "rollback", "taskId": "00002" })
        );
    }

    #[test]
    fn missing_optional_fields_deserialize() {
        let record: PersistedMessage =
            serde_json::from_value(json!({ "type": "restart" })).unwrap();
        assert_eq!(record.kind, "restart");
        assert!(!record.blocking);
        assert!(record.task.is_none());
    }
}
