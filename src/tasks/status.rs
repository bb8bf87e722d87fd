//! # Task status vocabulary.
//!
//! [`TaskStatus`] is the closed set of seven statuses a task moves through:
//!
//! ```text
//! init ─► ready ─► pending ─► done
//!                     ├─────► failed
//!                     └─────► invalid
//! (any) ─────────────────────► abort
//! ```
//!
//! The diagram shows the usual flow only. Under the default
//! [`TransitionPolicy::Permissive`](crate::TransitionPolicy) any status may follow any
//! other through `update`.
//!
//! ## Codec
//! - [`TaskStatus::encode`] yields the stable lowercase name used on the wire.
//! - [`TaskStatus::decode`] accepts exactly those names and fails with
//!   [`SupervisorError::UnknownStatus`] otherwise.
//! - [`TaskStatus::parse`] is the lenient form (trimmed, case-insensitive) and never fails.
//!
//! serde goes through `encode`/`decode`, so persisted records carry plain names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SupervisorError;

/// One of the seven task statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskStatus {
    /// Created by `submit`, not yet scheduled.
    Init,
    /// Scheduled; the `ready` effect usually starts a worker.
    Ready,
    /// A worker is executing the task.
    Pending,
    /// The task turned out to be unprocessable.
    Invalid,
    /// The last attempt failed.
    Failed,
    /// The task was aborted.
    Abort,
    /// The task completed.
    Done,
}

impl TaskStatus {
    /// All statuses in declaration order.
    pub const ALL: [TaskStatus; 7] = [
        TaskStatus::Init,
        TaskStatus::Ready,
        TaskStatus::Pending,
        TaskStatus::Invalid,
        TaskStatus::Failed,
        TaskStatus::Abort,
        TaskStatus::Done,
    ];

    /// Returns the stable string encoding.
    pub const fn encode(self) -> &'static str {
        match self {
            TaskStatus::Init => "init",
            TaskStatus::Ready => "ready",
            TaskStatus::Pending => "pending",
            TaskStatus::Invalid => "invalid",
            TaskStatus::Failed => "failed",
            TaskStatus::Abort => "abort",
            TaskStatus::Done => "done",
        }
    }

    /// Decodes a stable string encoding.
    ///
    /// # Example
    /// ```
    /// use taskwarden::TaskStatus;
    ///
    /// assert_eq!(TaskStatus::decode("pending").unwrap(), TaskStatus::Pending);
    /// assert!(TaskStatus::decode("Pending").is_err());
    /// ```
    pub fn decode(value: &str) -> Result<Self, SupervisorError> {
        Self::ALL
            .into_iter()
            .find(|s| s.encode() == value)
            .ok_or_else(|| SupervisorError::UnknownStatus {
                value: value.to_string(),
            })
    }

    /// Parses a status name leniently; returns `None` if unrecognized.
    ///
    /// # Example
    /// ```
    /// use taskwarden::TaskStatus;
    ///
    /// assert_eq!(TaskStatus::parse(" Abort "), Some(TaskStatus::Abort));
    /// assert_eq!(TaskStatus::parse("paused"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.encode().eq_ignore_ascii_case(value))
    }

    /// Returns `true` for `done` and `abort`.
    ///
    /// Only [`TransitionPolicy::Strict`](crate::TransitionPolicy) treats these as absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Abort)
    }
}

/// Returns `true` iff `value` is one of the seven canonical encodings.
pub fn is_status(value: &str) -> bool {
    TaskStatus::decode(value).is_ok()
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.encode())
    }
}

impl FromStr for TaskStatus {
    type Err = SupervisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::decode(s)
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.encode())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TaskStatus::decode(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_inverts_encode() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::decode(status.encode()).unwrap(), status);
        }
    }

    #[test]
    fn vocabulary_is_closed() {
        assert!(is_status("done"));
        assert!(!is_status("paused"));
        assert!(!is_status(""));
        assert_eq!(
            TaskStatus::decode("paused"),
            Err(SupervisorError::UnknownStatus {
                value: "paused".into()
            })
        );
    }

    #[test]
    fn parse_is_lenient_decode_is_not() {
        assert_eq!(TaskStatus::parse("READY"), Some(TaskStatus::Ready));
        assert!(TaskStatus::decode("READY").is_err());
        assert_eq!(TaskStatus::parse("nope"), None);
    }

    #[test]
    fn serde_uses_stable_names() {
        let json = serde_json::to_string(&TaskStatus::Abort).unwrap();
        assert_eq!(json, "\"abort\"");
        let back: TaskStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TaskStatus::Abort);
        assert!(serde_json::from_str::<TaskStatus>("\"Symbol(abort)\"").is_err());
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = TaskStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![TaskStatus::Abort, TaskStatus::Done]);
    }
}
