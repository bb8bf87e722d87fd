//! # Transition policy.
//!
//! By default any status may follow any other; the registry only checks that the
//! target is a known status. [`TransitionPolicy::Strict`] makes `done` and `abort`
//! absorbing: once a task reaches one of them, only a same-status update (a no-op)
//! is accepted. Restarting such a task is rejected as well, since it goes through
//! `init`.

use crate::tasks::TaskStatus;

/// Which status changes `update` accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status to any status (default).
    #[default]
    Permissive,
    /// Terminal statuses are absorbing.
    Strict,
}

impl TransitionPolicy {
    /// Returns `true` if `from → to` is accepted.
    pub fn allows(self, from: TaskStatus, to: TaskStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => from == to || !from.is_terminal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_only_blocks_leaving_terminal_statuses() {
        let strict = TransitionPolicy::Strict;
        assert!(!strict.allows(TaskStatus::Done, TaskStatus::Ready));
        assert!(!strict.allows(TaskStatus::Abort, TaskStatus::Init));
        assert!(strict.allows(TaskStatus::Done, TaskStatus::Done));
        assert!(strict.allows(TaskStatus::Failed, TaskStatus::Init));
        assert!(TransitionPolicy::Permissive.allows(TaskStatus::Done, TaskStatus::Ready));
    }
}
