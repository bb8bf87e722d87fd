//! # Supervision policy: what happens after a fault.
//!
//! A fault is a [`SupervisorError`](crate::SupervisorError) for which
//! [`is_fault`](crate::SupervisorError::is_fault) holds: an effect/reducer error or a
//! journal failure. Validation errors never reach the policy.
//!
//! ```text
//! handler ─► Err(fault) ─► crash hook ─► ActorCrashed
//!                                            │
//!            ┌───────────────────────────────┼──────────────────────────────┐
//!            ▼                               ▼                              ▼
//!          Stop                           Resume                 Retry { max_retries, backoff }
//!   reply Err, close mailbox,      reply Err, next message      sleep backoff.next(n), re-handle
//!   ActorStopped                   ActorResumed                 the same message; when retries
//!                                                               run out, behave like Stop
//! ```

use std::time::Duration;

use crate::policies::backoff::BackoffPolicy;

/// Decision applied when a message handler raises a fault.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SupervisionPolicy {
    /// Stop the actor (default).
    #[default]
    Stop,
    /// Drop the message and keep processing the mailbox.
    Resume,
    /// Re-handle the same message after a delay.
    Retry {
        /// Retries allowed for one message; `None` retries forever.
        max_retries: Option<u32>,
        /// Delay between retries.
        backoff: BackoffPolicy,
    },
}

impl SupervisionPolicy {
    /// Returns the delay before retry number `retries` (0-indexed), or `None` if
    /// the message must not be retried.
    pub fn retry_delay(&self, retries: u32) -> Option<Duration> {
        match self {
            SupervisionPolicy::Retry {
                max_retries,
                backoff,
            } if max_retries.is_none_or(|max| retries < max) => Some(backoff.next(retries)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retry_produces_delays() {
        assert_eq!(SupervisionPolicy::Stop.retry_delay(0), None);
        assert_eq!(SupervisionPolicy::Resume.retry_delay(0), None);

        let retry = SupervisionPolicy::Retry {
            max_retries: Some(2),
            backoff: BackoffPolicy::constant(Duration::from_millis(5)),
        };
        assert_eq!(retry.retry_delay(0), Some(Duration::from_millis(5)));
        assert_eq!(retry.retry_delay(1), Some(Duration::from_millis(5)));
        assert_eq!(retry.retry_delay(2), None);
    }

    #[test]
    fn unbounded_retry_never_gives_up() {
        let retry = SupervisionPolicy::Retry {
            max_retries: None,
            backoff: BackoffPolicy::default(),
        };
        assert!(retry.retry_delay(10_000).is_some());
    }
}
