//! # Lifecycle events emitted by a supervisor.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Subscriber events**: fan-out health (panic, overflow)
//! - **Recovery events**: journal replay on start
//! - **Task events**: admission, transitions, rejections, queued bulk work
//! - **Actor events**: faults and the supervision decision taken for them
//!
//! The [`Event`] struct carries additional metadata such as the actor name,
//! task id, the transition endpoints, reasons and retry delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use taskwarden::{Event, EventKind, TaskStatus};
//!
//! let ev = Event::new(EventKind::TaskTransitioned)
//!     .with_actor("mailer")
//!     .with_task("t-1")
//!     .with_transition(TaskStatus::Ready, TaskStatus::Pending);
//!
//! assert_eq!(ev.kind, EventKind::TaskTransitioned);
//! assert_eq!(ev.task.as_deref(), Some("t-1"));
//! assert_eq!(ev.to, Some(TaskStatus::Pending));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::tasks::TaskStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Recovery events ===
    /// Journal replay is starting.
    ///
    /// Sets:
    /// - `actor`: supervisor name
    /// - `count`: number of records to replay
    RecoveryStarted,

    /// Journal replay finished; the mailbox opens next.
    ///
    /// Sets:
    /// - `actor`: supervisor name
    /// - `count`: number of records that failed to replay
    RecoveryCompleted,

    // === Task events ===
    /// A new task was admitted.
    ///
    /// Sets:
    /// - `actor`, `task`
    TaskSubmitted,

    /// A submitted descriptor was skipped by the ignore hook.
    ///
    /// Sets:
    /// - `actor`, `reason`
    TaskIgnored,

    /// A submitted descriptor's id is already tracked.
    ///
    /// Sets:
    /// - `actor`, `task`
    TaskDuplicate,

    /// A task changed status and the pipeline committed.
    ///
    /// Sets:
    /// - `actor`, `task`, `from`, `to`
    TaskTransitioned,

    /// An update requested the status the task already had.
    ///
    /// Sets:
    /// - `actor`, `task`, `to`
    UpdateSkipped,

    /// A message failed validation; nothing changed.
    ///
    /// Sets:
    /// - `actor`, `action`, `reason` (error label and message)
    /// - `task`: when the error is tied to a task
    TransitionRejected,

    /// The effect or reducer of a transition failed; the transition was rolled back.
    ///
    /// Sets:
    /// - `actor`, `task`, `to`, `reason`
    EffectFailed,

    /// A bulk or single restart queued `ready` updates.
    ///
    /// Sets:
    /// - `actor`, `count`
    RestartQueued,

    /// A non-blocking bulk abort queued `abort` updates.
    ///
    /// Sets:
    /// - `actor`, `to`, `count`
    AbortQueued,

    // === Actor events ===
    /// A message handler raised a fault.
    ///
    /// Sets:
    /// - `actor`, `action`, `reason`
    /// - `task`: when the fault is tied to a task
    ActorCrashed,

    /// The supervision policy re-handles the failed message.
    ///
    /// Sets:
    /// - `actor`, `attempt`, `delay_ms`, `reason`
    ActorRetrying,

    /// The supervision policy dropped the failed message and kept the actor alive.
    ///
    /// Sets:
    /// - `actor`, `reason`
    ActorResumed,

    /// The actor stopped (fault, shutdown or all handles dropped).
    ///
    /// Sets:
    /// - `actor`, `reason`
    ActorStopped,
}

/// Supervisor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the emitting supervisor.
    pub actor: Option<Arc<str>>,
    /// Task id or subscriber name, if applicable.
    pub task: Option<Arc<str>>,
    /// Status left by a transition.
    pub from: Option<TaskStatus>,
    /// Status entered (or requested) by a transition.
    pub to: Option<TaskStatus>,
    /// Action name of the message being handled.
    pub action: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Number of tasks or records affected.
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            actor: None,
            task: None,
            from: None,
            to: None,
            action: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            count: None,
        }
    }

    /// Attaches the supervisor name.
    #[inline]
    pub fn with_actor(mut self, actor: impl Into<Arc<str>>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Attaches a task id (or subscriber name).
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches both ends of a transition.
    #[inline]
    pub fn with_transition(mut self, from: TaskStatus, to: TaskStatus) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Attaches the requested status only.
    #[inline]
    pub fn with_status(mut self, to: TaskStatus) -> Self {
        self.to = Some(to);
        self
    }

    /// Attaches the action name.
    #[inline]
    pub fn with_action(mut self, action: impl Into<Arc<str>>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Returns `true` for subscriber fan-out events.
    ///
    /// The subscriber listener does not forward these back to subscribers.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::TaskSubmitted);
        let b = Event::new(EventKind::TaskSubmitted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::ActorRetrying).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
