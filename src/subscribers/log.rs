//! # LogWriter: events rendered through `tracing`.
//!
//! A subscriber that turns every [`Event`] into one `tracing` record under the
//! `taskwarden::events` target. Install any `tracing` subscriber to see them.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO taskwarden::events: submitted actor="mailer" task="00001"
//! DEBUG taskwarden::events: transitioned actor="mailer" task="00001" from=ready to=pending
//! WARN taskwarden::events: rejected actor="mailer" action="update" reason="unknown_task: ..."
//! ERROR taskwarden::events: crashed actor="mailer" action="update" reason="effect_error: ..."
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "taskwarden::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let actor = e.actor.as_deref().unwrap_or("-");
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, subscriber = task, reason, "subscriber-overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, subscriber = task, info = reason, "subscriber-panicked");
            }
            EventKind::RecoveryStarted => {
                info!(target: TARGET, actor, records = e.count.unwrap_or(0), "recovery-started");
            }
            EventKind::RecoveryCompleted => {
                info!(target: TARGET, actor, failed = e.count.unwrap_or(0), "recovery-completed");
            }
            EventKind::TaskSubmitted => {
                info!(target: TARGET, actor, task, "submitted");
            }
            EventKind::TaskIgnored => {
                debug!(target: TARGET, actor, reason, "ignored");
            }
            EventKind::TaskDuplicate => {
                debug!(target: TARGET, actor, task, "duplicate");
            }
            EventKind::TaskTransitioned => {
                debug!(
                    target: TARGET,
                    actor,
                    task,
                    from = ?e.from,
                    to = ?e.to,
                    "transitioned"
                );
            }
            EventKind::UpdateSkipped => {
                debug!(target: TARGET, actor, task, status = ?e.to, "unchanged");
            }
            EventKind::TransitionRejected => {
                warn!(
                    target: TARGET,
                    actor,
                    task,
                    action = e.action.as_deref().unwrap_or("-"),
                    reason,
                    "rejected"
                );
            }
            EventKind::EffectFailed => {
                error!(target: TARGET, actor, task, status = ?e.to, reason, "effect-failed");
            }
            EventKind::RestartQueued => {
                info!(target: TARGET, actor, count = e.count.unwrap_or(0), "restart-queued");
            }
            EventKind::AbortQueued => {
                info!(
                    target: TARGET,
                    actor,
                    status = ?e.to,
                    count = e.count.unwrap_or(0),
                    "abort-queued"
                );
            }
            EventKind::ActorCrashed => {
                error!(
                    target: TARGET,
                    actor,
                    action = e.action.as_deref().unwrap_or("-"),
                    reason,
                    "crashed"
                );
            }
            EventKind::ActorRetrying => {
                warn!(
                    target: TARGET,
                    actor,
                    attempt = e.attempt.unwrap_or(0),
                    delay_ms = e.delay_ms.unwrap_or(0),
                    reason,
                    "retrying"
                );
            }
            EventKind::ActorResumed => {
                warn!(target: TARGET, actor, reason, "resumed");
            }
            EventKind::ActorStopped => {
                info!(target: TARGET, actor, reason, "stopped");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
