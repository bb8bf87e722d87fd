//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`], the settings a [`Supervisor`](crate::Supervisor)
//! is built from.
//!
//! ## Sentinel values
//! - `restart_on` empty → bulk `restart` restarts nothing
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::borrow::Cow;
use std::time::Duration;

use crate::policies::{SupervisionPolicy, TransitionPolicy};
use crate::tasks::TaskStatus;

/// Timeout applied by [`SupervisorHandle::block`](crate::SupervisorHandle::block).
///
/// A blocking call that exceeds it is reported as an application hang.
pub const FATAL_HANG_TIME: Duration = Duration::from_secs(1000);

/// Statuses a bulk `restart` sweeps by default.
pub const DEFAULT_RESTART_ON: [TaskStatus; 3] =
    [TaskStatus::Init, TaskStatus::Ready, TaskStatus::Pending];

/// Configuration for one supervisor.
///
/// ## Field semantics
/// - `name`: actor name used in events, logs and the [`Context`](crate::Context)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `restart_on`: statuses swept by a bulk `restart`, in order
/// - `transitions`: which status changes `update` accepts
/// - `supervision`: what happens after a fault
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Actor name.
    pub name: Cow<'static, str>,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Statuses whose tasks a bulk `restart` sends back through `init`.
    ///
    /// Tasks that are `done`, `failed`, `invalid` or `abort` are left alone by default.
    pub restart_on: Vec<TaskStatus>,

    /// Transition policy for `update`.
    pub transitions: TransitionPolicy,

    /// Supervision policy for faults.
    pub supervision: SupervisionPolicy,
}

impl SupervisorConfig {
    /// Default configuration with the given actor name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the bulk-restart statuses with duplicates removed, keeping order.
    pub fn restart_statuses(&self) -> Vec<TaskStatus> {
        let mut out = Vec::with_capacity(self.restart_on.len());
        for s in &self.restart_on {
            if !out.contains(s) {
                out.push(*s);
            }
        }
        out
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `name = "task-supervisor"`
    /// - `bus_capacity = 1024`
    /// - `restart_on = [init, ready, pending]`
    /// - `transitions = Permissive`
    /// - `supervision = Stop`
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("task-supervisor"),
            bus_capacity: 1024,
            restart_on: DEFAULT_RESTART_ON.to_vec(),
            transitions: TransitionPolicy::default(),
            supervision: SupervisionPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_statuses_are_deduplicated_in_order() {
        let cfg = SupervisorConfig {
            restart_on: vec![TaskStatus::Pending, TaskStatus::Init, TaskStatus::Pending],
            ..SupervisorConfig::named("s")
        };
        assert_eq!(
            cfg.restart_statuses(),
            vec![TaskStatus::Pending, TaskStatus::Init]
        );
        assert_eq!(SupervisorConfig::default().name, "task-supervisor");
    }
}
