//! Supervision, retry and transition policies.
//!
//! This module groups the knobs that control **what** a supervisor does after a
//! fault, **how long** it waits before retrying, and **which** status changes it
//! accepts.
//!
//! ## Contents
//! - [`SupervisionPolicy`] stop / resume / retry after a fault
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization of retry delays
//! - [`TransitionPolicy`] permissive or strict (absorbing terminal statuses)
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { supervision: SupervisionPolicy, transitions: TransitionPolicy, .. }
//!      └─► actor loop uses:
//!           - supervision.retry_delay(n) after a fault
//!           - transitions.allows(from, to) before every update
//! ```
//!
//! ## Defaults
//! - `SupervisionPolicy::Stop`
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=10s, jitter=None.
//! - `TransitionPolicy::Permissive`

mod backoff;
mod jitter;
mod supervision;
mod transition;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use supervision::SupervisionPolicy;
pub use transition::TransitionPolicy;
