//! Runtime core: the supervisor actor and everything it owns.
//!
//! The public surface is [`Supervisor`] (configure and start), [`SupervisorHandle`]
//! (talk to a running supervisor) and the types effects receive: [`Context`] and
//! [`RegistryView`].
//!
//! Internal modules:
//! - `actor`: mailbox loop, supervision policy, journal replay, subscriber listener;
//! - `handlers`: submit / update / restart / abort and the effect pipeline;
//! - `registry`: primary task store plus status index;
//! - `context`: per-message context handed to effects;
//! - `supervisor` / `builder`: wiring and startup.

mod actor;
mod builder;
mod config;
mod context;
mod handlers;
mod registry;
mod supervisor;

pub use actor::{ActorExit, SupervisorHandle};
pub use builder::SupervisorBuilder;
pub use config::{DEFAULT_RESTART_ON, FATAL_HANG_TIME, SupervisorConfig};
pub use context::{Context, DebugLog};
pub use registry::{RegistrySnapshot, RegistryView, TaskRegistry};
pub use supervisor::{CrashHook, Supervisor, SupervisorAction};
