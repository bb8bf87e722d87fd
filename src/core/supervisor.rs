//! # Supervisor: wiring and startup.
//!
//! A [`Supervisor`] is a fully configured, not yet running task supervisor. It owns
//! the action directory, the effects bound per status, the reducer, the optional
//! journal and the subscribers. [`Supervisor::start`] moves all of it into a tokio
//! task and returns the [`SupervisorHandle`] used to talk to it.
//!
//! ```text
//! Supervisor::builder(cfg, identity)
//!     .with_effect(status, effect) ...
//!     .with_journal(journal)
//!     .with_subscribers(subs)
//!     .build()?                           ─► Supervisor
//!
//! start():
//!   Bus::new(cfg.bus_capacity)
//!   mailbox()                             ─► SupervisorHandle
//!   bus.subscribe() ─► subscriber_listener ─► SubscriberSet (only if subscribers)
//!   tokio::spawn(Actor::run)              ─► JoinHandle<ActorExit>
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use serde_json::json;
//! use taskwarden::{
//!     EffectFn, FieldIdentity, Message, NextState, Reply, Supervisor, SupervisorConfig,
//!     TaskStatus,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ready = EffectFn::arc(|msg, ctx| async move {
//!         ctx.debug().info(format_args!("{} is ready", msg.task.task_id));
//!         Ok(NextState::Unchanged)
//!     });
//!
//!     let sup = Supervisor::builder(SupervisorConfig::named("jobs"), FieldIdentity::new("jobId"))
//!         .with_effect(TaskStatus::Ready, ready)
//!         .build()?;
//!     let (handle, exit) = sup.start();
//!
//!     let reply = handle
//!         .query(Message::submit(json!({ "jobId": "j-1" })), Duration::from_secs(1))
//!         .await?;
//!     assert_eq!(reply, Reply::Submitted { task_id: "j-1".into() });
//!
//!     handle.shutdown();
//!     exit.await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::action::{ActionDirectory, Message};
use crate::core::actor::{self, Actor, ActorExit, SupervisorHandle};
use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::core::handlers::SupervisorCore;
use crate::core::registry::TaskRegistry;
use crate::effects::{Effect, Reducer};
use crate::error::SupervisorError;
use crate::events::Bus;
use crate::journal::Journal;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{TaskIdentity, TaskStatus};

/// The four supervisor actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SupervisorAction {
    /// Admit a new task.
    Submit,
    /// Patch an existing task.
    Update,
    /// Send tasks back through `init`.
    Restart,
    /// Move tasks to `abort`.
    Abort,
}

impl SupervisorAction {
    /// Action table every supervisor directory is built from.
    pub const TABLE: [(&'static str, SupervisorAction); 4] = [
        ("submit", SupervisorAction::Submit),
        ("update", SupervisorAction::Update),
        ("restart", SupervisorAction::Restart),
        ("abort", SupervisorAction::Abort),
    ];

    /// Public action name.
    pub const fn name(self) -> &'static str {
        match self {
            SupervisorAction::Submit => "submit",
            SupervisorAction::Update => "update",
            SupervisorAction::Restart => "restart",
            SupervisorAction::Abort => "abort",
        }
    }
}

/// Called with every fault before the supervision policy runs.
pub type CrashHook = Arc<dyn Fn(&SupervisorError, &Message) + Send + Sync>;

/// A configured supervisor, ready to [`start`](Supervisor::start).
pub struct Supervisor {
    pub(crate) cfg: SupervisorConfig,
    pub(crate) directory: Arc<ActionDirectory<SupervisorAction>>,
    pub(crate) identity: Arc<dyn TaskIdentity>,
    pub(crate) effects: HashMap<TaskStatus, Arc<dyn Effect>>,
    pub(crate) reducer: Arc<dyn Reducer>,
    pub(crate) journal: Option<Arc<dyn Journal>>,
    pub(crate) subscribers: Vec<Arc<dyn Subscribe>>,
    pub(crate) crash_hook: Option<CrashHook>,
}

impl Supervisor {
    /// Starts configuring a supervisor that derives task ids with `identity`.
    pub fn builder(cfg: SupervisorConfig, identity: impl TaskIdentity) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, Arc::new(identity))
    }

    /// Directory the supervisor resolves action tags with.
    pub fn directory(&self) -> &Arc<ActionDirectory<SupervisorAction>> {
        &self.directory
    }

    /// Configuration the supervisor runs with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Spawns the actor task.
    ///
    /// The journal is replayed before the first mailbox message is handled, so
    /// messages dispatched right after `start` observe the recovered registry.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(self) -> (SupervisorHandle, JoinHandle<ActorExit>) {
        let name: Arc<str> = Arc::from(self.cfg.name.as_ref());
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let (handle, rx) = actor::mailbox(Arc::clone(&name), bus.clone());
        let token = Actor::token_of(&handle);

        let listener = (!self.subscribers.is_empty()).then(|| {
            let events = bus.subscribe();
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            tokio::spawn(actor::subscriber_listener(events, set, token.clone()))
        });

        let core = SupervisorCore {
            name,
            cfg: self.cfg,
            directory: self.directory,
            registry: TaskRegistry::new(),
            identity: self.identity,
            effects: self.effects,
            reducer: self.reducer,
            journal: self.journal,
            bus,
            recovering: false,
            outbox: Vec::new(),
        };
        let actor = Actor {
            core,
            rx,
            me: handle.downgrade(),
            token,
            crash_hook: self.crash_hook,
            listener,
        };
        (handle, tokio::spawn(actor.run()))
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut effects: Vec<_> = self.effects.keys().copied().collect();
        effects.sort();
        f.debug_struct("Supervisor")
            .field("name", &self.cfg.name)
            .field("effects", &effects)
            .field("journal", &self.journal.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_match_action_names() {
        for (name, action) in SupervisorAction::TABLE {
            assert_eq!(name, action.name());
        }
        assert!(ActionDirectory::build(&SupervisorAction::TABLE).is_ok());
    }
}
