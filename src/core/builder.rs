//! # Supervisor builder.
//!
//! Collects everything a [`Supervisor`] needs before it starts: one effect per
//! status, the reducer, an optional journal, subscribers and a crash hook.
//!
//! ```text
//! SupervisorBuilder::new(cfg, identity)
//!   .with_effect(status, effect)   (last one per status wins)
//!   .with_reducer(reducer)         (default: Identity)
//!   .with_journal(journal)
//!   .with_subscribers(subs)
//!   .on_crash(hook)
//!   .build() ──► ActionDirectory::build(TABLE) ──► Supervisor
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::{ActionDirectory, Message};
use crate::core::config::SupervisorConfig;
use crate::core::supervisor::{CrashHook, Supervisor, SupervisorAction};
use crate::effects::{Effect, Identity, Reducer};
use crate::error::{DirectoryError, SupervisorError};
use crate::journal::Journal;
use crate::subscribers::Subscribe;
use crate::tasks::{TaskIdentity, TaskStatus};

/// Builder for a [`Supervisor`] with optional effects, journal and subscribers.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    identity: Arc<dyn TaskIdentity>,
    effects: HashMap<TaskStatus, Arc<dyn Effect>>,
    reducer: Arc<dyn Reducer>,
    journal: Option<Arc<dyn Journal>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    crash_hook: Option<CrashHook>,
}

impl SupervisorBuilder {
    /// Creates a builder with no effects and the [`Identity`] reducer.
    pub fn new(cfg: SupervisorConfig, identity: Arc<dyn TaskIdentity>) -> Self {
        Self {
            cfg,
            identity,
            effects: HashMap::new(),
            reducer: Arc::new(Identity),
            journal: None,
            subscribers: Vec::new(),
            crash_hook: None,
        }
    }

    /// Binds `effect` to `status`, replacing any previous binding.
    ///
    /// The effect runs every time a task enters `status`, except during recovery.
    pub fn with_effect(mut self, status: TaskStatus, effect: Arc<dyn Effect>) -> Self {
        self.effects.insert(status, effect);
        self
    }

    /// Replaces the reducer run after every effect.
    pub fn with_reducer(mut self, reducer: impl Reducer) -> Self {
        self.reducer = Arc::new(reducer);
        self
    }

    /// Persists accepted updates to `journal` and replays it on start.
    pub fn with_journal(mut self, journal: Arc<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets its own bounded queue and worker task.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Installs a hook called with every fault and the message that raised it.
    pub fn on_crash<F>(mut self, f: F) -> Self
    where
        F: Fn(&SupervisorError, &Message) + Send + Sync + 'static,
    {
        self.crash_hook = Some(Arc::new(f));
        self
    }

    /// Builds the action directory and returns the configured supervisor.
    ///
    /// ### Errors
    /// Returns [`DirectoryError`] if the action table is rejected.
    pub fn build(self) -> Result<Supervisor, DirectoryError> {
        let directory = Arc::new(ActionDirectory::build(&SupervisorAction::TABLE)?);
        Ok(Supervisor {
            cfg: self.cfg,
            directory,
            identity: self.identity,
            effects: self.effects,
            reducer: self.reducer,
            journal: self.journal,
            subscribers: self.subscribers,
            crash_hook: self.crash_hook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectFn;
    use crate::effects::NextState;
    use crate::tasks::FieldIdentity;

    #[test]
    fn build_keeps_the_last_effect_per_status() {
        let noop = || {
            EffectFn::arc(|_msg, _ctx| async { Ok(NextState::Unchanged) }) as Arc<dyn Effect>
        };
        let sup = SupervisorBuilder::new(
            SupervisorConfig::default(),
            Arc::new(FieldIdentity::new("id")),
        )
        .with_effect(TaskStatus::Ready, noop())
        .with_effect(TaskStatus::Ready, noop())
        .with_effect(TaskStatus::Abort, noop())
        .build()
        .unwrap();

        assert_eq!(sup.effects.len(), 2);
        assert!(sup.journal.is_none());
        assert!(sup.directory().token_of(SupervisorAction::Update).is_some());
    }
}
