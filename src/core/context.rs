//! # Per-message context.
//!
//! A [`Context`] is built for every message the supervisor handles and passed to
//! effects. It is cheap to clone and owns everything it carries, so effects can move
//! it into spawned futures.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::core::actor::SupervisorHandle;
use crate::journal::Journal;

/// What the supervisor knows about the message being handled.
#[derive(Clone)]
pub struct Context {
    name: Arc<str>,
    me: SupervisorHandle,
    sender: Option<Arc<str>>,
    recovering: bool,
    journal: Option<Arc<dyn Journal>>,
    tag: Arc<str>,
}

impl Context {
    pub(crate) fn new(
        me: SupervisorHandle,
        sender: Option<Arc<str>>,
        recovering: bool,
        journal: Option<Arc<dyn Journal>>,
        tag: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            name: me.name_arc(),
            me,
            sender,
            recovering,
            journal,
            tag: tag.into(),
        }
    }

    /// Same context for another message handled inline.
    pub(crate) fn with_tag(&self, tag: impl Into<Arc<str>>) -> Self {
        Self {
            tag: tag.into(),
            ..self.clone()
        }
    }

    /// Supervisor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to the supervisor handling the message.
    pub fn me(&self) -> &SupervisorHandle {
        &self.me
    }

    /// Label of whoever sent the message, if given.
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// `true` while the journal is being replayed.
    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    /// Journal the supervisor persists to, if any.
    pub fn journal(&self) -> Option<&Arc<dyn Journal>> {
        self.journal.as_ref()
    }

    /// Stable string form of the message's action.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Logger scoped to this actor and message.
    pub fn debug(&self) -> DebugLog<'_> {
        DebugLog { ctx: self }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("sender", &self.sender)
            .field("recovering", &self.recovering)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// `tracing` facade carrying `actor` and `msg` fields.
pub struct DebugLog<'a> {
    ctx: &'a Context,
}

impl DebugLog<'_> {
    /// Logs at info level.
    pub fn info(&self, text: impl fmt::Display) {
        info!(actor = %self.ctx.name, msg = %self.ctx.tag, "{text}");
    }

    /// Logs at warn level.
    pub fn warn(&self, text: impl fmt::Display) {
        warn!(actor = %self.ctx.name, msg = %self.ctx.tag, "{text}");
    }

    /// Logs at error level.
    pub fn error(&self, text: impl fmt::Display) {
        error!(actor = %self.ctx.name, msg = %self.ctx.tag, "{text}");
    }
}
