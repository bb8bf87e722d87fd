//! # Action directory: names, tokens and handlers.
//!
//! An [`ActionDirectory`] is built once per supervisor from a static table of
//! `name → handler` entries. Each handler gets exactly one [`ActionToken`]:
//!
//! ```text
//! build([("submit", Submit), ("update", Update), ...])
//!    ├─► validate: names unique, non-empty, no '@' prefix; handlers unique
//!    ├─► directory id = DIRECTORY_SEQ.fetch_add(1)
//!    └─► slot i ─► ActionToken { directory, slot: i }
//!
//! token_of(Update)      ─► ActionToken
//! handler_of(token)     ─► Update
//! encode_tag(Token(t))  ─► Named("@update")      (stable across restarts)
//! decode_tag("@update") ─► Token(t)              (only for this directory's names)
//! decode_tag("update")  ─► Named("update")       (passed through)
//! ```
//!
//! ## Rules
//! - Tokens are unique per directory instance and live as long as the process.
//!   They are **not** serializable; anything crossing a persistence boundary goes
//!   through [`encode_message`](ActionDirectory::encode_message) /
//!   [`decode_message`](ActionDirectory::decode_message).
//! - Decoding is lenient: a string that is not a stable token of this directory is
//!   left untouched.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use crate::error::DirectoryError;

/// Prefix that marks the stable string form of a token.
pub const TOKEN_SIGIL: char = '@';

/// Global sequence for directory instances.
static DIRECTORY_SEQ: AtomicU32 = AtomicU32::new(0);

/// Process-local opaque action identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionToken {
    directory: u32,
    slot: u32,
}

impl fmt::Debug for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionToken({}:{})", self.directory, self.slot)
    }
}

/// Action identity carried by a message: a plain name or a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionTag {
    /// Human-readable name or stable token string.
    Named(Cow<'static, str>),
    /// Opaque token of some directory.
    Token(ActionToken),
}

impl ActionTag {
    /// Tag for a plain action name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        ActionTag::Named(name.into())
    }

    /// Returns the name if this is a [`ActionTag::Named`] tag.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            ActionTag::Named(name) => Some(name),
            ActionTag::Token(_) => None,
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTag::Named(name) => f.write_str(name),
            ActionTag::Token(t) => write!(f, "{t:?}"),
        }
    }
}

/// Anything carrying an [`ActionTag`] that must cross a persistence boundary.
pub trait Tagged {
    /// Current tag.
    fn tag(&self) -> &ActionTag;
    /// Replaces the tag.
    fn set_tag(&mut self, tag: ActionTag);
}

struct Entry<A> {
    name: &'static str,
    handler: A,
}

/// Bidirectional mapping between action names, tokens and handlers.
///
/// `A` is the handler key, typically a small `Copy` enum of the actor's actions.
pub struct ActionDirectory<A> {
    id: u32,
    entries: Vec<Entry<A>>,
    by_name: HashMap<&'static str, u32>,
    by_handler: HashMap<A, u32>,
}

impl<A> ActionDirectory<A>
where
    A: Copy + Eq + Hash + fmt::Debug,
{
    /// Builds a directory, assigning one token per entry.
    ///
    /// ### Errors
    /// - [`DirectoryError::InvalidName`] for empty names or names starting with [`TOKEN_SIGIL`]
    /// - [`DirectoryError::DuplicateName`] if a name repeats
    /// - [`DirectoryError::DuplicateHandler`] if a handler is listed twice
    pub fn build(table: &[(&'static str, A)]) -> Result<Self, DirectoryError> {
        let mut by_name = HashMap::with_capacity(table.len());
        let mut by_handler = HashMap::with_capacity(table.len());
        let mut entries = Vec::with_capacity(table.len());

        for (slot, (name, handler)) in table.iter().enumerate() {
            if name.is_empty() || name.starts_with(TOKEN_SIGIL) {
                return Err(DirectoryError::InvalidName(name.to_string()));
            }
            let slot = slot as u32;
            if by_name.insert(*name, slot).is_some() {
                return Err(DirectoryError::DuplicateName(name.to_string()));
            }
            if let Some(prev) = by_handler.insert(*handler, slot) {
                return Err(DirectoryError::DuplicateHandler(
                    name.to_string(),
                    table[prev as usize].0.to_string(),
                ));
            }
            entries.push(Entry {
                name: *name,
                handler: *handler,
            });
        }

        Ok(Self {
            id: DIRECTORY_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            entries,
            by_name,
            by_handler,
        })
    }

    /// Returns the token assigned to `handler`.
    pub fn token_of(&self, handler: A) -> Option<ActionToken> {
        self.by_handler.get(&handler).map(|&slot| self.token(slot))
    }

    /// Returns the handler addressed by `token`, if it belongs to this directory.
    pub fn handler_of(&self, token: ActionToken) -> Option<A> {
        if token.directory != self.id {
            return None;
        }
        self.entries.get(token.slot as usize).map(|e| e.handler)
    }

    /// Returns the name registered for `handler`.
    pub fn name_of(&self, handler: A) -> Option<&'static str> {
        self.by_handler
            .get(&handler)
            .map(|&slot| self.entries[slot as usize].name)
    }

    /// Resolves a tag to a handler: names by lookup, tokens by slot.
    ///
    /// Stable token strings are resolved as well, so a record that skipped
    /// [`decode_message`](Self::decode_message) still dispatches correctly.
    pub fn resolve(&self, tag: &ActionTag) -> Option<A> {
        match tag {
            ActionTag::Token(t) => self.handler_of(*t),
            ActionTag::Named(name) => {
                let name: &str = name;
                let name = name.strip_prefix(TOKEN_SIGIL).unwrap_or(name);
                self.by_name
                    .get(name)
                    .map(|&slot| self.entries[slot as usize].handler)
            }
        }
    }

    /// Returns the tag for `handler`'s token.
    pub fn tag_of(&self, handler: A) -> Option<ActionTag> {
        self.token_of(handler).map(ActionTag::Token)
    }

    /// Converts a tag to its stable string form.
    ///
    /// Tokens of this directory become `@<name>`; foreign tokens keep their debug form
    /// (which no directory decodes); names pass through.
    pub fn encode_tag(&self, tag: &ActionTag) -> String {
        match tag {
            ActionTag::Named(name) => name.to_string(),
            ActionTag::Token(t) => match self.handler_of(*t) {
                Some(_) => format!("{TOKEN_SIGIL}{}", self.entries[t.slot as usize].name),
                None => format!("{t:?}"),
            },
        }
    }

    /// Converts a string back to a tag; never fails.
    pub fn decode_tag(&self, raw: &str) -> ActionTag {
        if let Some(name) = raw.strip_prefix(TOKEN_SIGIL) {
            if let Some(&slot) = self.by_name.get(name) {
                return ActionTag::Token(self.token(slot));
            }
        }
        ActionTag::Named(Cow::Owned(raw.to_string()))
    }

    /// Replaces a token tag with its stable string form.
    pub fn encode_message<M: Tagged>(&self, mut msg: M) -> M {
        if let ActionTag::Token(_) = msg.tag() {
            let encoded = self.encode_tag(msg.tag());
            msg.set_tag(ActionTag::Named(Cow::Owned(encoded)));
        }
        msg
    }

    /// Replaces a stable token string with the corresponding token.
    pub fn decode_message<M: Tagged>(&self, mut msg: M) -> M {
        let decoded = match msg.tag() {
            ActionTag::Named(name) if name.starts_with(TOKEN_SIGIL) => self.decode_tag(name),
            _ => return msg,
        };
        msg.set_tag(decoded);
        msg
    }

    /// Iterates `(name, token)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ActionToken)> + '_ {
        (0..self.entries.len() as u32)
            .map(|slot| (self.entries[slot as usize].name, self.token(slot)))
    }

    fn token(&self, slot: u32) -> ActionToken {
        ActionToken {
            directory: self.id,
            slot,
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for ActionDirectory<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (e.name, &e.handler)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Op {
        Ping,
        Pong,
    }

    #[derive(Debug, PartialEq)]
    struct Msg {
        tag: ActionTag,
    }

    impl Tagged for Msg {
        fn tag(&self) -> &ActionTag {
            &self.tag
        }
        fn set_tag(&mut self, tag: ActionTag) {
            self.tag = tag;
        }
    }

    fn dir() -> ActionDirectory<Op> {
        ActionDirectory::build(&[("ping", Op::Ping), ("pong", Op::Pong)]).unwrap()
    }

    #[test]
    fn every_handler_gets_one_unique_token() {
        let d = dir();
        let ping = d.token_of(Op::Ping).unwrap();
        let pong = d.token_of(Op::Pong).unwrap();
        assert_ne!(ping, pong);
        assert_eq!(d.handler_of(ping), Some(Op::Ping));
        assert_eq!(d.handler_of(pong), Some(Op::Pong));
        assert_eq!(d.token_of(Op::Ping), Some(ping));
    }

    #[test]
    fn tokens_do_not_cross_directories() {
        let a = dir();
        let b = dir();
        let token = a.token_of(Op::Ping).unwrap();
        assert_ne!(Some(token), b.token_of(Op::Ping));
        assert_eq!(b.handler_of(token), None);
        assert_eq!(b.resolve(&ActionTag::Token(token)), None);
    }

    #[test]
    fn encode_then_decode_restores_the_token() {
        let d = dir();
        let token = d.token_of(Op::Pong).unwrap();
        let encoded = d.encode_message(Msg {
            tag: ActionTag::Token(token),
        });
        assert_eq!(encoded.tag, ActionTag::named("@pong"));

        // A fresh directory (new process) decodes to its own token.
        let fresh = dir();
        let decoded = fresh.decode_message(encoded);
        assert_eq!(decoded.tag, ActionTag::Token(fresh.token_of(Op::Pong).unwrap()));
    }

    #[test]
    fn decode_is_lenient() {
        let d = dir();
        for raw in ["ping", "@unknown", "", "Symbol(action_update)"] {
            let msg = d.decode_message(Msg {
                tag: ActionTag::named(raw.to_string()),
            });
            assert_eq!(msg.tag, ActionTag::named(raw.to_string()));
        }
        assert_eq!(d.resolve(&ActionTag::named("ping")), Some(Op::Ping));
        assert_eq!(d.resolve(&ActionTag::named("@pong")), Some(Op::Pong));
    }

    #[test]
    fn build_rejects_bad_tables() {
        assert_eq!(
            ActionDirectory::build(&[("ping", Op::Ping), ("ping", Op::Pong)]).unwrap_err(),
            DirectoryError::DuplicateName("ping".into())
        );
        assert_eq!(
            ActionDirectory::build(&[("ping", Op::Ping), ("again", Op::Ping)]).unwrap_err(),
            DirectoryError::DuplicateHandler("again".into(), "ping".into())
        );
        assert_eq!(
            ActionDirectory::build(&[("@ping", Op::Ping)]).unwrap_err(),
            DirectoryError::InvalidName("@ping".into())
        );
    }
}
