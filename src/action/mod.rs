//! Action addressing: directories, tokens and the message envelope.
//!
//! ## Contents
//! - [`ActionDirectory`], [`ActionToken`], [`ActionTag`] name/token/handler mapping
//! - [`Tagged`] trait for anything whose tag is encoded at a persistence boundary
//! - [`Message`], [`Reply`] supervisor message shape and outcomes
//!
//! ## Quick wiring
//! ```text
//! Message{tag} ──► ActionDirectory::resolve(tag) ──► SupervisorAction
//!
//! persist:  Message ──► encode_message ──► PersistedMessage{type: "@update"}
//! replay:   PersistedMessage ──► decode_message ──► Message{tag: Token(update)}
//! ```

mod directory;
mod message;

pub use directory::{ActionDirectory, ActionTag, ActionToken, TOKEN_SIGIL, Tagged};
pub use message::{Message, Reply};
