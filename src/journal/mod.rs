//! Persistence contract and crash recovery.
//!
//! A supervisor with a [`Journal`] persists every accepted `update` message
//! *before* applying it, and replays the journal when it starts:
//!
//! ```text
//! update(msg) ──► encode_message(msg) ──► PersistedMessage ──► Journal::persist
//!   effect/reducer failed ──► PersistedMessage::rollback(prior) ──► Journal::persist
//!
//! start():
//!   Journal::replay() ──► [PersistedMessage] ──► decode_message ──► handle (recovering)
//!                     │                                 effects skipped, reducer runs,
//!                     │                                 nothing persisted again
//!                     └─► rollback ──► task restored to `prior` (or removed)
//! ```
//!
//! A journal that fails to replay is a fault handed to the supervision policy.
//!
//! ## Contents
//! - [`Journal`] async storage trait
//! - [`PersistedMessage`] wire form of a message (JSON, camelCase)
//! - [`InMemoryJournal`] journal kept in process memory, for tests and demos

mod memory;
mod record;

use async_trait::async_trait;

use crate::error::JournalError;

pub use memory::InMemoryJournal;
pub use record::PersistedMessage;

/// Append-only message store.
#[async_trait]
pub trait Journal: Send + Sync + 'static {
    /// Appends one record.
    async fn persist(&self, record: &PersistedMessage) -> Result<(), JournalError>;

    /// Returns every record in append order.
    async fn replay(&self) -> Result<Vec<PersistedMessage>, JournalError>;
}
