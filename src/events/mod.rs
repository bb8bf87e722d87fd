//! Supervisor events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish lifecycle events emitted by the supervisor actor, its recovery
//! pass and the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the supervisor actor (admission, transitions, rejections,
//!   crashes, supervision decisions), journal recovery, `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the supervisor's subscriber listener (fans out to
//!   `SubscriberSet`) and any receiver obtained through `SupervisorHandle::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
