//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`] for events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! supervisor actor ── publish(Event) ──► Bus ──► subscriber listener
//!                                                     │
//!                                                     ▼
//!                                              SubscriberSet::emit_arc
//!                                                     │
//!                                        ┌────────────┼────────────┐
//!                                        ▼            ▼            ▼
//!                                    LogWriter      Audit        Custom
//! ```

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
