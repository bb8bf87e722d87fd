//! Effect and reducer pipeline.
//!
//! ## Contents
//! - [`Effect`], [`EffectFn`], [`NextState`] per-status side effects
//! - [`Reducer`], [`ReducerFn`], [`Identity`] pure post-processing
//! - [`Worker`], [`WorkerFn`], [`WorkerPool`] ready/abort effects backed by spawned workers
//!
//! ## Quick wiring
//! ```text
//! accepted transition ─► effect (if bound, not recovering) ─► validate
//!                     ─► reducer (always)                  ─► validate ─► commit
//! ```

mod effect;
mod reducer;
mod worker;

pub use effect::{Effect, EffectFn, NextState};
pub use reducer::{Identity, Reducer, ReducerFn};
pub use worker::{Worker, WorkerFn, WorkerPool};
