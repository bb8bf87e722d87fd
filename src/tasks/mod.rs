//! # Task data model.
//!
//! This module provides the task-related types:
//! - [`TaskStatus`] - closed status vocabulary and its codec
//! - [`Task`], [`TaskId`], [`TaskPatch`], [`TaskMessage`] - records and partial updates
//! - [`TaskIdentity`], [`FieldIdentity`] - id derivation and admission hooks

mod identity;
mod status;
mod task;

pub use identity::{FieldIdentity, TaskIdentity};
pub use status::{TaskStatus, is_status};
pub use task::{Task, TaskId, TaskMessage, TaskPatch};
