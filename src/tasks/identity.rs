//! # Task identity and admission.
//!
//! The supervisor does not know what a task descriptor looks like. A
//! [`TaskIdentity`] tells it how to derive a [`TaskId`], whether a descriptor is
//! valid, and whether it should be silently ignored.
//!
//! [`FieldIdentity`] covers the common case of an id stored in one JSON field.

use std::sync::Arc;

use serde_json::Value;

use crate::tasks::task::TaskId;

/// Identity and admission hooks consulted by `submit`.
///
/// # Example
/// ```
/// use serde_json::{json, Value};
/// use taskwarden::{TaskId, TaskIdentity};
///
/// struct ByOrder;
///
/// impl TaskIdentity for ByOrder {
///     fn task_id(&self, payload: &Value) -> Option<TaskId> {
///         payload.get("order").and_then(Value::as_u64).map(|n| TaskId::new(format!("order-{n}")))
///     }
/// }
///
/// assert_eq!(ByOrder.task_id(&json!({ "order": 7 })).unwrap().as_str(), "order-7");
/// assert!(ByOrder.is_valid(&json!({ "order": 7 })));
/// ```
pub trait TaskIdentity: Send + Sync + 'static {
    /// Derives the task id from a descriptor; `None` if it has none.
    fn task_id(&self, payload: &Value) -> Option<TaskId>;

    /// Returns `true` if the descriptor may be admitted.
    ///
    /// Default: the descriptor yields an id.
    fn is_valid(&self, payload: &Value) -> bool {
        self.task_id(payload).is_some()
    }

    /// Returns a reason to silently skip the descriptor, if any.
    fn ignore(&self, _payload: &Value) -> Option<String> {
        None
    }
}

type IgnoreFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Identity read from a single descriptor field.
///
/// String values are used verbatim, numbers are formatted; empty strings are invalid.
#[derive(Clone)]
pub struct FieldIdentity {
    field: String,
    ignore: Option<IgnoreFn>,
}

impl FieldIdentity {
    /// Uses `field` as the id source.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ignore: None,
        }
    }

    /// Adds an ignore predicate.
    pub fn ignoring<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.ignore = Some(Arc::new(f));
        self
    }
}

impl TaskIdentity for FieldIdentity {
    fn task_id(&self, payload: &Value) -> Option<TaskId> {
        match payload.get(&self.field)? {
            Value::String(s) if !s.is_empty() => Some(TaskId::new(s.clone())),
            Value::Number(n) => Some(TaskId::new(n.to_string())),
            _ => None,
        }
    }

    fn ignore(&self, payload: &Value) -> Option<String> {
        self.ignore.as_ref().and_then(|f| f(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_identity_reads_strings_and_numbers() {
        let id = FieldIdentity::new("foreignId");
        assert_eq!(
            id.task_id(&json!({ "foreignId": "00001" })),
            Some(TaskId::from("00001"))
        );
        assert_eq!(
            id.task_id(&json!({ "foreignId": 42 })),
            Some(TaskId::from("42"))
        );
        assert!(!id.is_valid(&json!({ "foreignId": "" })));
        assert!(!id.is_valid(&json!({ "recipient": "jack" })));
    }

    #[test]
    fn ignore_predicate_is_consulted() {
        let id = FieldIdentity::new("foreignId").ignoring(|p| {
            (p.get("recipient") == Some(&json!("nobody"))).then(|| "no recipient".to_string())
        });
        assert_eq!(
            id.ignore(&json!({ "foreignId": "1", "recipient": "nobody" })).as_deref(),
            Some("no recipient")
        );
        assert_eq!(id.ignore(&json!({ "foreignId": "1", "recipient": "jack" })), None);
    }
}
