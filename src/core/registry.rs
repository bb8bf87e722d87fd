//! # Task registry: primary store plus status index.
//!
//! The registry is owned by the supervisor actor and never shared; effects and
//! reducers only ever see a read-only [`RegistryView`].
//!
//! ```text
//! tasks:     id ──► Task
//! by_status: init    ──► {id, ..}
//!            ready   ──► {id, ..}
//!            ...     (all seven buckets always present)
//! ```
//!
//! ## Rules
//! - Every task `t` is in bucket `t.status` and in no other bucket.
//! - [`set`](TaskRegistry::set) only touches the primary store; a status change must
//!   be followed by exactly one [`reindex`](TaskRegistry::reindex) before anything
//!   else reads the index.
//! - A task is only removed when the `submit` that admitted it is rolled back.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::tasks::{Task, TaskId, TaskStatus};

/// Mutable task store with a status index.
#[derive(Debug)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, Task>,
    by_status: HashMap<TaskStatus, BTreeSet<TaskId>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    /// Creates an empty registry with every status bucket present.
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            by_status: TaskStatus::ALL
                .into_iter()
                .map(|s| (s, BTreeSet::new()))
                .collect(),
        }
    }

    /// Returns `true` if `id` is tracked.
    pub fn has(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Returns the stored record.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Stores `task` in the primary store without touching the index.
    ///
    /// Returns the record it replaced.
    pub fn set(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.task_id.clone(), task)
    }

    /// Stores a task that is not tracked yet and indexes it under its status.
    ///
    /// Returns `false` (and changes nothing) if the id is already tracked.
    pub fn insert(&mut self, task: Task) -> bool {
        if self.has(task.task_id.as_str()) {
            return false;
        }
        self.bucket(task.status).insert(task.task_id.clone());
        self.tasks.insert(task.task_id.clone(), task);
        true
    }

    /// Drops `id` from the store and from its bucket.
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let task = self.tasks.remove(id)?;
        self.bucket(task.status).remove(id);
        Some(task)
    }

    /// Moves `id` from the `old` bucket to the `new` bucket.
    pub fn reindex(&mut self, old: TaskStatus, new: TaskStatus, id: &TaskId) {
        if old == new {
            return;
        }
        self.bucket(old).remove(id);
        self.bucket(new).insert(id.clone());
    }

    /// Ids currently indexed under `status`, in id order.
    pub fn ids_in(&self, status: TaskStatus) -> Vec<TaskId> {
        self.by_status
            .get(&status)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of tracked tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if no task is tracked.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Read-only view handed to effects and reducers.
    pub fn view(&self) -> RegistryView<'_> {
        RegistryView { registry: self }
    }

    /// Owned, ordered copy of the registry.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            tasks: self
                .tasks
                .iter()
                .map(|(id, t)| (id.clone(), t.clone()))
                .collect(),
            by_status: self
                .by_status
                .iter()
                .map(|(s, ids)| (*s, ids.clone()))
                .collect(),
        }
    }

    fn bucket(&mut self, status: TaskStatus) -> &mut BTreeSet<TaskId> {
        self.by_status.entry(status).or_default()
    }
}

/// Read-only access to the registry.
#[derive(Clone, Copy, Debug)]
pub struct RegistryView<'a> {
    registry: &'a TaskRegistry,
}

impl<'a> RegistryView<'a> {
    /// Returns `true` if `id` is tracked.
    pub fn has(&self, id: &str) -> bool {
        self.registry.has(id)
    }

    /// Returns the stored record.
    pub fn get(&self, id: &str) -> Option<&'a Task> {
        self.registry.get(id)
    }

    /// Current status of `id`.
    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.get(id).map(|t| t.status)
    }

    /// Ids indexed under `status`.
    pub fn ids_in(&self, status: TaskStatus) -> Vec<TaskId> {
        self.registry.ids_in(status)
    }

    /// Number of tasks indexed under `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.registry.by_status.get(&status).map_or(0, BTreeSet::len)
    }

    /// Number of tracked tasks.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if no task is tracked.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Iterates over every tracked task in arbitrary order.
    pub fn tasks(&self) -> impl Iterator<Item = &'a Task> + 'a {
        self.registry.tasks.values()
    }
}

/// Owned copy of a registry, as returned by
/// [`SupervisorHandle::snapshot`](crate::SupervisorHandle::snapshot).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    /// Primary store.
    pub tasks: BTreeMap<TaskId, Task>,
    /// Status index.
    pub by_status: BTreeMap<TaskStatus, BTreeSet<TaskId>>,
}

impl RegistrySnapshot {
    /// Returns the stored record.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Current status of `id`.
    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.get(id).map(|t| t.status)
    }

    /// Ids indexed under `status`.
    pub fn ids_in(&self, status: TaskStatus) -> Vec<TaskId> {
        self.by_status
            .get(&status)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of tasks indexed under `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.by_status.get(&status).map_or(0, BTreeSet::len)
    }

    /// Checks that every task sits in exactly the bucket of its status.
    pub fn is_consistent(&self) -> bool {
        let indexed: usize = self.by_status.values().map(BTreeSet::len).sum();
        indexed == self.tasks.len()
            && self.tasks.values().all(|t| {
                self.by_status
                    .get(&t.status)
                    .is_some_and(|ids| ids.contains(&t.task_id))
            })
    }
}
