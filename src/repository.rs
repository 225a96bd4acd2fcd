//! # Task Repository
//!
//! In-memory authoritative collection of [`Task`] entities. Pure and
//! synchronous; persistence and remote I/O are driven externally by the
//! coordinator, never by the repository itself.
//!
//! Mutations targeting a missing id are no-ops. Callers perform existence
//! checks before issuing a mutation; the `Option` return values exist so
//! they can tell the difference.

use serde::{Deserialize, Serialize};

use crate::task::{Lane, Task, TaskPatch};

/// Insertion-ordered task collection, one entry per id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRepository {
    tasks: Vec<Task>,
}

impl TaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task. An existing task with the same id is replaced in
    /// place, preserving the one-record-per-id invariant.
    pub fn insert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
    }

    /// Replace the task stored under `id` with `task`, in place.
    ///
    /// This is the one operation that substitutes a temporary id for the
    /// server-issued one: the swap happens within a single call, so no
    /// moment exists where both records appear. Returns the previous
    /// record, or `None` if `id` was absent.
    pub fn replace(&mut self, id: &str, task: Task) -> Option<Task> {
        let slot = self.tasks.iter_mut().find(|t| t.id == id)?;
        Some(std::mem::replace(slot, task))
    }

    /// Merge a partial update into the task under `id`.
    ///
    /// Returns a clone of the patched task, or `None` if `id` was absent.
    pub fn patch(&mut self, id: &str, patch: &TaskPatch) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        patch.apply_to(task);
        Some(task.clone())
    }

    /// Remove the task under `id`, returning it if present
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Clone of the full collection, in insertion order
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Replace the whole collection with authoritative server state
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Count of tasks in a lane, used to compute the optimistic position
    /// of a newly created task.
    pub fn lane_len(&self, lane: Lane) -> usize {
        self.tasks.iter().filter(|t| t.lane == lane).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}
