//! # Sync Queue
//!
//! Ordered list of [`PendingOperation`] records awaiting remote
//! application. Operations land here when a mutation cannot be confirmed
//! immediately: either the engine was offline at the time, or the remote
//! call failed with a connectivity-classified error.
//!
//! The queue preserves insertion order and is drained strictly FIFO during
//! replay. Multiple queued operations targeting the same task id are kept
//! as-is and replayed in order; no coalescing happens.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::task::{now_rfc3339, NewTask, TaskPatch};

/// The remote mutation a pending operation will replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum SyncAction {
    /// Re-submit a create with the originally captured fields
    Create(NewTask),
    /// Re-submit a partial update
    Update(TaskPatch),
    /// Re-submit a delete; carries no payload
    Delete,
}

impl SyncAction {
    pub fn name(&self) -> &'static str {
        match self {
            SyncAction::Create(_) => "create",
            SyncAction::Update(_) => "update",
            SyncAction::Delete => "delete",
        }
    }
}

/// A mutation not yet confirmed by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Identity of this queue entry; two operations on the same task
    /// remain distinguishable.
    pub op_id: Uuid,
    /// Target task id, temporary or server-issued
    pub task_id: String,
    pub action: SyncAction,
    /// RFC 3339 timestamp of when the entry was queued
    pub queued_at: String,
    /// Replay attempts so far
    #[serde(default)]
    pub attempts: u32,
    /// Message from the most recent failed replay attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingOperation {
    fn new(task_id: impl Into<String>, action: SyncAction) -> Self {
        Self {
            op_id: Uuid::new_v4(),
            task_id: task_id.into(),
            action,
            queued_at: now_rfc3339(),
            attempts: 0,
            last_error: None,
        }
    }

    pub fn create(task_id: impl Into<String>, fields: NewTask) -> Self {
        Self::new(task_id, SyncAction::Create(fields))
    }

    pub fn update(task_id: impl Into<String>, patch: TaskPatch) -> Self {
        Self::new(task_id, SyncAction::Update(patch))
    }

    pub fn delete(task_id: impl Into<String>) -> Self {
        Self::new(task_id, SyncAction::Delete)
    }
}

/// FIFO queue of operations awaiting replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncQueue {
    entries: VecDeque<PendingOperation>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation; insertion order is replay order
    pub fn push(&mut self, op: PendingOperation) {
        self.entries.push_back(op);
    }

    /// Remove a processed entry by its queue identity
    pub fn remove(&mut self, op_id: &Uuid) -> Option<PendingOperation> {
        let index = self.entries.iter().position(|op| op.op_id == *op_id)?;
        self.entries.remove(index)
    }

    /// Record a failed replay attempt, leaving the entry queued
    pub fn mark_failed(&mut self, op_id: &Uuid, error: impl Into<String>) {
        if let Some(op) = self.entries.iter_mut().find(|op| op.op_id == *op_id) {
            op.attempts += 1;
            op.last_error = Some(error.into());
        }
    }

    /// Snapshot of the queue in replay order
    pub fn entries(&self) -> Vec<PendingOperation> {
        self.entries.iter().cloned().collect()
    }

    /// Queued operations targeting a given task id, in order
    pub fn for_task(&self, task_id: &str) -> Vec<&PendingOperation> {
        self.entries.iter().filter(|op| op.task_id == task_id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restore queue contents from a persisted snapshot
    pub fn restore(&mut self, entries: Vec<PendingOperation>) {
        self.entries = entries.into();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOperation> {
        self.entries.iter()
    }
}
