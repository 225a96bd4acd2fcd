//! # Sync State
//!
//! The coordinator's mutable state as one explicit record, with the pure
//! synchronous transitions that mutate it. The coordinator acquires the
//! lock, applies a transition, releases the lock, and performs I/O with no
//! lock held; every remote-call continuation re-validates against the
//! fencing tokens below before touching state.
//!
//! ## Fencing
//!
//! Each optimistic mutation stamps its task id with a fresh token from a
//! monotonically increasing sequence. A confirmation or rollback arriving
//! from an awaited remote call applies only while its token is still the
//! latest for that id; a response that lost the race is stale and must not
//! resurrect state a later mutation already replaced.

use std::collections::HashMap;

use crate::persistence::CachedState;
use crate::queue::{PendingOperation, SyncQueue};
use crate::repository::TaskRepository;
use crate::task::{now_rfc3339, NewTask, Task, TaskPatch};

/// Mutable engine state guarded by the coordinator's lock
#[derive(Debug, Default)]
pub struct SyncState {
    pub tasks: TaskRepository,
    pub pending: SyncQueue,
    pub is_online: bool,
    /// RFC 3339 timestamp of the last successful sync
    pub last_sync: Option<String>,
    /// Most recent surfaced error, if any
    pub last_error: Option<String>,
    seq: u64,
    fences: HashMap<String, u64>,
}

impl SyncState {
    /// Fresh state; the engine assumes it is online until told otherwise
    pub fn new() -> Self {
        Self {
            is_online: true,
            ..Self::default()
        }
    }

    /// Stamp a task id with a fresh mutation token
    fn stamp(&mut self, id: &str) -> u64 {
        self.seq += 1;
        self.fences.insert(id.to_string(), self.seq);
        self.seq
    }

    /// Whether `token` is still the latest mutation for `id`
    pub fn fence_holds(&self, id: &str, token: u64) -> bool {
        self.fences.get(id) == Some(&token)
    }

    /// Drop the fence for `id` if `token` still holds it
    fn release_fence(&mut self, id: &str, token: u64) {
        if self.fence_holds(id, token) {
            self.fences.remove(id);
        }
    }

    /// Insert the optimistic record for a create. Computes the lane
    /// position, returns the inserted task and its fencing token.
    pub fn begin_create(&mut self, fields: &mut NewTask, user_id: &str) -> (Task, u64) {
        fields.position = self.tasks.lane_len(fields.lane) as i64;
        let task = Task::optimistic(fields, user_id);
        let token = self.stamp(&task.id);
        self.tasks.insert(task.clone());
        (task, token)
    }

    /// Swap the temporary id for the server record. No-op when stale.
    pub fn confirm_create(&mut self, temp_id: &str, token: u64, server_task: Task) -> bool {
        if !self.fence_holds(temp_id, token) {
            return false;
        }
        self.tasks.replace(temp_id, server_task);
        self.release_fence(temp_id, token);
        true
    }

    /// Remove the optimistic create record. No-op when stale.
    pub fn rollback_create(&mut self, temp_id: &str, token: u64) -> bool {
        if !self.fence_holds(temp_id, token) {
            return false;
        }
        self.tasks.remove(temp_id);
        self.release_fence(temp_id, token);
        true
    }

    /// Apply a patch optimistically. Returns the pre-mutation snapshot,
    /// the patched task, and the fencing token; `None` if `id` is absent.
    pub fn begin_update(&mut self, id: &str, patch: &TaskPatch) -> Option<(Task, Task, u64)> {
        let prior = self.tasks.get(id)?.clone();
        let token = self.stamp(id);
        let updated = self.tasks.patch(id, patch)?;
        Some((prior, updated, token))
    }

    /// Replace the optimistic patch result with server truth. No-op when stale.
    pub fn confirm_update(&mut self, id: &str, token: u64, server_task: Task) -> bool {
        if !self.fence_holds(id, token) {
            return false;
        }
        self.tasks.replace(id, server_task);
        self.release_fence(id, token);
        true
    }

    /// Remove a task optimistically. Returns the pre-mutation snapshot and
    /// the fencing token; `None` if `id` is absent.
    pub fn begin_delete(&mut self, id: &str) -> Option<(Task, u64)> {
        let prior = self.tasks.remove(id)?;
        let token = self.stamp(id);
        Some((prior, token))
    }

    /// Acknowledge a confirmed delete. No-op when stale.
    pub fn confirm_delete(&mut self, id: &str, token: u64) -> bool {
        if !self.fence_holds(id, token) {
            return false;
        }
        self.release_fence(id, token);
        true
    }

    /// Restore the repository to exactly the pre-mutation snapshot.
    /// No-op when stale.
    pub fn rollback_to(&mut self, id: &str, token: u64, prior: Task) -> bool {
        if !self.fence_holds(id, token) {
            return false;
        }
        self.tasks.insert(prior);
        self.release_fence(id, token);
        true
    }

    /// Queue an operation for replay once connectivity returns
    pub fn enqueue(&mut self, op: PendingOperation) {
        self.pending.push(op);
    }

    /// Record the moment of a successful sync
    pub fn mark_synced(&mut self) {
        self.last_sync = Some(now_rfc3339());
    }

    /// Restore cached tasks, queue, and last-sync from a persisted snapshot
    pub fn restore(&mut self, cached: CachedState) {
        self.tasks.replace_all(cached.tasks);
        self.pending.restore(cached.pending_syncs);
        self.last_sync = cached.last_sync;
    }

    /// The reduced snapshot persisted across restarts. Fencing tokens are
    /// runtime-only and deliberately not part of it.
    pub fn cached(&self) -> CachedState {
        CachedState {
            tasks: self.tasks.snapshot(),
            pending_syncs: self.pending.entries(),
            last_sync: self.last_sync.clone(),
        }
    }

    /// Observer-facing view of the state
    pub fn observed(&self) -> StateSnapshot {
        StateSnapshot {
            tasks: self.tasks.snapshot(),
            pending_ops: self.pending.len(),
            is_online: self.is_online,
            last_sync: self.last_sync.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Immutable view delivered to observers after each applied transition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub tasks: Vec<Task>,
    pub pending_ops: usize,
    pub is_online: bool,
    pub last_sync: Option<String>,
    pub last_error: Option<String>,
}
