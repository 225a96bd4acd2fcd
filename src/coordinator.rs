//! # Sync Coordinator
//!
//! The state machine and public contract of the engine. Applies optimistic
//! mutations to the in-memory repository, decides whether to call the
//! remote service immediately or enqueue for later, performs rollback on
//! failure, and replays the queue when connectivity returns.
//!
//! ## Architecture
//!
//! Dependencies are injected at construction: a [`RemoteClient`] for the
//! CRUD API, a [`SnapshotStore`] for the durable cache, and a
//! [`SyncConfig`]. There is no global state; construct one coordinator,
//! call [`init`](SyncCoordinator::init), and share it behind an `Arc`.
//!
//! Every mutation follows the same shape:
//!
//! 1. apply the optimistic transition under the state lock, persist, notify
//! 2. await the remote call with no lock held
//! 3. re-acquire the lock and confirm, or roll back; a
//!    connectivity-classified failure additionally queues the original
//!    intent and flips the engine offline
//!
//! Confirmations and rollbacks are fenced: a response that arrives after a
//! later mutation has already superseded it is dropped instead of
//! resurrecting stale state.

use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::persistence::{CachedState, SnapshotStore};
use crate::queue::{PendingOperation, SyncAction};
use crate::remote::RemoteClient;
use crate::state::{StateSnapshot, SyncState};
use crate::task::{FocusDuration, Lane, NewTask, Task, TaskPatch, TaskStatus};

/// Orchestrates the repository, the queue, and the remote service
pub struct SyncCoordinator<R, S> {
    remote: R,
    store: S,
    config: SyncConfig,
    state: RwLock<SyncState>,
    /// Serializes queue drains; two concurrent replays must not interleave
    replay_guard: Mutex<()>,
    observers: watch::Sender<StateSnapshot>,
}

impl<R, S> SyncCoordinator<R, S>
where
    R: RemoteClient,
    S: SnapshotStore,
{
    /// Create a coordinator owning its injected dependencies
    pub fn new(remote: R, store: S, config: SyncConfig) -> Self {
        let state = SyncState::new();
        let (observers, _) = watch::channel(state.observed());
        Self {
            remote,
            store,
            config,
            state: RwLock::new(state),
            replay_guard: Mutex::new(()),
            observers,
        }
    }

    /// Restore the persisted snapshot, then attempt a first fetch.
    ///
    /// The cached `{tasks, pending_syncs, last_sync}` snapshot is applied
    /// before the fetch resolves, so a restart shows cached state
    /// immediately. A connectivity failure on the first fetch is
    /// swallowed; the engine simply starts offline with cached data
    /// authoritative.
    pub async fn init(&self) -> Result<(), SyncError> {
        match self.store.get(self.config.snapshot_key()) {
            Ok(Some(raw)) => match CachedState::decode(&raw) {
                Ok(cached) => {
                    let mut state = self.state.write().await;
                    info!(
                        tasks = cached.tasks.len(),
                        pending = cached.pending_syncs.len(),
                        "restored cached state"
                    );
                    state.restore(cached);
                }
                Err(err) => warn!("discarding unreadable snapshot: {}", err),
            },
            Ok(None) => {}
            Err(err) => warn!("failed to load snapshot: {}", err),
        }
        self.notify().await;

        match self.fetch_all().await {
            Err(err) if err.is_connectivity() => Ok(()),
            other => other,
        }
    }

    /// Persist a final snapshot. Call before dropping the coordinator.
    pub async fn dispose(&self) {
        self.persist().await;
    }

    /// Watch the engine state; a fresh snapshot is published after every
    /// applied transition.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.observers.subscribe()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn is_online(&self) -> bool {
        self.state.read().await.is_online
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.snapshot()
    }

    pub async fn pending_operations(&self) -> Vec<PendingOperation> {
        self.state.read().await.pending.entries()
    }

    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }

    pub async fn last_sync(&self) -> Option<String> {
        self.state.read().await.last_sync.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Fetch the full task list and replace the repository wholesale.
    ///
    /// A connectivity failure flips the engine offline; when the engine
    /// already believed it was offline the failure is suppressed entirely
    /// and cached data remains authoritative.
    pub async fn fetch_all(&self) -> Result<(), SyncError> {
        match self.remote.list().await {
            Ok(tasks) => {
                {
                    let mut state = self.state.write().await;
                    state.tasks.replace_all(tasks);
                    state.mark_synced();
                }
                self.commit().await;
                Ok(())
            }
            Err(err) if err.is_connectivity() => {
                let was_online = {
                    let mut state = self.state.write().await;
                    let was = state.is_online;
                    state.is_online = false;
                    was
                };
                self.commit().await;
                if was_online {
                    debug!("fetch failed, going offline: {}", err);
                    Err(err)
                } else {
                    debug!("fetch suppressed while offline, cached data stands");
                    Ok(())
                }
            }
            Err(err) => {
                {
                    let mut state = self.state.write().await;
                    state.last_error = Some(err.to_string());
                }
                self.commit().await;
                Err(err)
            }
        }
    }

    /// Create a task optimistically.
    ///
    /// Returns the server record when confirmed immediately; otherwise the
    /// optimistic record whose create has been queued for replay. An
    /// application rejection rolls the optimistic record back and is
    /// returned as the error.
    pub async fn create_task(&self, mut fields: NewTask) -> Result<Task, SyncError> {
        let (optimistic, token, online) = {
            let mut state = self.state.write().await;
            state.last_error = None;
            let (task, token) = state.begin_create(&mut fields, self.config.user_id());
            (task, token, state.is_online)
        };
        self.commit().await;

        if !online {
            debug!(task_id = %optimistic.id, "offline, queueing create");
            let mut state = self.state.write().await;
            state.enqueue(PendingOperation::create(optimistic.id.clone(), fields));
            drop(state);
            self.commit().await;
            return Ok(optimistic);
        }

        match self.remote.create(&fields).await {
            Ok(server_task) => {
                {
                    let mut state = self.state.write().await;
                    if !state.confirm_create(&optimistic.id, token, server_task.clone()) {
                        debug!(task_id = %optimistic.id, "dropping stale create confirmation");
                    }
                }
                self.commit().await;
                Ok(server_task)
            }
            Err(err) => {
                self.handle_failed_mutation(
                    err,
                    Rollback::RemoveCreate {
                        temp_id: optimistic.id.clone(),
                        token,
                    },
                    PendingOperation::create(optimistic.id.clone(), fields),
                )
                .await?;
                Ok(optimistic)
            }
        }
    }

    /// Patch a task optimistically.
    ///
    /// Returns the server record when confirmed immediately; otherwise the
    /// locally patched record whose update has been queued for replay. An
    /// application rejection restores the exact pre-mutation snapshot and
    /// is returned as the error.
    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task, SyncError> {
        let (prior, optimistic, token, online) = {
            let mut state = self.state.write().await;
            state.last_error = None;
            let Some((prior, updated, token)) = state.begin_update(id, &patch) else {
                let err = SyncError::application(format!("no task with id {}", id), None);
                state.last_error = Some(err.to_string());
                return Err(err);
            };
            (prior, updated, token, state.is_online)
        };
        self.commit().await;

        if !online {
            debug!(task_id = %id, "offline, queueing update");
            let mut state = self.state.write().await;
            state.enqueue(PendingOperation::update(id, patch));
            drop(state);
            self.commit().await;
            return Ok(optimistic);
        }

        match self.remote.update(id, &patch).await {
            Ok(server_task) => {
                {
                    let mut state = self.state.write().await;
                    if !state.confirm_update(id, token, server_task.clone()) {
                        debug!(task_id = %id, "dropping stale update confirmation");
                    }
                }
                self.commit().await;
                Ok(server_task)
            }
            Err(err) => {
                self.handle_failed_mutation(
                    err,
                    Rollback::Restore {
                        id: id.to_string(),
                        token,
                        prior,
                    },
                    PendingOperation::update(id, patch),
                )
                .await?;
                Ok(optimistic)
            }
        }
    }

    /// Delete a task optimistically.
    ///
    /// An application rejection restores the exact pre-mutation snapshot
    /// and is returned as the error.
    pub async fn delete_task(&self, id: &str) -> Result<(), SyncError> {
        let (prior, token, online) = {
            let mut state = self.state.write().await;
            state.last_error = None;
            let Some((prior, token)) = state.begin_delete(id) else {
                let err = SyncError::application(format!("no task with id {}", id), None);
                state.last_error = Some(err.to_string());
                return Err(err);
            };
            (prior, token, state.is_online)
        };
        self.commit().await;

        if !online {
            debug!(task_id = %id, "offline, queueing delete");
            let mut state = self.state.write().await;
            state.enqueue(PendingOperation::delete(id));
            drop(state);
            self.commit().await;
            return Ok(());
        }

        match self.remote.delete(id).await {
            Ok(()) => {
                {
                    let mut state = self.state.write().await;
                    state.confirm_delete(id, token);
                }
                self.commit().await;
                Ok(())
            }
            Err(err) => {
                self.handle_failed_mutation(
                    err,
                    Rollback::Restore {
                        id: id.to_string(),
                        token,
                        prior,
                    },
                    PendingOperation::delete(id),
                )
                .await?;
                Ok(())
            }
        }
    }

    /// Move a task to another lane.
    ///
    /// Sets the duration when moving into the duration-bearing lane and
    /// clears it otherwise. Delegates to [`update_task`](Self::update_task).
    pub async fn move_task(
        &self,
        id: &str,
        lane: Lane,
        duration: Option<FocusDuration>,
    ) -> Result<Task, SyncError> {
        let patch = TaskPatch {
            lane: Some(lane),
            duration: Some(if lane.supports_duration() { duration } else { None }),
            ..Default::default()
        };
        self.update_task(id, patch).await
    }

    /// Mark a task completed, stamping `completed_at`
    pub async fn complete_task(&self, id: &str) -> Result<Task, SyncError> {
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            completed_at: Some(Some(crate::task::now_rfc3339())),
            ..Default::default()
        };
        self.update_task(id, patch).await
    }

    /// Reopen a completed task, clearing `completed_at`
    pub async fn reopen_task(&self, id: &str) -> Result<Task, SyncError> {
        let patch = TaskPatch {
            status: Some(TaskStatus::Pending),
            completed_at: Some(None),
            ..Default::default()
        };
        self.update_task(id, patch).await
    }

    /// Replay the queue against the remote service, strictly in order.
    ///
    /// No-op while offline or when the queue is empty. Each entry is
    /// awaited before the next is dispatched; a failed entry is recorded
    /// and left queued, and the drain continues with the next entry.
    /// Afterwards an aggregated error is surfaced if any entry failed,
    /// `last_sync` is updated, and a final [`fetch_all`](Self::fetch_all)
    /// pulls authoritative server state.
    pub async fn sync_pending(&self) -> Result<(), SyncError> {
        let _guard = self.replay_guard.lock().await;

        let (online, ops) = {
            let state = self.state.read().await;
            (state.is_online, state.pending.entries())
        };
        if !online || ops.is_empty() {
            return Ok(());
        }

        info!(count = ops.len(), "replaying pending operations");
        let mut failures: Vec<String> = Vec::new();

        for op in ops {
            let outcome = match &op.action {
                SyncAction::Create(fields) => self.remote.create(fields).await.map(Some),
                SyncAction::Update(patch) => {
                    self.remote.update(&op.task_id, patch).await.map(Some)
                }
                SyncAction::Delete => self.remote.delete(&op.task_id).await.map(|_| None),
            };

            let mut state = self.state.write().await;
            match outcome {
                Ok(server_task) => {
                    if let (SyncAction::Create(_), Some(server_task)) = (&op.action, server_task)
                    {
                        // Replayed create: swap the temporary id for the
                        // server record.
                        state.tasks.replace(&op.task_id, server_task);
                    }
                    state.pending.remove(&op.op_id);
                }
                Err(err) => {
                    warn!(
                        task_id = %op.task_id,
                        action = op.action.name(),
                        "replay failed: {}", err
                    );
                    failures.push(format!("{} {}: {}", op.action.name(), op.task_id, err));
                    state.pending.mark_failed(&op.op_id, err.to_string());
                }
            }
        }

        let aggregated = if failures.is_empty() {
            None
        } else {
            Some(format!(
                "{} queued operation(s) failed: {}",
                failures.len(),
                failures.join("; ")
            ))
        };
        {
            let mut state = self.state.write().await;
            state.mark_synced();
            state.last_error = aggregated.clone();
        }
        self.commit().await;

        // Final reconciliation pass.
        if let Err(err) = self.fetch_all().await {
            debug!("reconciliation fetch failed: {}", err);
        }

        match aggregated {
            None => Ok(()),
            Some(message) => Err(SyncError::unknown(message)),
        }
    }

    /// Update the connectivity flag. Setting the engine online triggers an
    /// automatic queue replay.
    pub async fn set_online_status(&self, online: bool) {
        {
            let mut state = self.state.write().await;
            if state.is_online != online {
                info!(online, "connectivity changed");
            }
            state.is_online = online;
        }
        self.commit().await;

        if online {
            if let Err(err) = self.sync_pending().await {
                debug!("replay after reconnect: {}", err);
            }
        }
    }

    /// Shared failure path for create/update/delete: roll back the
    /// optimistic mutation, then either queue the original intent and flip
    /// offline (connectivity-classified) or surface the error.
    async fn handle_failed_mutation(
        &self,
        err: SyncError,
        rollback: Rollback,
        retry: PendingOperation,
    ) -> Result<(), SyncError> {
        let queued = {
            let mut state = self.state.write().await;
            let applied = match rollback {
                Rollback::RemoveCreate { temp_id, token } => {
                    state.rollback_create(&temp_id, token)
                }
                Rollback::Restore { id, token, prior } => {
                    state.rollback_to(&id, token, prior)
                }
            };
            if !applied {
                debug!("dropping stale rollback");
            }
            if err.is_connectivity() || !state.is_online {
                info!(task_id = %retry.task_id, action = retry.action.name(),
                    "queued for replay after connectivity failure");
                state.enqueue(retry);
                state.is_online = false;
                true
            } else {
                state.last_error = Some(err.to_string());
                false
            }
        };
        self.commit().await;

        if queued {
            Ok(())
        } else {
            Err(err)
        }
    }

    async fn persist(&self) {
        let cached = self.state.read().await.cached();
        match cached.encode() {
            Ok(json) => {
                if let Err(err) = self.store.set(self.config.snapshot_key(), &json) {
                    warn!("failed to persist snapshot: {}", err);
                }
            }
            Err(err) => warn!("failed to encode snapshot: {}", err),
        }
    }

    async fn notify(&self) {
        let snapshot = self.state.read().await.observed();
        // send_replace stores the value even while nobody is subscribed,
        // so a late subscriber sees current state rather than the initial.
        self.observers.send_replace(snapshot);
    }

    async fn commit(&self) {
        self.persist().await;
        self.notify().await;
    }
}

/// How to undo an optimistic mutation when the remote call fails
enum Rollback {
    /// Create case: no prior snapshot exists, remove the record entirely
    RemoveCreate { temp_id: String, token: u64 },
    /// Update/delete case: restore the exact pre-mutation snapshot
    Restore {
        id: String,
        token: u64,
        prior: Task,
    },
}
