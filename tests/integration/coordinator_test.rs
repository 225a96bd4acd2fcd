//! Coordinator integration tests
//!
//! Covers the optimistic mutation paths: immediate confirmation, exact
//! rollback on rejection, and the connectivity-failure branch that queues
//! the original intent.

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use driftsync::{
    FocusDuration, Lane, NewTask, RemoteClient, SyncAction, SyncCoordinator, SyncError, Task,
    TaskPatch, TaskStatus,
};
use pretty_assertions::assert_eq;
use tokio::sync::Semaphore;

use crate::common::{coordinator, server_task, test_config, FakeRemoteClient};

/// Delays create responses until the test releases a permit
struct GatedRemote {
    inner: Arc<FakeRemoteClient>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl RemoteClient for GatedRemote {
    async fn list(&self) -> Result<Vec<Task>, SyncError> {
        self.inner.list().await
    }
    async fn create(&self, fields: &NewTask) -> Result<Task, SyncError> {
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.create(fields).await
    }
    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, SyncError> {
        self.inner.update(id, patch).await
    }
    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn optimistic_echo_before_remote_resolves() {
    let inner = Arc::new(FakeRemoteClient::new());
    let gate = Arc::new(Semaphore::new(0));
    let remote = GatedRemote {
        inner: Arc::clone(&inner),
        gate: Arc::clone(&gate),
    };
    let coord = Arc::new(SyncCoordinator::new(
        remote,
        Arc::new(driftsync::MemoryStore::new()),
        test_config(),
    ));

    let handle = {
        let coord = Arc::clone(&coord);
        tokio::spawn(async move { coord.create_task(NewTask::new("A", Lane::Main)).await })
    };
    // Let the spawned mutation reach the gated remote call.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let tasks = coord.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "A");
    assert!(Task::is_temp_id(&tasks[0].id));

    gate.add_permits(1);
    let confirmed = handle.await.unwrap().unwrap();
    assert!(!Task::is_temp_id(&confirmed.id));

    let tasks = coord.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, confirmed.id);
}

#[tokio::test]
async fn create_confirmation_substitutes_server_record() {
    let (coord, remote, _store) = coordinator();

    let created = coord
        .create_task(NewTask::new("Ship release", Lane::Main))
        .await
        .unwrap();

    assert_eq!(created.id, "srv-1");
    let tasks = coord.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "srv-1");
    assert_eq!(remote.server_tasks().len(), 1);
    assert!(coord.is_online().await);
    assert_eq!(coord.pending_count().await, 0);
}

#[tokio::test]
async fn create_position_is_lane_count() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![
        server_task("a", "A", Lane::Main),
        server_task("b", "B", Lane::Main),
        server_task("c", "C", Lane::Controller),
    ]);
    coord.fetch_all().await.unwrap();

    let created = coord
        .create_task(NewTask::new("Third in main", Lane::Main))
        .await
        .unwrap();
    assert_eq!(created.position, 2);

    let created = coord
        .create_task(NewTask::new("Second in controller", Lane::Controller))
        .await
        .unwrap();
    assert_eq!(created.position, 1);
}

#[tokio::test]
async fn create_rejection_rolls_back_without_queueing() {
    let (coord, remote, _store) = coordinator();
    remote.script_create(Err(SyncError::application("title too long", Some(422))));

    let err = coord
        .create_task(NewTask::new("Rejected", Lane::Main))
        .await
        .unwrap_err();

    assert!(!err.is_connectivity());
    assert!(coord.tasks().await.is_empty());
    assert_eq!(coord.pending_count().await, 0);
    assert!(coord.is_online().await);
    assert!(coord.last_error().await.unwrap().contains("title too long"));
}

#[tokio::test]
async fn update_rejection_restores_exact_prior_state() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![server_task("X", "old", Lane::Main)]);
    coord.fetch_all().await.unwrap();
    let before = coord.tasks().await;

    remote.script_update(Err(SyncError::application("validation failed", Some(422))));
    let patch = TaskPatch {
        title: Some("new".to_string()),
        ..Default::default()
    };
    let err = coord.update_task("X", patch).await.unwrap_err();

    assert!(!err.is_connectivity());
    assert_eq!(coord.tasks().await, before);
    assert_eq!(coord.pending_count().await, 0);
    assert!(coord.is_online().await);
}

#[tokio::test]
async fn update_network_failure_rolls_back_and_queues() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![server_task("Y", "stable", Lane::Main)]);
    coord.fetch_all().await.unwrap();
    let before = coord.tasks().await;

    remote.script_update(Err(SyncError::network("connection reset")));
    let patch = TaskPatch {
        title: Some("ambitious rename".to_string()),
        ..Default::default()
    };
    let result = coord.update_task("Y", patch).await;

    // Connectivity failures are recovered locally, not surfaced.
    assert!(result.is_ok());
    assert_eq!(coord.tasks().await, before);
    assert!(!coord.is_online().await);

    let pending = coord.pending_operations().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task_id, "Y");
    assert_matches!(pending[0].action, SyncAction::Update(_));
}

#[tokio::test]
async fn delete_confirmed_remotely() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![server_task("gone", "Doomed", Lane::Main)]);
    coord.fetch_all().await.unwrap();

    coord.delete_task("gone").await.unwrap();

    assert!(coord.tasks().await.is_empty());
    assert!(remote.server_tasks().is_empty());
}

#[tokio::test]
async fn delete_network_failure_restores_and_queues() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![server_task("keep", "Still here", Lane::Main)]);
    coord.fetch_all().await.unwrap();

    remote.script_delete(Err(SyncError::network("timed out")));
    coord.delete_task("keep").await.unwrap();

    let tasks = coord.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "keep");
    assert!(!coord.is_online().await);

    let pending = coord.pending_operations().await;
    assert_eq!(pending.len(), 1);
    assert_matches!(pending[0].action, SyncAction::Delete);
}

#[tokio::test]
async fn move_task_sets_and_clears_duration() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![server_task("m", "Mobile", Lane::Main)]);
    coord.fetch_all().await.unwrap();

    coord
        .move_task("m", Lane::Controller, Some(FocusDuration::Long))
        .await
        .unwrap();
    let task = coord.tasks().await.into_iter().next().unwrap();
    assert_eq!(task.lane, Lane::Controller);
    assert_eq!(task.duration, Some(FocusDuration::Long));

    coord
        .move_task("m", Lane::Main, Some(FocusDuration::Short))
        .await
        .unwrap();
    let task = coord.tasks().await.into_iter().next().unwrap();
    assert_eq!(task.lane, Lane::Main);
    // The target lane does not carry durations; the hint is discarded.
    assert_eq!(task.duration, None);
}

#[tokio::test]
async fn complete_and_reopen_toggle_status() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![server_task("t", "Toggle", Lane::Main)]);
    coord.fetch_all().await.unwrap();

    coord.complete_task("t").await.unwrap();
    let task = coord.tasks().await.into_iter().next().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.completed_at.is_some());

    coord.reopen_task("t").await.unwrap();
    let task = coord.tasks().await.into_iter().next().unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.completed_at.is_none());
}

#[tokio::test]
async fn fetch_all_replaces_wholesale_and_marks_sync() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![
        server_task("a", "A", Lane::Main),
        server_task("b", "B", Lane::Controller),
    ]);

    assert!(coord.last_sync().await.is_none());
    coord.fetch_all().await.unwrap();

    assert_eq!(coord.tasks().await.len(), 2);
    assert!(coord.last_sync().await.is_some());
}

#[tokio::test]
async fn fetch_all_network_failure_while_offline_is_suppressed() {
    let (coord, remote, _store) = coordinator();
    remote.seed(vec![server_task("cached", "Cached", Lane::Main)]);
    coord.fetch_all().await.unwrap();

    coord.set_online_status(false).await;
    remote.script_list(Err(SyncError::network("no route to host")));

    // Cached data remains authoritative; no error escapes.
    coord.fetch_all().await.unwrap();
    assert_eq!(coord.tasks().await.len(), 1);
}

#[tokio::test]
async fn fetch_all_network_failure_while_online_flips_offline() {
    let (coord, remote, _store) = coordinator();
    remote.script_list(Err(SyncError::network("down")));

    let err = coord.fetch_all().await.unwrap_err();
    assert!(err.is_connectivity());
    assert!(!coord.is_online().await);
}

#[tokio::test]
async fn update_unknown_id_is_an_application_error() {
    let (coord, _remote, _store) = coordinator();
    let err = coord
        .update_task("ghost", TaskPatch::default())
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::Application { .. });
    assert_eq!(coord.pending_count().await, 0);
}
