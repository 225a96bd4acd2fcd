//! HTTP remote client integration tests
//!
//! Exercises the reqwest-backed client against a mock server, with
//! particular attention to the error classification the coordinator
//! depends on.

use driftsync::{Lane, NewTask, RemoteClient, SyncConfig, SyncError, TaskPatch};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::server_task;

fn client_for(server: &MockServer) -> driftsync::HttpRemoteClient {
    let config = SyncConfig::builder()
        .server_url(server.uri())
        .api_token("secret")
        .user_id("user-1")
        .build()
        .unwrap();
    driftsync::HttpRemoteClient::new(config)
}

#[tokio::test]
async fn list_returns_tasks_with_bearer_auth() {
    let server = MockServer::start().await;
    let tasks = vec![
        server_task("t1", "First", Lane::Main),
        server_task("t2", "Second", Lane::Controller),
    ];
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&tasks))
        .mount(&server)
        .await;

    let listed = client_for(&server).list().await.unwrap();
    assert_eq!(listed, tasks);
}

#[tokio::test]
async fn create_posts_fields_and_parses_server_record() {
    let server = MockServer::start().await;
    let fields = NewTask::new("New task", Lane::Main);
    let created = server_task("srv-9", "New task", Lane::Main);
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_json(&fields))
        .respond_with(ResponseTemplate::new(201).set_body_json(&created))
        .mount(&server)
        .await;

    let task = client_for(&server).create(&fields).await.unwrap();
    assert_eq!(task, created);
}

#[tokio::test]
async fn update_patches_single_task() {
    let server = MockServer::start().await;
    let patch = TaskPatch {
        title: Some("Renamed".to_string()),
        ..Default::default()
    };
    let updated = server_task("t1", "Renamed", Lane::Main);
    Mock::given(method("PATCH"))
        .and(path("/api/tasks/t1"))
        .and(body_json(&patch))
        .respond_with(ResponseTemplate::new(200).set_body_json(&updated))
        .mount(&server)
        .await;

    let task = client_for(&server).update("t1", &patch).await.unwrap();
    assert_eq!(task.title, "Renamed");
}

#[tokio::test]
async fn delete_succeeds_on_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/t1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client_for(&server).delete("t1").await.unwrap();
}

#[tokio::test]
async fn rejection_maps_to_application_error_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(422).set_body_string("title must not be empty"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create(&NewTask::new("", Lane::Main))
        .await
        .unwrap_err();

    assert!(!err.is_connectivity());
    match err {
        SyncError::Application { message, status } => {
            assert_eq!(status, Some(422));
            assert!(message.contains("title must not be empty"));
        }
        other => panic!("expected application error, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_status_is_still_an_application_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/t1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server).delete("t1").await.unwrap_err();
    // The server responded; this is not a connectivity failure.
    assert!(!err.is_connectivity());
}

#[tokio::test]
async fn unreachable_host_maps_to_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let config = SyncConfig::builder()
        .server_url(uri)
        .user_id("user-1")
        .build()
        .unwrap();
    let err = driftsync::HttpRemoteClient::new(config)
        .list()
        .await
        .unwrap_err();

    assert!(err.is_connectivity(), "expected network error, got {:?}", err);
}

#[tokio::test]
async fn malformed_body_maps_to_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).list().await.unwrap_err();
    assert!(matches!(err, SyncError::Serialization { .. }));
}
