//! # Remote Client
//!
//! The remote CRUD contract consumed by the coordinator, and the HTTP
//! implementation of it.
//!
//! Every operation fails with either a connectivity-classified
//! [`SyncError::Network`] (the request never reached the server) or an
//! application-level error (the server responded with a rejection). The
//! coordinator branches on that distinction for all rollback/enqueue
//! decisions, so the mapping here is load-bearing.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::task::{NewTask, Task, TaskPatch};

/// Remote CRUD operations for tasks
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch the full task list
    async fn list(&self) -> Result<Vec<Task>, SyncError>;

    /// Create a task; the response carries the server-issued id
    async fn create(&self, fields: &NewTask) -> Result<Task, SyncError>;

    /// Apply a partial update
    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, SyncError>;

    /// Delete a task
    async fn delete(&self, id: &str) -> Result<(), SyncError>;
}

#[async_trait]
impl<T> RemoteClient for std::sync::Arc<T>
where
    T: RemoteClient + ?Sized,
{
    async fn list(&self) -> Result<Vec<Task>, SyncError> {
        (**self).list().await
    }

    async fn create(&self, fields: &NewTask) -> Result<Task, SyncError> {
        (**self).create(fields).await
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, SyncError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        (**self).delete(id).await
    }
}

/// HTTP implementation of [`RemoteClient`]
pub struct HttpRemoteClient {
    config: SyncConfig,
    client: Client,
}

impl HttpRemoteClient {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn tasks_url(&self) -> String {
        self.config.api_url("/api/tasks")
    }

    fn task_url(&self, id: &str) -> String {
        self.config.api_url(&format!("/api/tasks/{}", id))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.get_token() {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// A send-level failure means no response reached us
    fn transport_error(err: reqwest::Error) -> SyncError {
        SyncError::network(format!("request failed: {}", err))
    }

    /// Turn a non-success response into an application error carrying the
    /// status code and whatever message body the server produced.
    async fn reject(response: reqwest::Response) -> SyncError {
        let status = response.status();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        SyncError::application(message, Some(status.as_u16()))
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn list(&self) -> Result<Vec<Task>, SyncError> {
        let response = self
            .authorize(self.client.get(self.tasks_url()))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        response
            .json::<Vec<Task>>()
            .await
            .map_err(|e| SyncError::serialization(format!("failed to parse task list: {}", e)))
    }

    async fn create(&self, fields: &NewTask) -> Result<Task, SyncError> {
        let response = self
            .authorize(self.client.post(self.tasks_url()))
            .json(fields)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        response
            .json::<Task>()
            .await
            .map_err(|e| SyncError::serialization(format!("failed to parse created task: {}", e)))
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, SyncError> {
        let response = self
            .authorize(self.client.patch(self.task_url(id)))
            .json(patch)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        response
            .json::<Task>()
            .await
            .map_err(|e| SyncError::serialization(format!("failed to parse updated task: {}", e)))
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let response = self
            .authorize(self.client.delete(self.task_url(id)))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        Ok(())
    }
}
