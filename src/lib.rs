//! Driftsync - Offline-First Task Sync Engine
//!
//! Driftsync is the synchronization core of a personal task tracker. It
//! lets a caller mutate a task collection instantly while disconnected,
//! queues those mutations, and reconciles them with a remote CRUD service
//! once connectivity returns, with rollback on failure.
//!
//! # Overview
//!
//! This library provides:
//! - Optimistic mutations applied to an in-memory repository before the
//!   server has confirmed them
//! - A FIFO queue of pending operations replayed in order on reconnection
//! - Exact rollback to the pre-mutation snapshot when the server rejects
//! - A durable `{tasks, pending_syncs, last_sync}` snapshot so a restart
//!   shows cached state immediately
//!
//! # Module Structure
//!
//! - **`task`** - the task model and its create/patch payload types
//! - **`repository`** - in-memory authoritative task collection
//! - **`queue`** - pending operations awaiting remote application
//! - **`state`** - the explicit engine state record and its transitions
//! - **`coordinator`** - the orchestrating state machine and public contract
//! - **`remote`** - the remote CRUD contract and its HTTP implementation
//! - **`persistence`** - the key/value snapshot contract and stores
//! - **`monitor`** - relays platform connectivity events
//! - **`config`** - engine configuration
//! - **`error`** - the error taxonomy driving recovery decisions
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use driftsync::{
//!     HttpRemoteClient, JsonFileStore, Lane, NewTask, SyncConfig, SyncCoordinator,
//! };
//!
//! # async fn example() -> Result<(), driftsync::SyncError> {
//! let config = SyncConfig::builder()
//!     .server_url("https://tasks.example.com")
//!     .user_id("user-1")
//!     .build()
//!     .expect("valid config");
//!
//! let remote = HttpRemoteClient::new(config.clone());
//! let store = JsonFileStore::default_location()?;
//! let coordinator = Arc::new(SyncCoordinator::new(remote, store, config));
//!
//! coordinator.init().await?;
//! coordinator.create_task(NewTask::new("Water the plants", Lane::Main)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every failure is either *connectivity-classified* (the request never
//! reached the server) or an application failure (the server responded
//! with a rejection). Connectivity failures are recovered locally: the
//! engine flips offline and queues the operation for replay. Application
//! failures are rolled back, surfaced, and never retried automatically.
//!
//! # Concurrency
//!
//! All engine state lives behind one async lock inside the coordinator.
//! Optimistic writes happen in a single critical section; remote calls are
//! awaited with no lock held, and their continuations are fenced so a slow
//! response cannot resurrect state a later mutation already replaced.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod monitor;
pub mod persistence;
pub mod queue;
pub mod remote;
pub mod repository;
pub mod state;
pub mod task;

pub use config::{ConfigError, SyncConfig, SyncConfigBuilder, DEFAULT_SNAPSHOT_KEY};
pub use coordinator::SyncCoordinator;
pub use error::SyncError;
pub use monitor::{ConnectivityEvent, ConnectivityMonitor};
pub use persistence::{CachedState, JsonFileStore, MemoryStore, SnapshotStore};
pub use queue::{PendingOperation, SyncAction, SyncQueue};
pub use remote::{HttpRemoteClient, RemoteClient};
pub use repository::TaskRepository;
pub use state::{StateSnapshot, SyncState};
pub use task::{FocusDuration, Lane, NewTask, Task, TaskPatch, TaskStatus, TEMP_ID_PREFIX};
