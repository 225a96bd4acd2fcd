//! Sync Error Types
//!
//! This module defines the error taxonomy used across the sync engine.
//! The distinction that drives all recovery behavior is whether a failure
//! is *connectivity-classified* (the request never reached the server) or
//! an application failure (the server responded with a rejection).
//!
//! # Error Categories
//!
//! - `Network` - transport failure, no response reached the client
//! - `Application` - the remote service explicitly rejected the operation
//! - `Serialization` - JSON encode/decode failures
//! - `Persistence` - local key/value store failures
//! - `Unknown` - anything else, treated as application-level for propagation
//!
//! # Usage
//!
//! ```rust
//! use driftsync::SyncError;
//!
//! let error = SyncError::application("title must not be empty", Some(422));
//! assert!(!error.is_connectivity());
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across task
//! boundaries.
use thiserror::Error;

/// Errors produced by the sync engine and its collaborators
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Transport failure; the request never reached the server
    #[error("network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// The remote service responded with a rejection
    #[error("remote rejected operation: {message}")]
    Application {
        /// Human-readable error message
        message: String,
        /// HTTP status code, when one was received
        status: Option<u16>,
    },

    /// JSON serialization or deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// Local key/value store failure
    #[error("persistence error: {message}")]
    Persistence {
        /// Human-readable error message
        message: String,
    },

    /// Unclassified failure
    #[error("unknown error: {message}")]
    Unknown {
        /// Human-readable error message
        message: String,
    },
}

impl SyncError {
    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new application error
    pub fn application(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Application {
            message: message.into(),
            status,
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a new unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Whether this failure is attributable to lack of network reachability.
    ///
    /// Connectivity-classified failures are recovered locally: the engine
    /// flips offline and queues the operation for replay. Everything else
    /// is surfaced to the caller and never retried automatically.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
