//! Engine configuration module
//!
//! Provides configuration for the sync engine: remote endpoint, bearer
//! token, owning user, and the key the persisted snapshot is stored under.

use thiserror::Error;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Default key for the persisted `{tasks, pending_syncs, last_sync}` snapshot
pub const DEFAULT_SNAPSHOT_KEY: &str = "driftsync.state";

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    server_url: String,
    api_token: Option<String>,
    user_id: String,
    snapshot_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let server_url = std::env::var("DRIFTSYNC_API_URL")
            .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        Self {
            server_url,
            api_token: None,
            user_id: "local".to_string(),
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

impl SyncConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Set the bearer token used by the HTTP client
    pub fn set_token(&mut self, token: Option<String>) {
        self.api_token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&String> {
        self.api_token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.api_token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Owning-user reference stamped onto optimistic tasks
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Key the persisted snapshot is stored under
    pub fn snapshot_key(&self) -> &str {
        &self.snapshot_key
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    server_url: Option<String>,
    api_token: Option<String>,
    user_id: Option<String>,
    snapshot_key: Option<String>,
}

impl SyncConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the bearer token
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the owning user id
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the snapshot storage key
    pub fn snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = Some(key.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let server_url = self.server_url.unwrap_or(defaults.server_url);
        if server_url.is_empty() {
            return Err(ConfigError::MissingValue("server_url"));
        }
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(server_url));
        }
        let user_id = self.user_id.unwrap_or(defaults.user_id);
        if user_id.is_empty() {
            return Err(ConfigError::MissingValue("user_id"));
        }
        Ok(SyncConfig {
            server_url,
            api_token: self.api_token,
            user_id,
            snapshot_key: self.snapshot_key.unwrap_or(defaults.snapshot_key),
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
