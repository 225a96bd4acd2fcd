//! # Task Model
//!
//! Core data types for the task collection: the [`Task`] entity itself,
//! the enumerations that partition it, and the payload types used when
//! talking to the remote service ([`NewTask`] for creation, [`TaskPatch`]
//! for partial updates).
//!
//! ## Temporary Ids
//!
//! A task created while unconfirmed carries a client-generated id with the
//! `tmp-` prefix. The id is swapped for the server-issued one in a single
//! repository operation once the create is acknowledged, so no moment exists
//! where both records appear.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Prefix marking client-generated ids awaiting server confirmation
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Categorical grouping used to partition tasks for ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Primary backlog lane
    Main,
    /// Focus lane; the only lane where a duration is meaningful
    Controller,
}

impl Lane {
    /// Whether tasks in this lane carry a focus duration
    pub fn supports_duration(self) -> bool {
        matches!(self, Lane::Controller)
    }
}

/// Completion state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

/// Focus duration bucket, meaningful only in the controller lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusDuration {
    Short,
    Medium,
    Long,
}

/// One user-visible work item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Server-issued id, or a `tmp-` prefixed placeholder
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub lane: Lane,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<FocusDuration>,
    /// Ordering within the lane
    pub position: i64,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Owning-user reference, opaque to the engine
    pub user_id: String,
}

impl Task {
    /// Generate a fresh temporary id
    pub fn temp_id() -> String {
        format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
    }

    /// Whether an id is a client-generated placeholder
    pub fn is_temp_id(id: &str) -> bool {
        id.starts_with(TEMP_ID_PREFIX)
    }

    /// Build the optimistic in-memory record for a create that has not yet
    /// been confirmed by the server.
    pub fn optimistic(new: &NewTask, user_id: &str) -> Self {
        let now = now_rfc3339();
        Self {
            id: Self::temp_id(),
            title: new.title.clone(),
            description: new.description.clone(),
            lane: new.lane,
            status: new.status,
            duration: new.duration,
            position: new.position,
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
            user_id: user_id.to_string(),
        }
    }
}

/// Fields for a task creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub lane: Lane,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<FocusDuration>,
    pub status: TaskStatus,
    pub position: i64,
}

impl NewTask {
    /// Create-fields with defaults: pending, no description, position 0.
    ///
    /// The coordinator overwrites `position` with the lane count at the
    /// moment the optimistic record is inserted.
    pub fn new(title: impl Into<String>, lane: Lane) -> Self {
        Self {
            title: title.into(),
            description: None,
            lane,
            duration: None,
            status: TaskStatus::Pending,
            position: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_duration(mut self, duration: FocusDuration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Partial task update.
///
/// `duration` and `completed_at` are doubly-optional: the outer `None`
/// leaves the field alone, `Some(None)` clears it, `Some(Some(v))` sets it.
/// On the wire the outer `None` is omitted and `Some(None)` serializes as
/// an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<Lane>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Option<FocusDuration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<Option<String>>,
}

impl TaskPatch {
    /// Merge the patch into a task and refresh `updated_at`
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(lane) = self.lane {
            task.lane = lane;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(duration) = self.duration {
            task.duration = duration;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
        if let Some(completed_at) = &self.completed_at {
            task.completed_at = completed_at.clone();
        }
        task.updated_at = now_rfc3339();
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Present-but-null deserializes to `Some(None)` rather than collapsing
/// into the outer `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Current time as an RFC 3339 string
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
