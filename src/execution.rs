//! Execution records under admission.
//!
//! An [`Execution`] is owned by the surrounding orchestration system. The
//! admission engine reads every field but only ever writes `status`, and only
//! when an enforced BUFFER decision is applied.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique execution identifier.
///
/// # Examples
///
/// ```
/// use execbuffer::ExecutionId;
///
/// let id = ExecutionId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Creates a new random execution ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an execution ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an execution.
///
/// Only [`ExecutionStatus::Buffered`] is ever written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Created, not yet picked up by the execution pipeline.
    #[default]
    NotStarted,
    /// Held back by admission control until released.
    Buffered,
    /// Currently running.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with a failure.
    Terminal,
    /// Canceled by a user or the system.
    Canceled,
}

impl ExecutionStatus {
    /// Returns true if the execution has finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Terminal | Self::Canceled)
    }
}

/// Kind of workflow being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    /// A pipeline run, usually started by a trigger.
    Pipeline,
    /// An ad-hoc orchestration, usually started interactively.
    Orchestration,
}

/// A workflow execution about to be admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Unique identifier.
    pub id: ExecutionId,
    /// Pipeline or orchestration.
    pub kind: ExecutionKind,
    /// Owning application.
    pub application: String,
    /// Human-readable name (pipeline name or orchestration description).
    pub name: String,
    /// Where the request came from (e.g. `"api"`, `"deck"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Trigger type (e.g. `"cron"`, `"git"`, `"manual"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
    /// Current lifecycle status.
    pub status: ExecutionStatus,
    /// When the execution record was created.
    pub created_at: DateTime<Utc>,
    /// Additional fields policies may inspect.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Execution {
    /// Creates a new, not-yet-started pipeline execution.
    #[must_use]
    pub fn pipeline(application: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ExecutionKind::Pipeline, application, name)
    }

    /// Creates a new, not-yet-started orchestration.
    #[must_use]
    pub fn orchestration(application: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ExecutionKind::Orchestration, application, name)
    }

    fn new(kind: ExecutionKind, application: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ExecutionId::new(),
            kind,
            application: application.into(),
            name: name.into(),
            origin: None,
            trigger_type: None,
            status: ExecutionStatus::NotStarted,
            created_at: Utc::now(),
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the request origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the trigger type.
    #[must_use]
    pub fn with_trigger_type(mut self, trigger_type: impl Into<String>) -> Self {
        self.trigger_type = Some(trigger_type.into());
        self
    }

    /// Adds a free-form attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns an attribute value, if present.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns true if the execution is an orchestration.
    #[must_use]
    pub const fn is_orchestration(&self) -> bool {
        matches!(self.kind, ExecutionKind::Orchestration)
    }

    /// Returns true if the execution has been buffered.
    #[must_use]
    pub const fn is_buffered(&self) -> bool {
        matches!(self.status, ExecutionStatus::Buffered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pipeline_not_started() {
        let execution = Execution::pipeline("orders", "deploy");
        assert_eq!(execution.kind, ExecutionKind::Pipeline);
        assert_eq!(execution.status, ExecutionStatus::NotStarted);
        assert!(!execution.is_buffered());
        assert!(!execution.id.is_nil());
    }

    #[test]
    fn test_orchestration_builder() {
        let execution = Execution::orchestration("orders", "resize server group")
            .with_origin("deck")
            .with_trigger_type("manual")
            .with_attribute("user", "alice@example.com");

        assert!(execution.is_orchestration());
        assert_eq!(execution.origin.as_deref(), Some("deck"));
        assert_eq!(execution.trigger_type.as_deref(), Some("manual"));
        assert_eq!(execution.attribute("user"), Some("alice@example.com"));
        assert_eq!(execution.attribute("missing"), None);
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&ExecutionStatus::Buffered).unwrap();
        assert_eq!(json, "\"BUFFERED\"");
        assert!(ExecutionStatus::Canceled.is_complete());
        assert!(!ExecutionStatus::Buffered.is_complete());
    }
}
