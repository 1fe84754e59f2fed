use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What should happen to an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Hold the execution back.
    Buffer,
    /// Let the execution proceed immediately.
    Enqueue,
}

impl Action {
    /// Returns a short stable identifier suitable for logging/metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::Enqueue => "enqueue",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single policy's vote on an execution.
///
/// `reason` is always non-empty. A `force`d decision short-circuits
/// aggregation and wins over every other vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    action: Action,
    force: bool,
    reason: String,
}

impl Decision {
    /// Creates a validated decision.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyReason`] if `reason` is empty or blank.
    pub fn new(
        action: Action,
        force: bool,
        reason: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ValidationError::EmptyReason);
        }
        Ok(Self { action, force, reason })
    }

    /// Non-forced BUFFER vote.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyReason`] if `reason` is empty or blank.
    pub fn buffer(reason: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Action::Buffer, false, reason)
    }

    /// Non-forced ENQUEUE vote.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyReason`] if `reason` is empty or blank.
    pub fn enqueue(reason: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Action::Enqueue, false, reason)
    }

    /// Marks this decision as forced.
    #[must_use]
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// The voted action.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Whether this decision overrides all others.
    #[must_use]
    pub const fn is_forced(&self) -> bool {
        self.force
    }

    /// Human-readable justification.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            action: Action,
            #[serde(default)]
            force: bool,
            reason: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        Decision::new(raw.action, raw.force, raw.reason).map_err(serde::de::Error::custom)
    }
}
