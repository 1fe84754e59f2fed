//! Error types for execbuffer.
//!
//! All errors are strongly typed using thiserror so callers can pattern
//! match on the failing collaborator. The aggregation step itself never
//! fails; everything here originates at a seam (policy, configuration,
//! buffer-state supplier) or at input validation.

use thiserror::Error;

/// Validation errors raised while constructing decisions, settings or policies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Decision reason cannot be empty")]
    EmptyReason,

    #[error("Threshold {value} must be greater than zero")]
    InvalidThreshold {
        value: u64,
    },

    #[error("Invalid application pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid admission settings: {reason}")]
    InvalidSettings {
        reason: String,
    },
}

/// Failure reported by a policy while evaluating an execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Policy '{policy}' failed: {message}")]
    Failed {
        policy: String,
        message: String,
    },
}

impl PolicyError {
    /// Creates a policy failure.
    #[must_use]
    pub fn failed(policy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            policy: policy.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the dynamic configuration collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config key '{key}' unavailable: {message}")]
    Unavailable {
        key: String,
        message: String,
    },

    #[error("Failed to parse settings: {message}")]
    Parse {
        message: String,
    },

    #[error("Failed to read settings from {path}: {message}")]
    Io {
        path: String,
        message: String,
    },
}

/// Errors raised by a buffer-state supplier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferStateError {
    #[error("Buffer state supplier '{supplier}' unavailable: {message}")]
    Unavailable {
        supplier: String,
        message: String,
    },
}

/// Top-level error type for execbuffer.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Buffer state error: {0}")]
    BufferState(#[from] BufferStateError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl AdmissionError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if a policy failed.
    #[must_use]
    pub const fn is_policy(&self) -> bool {
        matches!(self, Self::Policy(_))
    }

    /// Returns true if the configuration collaborator failed.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if the buffer-state supplier failed.
    #[must_use]
    pub const fn is_buffer_state(&self) -> bool {
        matches!(self, Self::BufferState(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Policy(_) => "policy_failed",
            Self::Config(_) => "config_unavailable",
            Self::BufferState(_) => "buffer_state_unavailable",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for execbuffer operations.
pub type AdmissionResult<T> = Result<T, AdmissionError>;
