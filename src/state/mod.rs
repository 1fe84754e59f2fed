//! Buffer state: is admission control currently holding executions back.
//!
//! The state is pulled from a [`BufferStateSupplier`] exactly once per
//! admission cycle and never cached.

mod suppliers;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AdmissionResult;

pub use suppliers::{
    ActiveExecutionCounter, ActiveExecutionsBufferStateSupplier, ConfigBufferStateSupplier,
    StaticBufferState,
};

/// Whether buffering is currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BufferState {
    /// Policies are consulted for every new execution.
    Active,
    /// Every execution passes through untouched.
    Inactive,
}

impl BufferState {
    /// Returns true if buffering is in effect.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Gauge value: `1.0` when active, `0.0` otherwise.
    #[must_use]
    pub const fn as_gauge(&self) -> f64 {
        match self {
            Self::Active => 1.0,
            Self::Inactive => 0.0,
        }
    }
}

impl From<bool> for BufferState {
    fn from(active: bool) -> Self {
        if active {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

impl fmt::Display for BufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("ACTIVE"),
            Self::Inactive => f.write_str("INACTIVE"),
        }
    }
}

/// Zero-argument oracle for the current [`BufferState`].
pub trait BufferStateSupplier: Send + Sync {
    /// Returns a short stable identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Reads the current state.
    fn state(&self) -> AdmissionResult<BufferState>;
}
