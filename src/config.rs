//! Runtime configuration.
//!
//! Two layers:
//! - [`DynamicConfig`]: a key/boolean lookup consulted fresh on every
//!   admission cycle, so flags can flip at runtime.
//! - [`AdmissionSettings`]: static, serde-loadable settings used to seed the
//!   dynamic flags and to build the built-in policies and suppliers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::decision::Action;
use crate::error::{AdmissionError, AdmissionResult, ConfigError, ValidationError};

/// Flag: is admission control enabled at all.
pub const ENABLED_KEY: &str = "admission.enabled";
/// Flag: are decisions observed only (learning mode).
pub const LEARNING_MODE_KEY: &str = "admission.learning-mode.enabled";
/// Flag: operator switch read by [`crate::state::ConfigBufferStateSupplier`].
pub const BUFFERING_ACTIVE_KEY: &str = "admission.buffering.active";

/// Default for [`ENABLED_KEY`].
pub const ENABLED_DEFAULT: bool = false;
/// Default for [`LEARNING_MODE_KEY`].
pub const LEARNING_MODE_DEFAULT: bool = true;

/// Dynamic key/boolean lookup.
///
/// Implementations may hit a remote service; errors propagate to the caller
/// unchanged.
pub trait DynamicConfig: Send + Sync {
    /// Returns the value of `key`, or `default` if the key is unset.
    fn is_enabled(&self, key: &str, default: bool) -> AdmissionResult<bool>;
}

/// Thread-safe in-memory [`DynamicConfig`].
#[derive(Debug, Default)]
pub struct StaticConfig {
    flags: RwLock<HashMap<String, bool>>,
}

impl StaticConfig {
    /// Creates an empty config; every lookup returns its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config seeded from settings.
    #[must_use]
    pub fn from_settings(settings: &AdmissionSettings) -> Self {
        let mut flags = HashMap::with_capacity(2);
        flags.insert(ENABLED_KEY.to_string(), settings.enabled);
        flags.insert(LEARNING_MODE_KEY.to_string(), settings.learning_mode);
        Self {
            flags: RwLock::new(flags),
        }
    }

    /// Sets a flag.
    pub fn set(&self, key: impl Into<String>, value: bool) -> AdmissionResult<()> {
        let mut guard = self
            .flags
            .write()
            .map_err(|_| AdmissionError::internal("config lock poisoned"))?;
        guard.insert(key.into(), value);
        Ok(())
    }

    /// Removes a flag so lookups fall back to their default.
    pub fn unset(&self, key: &str) -> AdmissionResult<()> {
        let mut guard = self
            .flags
            .write()
            .map_err(|_| AdmissionError::internal("config lock poisoned"))?;
        guard.remove(key);
        Ok(())
    }
}

impl DynamicConfig for StaticConfig {
    fn is_enabled(&self, key: &str, default: bool) -> AdmissionResult<bool> {
        let guard = self
            .flags
            .read()
            .map_err(|_| AdmissionError::internal("config lock poisoned"))?;
        Ok(guard.get(key).copied().unwrap_or(default))
    }
}

/// A regex-based vote on application names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRule {
    /// Regex matched against the execution's application.
    pub pattern: String,
    /// Vote cast when the pattern matches.
    pub action: Action,
    /// Whether the vote overrides all others.
    #[serde(default)]
    pub force: bool,
    /// Reason attached to the vote.
    pub reason: String,
}

/// Static admission settings.
///
/// ```
/// use execbuffer::AdmissionSettings;
///
/// let settings = AdmissionSettings::from_json_str(r#"{ "enabled": true }"#).unwrap();
/// assert!(settings.enabled);
/// assert!(settings.learning_mode);
/// assert_eq!(settings.active_executions_threshold, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionSettings {
    /// Initial value of [`ENABLED_KEY`].
    pub enabled: bool,
    /// Initial value of [`LEARNING_MODE_KEY`].
    pub learning_mode: bool,
    /// Running-execution count at which buffering becomes active.
    pub active_executions_threshold: u64,
    /// Orchestration origins that are always enqueued.
    pub enqueue_origins: Vec<String>,
    /// Application rules, evaluated as a single policy.
    pub application_rules: Vec<ApplicationRule>,
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self {
            enabled: ENABLED_DEFAULT,
            learning_mode: LEARNING_MODE_DEFAULT,
            active_executions_threshold: 100,
            enqueue_origins: vec!["deck".to_string()],
            application_rules: Vec::new(),
        }
    }
}

impl AdmissionSettings {
    /// Parses and validates settings from JSON.
    pub fn from_json_str(json: &str) -> AdmissionResult<Self> {
        let settings: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> AdmissionResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks invariants not expressible in the type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.active_executions_threshold == 0 {
            return Err(ValidationError::InvalidThreshold { value: 0 });
        }
        for rule in &self.application_rules {
            if rule.reason.trim().is_empty() {
                return Err(ValidationError::InvalidSettings {
                    reason: format!("application rule '{}' has an empty reason", rule.pattern),
                });
            }
            regex::Regex::new(&rule.pattern).map_err(|e| ValidationError::InvalidPattern {
                pattern: rule.pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
