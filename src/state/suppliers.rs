//! Built-in buffer-state suppliers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{DynamicConfig, BUFFERING_ACTIVE_KEY};
use crate::error::{AdmissionResult, ValidationError};

use super::{BufferState, BufferStateSupplier};

/// Supplier returning a fixed state that can be flipped at runtime.
#[derive(Debug)]
pub struct StaticBufferState {
    active: AtomicBool,
}

impl StaticBufferState {
    /// Creates the supplier in the given state.
    #[must_use]
    pub fn new(state: BufferState) -> Self {
        Self {
            active: AtomicBool::new(state.is_active()),
        }
    }

    /// Replaces the current state.
    pub fn set(&self, state: BufferState) {
        self.active.store(state.is_active(), Ordering::SeqCst);
    }
}

impl BufferStateSupplier for StaticBufferState {
    fn name(&self) -> &str {
        "static"
    }

    fn state(&self) -> AdmissionResult<BufferState> {
        Ok(BufferState::from(self.active.load(Ordering::SeqCst)))
    }
}

/// Operator switch backed by [`DynamicConfig`].
///
/// Reads [`BUFFERING_ACTIVE_KEY`] (default `false`) on every call.
pub struct ConfigBufferStateSupplier {
    config: Arc<dyn DynamicConfig>,
}

impl ConfigBufferStateSupplier {
    /// Creates the supplier.
    #[must_use]
    pub fn new(config: Arc<dyn DynamicConfig>) -> Self {
        Self { config }
    }
}

impl fmt::Debug for ConfigBufferStateSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBufferStateSupplier").finish_non_exhaustive()
    }
}

impl BufferStateSupplier for ConfigBufferStateSupplier {
    fn name(&self) -> &str {
        "config"
    }

    fn state(&self) -> AdmissionResult<BufferState> {
        Ok(BufferState::from(self.config.is_enabled(BUFFERING_ACTIVE_KEY, false)?))
    }
}

/// Source of the number of currently running executions.
pub trait ActiveExecutionCounter: Send + Sync {
    /// Returns the current count.
    fn active_executions(&self) -> AdmissionResult<u64>;
}

/// Activates buffering when the system is busy.
///
/// Buffering is active while the running-execution count is at or above the
/// threshold.
pub struct ActiveExecutionsBufferStateSupplier {
    counter: Arc<dyn ActiveExecutionCounter>,
    threshold: u64,
}

impl ActiveExecutionsBufferStateSupplier {
    /// Creates the supplier.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidThreshold`] if `threshold` is zero.
    pub fn new(
        counter: Arc<dyn ActiveExecutionCounter>,
        threshold: u64,
    ) -> Result<Self, ValidationError> {
        if threshold == 0 {
            return Err(ValidationError::InvalidThreshold { value: threshold });
        }
        Ok(Self { counter, threshold })
    }

    /// Returns the configured threshold.
    #[must_use]
    pub const fn threshold(&self) -> u64 {
        self.threshold
    }
}

impl fmt::Debug for ActiveExecutionsBufferStateSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveExecutionsBufferStateSupplier")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl BufferStateSupplier for ActiveExecutionsBufferStateSupplier {
    fn name(&self) -> &str {
        "active_executions"
    }

    fn state(&self) -> AdmissionResult<BufferState> {
        let active = self.counter.active_executions()?;
        let state = BufferState::from(active >= self.threshold);
        tracing::trace!(active, threshold = self.threshold, %state, "buffer state computed");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use super::*;
    use crate::config::StaticConfig;
    use crate::error::BufferStateError;

    struct FixedCount(AtomicU64);

    impl ActiveExecutionCounter for FixedCount {
        fn active_executions(&self) -> AdmissionResult<u64> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    struct Unreachable;

    impl ActiveExecutionCounter for Unreachable {
        fn active_executions(&self) -> AdmissionResult<u64> {
            Err(BufferStateError::Unavailable {
                supplier: "active_executions".to_string(),
                message: "repository unreachable".to_string(),
            }
            .into())
        }
    }

    #[test]
    fn test_static_state_flips() {
        let supplier = StaticBufferState::new(BufferState::Inactive);
        assert_eq!(supplier.state().unwrap(), BufferState::Inactive);
        supplier.set(BufferState::Active);
        assert_eq!(supplier.state().unwrap(), BufferState::Active);
    }

    #[test]
    fn test_config_switch_defaults_inactive() {
        let config = Arc::new(StaticConfig::new());
        let supplier = ConfigBufferStateSupplier::new(config.clone());
        assert_eq!(supplier.state().unwrap(), BufferState::Inactive);

        config.set(BUFFERING_ACTIVE_KEY, true).unwrap();
        assert_eq!(supplier.state().unwrap(), BufferState::Active);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let counter = Arc::new(FixedCount(AtomicU64::new(9)));
        let supplier = ActiveExecutionsBufferStateSupplier::new(counter.clone(), 10).unwrap();
        assert_eq!(supplier.state().unwrap(), BufferState::Inactive);

        counter.0.store(10, Ordering::SeqCst);
        assert_eq!(supplier.state().unwrap(), BufferState::Active);

        counter.0.store(250, Ordering::SeqCst);
        assert_eq!(supplier.state().unwrap(), BufferState::Active);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let counter = Arc::new(FixedCount(AtomicU64::new(0)));
        assert!(matches!(
            ActiveExecutionsBufferStateSupplier::new(counter, 0),
            Err(ValidationError::InvalidThreshold { value: 0 })
        ));
    }

    #[test]
    fn test_counter_failure_propagates() {
        let supplier = ActiveExecutionsBufferStateSupplier::new(Arc::new(Unreachable), 1).unwrap();
        assert!(supplier.state().unwrap_err().is_buffer_state());
    }
}
