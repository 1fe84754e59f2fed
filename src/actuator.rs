//! Buffer actuator: one admission decision per new execution.
//!
//! ```text
//! before_initial_persist(execution)
//!   ├─ admission.enabled == false ──────────────► Disabled   (no side effects)
//!   ├─ buffer state INACTIVE ──► gauge = 0 ─────► Inactive
//!   └─ ACTIVE ──► gauge = 1
//!        ┌─ timer ───────────────────────────────────────────────┐
//!        │ policies (descending order) ──► aggregate            │
//!        │   ├─ no policies ──────────────────────► NoDecision   │
//!        │   ├─ ENQUEUE ──► enqueued++ ───────────► Enqueued     │
//!        │   └─ BUFFER                                          │
//!        │        ├─ learning ──► buffered{learning=true}++     │
//!        │        └─ enforce  ──► status = BUFFERED,            │
//!        │                        buffered{learning=false}++    │
//!        └───────────────────────────────────────────────────────┘
//! ```
//!
//! Invocations on one actuator are serialized: the whole sequence above runs
//! under a single lock, so gauge and counter updates never interleave and a
//! buffer-state transition is never observed mid-decision.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{
    AdmissionSettings, DynamicConfig, ENABLED_DEFAULT, ENABLED_KEY, LEARNING_MODE_DEFAULT,
    LEARNING_MODE_KEY,
};
use crate::decision::{aggregate, Action, AggregateDecision};
use crate::error::{AdmissionResult, ValidationError};
use crate::execution::{Execution, ExecutionStatus};
use crate::metrics::{
    MetricsSink, NoopMetrics, Timer, ACTUATOR_ELAPSED, BUFFERING_ENABLED_GAUGE,
    EXECUTIONS_BUFFERED, EXECUTIONS_ENQUEUED,
};
use crate::policy::{
    AdmissionPolicy, ApplicationRulePolicy, EnqueueOriginsPolicy, PolicyRegistry,
};
use crate::state::BufferStateSupplier;

/// Hook invoked by the execution-creation flow before an execution is
/// persisted for the first time.
pub trait ExecutionListener: Send + Sync {
    /// Inspects and possibly mutates the execution. Errors abort creation.
    fn before_initial_persist(&self, execution: &mut Execution) -> AdmissionResult<()>;
}

/// Terminal state reached by one admission cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Admission control is switched off.
    Disabled,
    /// Buffering is not currently in effect.
    Inactive,
    /// No policies are registered.
    NoDecision,
    /// The execution proceeds on its existing path.
    Enqueued(AggregateDecision),
    /// The aggregate decision was BUFFER.
    Buffered {
        /// The combined decision.
        decision: AggregateDecision,
        /// True if the decision was only observed, not applied.
        learning: bool,
    },
}

impl AdmissionOutcome {
    /// Returns the aggregate decision, if policies were consulted.
    #[must_use]
    pub const fn decision(&self) -> Option<&AggregateDecision> {
        match self {
            Self::Enqueued(decision) | Self::Buffered { decision, .. } => Some(decision),
            Self::Disabled | Self::Inactive | Self::NoDecision => None,
        }
    }

    /// Returns true if the execution's status was changed.
    #[must_use]
    pub const fn mutated_execution(&self) -> bool {
        matches!(self, Self::Buffered { learning: false, .. })
    }
}

/// Orchestrates admission decisions and applies them.
pub struct BufferActuator {
    config: Arc<dyn DynamicConfig>,
    buffer_state: Arc<dyn BufferStateSupplier>,
    policies: PolicyRegistry,
    metrics: Arc<dyn MetricsSink>,
    serial: Mutex<()>,
}

impl BufferActuator {
    /// Creates an actuator.
    #[must_use]
    pub fn new(
        config: Arc<dyn DynamicConfig>,
        buffer_state: Arc<dyn BufferStateSupplier>,
        policies: PolicyRegistry,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            buffer_state,
            policies,
            metrics,
            serial: Mutex::new(()),
        }
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> BufferActuatorBuilder {
        BufferActuatorBuilder::default()
    }

    /// The registered policies, in evaluation order.
    #[must_use]
    pub const fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Runs one admission cycle for `execution`.
    ///
    /// # Errors
    /// Configuration, buffer-state and policy failures propagate unchanged;
    /// the execution is left untouched in that case.
    pub fn process(&self, execution: &mut Execution) -> AdmissionResult<AdmissionOutcome> {
        // The guard protects no data, so a poisoned lock is still usable.
        let _serial = self.serial.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.config.is_enabled(ENABLED_KEY, ENABLED_DEFAULT)? {
            return Ok(AdmissionOutcome::Disabled);
        }

        let state = self.buffer_state.state()?;
        self.metrics.set_gauge(BUFFERING_ENABLED_GAUGE, state.as_gauge());
        if !state.is_active() {
            tracing::trace!(
                execution_id = %execution.id,
                supplier = self.buffer_state.name(),
                "buffering inactive, admitting execution"
            );
            return Ok(AdmissionOutcome::Inactive);
        }

        let _timer = Timer::start(self.metrics.as_ref(), ACTUATOR_ELAPSED);

        let decisions = self.policies.evaluate(execution)?;
        let Some(decision) = aggregate(&decisions) else {
            return Ok(AdmissionOutcome::NoDecision);
        };

        match decision.action {
            Action::Buffer => {
                let learning = self.config.is_enabled(LEARNING_MODE_KEY, LEARNING_MODE_DEFAULT)?;
                if learning {
                    tracing::debug!(
                        execution_id = %execution.id,
                        application = %execution.application,
                        execution_name = %execution.name,
                        reason = %decision.reason,
                        forced = decision.force,
                        "learning mode: would have buffered execution"
                    );
                    self.metrics.increment(EXECUTIONS_BUFFERED, &[("learning", "true")]);
                } else {
                    execution.status = ExecutionStatus::Buffered;
                    tracing::warn!(
                        execution_id = %execution.id,
                        application = %execution.application,
                        execution_name = %execution.name,
                        reason = %decision.reason,
                        forced = decision.force,
                        "buffering execution"
                    );
                    self.metrics.increment(EXECUTIONS_BUFFERED, &[("learning", "false")]);
                }
                Ok(AdmissionOutcome::Buffered { decision, learning })
            }
            Action::Enqueue => {
                tracing::debug!(
                    execution_id = %execution.id,
                    application = %execution.application,
                    execution_name = %execution.name,
                    reason = %decision.reason,
                    forced = decision.force,
                    "enqueuing execution"
                );
                self.metrics.increment(EXECUTIONS_ENQUEUED, &[]);
                Ok(AdmissionOutcome::Enqueued(decision))
            }
        }
    }
}

impl ExecutionListener for BufferActuator {
    fn before_initial_persist(&self, execution: &mut Execution) -> AdmissionResult<()> {
        self.process(execution).map(|_| ())
    }
}

impl fmt::Debug for BufferActuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferActuator")
            .field("buffer_state", &self.buffer_state.name())
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BufferActuator`].
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use execbuffer::{
///     AlwaysBufferPolicy, BufferActuator, BufferState, EnqueueOriginsPolicy, InMemoryMetrics,
///     StaticBufferState, StaticConfig,
/// };
///
/// let actuator = BufferActuator::builder()
///     .config(Arc::new(StaticConfig::new()))
///     .buffer_state(Arc::new(StaticBufferState::new(BufferState::Active)))
///     .policy(EnqueueOriginsPolicy::new(["deck"]))
///     .policy(AlwaysBufferPolicy::new())
///     .metrics(Arc::new(InMemoryMetrics::new()))
///     .build()?;
/// assert_eq!(actuator.policies().names(), vec!["enqueue_origins", "always_buffer"]);
/// # Ok::<(), execbuffer::ValidationError>(())
/// ```
#[derive(Default)]
pub struct BufferActuatorBuilder {
    config: Option<Arc<dyn DynamicConfig>>,
    buffer_state: Option<Arc<dyn BufferStateSupplier>>,
    policies: Vec<Arc<dyn AdmissionPolicy>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl BufferActuatorBuilder {
    /// Set the dynamic configuration (required).
    #[must_use]
    pub fn config(mut self, config: Arc<dyn DynamicConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the buffer-state supplier (required).
    #[must_use]
    pub fn buffer_state(mut self, supplier: Arc<dyn BufferStateSupplier>) -> Self {
        self.buffer_state = Some(supplier);
        self
    }

    /// Register a policy.
    #[must_use]
    pub fn policy(mut self, policy: impl AdmissionPolicy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    /// Register a shared policy.
    #[must_use]
    pub fn shared_policy(mut self, policy: Arc<dyn AdmissionPolicy>) -> Self {
        self.policies.push(policy);
        self
    }

    /// Register the built-in policies described by `settings`.
    ///
    /// Adds an [`EnqueueOriginsPolicy`] when origins are configured and an
    /// [`ApplicationRulePolicy`] when rules are configured.
    ///
    /// # Errors
    /// Returns a validation error if the settings are invalid.
    pub fn settings_policies(
        mut self,
        settings: &AdmissionSettings,
    ) -> Result<Self, ValidationError> {
        settings.validate()?;
        if !settings.enqueue_origins.is_empty() {
            self = self.policy(EnqueueOriginsPolicy::from_settings(settings));
        }
        if !settings.application_rules.is_empty() {
            self = self.policy(ApplicationRulePolicy::from_settings(settings)?);
        }
        Ok(self)
    }

    /// Set the metrics sink (defaults to [`NoopMetrics`]).
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the actuator, sorting the policies.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingField`] if config or buffer state
    /// were not set.
    pub fn build(self) -> Result<BufferActuator, ValidationError> {
        let config = self.config.ok_or_else(|| ValidationError::MissingField {
            field: "config".to_string(),
        })?;
        let buffer_state = self.buffer_state.ok_or_else(|| ValidationError::MissingField {
            field: "buffer_state".to_string(),
        })?;
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics));
        Ok(BufferActuator::new(
            config,
            buffer_state,
            PolicyRegistry::new(self.policies),
            metrics,
        ))
    }
}
