//! # execbuffer - admission control for pipeline executions
//!
//! Every workflow execution about to be admitted is either *buffered* (held
//! back until released elsewhere) or *enqueued* (allowed straight into the
//! execution pipeline). execbuffer makes that call by polling a pluggable set
//! of policies and combining their votes into one deterministic decision.
//!
//! ## Core Concepts
//!
//! - **Policy**: an ordered voter returning a [`Decision`] for one execution
//! - **Aggregation**: the first forced vote wins; otherwise ENQUEUE needs
//!   unanimity and any BUFFER vote vetoes admission
//! - **Buffer state**: a pull-based oracle saying whether buffering is in
//!   effect right now
//! - **Learning mode**: decisions are computed, logged and counted but never
//!   applied
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use execbuffer::{
//!     AdmissionOutcome, AlwaysBufferPolicy, BufferActuator, BufferState, Execution,
//!     ExecutionStatus, InMemoryMetrics, StaticBufferState, StaticConfig,
//! };
//! use execbuffer::config::{ENABLED_KEY, LEARNING_MODE_KEY};
//!
//! let config = Arc::new(StaticConfig::new());
//! config.set(ENABLED_KEY, true)?;
//! config.set(LEARNING_MODE_KEY, false)?;
//!
//! let actuator = BufferActuator::builder()
//!     .config(config)
//!     .buffer_state(Arc::new(StaticBufferState::new(BufferState::Active)))
//!     .policy(AlwaysBufferPolicy::new())
//!     .metrics(Arc::new(InMemoryMetrics::new()))
//!     .build()?;
//!
//! let mut execution = Execution::pipeline("orders", "nightly-report");
//! let outcome = actuator.process(&mut execution)?;
//!
//! assert!(matches!(outcome, AdmissionOutcome::Buffered { learning: false, .. }));
//! assert_eq!(execution.status, ExecutionStatus::Buffered);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actuator;
pub mod config;
pub mod decision;
pub mod error;
pub mod execution;
pub mod metrics;
pub mod policy;
pub mod state;

// Re-export primary types at crate root for convenience
pub use actuator::{AdmissionOutcome, BufferActuator, BufferActuatorBuilder, ExecutionListener};
pub use config::{AdmissionSettings, ApplicationRule, DynamicConfig, StaticConfig};
pub use decision::{aggregate, Action, AggregateDecision, Decision};
pub use error::{
    AdmissionError, AdmissionResult, BufferStateError, ConfigError, PolicyError, ValidationError,
};
pub use execution::{Execution, ExecutionId, ExecutionKind, ExecutionStatus};
pub use metrics::{InMemoryMetrics, MetricsSink, NoopMetrics, Timer};
pub use policy::{
    AdmissionPolicy, AlwaysBufferPolicy, ApplicationRulePolicy, EnqueueOriginsPolicy, FnPolicy,
    PolicyRegistry,
};
pub use state::{
    ActiveExecutionCounter, ActiveExecutionsBufferStateSupplier, BufferState, BufferStateSupplier,
    ConfigBufferStateSupplier, StaticBufferState,
};
