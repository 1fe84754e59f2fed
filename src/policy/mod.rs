//! Admission policies and the ordered registry that evaluates them.
//!
//! A policy is an independent voter: it looks at one execution and returns a
//! [`Decision`]. Policies are registered once at startup; the registry sorts
//! them by descending [`AdmissionPolicy::order`] and never changes afterwards.

mod builtin;

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use crate::decision::Decision;
use crate::error::{AdmissionError, AdmissionResult, PolicyError};
use crate::execution::Execution;

pub use builtin::{AlwaysBufferPolicy, ApplicationRulePolicy, EnqueueOriginsPolicy, FnPolicy};

/// A pluggable admission voter.
///
/// Implementations must be fast and non-blocking. Errors are not swallowed:
/// a failing policy aborts the admission cycle for that execution.
pub trait AdmissionPolicy: Send + Sync {
    /// Returns a short stable identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Priority; higher values are evaluated first.
    fn order(&self) -> i32 {
        0
    }

    /// Votes on a single execution.
    fn evaluate(&self, execution: &Execution) -> AdmissionResult<Decision>;
}

/// Immutable, pre-sorted set of policies.
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    policies: Vec<Arc<dyn AdmissionPolicy>>,
}

impl PolicyRegistry {
    /// Builds a registry sorted by descending `order`.
    ///
    /// Policies with equal order keep their registration order.
    #[must_use]
    pub fn new(mut policies: Vec<Arc<dyn AdmissionPolicy>>) -> Self {
        policies.sort_by_key(|p| Reverse(p.order()));
        Self { policies }
    }

    /// Returns the number of registered policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns true if no policies are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policy names in evaluation order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    /// Evaluates every policy against `execution`, in evaluation order.
    ///
    /// Stops at the first failing policy. Failures that are not already
    /// policy errors are wrapped so the error names the broken policy.
    pub fn evaluate(&self, execution: &Execution) -> AdmissionResult<Vec<Decision>> {
        let mut decisions = Vec::with_capacity(self.policies.len());
        for policy in &self.policies {
            match policy.evaluate(execution) {
                Ok(decision) => decisions.push(decision),
                Err(AdmissionError::Policy(e)) => return Err(AdmissionError::Policy(e)),
                Err(other) => {
                    return Err(PolicyError::failed(policy.name(), other.to_string()).into());
                }
            }
        }
        Ok(decisions)
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("policies", &self.names())
            .finish()
    }
}
