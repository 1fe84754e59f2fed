//! Built-in policies.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;

use crate::config::{AdmissionSettings, ApplicationRule};
use crate::decision::Decision;
use crate::error::{AdmissionResult, ValidationError};
use crate::execution::Execution;

use super::AdmissionPolicy;

/// Votes BUFFER for every execution.
///
/// Combined with the unanimity rule this buffers everything unless another
/// policy forces an ENQUEUE.
#[derive(Debug, Clone)]
pub struct AlwaysBufferPolicy {
    order: i32,
}

impl AlwaysBufferPolicy {
    /// Creates the policy with order 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { order: 0 }
    }

    /// Overrides the evaluation order.
    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl Default for AlwaysBufferPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionPolicy for AlwaysBufferPolicy {
    fn name(&self) -> &str {
        "always_buffer"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn evaluate(&self, _execution: &Execution) -> AdmissionResult<Decision> {
        Ok(Decision::buffer("buffering all executions")?)
    }
}

/// Forces ENQUEUE for orchestrations started from interactive origins.
///
/// Anything else gets a plain ENQUEUE vote, leaving the outcome to the other
/// policies.
#[derive(Debug, Clone)]
pub struct EnqueueOriginsPolicy {
    origins: HashSet<String>,
    order: i32,
}

impl EnqueueOriginsPolicy {
    /// Default order: ahead of ordinary voters.
    pub const DEFAULT_ORDER: i32 = 100;

    /// Creates the policy for the given origins.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins.into_iter().map(Into::into).collect(),
            order: Self::DEFAULT_ORDER,
        }
    }

    /// Creates the policy from [`AdmissionSettings::enqueue_origins`].
    #[must_use]
    pub fn from_settings(settings: &AdmissionSettings) -> Self {
        Self::new(settings.enqueue_origins.iter().cloned())
    }

    /// Overrides the evaluation order.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl AdmissionPolicy for EnqueueOriginsPolicy {
    fn name(&self) -> &str {
        "enqueue_origins"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn evaluate(&self, execution: &Execution) -> AdmissionResult<Decision> {
        match execution.origin.as_deref() {
            Some(origin) if execution.is_orchestration() && self.origins.contains(origin) => {
                let reason = format!("orchestration from {origin} is never buffered");
                Ok(Decision::enqueue(reason)?.forced())
            }
            _ => Ok(Decision::enqueue("not an interactive orchestration")?),
        }
    }
}

struct CompiledRule {
    regex: Regex,
    decision: Decision,
}

/// Votes according to the first application rule whose pattern matches.
///
/// No match yields a plain ENQUEUE vote.
pub struct ApplicationRulePolicy {
    rules: Vec<CompiledRule>,
    order: i32,
}

impl ApplicationRulePolicy {
    /// Compiles the rules.
    ///
    /// # Errors
    /// Returns a validation error for an invalid regex or an empty reason.
    pub fn new(rules: &[ApplicationRule]) -> Result<Self, ValidationError> {
        let rules = rules
            .iter()
            .map(|rule| -> Result<CompiledRule, ValidationError> {
                let regex = Regex::new(&rule.pattern).map_err(|e| ValidationError::InvalidPattern {
                    pattern: rule.pattern.clone(),
                    reason: e.to_string(),
                })?;
                let decision = Decision::new(rule.action, rule.force, rule.reason.clone())?;
                Ok(CompiledRule { regex, decision })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Ok(Self { rules, order: 0 })
    }

    /// Compiles [`AdmissionSettings::application_rules`].
    pub fn from_settings(settings: &AdmissionSettings) -> Result<Self, ValidationError> {
        Self::new(&settings.application_rules)
    }

    /// Overrides the evaluation order.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl fmt::Debug for ApplicationRulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<&str> = self.rules.iter().map(|r| r.regex.as_str()).collect();
        f.debug_struct("ApplicationRulePolicy")
            .field("patterns", &patterns)
            .field("order", &self.order)
            .finish()
    }
}

impl AdmissionPolicy for ApplicationRulePolicy {
    fn name(&self) -> &str {
        "application_rules"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn evaluate(&self, execution: &Execution) -> AdmissionResult<Decision> {
        let matched = self
            .rules
            .iter()
            .find(|rule| rule.regex.is_match(&execution.application));
        match matched {
            Some(rule) => Ok(rule.decision.clone()),
            None => Ok(Decision::enqueue(format!("no rule for {}", execution.application))?),
        }
    }
}

/// Adapts a closure into a policy.
///
/// ```
/// use execbuffer::{AdmissionPolicy, Decision, Execution, FnPolicy};
///
/// let policy = FnPolicy::new("night_batch", 5, |e: &Execution| {
///     if e.trigger_type.as_deref() == Some("cron") {
///         Ok(Decision::buffer("cron runs can wait")?)
///     } else {
///         Ok(Decision::enqueue("ok")?)
///     }
/// });
/// assert_eq!(policy.order(), 5);
/// ```
pub struct FnPolicy<F> {
    name: String,
    order: i32,
    f: F,
}

impl<F> FnPolicy<F>
where
    F: Fn(&Execution) -> AdmissionResult<Decision> + Send + Sync,
{
    /// Wraps `f` under `name` with the given order.
    pub fn new(name: impl Into<String>, order: i32, f: F) -> Self {
        Self {
            name: name.into(),
            order,
            f,
        }
    }
}

impl<F> fmt::Debug for FnPolicy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl<F> AdmissionPolicy for FnPolicy<F>
where
    F: Fn(&Execution) -> AdmissionResult<Decision> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn evaluate(&self, execution: &Execution) -> AdmissionResult<Decision> {
        (self.f)(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Action;

    #[test]
    fn test_always_buffer_votes_buffer() {
        let d = AlwaysBufferPolicy::new().evaluate(&Execution::pipeline("a", "p")).unwrap();
        assert_eq!(d.action(), Action::Buffer);
        assert!(!d.is_forced());
    }

    #[test]
    fn test_deck_orchestration_forced_enqueue() {
        let policy = EnqueueOriginsPolicy::new(["deck"]);
        let execution = Execution::orchestration("a", "rollback").with_origin("deck");
        let d = policy.evaluate(&execution).unwrap();
        assert_eq!(d.action(), Action::Enqueue);
        assert!(d.is_forced());
        assert!(d.reason().contains("deck"));
    }

    #[test]
    fn test_pipeline_from_deck_not_forced() {
        let policy = EnqueueOriginsPolicy::new(["deck"]);
        let execution = Execution::pipeline("a", "deploy").with_origin("deck");
        let d = policy.evaluate(&execution).unwrap();
        assert_eq!(d.action(), Action::Enqueue);
        assert!(!d.is_forced());
    }

    #[test]
    fn test_api_orchestration_not_forced() {
        let policy = EnqueueOriginsPolicy::new(["deck"]);
        let execution = Execution::orchestration("a", "resize").with_origin("api");
        assert!(!policy.evaluate(&execution).unwrap().is_forced());
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            ApplicationRule {
                pattern: "^batch".to_string(),
                action: Action::Buffer,
                force: false,
                reason: "batch can wait".to_string(),
            },
            ApplicationRule {
                pattern: ".*".to_string(),
                action: Action::Enqueue,
                force: true,
                reason: "catch-all".to_string(),
            },
        ];
        let policy = ApplicationRulePolicy::new(&rules).unwrap();

        let batch = policy.evaluate(&Execution::pipeline("batch-reports", "nightly")).unwrap();
        assert_eq!(batch.action(), Action::Buffer);
        assert_eq!(batch.reason(), "batch can wait");

        let other = policy.evaluate(&Execution::pipeline("payments", "deploy")).unwrap();
        assert_eq!(other.action(), Action::Enqueue);
        assert!(other.is_forced());
    }

    #[test]
    fn test_no_rule_enqueues() {
        let policy = ApplicationRulePolicy::new(&[]).unwrap();
        let d = policy.evaluate(&Execution::pipeline("orders", "deploy")).unwrap();
        assert_eq!(d.action(), Action::Enqueue);
        assert_eq!(d.reason(), "no rule for orders");
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let rules = vec![ApplicationRule {
            pattern: "[".to_string(),
            action: Action::Buffer,
            force: false,
            reason: "x".to_string(),
        }];
        assert!(matches!(
            ApplicationRulePolicy::new(&rules),
            Err(ValidationError::InvalidPattern { .. })
        ));
    }
}
