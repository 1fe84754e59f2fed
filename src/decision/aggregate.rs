use serde::{Deserialize, Serialize};

use super::vote::{Action, Decision};

/// The single combined result of every policy's vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDecision {
    /// Combined action.
    pub action: Action,
    /// True if a single forced vote decided the outcome.
    pub force: bool,
    /// The forcing vote's reason, or every reason joined with `", "` in
    /// evaluation order.
    pub reason: String,
}

impl AggregateDecision {
    /// Returns true if the combined action is BUFFER.
    #[must_use]
    pub const fn is_buffer(&self) -> bool {
        matches!(self.action, Action::Buffer)
    }
}

impl From<&Decision> for AggregateDecision {
    fn from(d: &Decision) -> Self {
        Self {
            action: d.action(),
            force: d.is_forced(),
            reason: d.reason().to_string(),
        }
    }
}

/// Reduce an ordered sequence of votes into one decision.
///
/// - Empty input yields `None`: there is nothing to act on.
/// - The first forced vote wins outright; every other vote is discarded.
/// - Otherwise ENQUEUE requires unanimity; any BUFFER vote vetoes admission.
///
/// Pure and deterministic for a given input order.
#[must_use]
pub fn aggregate(decisions: &[Decision]) -> Option<AggregateDecision> {
    if decisions.is_empty() {
        return None;
    }

    if let Some(forced) = decisions.iter().find(|d| d.is_forced()) {
        return Some(AggregateDecision::from(forced));
    }

    let action = if decisions.iter().all(|d| d.action() == Action::Enqueue) {
        Action::Enqueue
    } else {
        Action::Buffer
    };

    let reason = decisions
        .iter()
        .map(Decision::reason)
        .collect::<Vec<_>>()
        .join(", ");

    Some(AggregateDecision {
        action,
        force: false,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enqueue(reason: &str) -> Decision {
        Decision::enqueue(reason).unwrap()
    }

    fn buffer(reason: &str) -> Decision {
        Decision::buffer(reason).unwrap()
    }

    #[test]
    fn test_empty_yields_no_decision() {
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn test_single_vote_passes_through() {
        let agg = aggregate(&[buffer("overloaded")]).unwrap();
        assert_eq!(agg.action, Action::Buffer);
        assert!(!agg.force);
        assert_eq!(agg.reason, "overloaded");
    }

    #[test]
    fn test_unanimous_enqueue() {
        let agg = aggregate(&[enqueue("a"), enqueue("b"), enqueue("c")]).unwrap();
        assert_eq!(agg.action, Action::Enqueue);
        assert!(!agg.force);
    }

    #[test]
    fn test_single_buffer_vetoes() {
        let agg = aggregate(&[enqueue("ok"), enqueue("ok"), buffer("overloaded")]).unwrap();
        assert_eq!(
            agg,
            AggregateDecision {
                action: Action::Buffer,
                force: false,
                reason: "ok, ok, overloaded".to_string(),
            }
        );
    }

    #[test]
    fn test_veto_position_does_not_matter() {
        let first = aggregate(&[buffer("x"), enqueue("y")]).unwrap();
        let last = aggregate(&[enqueue("y"), buffer("x")]).unwrap();
        assert_eq!(first.action, Action::Buffer);
        assert_eq!(last.action, Action::Buffer);
        assert_eq!(first.reason, "x, y");
        assert_eq!(last.reason, "y, x");
    }

    #[test]
    fn test_forced_vote_wins_outright() {
        let agg = aggregate(&[buffer("blacklisted").forced(), enqueue("ok")]).unwrap();
        assert_eq!(
            agg,
            AggregateDecision {
                action: Action::Buffer,
                force: true,
                reason: "blacklisted".to_string(),
            }
        );
    }

    #[test]
    fn test_forced_enqueue_overrides_buffer_votes() {
        let agg = aggregate(&[
            buffer("overloaded"),
            enqueue("interactive").forced(),
            buffer("night"),
        ])
        .unwrap();
        assert_eq!(agg.action, Action::Enqueue);
        assert!(agg.force);
        assert_eq!(agg.reason, "interactive");
    }

    #[test]
    fn test_first_forced_vote_wins_among_several() {
        let agg = aggregate(&[
            enqueue("ok"),
            buffer("first").forced(),
            enqueue("second").forced(),
        ])
        .unwrap();
        assert_eq!(agg.action, Action::Buffer);
        assert_eq!(agg.reason, "first");
    }

    #[test]
    fn test_repeatable() {
        let votes = [enqueue("a"), buffer("b"), enqueue("c")];
        assert_eq!(aggregate(&votes), aggregate(&votes));
    }
}
