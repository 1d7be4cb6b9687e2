//! Fusion policy evaluation

use civiclens_core::{FusionDecision, FusionInputs, Prediction};
use tracing::debug;

use crate::rule::{default_rules, Action, FusionRule};
use crate::{FallbackGenerator, FusionThresholds};

/// Ordered rule chain, first accepting match wins
///
/// Stateless between calls and safe to share across request tasks.
#[derive(Debug)]
pub struct FusionPolicy {
    rules: Vec<FusionRule>,
}

impl FusionPolicy {
    /// Create a policy with the default rule table
    pub fn new(thresholds: FusionThresholds) -> Self {
        Self::with_rules(default_rules(thresholds))
    }

    /// Create a policy with a custom rule table
    pub fn with_rules(rules: Vec<FusionRule>) -> Self {
        Self { rules }
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[FusionRule] {
        &self.rules
    }

    /// Evaluate the rule chain and report which rule decided
    pub fn evaluate(&self, inputs: &FusionInputs, fallback: &FallbackGenerator) -> FusionOutcome {
        let mut corroboration = None;

        for rule in &self.rules {
            if !rule.matches(inputs) {
                continue;
            }

            match rule.action {
                Action::Corroborate(source) => {
                    if let Some(prediction) = source.prediction(inputs) {
                        debug!(
                            "Rule {} recorded '{}' ({:.3}) as corroboration",
                            rule.name, prediction.label, prediction.confidence
                        );
                        corroboration.get_or_insert_with(|| prediction.clone());
                    }
                }
                Action::Accept(source) => {
                    if let Some(prediction) = source.prediction(inputs) {
                        let decision = FusionDecision::accept(prediction);
                        debug!(
                            "Rule {} accepted {} ({:.3})",
                            rule.name, decision.issue_type, decision.confidence
                        );
                        return FusionOutcome {
                            decision,
                            rule: Some(rule.name),
                            corroboration,
                        };
                    }
                }
            }
        }

        let decision = fallback.issue();
        debug!(
            "No rule matched {} present results, fallback {} ({:.3})",
            inputs.present(),
            decision.issue_type,
            decision.confidence
        );

        FusionOutcome {
            decision,
            rule: None,
            corroboration,
        }
    }

    /// Evaluate the rule chain, returning only the decision
    pub fn decide(&self, inputs: &FusionInputs, fallback: &FallbackGenerator) -> FusionDecision {
        self.evaluate(inputs, fallback).decision
    }
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self::new(FusionThresholds::default())
    }
}

/// Result of a fusion evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutcome {
    /// The decision returned to callers
    pub decision: FusionDecision,

    /// Name of the deciding rule; `None` when the fallback produced the answer
    pub rule: Option<&'static str>,

    /// Garbage specialist result that confidently disagreed with "garbage".
    /// Recorded only; it does not change the decision.
    pub corroboration: Option<Prediction>,
}

impl FusionOutcome {
    pub fn is_fallback(&self) -> bool {
        self.rule.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civiclens_core::IssueType;

    fn p(label: &str, confidence: f32) -> Option<Prediction> {
        Some(Prediction::new(label, confidence))
    }

    fn decide(general: Option<Prediction>, common: Option<Prediction>, garbage: Option<Prediction>) -> FusionOutcome {
        FusionPolicy::default().evaluate(
            &FusionInputs {
                general,
                common,
                garbage,
            },
            &FallbackGenerator::seeded(0),
        )
    }

    #[test]
    fn test_garbage_override() {
        let outcome = decide(None, None, p("garbage", 0.6));
        assert_eq!(outcome.decision, FusionDecision::new(IssueType::Garbage, 0.6));
        assert_eq!(outcome.rule, Some("garbage_override"));
    }

    #[test]
    fn test_garbage_override_beats_confident_streetlight() {
        let outcome = decide(p("streetlight", 0.99), p("pothole", 0.9), p("garbage", 0.55));
        assert_eq!(outcome.decision.issue_type, IssueType::Garbage);
    }

    #[test]
    fn test_streetlight_high_confidence() {
        let outcome = decide(p("streetlight", 0.85), p("pothole", 0.2), None);
        assert_eq!(outcome.decision, FusionDecision::new(IssueType::Streetlight, 0.85));
        assert_eq!(outcome.rule, Some("streetlight_high_confidence"));
    }

    #[test]
    fn test_specialist_low_bar_precedes_general_specialist() {
        let outcome = decide(p("pothole", 0.75), p("garbage", 0.4), None);
        assert_eq!(outcome.decision, FusionDecision::new(IssueType::Garbage, 0.4));
        assert_eq!(outcome.rule, Some("common_specialist"));
    }

    #[test]
    fn test_general_specialist() {
        // Common is not on a specialist label, so 3b and 3d cannot fire
        let outcome = decide(p("pothole", 0.75), p("other", 0.5), None);
        assert_eq!(outcome.decision.issue_type, IssueType::Pothole);
        assert_eq!(outcome.rule, Some("general_specialist"));
    }

    #[test]
    fn test_common_label_any_confidence() {
        let outcome = decide(p("water_leak", 0.9), p("pothole", 0.1), None);
        assert_eq!(outcome.decision, FusionDecision::new(IssueType::Pothole, 0.1));
        assert_eq!(outcome.rule, Some("common_label"));
    }

    #[test]
    fn test_common_margin() {
        let outcome = decide(p("water_leak", 0.3), p("other", 0.6), None);
        assert_eq!(outcome.decision.issue_type, IssueType::Other);
        assert_eq!(outcome.rule, Some("common_margin"));
    }

    #[test]
    fn test_general_margin_streetlight() {
        let outcome = decide(p("streetlight", 0.75), p("other", 0.3), None);
        assert_eq!(outcome.decision.issue_type, IssueType::Streetlight);
        assert_eq!(outcome.rule, Some("general_margin_streetlight"));
    }

    #[test]
    fn test_general_margin_without_streetlight_goes_to_common() {
        let outcome = decide(p("water_leak", 0.9), p("other", 0.4), None);
        assert_eq!(outcome.decision, FusionDecision::new(IssueType::Other, 0.4));
        assert_eq!(outcome.rule, Some("general_margin"));
    }

    #[test]
    fn test_comparable_streetlight() {
        let outcome = decide(p("streetlight", 0.65), p("other", 0.5), None);
        assert_eq!(outcome.decision.issue_type, IssueType::Streetlight);
        assert_eq!(outcome.rule, Some("streetlight_comparable"));
    }

    #[test]
    fn test_comparable_tie_favors_general() {
        let outcome = decide(p("water_leak", 0.5), p("other", 0.5), None);
        assert_eq!(outcome.decision.issue_type, IssueType::WaterLeak);
        assert_eq!(outcome.rule, Some("general_higher"));
    }

    #[test]
    fn test_comparable_common_higher() {
        let outcome = decide(p("water_leak", 0.45), p("other", 0.55), None);
        assert_eq!(outcome.decision.issue_type, IssueType::Other);
        assert_eq!(outcome.rule, Some("common_higher"));
    }

    #[test]
    fn test_single_results() {
        let general = decide(p("water_leak", 0.2), None, None);
        assert_eq!(general.decision, FusionDecision::new(IssueType::WaterLeak, 0.2));
        assert_eq!(general.rule, Some("general_only"));

        let common = decide(None, p("pothole", 0.3), None);
        assert_eq!(common.decision, FusionDecision::new(IssueType::Pothole, 0.3));
        assert_eq!(common.rule, Some("common_only"));
    }

    #[test]
    fn test_weak_garbage_result_alone_falls_back() {
        let outcome = decide(None, None, p("garbage", 0.4));
        assert!(outcome.is_fallback());
    }

    #[test]
    fn test_corroboration_is_recorded_without_effect() {
        let with = decide(p("streetlight", 0.85), p("other", 0.2), p("not_garbage", 0.9));
        let without = decide(p("streetlight", 0.85), p("other", 0.2), None);

        assert_eq!(with.decision, without.decision);
        assert_eq!(with.corroboration.unwrap().label, "not_garbage");
        assert!(without.corroboration.is_none());
    }

    #[test]
    fn test_fallback_differs_across_seeds() {
        let policy = FusionPolicy::default();
        let inputs = FusionInputs::default();

        let a = policy.decide(&inputs, &FallbackGenerator::seeded(1));
        let b = policy.decide(&inputs, &FallbackGenerator::seeded(2));

        assert!((0.0..1.0).contains(&a.confidence));
        assert!((0.0..1.0).contains(&b.confidence));
        assert_ne!(a, b);
    }
}
