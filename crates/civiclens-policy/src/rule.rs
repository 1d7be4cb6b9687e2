//! Fusion rules: ordered `(condition, action)` pairs over predictor results

use civiclens_core::labels::{is_specialist_label, GARBAGE, STREETLIGHT};
use civiclens_core::{FusionInputs, Prediction};
use std::fmt;

use crate::FusionThresholds;

/// Predictor result a rule refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    General,
    Common,
    Garbage,
}

impl Source {
    /// The referenced result, if present
    pub fn prediction<'a>(&self, inputs: &'a FusionInputs) -> Option<&'a Prediction> {
        match self {
            Self::General => inputs.general.as_ref(),
            Self::Common => inputs.common.as_ref(),
            Self::Garbage => inputs.garbage.as_ref(),
        }
    }
}

/// What happens when a rule's condition holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Accept the source's label and confidence; evaluation stops
    Accept(Source),

    /// Record the source as corroborating evidence; evaluation continues
    Corroborate(Source),
}

type Condition = Box<dyn Fn(&FusionInputs) -> bool + Send + Sync>;

/// A single named rule
pub struct FusionRule {
    /// Rule identifier, reported with every decision
    pub name: &'static str,

    /// Action to take when the condition holds
    pub action: Action,

    condition: Condition,
}

impl FusionRule {
    pub fn new(
        name: &'static str,
        action: Action,
        condition: impl Fn(&FusionInputs) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            action,
            condition: Box::new(condition),
        }
    }

    /// Check whether this rule applies to `inputs`
    pub fn matches(&self, inputs: &FusionInputs) -> bool {
        (self.condition)(inputs)
    }
}

impl fmt::Debug for FusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FusionRule")
            .field("name", &self.name)
            .field("action", &self.action)
            .finish()
    }
}

/// Condition over the general and common results, only when both are present
fn both(
    condition: impl Fn(&Prediction, &Prediction) -> bool + Send + Sync + 'static,
) -> impl Fn(&FusionInputs) -> bool + Send + Sync + 'static {
    move |inputs: &FusionInputs| {
        inputs
            .general_and_common()
            .map_or(false, |(general, common)| condition(general, common))
    }
}

/// The default rule chain.
///
/// Order encodes trust: the garbage specialist first, then the common
/// specialist on its own labels at a low bar, the general model on
/// streetlights only at high confidence, and single-model answers last.
/// When both general and common are present one of the pair rules always
/// matches.
pub fn default_rules(t: FusionThresholds) -> Vec<FusionRule> {
    use Action::{Accept, Corroborate};
    use Source::{Common, General, Garbage};

    vec![
        FusionRule::new("garbage_override", Accept(Garbage), move |inputs| {
            inputs
                .garbage
                .as_ref()
                .map_or(false, |g| g.is_confident(GARBAGE, t.garbage_override))
        }),
        FusionRule::new("garbage_corroboration", Corroborate(Garbage), move |inputs| {
            inputs
                .garbage
                .as_ref()
                .map_or(false, |g| g.label != GARBAGE && g.confidence > t.garbage_corroboration)
        }),
        FusionRule::new(
            "streetlight_high_confidence",
            Accept(General),
            both(move |general, _| general.is_confident(STREETLIGHT, t.streetlight_high)),
        ),
        FusionRule::new(
            "common_specialist",
            Accept(Common),
            both(move |_, common| {
                is_specialist_label(&common.label) && common.confidence > t.specialist_low_bar
            }),
        ),
        FusionRule::new(
            "general_specialist",
            Accept(General),
            both(move |general, _| {
                is_specialist_label(&general.label) && general.confidence > t.general_specialist
            }),
        ),
        FusionRule::new(
            "common_label",
            Accept(Common),
            both(|_, common| is_specialist_label(&common.label)),
        ),
        FusionRule::new(
            "common_margin",
            Accept(Common),
            both(move |general, common| common.confidence > general.confidence + t.common_margin),
        ),
        FusionRule::new(
            "general_margin_streetlight",
            Accept(General),
            both(move |general, common| {
                general.confidence > common.confidence + t.general_margin
                    && general.is_confident(STREETLIGHT, t.streetlight_dominant)
            }),
        ),
        FusionRule::new(
            "general_margin",
            Accept(Common),
            both(move |general, common| general.confidence > common.confidence + t.general_margin),
        ),
        FusionRule::new(
            "streetlight_comparable",
            Accept(General),
            both(move |general, _| general.is_confident(STREETLIGHT, t.streetlight_comparable)),
        ),
        FusionRule::new(
            "general_higher",
            Accept(General),
            both(|general, common| general.confidence >= common.confidence),
        ),
        FusionRule::new("common_higher", Accept(Common), both(|_, _| true)),
        FusionRule::new("general_only", Accept(General), |inputs| inputs.general.is_some()),
        FusionRule::new("common_only", Accept(Common), |inputs| inputs.common.is_some()),
    ]
}
