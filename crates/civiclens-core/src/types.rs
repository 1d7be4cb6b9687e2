//! Core types for CivicLens

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::labels::{normalize_label, AreaType, IssueType, Severity};
use crate::{Error, Result};

/// Normalized output of a single predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Normalized winning label
    pub label: String,

    /// Confidence of the winning label (0.0-1.0)
    pub confidence: f32,

    /// Probability per label, when the model exposes it
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub class_scores: BTreeMap<String, f32>,
}

impl Prediction {
    /// Create a prediction from the winning label alone; `class_scores` stays empty
    pub fn new(label: impl AsRef<str>, confidence: f32) -> Self {
        Self {
            label: normalize_label(label.as_ref()),
            confidence: clamp_unit(confidence),
            class_scores: BTreeMap::new(),
        }
    }

    /// Build a prediction from a probability vector aligned with `labels`.
    ///
    /// The winning label is the argmax; ties resolve to the lowest index.
    pub fn from_scores(labels: &[String], probabilities: &[f32]) -> Result<Self> {
        if labels.is_empty() || labels.len() != probabilities.len() {
            return Err(Error::classifier(format!(
                "model produced {} scores for {} labels",
                probabilities.len(),
                labels.len()
            )));
        }

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(Error::classifier("model produced non-finite scores"));
        }

        let mut best = 0;
        for (idx, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = idx;
            }
        }

        let class_scores: BTreeMap<String, f32> = labels
            .iter()
            .zip(probabilities)
            .map(|(label, p)| (normalize_label(label), clamp_unit(*p)))
            .collect();

        Ok(Self {
            label: normalize_label(&labels[best]),
            confidence: clamp_unit(probabilities[best]),
            class_scores,
        })
    }

    /// Check whether this prediction carries `label` with confidence above `threshold`
    pub fn is_confident(&self, label: &str, threshold: f32) -> bool {
        self.label == label && self.confidence > threshold
    }
}

/// Per-slot predictor outputs for one image; absent slots are `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FusionInputs {
    /// General multi-class classifier
    pub general: Option<Prediction>,

    /// Pothole/garbage specialist
    pub common: Option<Prediction>,

    /// Garbage vs. not-garbage specialist
    pub garbage: Option<Prediction>,
}

impl FusionInputs {
    /// Number of slots that produced a prediction
    pub fn present(&self) -> usize {
        [&self.general, &self.common, &self.garbage]
            .iter()
            .filter(|p| p.is_some())
            .count()
    }

    /// Both the general and the common result, when both are present
    pub fn general_and_common(&self) -> Option<(&Prediction, &Prediction)> {
        match (&self.general, &self.common) {
            (Some(general), Some(common)) => Some((general, common)),
            _ => None,
        }
    }
}

/// Status of one registry slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier exposed through `/models/info`
    pub id: String,

    /// Labels this model is trusted on
    pub specialty: BTreeSet<String>,

    /// Whether the model loaded successfully
    pub loaded: bool,

    /// Human-readable purpose
    pub purpose: String,

    /// Artifact path the model was loaded from
    pub path: String,
}

/// Final fused classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionDecision {
    pub issue_type: IssueType,
    pub confidence: f32,
}

impl FusionDecision {
    pub fn new(issue_type: IssueType, confidence: f32) -> Self {
        Self {
            issue_type,
            confidence: clamp_unit(confidence),
        }
    }

    /// Accept a predictor's answer as the decision
    pub fn accept(prediction: &Prediction) -> Self {
        Self::new(IssueType::from_label(&prediction.label), prediction.confidence)
    }
}

/// Severity band derived from a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityDecision {
    pub severity: Severity,
    pub confidence: f32,
}

/// Area category derived from coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDecision {
    pub area_type: AreaType,
    pub confidence: f32,
}

/// Clamp a score into `[0, 1]`, mapping NaN to 0
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
