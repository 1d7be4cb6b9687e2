//! Confidence to severity band mapping

use civiclens_core::{clamp_unit, Severity, SeverityDecision};

use crate::FallbackGenerator;

/// Lower bound (inclusive) of the high band
pub const HIGH_SEVERITY: f32 = 0.8;

/// Lower bound (inclusive) of the medium band
pub const MEDIUM_SEVERITY: f32 = 0.6;

/// Map a confidence onto a severity band
pub fn severity_band(confidence: f32) -> Severity {
    if confidence >= HIGH_SEVERITY {
        Severity::High
    } else if confidence >= MEDIUM_SEVERITY {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Severity from an optional confidence.
///
/// A missing or non-finite confidence gives a random band and confidence.
pub fn severity_from(confidence: Option<f32>, fallback: &FallbackGenerator) -> SeverityDecision {
    match confidence.filter(|c| c.is_finite()) {
        Some(confidence) => SeverityDecision {
            severity: severity_band(confidence),
            confidence: clamp_unit(confidence),
        },
        None => fallback.severity(),
    }
}
