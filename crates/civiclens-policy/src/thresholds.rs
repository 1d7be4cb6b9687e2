//! Tunable confidence thresholds for the fusion rule chain

use serde::{Deserialize, Serialize};

/// Thresholds used by the default rule table
///
/// All comparisons are strict (`>`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionThresholds {
    /// Garbage specialist saying "garbage" above this wins outright
    pub garbage_override: f32,

    /// Garbage specialist saying anything else above this is corroboration
    pub garbage_corroboration: f32,

    /// General model trusted on streetlight above this
    pub streetlight_high: f32,

    /// Common specialist trusted on pothole/garbage above this
    pub specialist_low_bar: f32,

    /// General model trusted on pothole/garbage above this
    pub general_specialist: f32,

    /// Common wins when it leads general by more than this
    pub common_margin: f32,

    /// General leads common by more than this
    pub general_margin: f32,

    /// Streetlight confidence required when general leads by the margin
    pub streetlight_dominant: f32,

    /// Streetlight confidence required when the two are comparable
    pub streetlight_comparable: f32,
}

impl Default for FusionThresholds {
    fn default() -> Self {
        Self {
            garbage_override: 0.5,
            garbage_corroboration: 0.7,
            streetlight_high: 0.8,
            specialist_low_bar: 0.3,
            general_specialist: 0.7,
            common_margin: 0.2,
            general_margin: 0.3,
            streetlight_dominant: 0.7,
            streetlight_comparable: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let thresholds: FusionThresholds =
            serde_yaml::from_str("streetlight_high: 0.9\ncommon_margin: 0.25").unwrap();

        assert_eq!(thresholds.streetlight_high, 0.9);
        assert_eq!(thresholds.common_margin, 0.25);
        assert_eq!(thresholds.garbage_override, 0.5);
        assert_eq!(thresholds.specialist_low_bar, 0.3);
    }
}
