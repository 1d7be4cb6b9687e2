//! Label vocabulary shared by predictors, the fusion policy and the service
//!
//! Predictors emit free-form class names (whatever the training pipeline
//! used as directory names). Everything past the predictor boundary works on
//! the normalized form produced by [`normalize_label`], and every decision
//! that leaves the service is expressed as one of the closed enums below.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label emitted by the garbage specialist for positive detections
pub const GARBAGE: &str = "garbage";

/// Label emitted by the general classifier for streetlight detections
pub const STREETLIGHT: &str = "streetlight";

/// Label emitted for pothole detections
pub const POTHOLE: &str = "pothole";

/// Canonical civic issue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Pothole,
    Garbage,
    Streetlight,
    WaterLeak,
    Other,
}

impl IssueType {
    /// Every issue type, in the order exposed by `/models/info`
    pub const ALL: [IssueType; 5] = [
        IssueType::Pothole,
        IssueType::Garbage,
        IssueType::Streetlight,
        IssueType::WaterLeak,
        IssueType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pothole => "pothole",
            Self::Garbage => "garbage",
            Self::Streetlight => "streetlight",
            Self::WaterLeak => "water_leak",
            Self::Other => "other",
        }
    }

    /// Map a predictor label onto an issue type.
    ///
    /// Unknown labels (including specialist-only labels such as
    /// `not_garbage`) fold into [`IssueType::Other`].
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "pothole" => Self::Pothole,
            "garbage" => Self::Garbage,
            "streetlight" => Self::Streetlight,
            "water_leak" => Self::WaterLeak,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Area category derived from coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Urban,
    Busy,
    Residential,
    Rural,
}

impl AreaType {
    /// Bucket order used by the coordinate hash. Changing it changes every
    /// stored area assignment.
    pub const ALL: [AreaType; 4] = [
        AreaType::Urban,
        AreaType::Busy,
        AreaType::Residential,
        AreaType::Rural,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urban => "urban",
            Self::Busy => "busy",
            Self::Residential => "residential",
            Self::Rural => "rural",
        }
    }
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw class name emitted by a model.
///
/// Lowercases, trims, maps separators to `_` and folds the plural and
/// spelling variants seen in training directory names.
pub fn normalize_label(raw: &str) -> String {
    let lowered: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();

    match lowered.as_str() {
        "potholes" => "pothole".to_string(),
        "streetlights" | "street_light" | "street_lights" => "streetlight".to_string(),
        "waterleak" | "water_leaks" => "water_leak".to_string(),
        "trash" => "garbage".to_string(),
        _ => lowered,
    }
}

/// True for the labels the common specialist is trusted on
pub fn is_specialist_label(label: &str) -> bool {
    label == POTHOLE || label == GARBAGE
}
