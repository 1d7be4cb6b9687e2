//! CivicLens Core
//!
//! Core types, label vocabulary, and error handling shared across CivicLens
//! components.
//!
//! This crate provides:
//! - The normalized [`Prediction`] every predictor emits
//! - Decision types returned to callers (issue type, severity, area type)
//! - The closed label enums and raw-label normalization
//! - Error types and result handling

pub mod error;
pub mod labels;
pub mod types;

pub use error::{Error, Result};
pub use labels::{normalize_label, AreaType, IssueType, Severity};
pub use types::{
    clamp_unit, AreaDecision, FusionDecision, FusionInputs, ModelDescriptor, Prediction,
    SeverityDecision,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::labels::{AreaType, IssueType, Severity};
    pub use crate::types::{
        AreaDecision, FusionDecision, FusionInputs, Prediction, SeverityDecision,
    };
}
