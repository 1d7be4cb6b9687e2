//! CivicLens Policy
//!
//! Pure decision functions over predictor results:
//! - Fusion: an ordered rule chain that reconciles the general, common and
//!   garbage predictors into one issue type
//! - Severity: confidence bands
//! - Area type: deterministic coordinate bucketing
//! - Fallback: seedable random answers when no signal is available

pub mod area;
pub mod engine;
pub mod fallback;
pub mod rule;
pub mod severity;
pub mod thresholds;

pub use area::{area_bucket, area_type, validate_coordinates};
pub use engine::{FusionOutcome, FusionPolicy};
pub use fallback::FallbackGenerator;
pub use rule::{default_rules, Action, FusionRule, Source};
pub use severity::{severity_band, severity_from};
pub use thresholds::FusionThresholds;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{FusionOutcome, FusionPolicy};
    pub use crate::fallback::FallbackGenerator;
    pub use crate::thresholds::FusionThresholds;
}
