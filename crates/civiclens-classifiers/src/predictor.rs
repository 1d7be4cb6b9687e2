//! Predictor port and loader extension point

use crate::config::SlotConfig;
use crate::input::{ImageInput, InputSpec};
use civiclens_core::{Prediction, Result};
use std::path::Path;
use std::sync::Arc;

/// Trait for all image predictors
///
/// Implementations normalize their native output into a [`Prediction`] so
/// that nothing past this boundary depends on model shape. `predict` is
/// blocking; the registry runs it on the blocking pool.
pub trait Predictor: Send + Sync {
    /// Predict the class of a decoded image
    fn predict(&self, image: &ImageInput) -> Result<Prediction>;

    /// Get the predictor name
    fn name(&self) -> &str;

    /// Labels in model output order
    fn labels(&self) -> &[String];

    /// Input contract (size and layout)
    fn input_spec(&self) -> InputSpec;
}

/// Pluggable backend that turns a slot configuration into a predictor.
///
/// The registry owns the loaded/unloaded bookkeeping; a loader only has to
/// report failure through `Err`. A missing artifact should surface as
/// [`civiclens_core::Error::Io`] with `NotFound` so the registry can treat
/// it as a normal "not deployed" outcome.
pub trait PredictorLoader: Send + Sync {
    /// Load the predictor described by `config`, resolving relative paths
    /// against `models_dir`.
    fn load(&self, config: &SlotConfig, models_dir: &Path) -> Result<Arc<dyn Predictor>>;

    /// Short backend name for diagnostics
    fn backend(&self) -> &str;
}
