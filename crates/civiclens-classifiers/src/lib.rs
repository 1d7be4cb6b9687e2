//! CivicLens Classifiers
//!
//! Image predictors behind a common port, and the registry that holds them.
//!
//! The registry has three named slots:
//! - `general`: broad multi-class model, trusted for streetlights
//! - `common`: lightweight pothole/garbage specialist
//! - `garbage`: garbage vs. not-garbage specialist
//!
//! Any slot may be empty. Predictors run on the blocking pool with a
//! per-call timeout, and failures surface as an absent result rather than
//! an error.

pub mod config;
pub mod input;
pub mod loader;
#[cfg(feature = "ml-models")]
pub mod models;
pub mod predictor;
pub mod registry;
pub mod slot;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{ArchitectureSpec, ClassifierConfig, DeviceSpec, SlotConfig, SlotsConfig};
pub use input::{ImageInput, InputSpec, Layout};
pub use loader::default_loader;
#[cfg(feature = "ml-models")]
pub use models::{CandleLoader, LinearPredictor, ResNetPredictor};
pub use predictor::{Predictor, PredictorLoader};
pub use registry::{ClassifierRegistry, ReloadOutcome};
pub use slot::SlotId;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::input::ImageInput;
    pub use crate::predictor::{Predictor, PredictorLoader};
    pub use crate::registry::ClassifierRegistry;
    pub use crate::slot::SlotId;
}
