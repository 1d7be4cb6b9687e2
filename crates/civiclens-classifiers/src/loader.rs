//! Backend selection for predictor loading

use crate::config::DeviceSpec;
use crate::predictor::PredictorLoader;
use std::sync::Arc;

/// Loader for the compiled-in backend
#[cfg(feature = "ml-models")]
pub fn default_loader(device: DeviceSpec) -> Arc<dyn PredictorLoader> {
    Arc::new(crate::models::CandleLoader::new(device))
}

/// Loader for the compiled-in backend
#[cfg(not(feature = "ml-models"))]
pub fn default_loader(_device: DeviceSpec) -> Arc<dyn PredictorLoader> {
    Arc::new(UnavailableLoader)
}

/// Loader used when no inference backend is compiled in; every slot stays unloaded
#[cfg(not(feature = "ml-models"))]
pub struct UnavailableLoader;

#[cfg(not(feature = "ml-models"))]
impl PredictorLoader for UnavailableLoader {
    fn load(
        &self,
        config: &crate::config::SlotConfig,
        _models_dir: &std::path::Path,
    ) -> civiclens_core::Result<Arc<dyn crate::predictor::Predictor>> {
        Err(civiclens_core::Error::classifier(format!(
            "cannot load '{}': built without the ml-models feature",
            config.id
        )))
    }

    fn backend(&self) -> &str {
        "none"
    }
}
