//! Classifier registry: three named slots, each holding an optional predictor
//!
//! Slots are loaded once at startup and may be reloaded individually. Each
//! slot is an immutable snapshot behind a lock, so an in-flight request keeps
//! the predictor it started with while a reload swaps in a new one.

use crate::config::ClassifierConfig;
use crate::input::ImageInput;
use crate::loader::default_loader;
use crate::predictor::{Predictor, PredictorLoader};
use crate::slot::SlotId;
use civiclens_core::{Error, FusionInputs, ModelDescriptor, Prediction};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of reloading one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A fresh predictor now serves the slot
    Loaded,

    /// The artifact is missing; the previously loaded predictor keeps serving
    Kept,

    /// The slot holds no predictor
    Unavailable,
}

impl ReloadOutcome {
    pub fn is_loaded(self) -> bool {
        self == Self::Loaded
    }
}

/// Loaded state of one slot
struct SlotState {
    descriptor: ModelDescriptor,
    predictor: Option<Arc<dyn Predictor>>,
}

/// Registry of the general, common, and garbage predictors
pub struct ClassifierRegistry {
    config: ClassifierConfig,
    loader: Arc<dyn PredictorLoader>,
    slots: [RwLock<Arc<SlotState>>; 3],
}

impl ClassifierRegistry {
    /// Load every slot with the compiled-in backend
    pub fn load(config: ClassifierConfig) -> Self {
        let loader = default_loader(config.device);
        Self::with_loader(config, loader)
    }

    /// Load every slot with a custom backend
    ///
    /// Never fails: a slot whose artifact is missing or broken stays
    /// unloaded and the service degrades to the remaining predictors.
    pub fn with_loader(config: ClassifierConfig, loader: Arc<dyn PredictorLoader>) -> Self {
        info!(
            "Initializing classifier registry ({} backend, models in {})",
            loader.backend(),
            config.models_dir.display()
        );

        let slots = SlotId::ALL
            .map(|slot| RwLock::new(Arc::new(load_slot(&config, loader.as_ref(), slot).0)));

        let registry = Self {
            config,
            loader,
            slots,
        };

        info!(
            "Classifier registry initialized with {}/{} models",
            registry.loaded_count(),
            SlotId::ALL.len()
        );

        registry
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Per-predictor inference budget
    pub fn timeout(&self) -> Duration {
        self.config.predictor_timeout()
    }

    /// Whether each slot currently holds a predictor
    pub fn availability(&self) -> BTreeMap<SlotId, bool> {
        SlotId::ALL
            .iter()
            .map(|slot| (*slot, self.snapshot(*slot).predictor.is_some()))
            .collect()
    }

    /// Descriptor of every slot
    pub fn descriptors(&self) -> BTreeMap<SlotId, ModelDescriptor> {
        SlotId::ALL
            .iter()
            .map(|slot| (*slot, self.descriptor(*slot)))
            .collect()
    }

    pub fn descriptor(&self, slot: SlotId) -> ModelDescriptor {
        self.snapshot(slot).descriptor.clone()
    }

    /// Number of slots holding a predictor
    pub fn loaded_count(&self) -> usize {
        self.availability().values().filter(|loaded| **loaded).count()
    }

    /// Predictor currently held by `slot`
    pub fn predictor(&self, slot: SlotId) -> Option<Arc<dyn Predictor>> {
        self.snapshot(slot).predictor.clone()
    }

    /// Reload one slot from its artifact.
    ///
    /// Blocking. The artifact is loaded before the lock is taken, so readers
    /// only ever see the old or the new snapshot. A missing artifact keeps a
    /// working predictor in place; an artifact that fails to load empties
    /// the slot.
    pub fn reload(&self, slot: SlotId) -> ReloadOutcome {
        let (state, missing) = load_slot(&self.config, self.loader.as_ref(), slot);
        let mut current = self.slots[slot.index()].write();

        if state.predictor.is_some() {
            *current = Arc::new(state);
            return ReloadOutcome::Loaded;
        }

        if missing && current.predictor.is_some() {
            warn!(
                "{} artifact not found at {}, keeping current model",
                slot, state.descriptor.path
            );
            return ReloadOutcome::Kept;
        }

        *current = Arc::new(state);
        ReloadOutcome::Unavailable
    }

    /// Reload every slot; reports whether each one loaded a fresh predictor
    pub fn reload_all(&self) -> BTreeMap<SlotId, bool> {
        SlotId::ALL
            .iter()
            .map(|slot| (*slot, self.reload(*slot).is_loaded()))
            .collect()
    }

    /// Run one slot's predictor on the blocking pool.
    ///
    /// Returns `None` when the slot is empty or when the predictor errors,
    /// panics, or exceeds the timeout. A timed-out inference is abandoned,
    /// not cancelled.
    pub async fn predict_slot(&self, slot: SlotId, image: Arc<ImageInput>) -> Option<Prediction> {
        let predictor = self.predictor(slot)?;
        let start = Instant::now();

        let task = tokio::task::spawn_blocking(move || predictor.predict(&image));
        let outcome = tokio::time::timeout(self.timeout(), task).await;

        metrics::histogram!("civiclens_inference_latency_us", "slot" => slot.as_str())
            .record(start.elapsed().as_micros() as f64);

        match outcome {
            Ok(Ok(Ok(prediction))) => {
                debug!(
                    "{} predicted '{}' ({:.3}) in {:?}",
                    slot,
                    prediction.label,
                    prediction.confidence,
                    start.elapsed()
                );
                Some(prediction)
            }
            Ok(Ok(Err(e))) => {
                record_failure(slot, &e);
                warn!("{} predictor failed: {}", slot, e);
                None
            }
            Ok(Err(join_error)) => {
                metrics::counter!(
                    "civiclens_predictor_failures_total",
                    "slot" => slot.as_str(),
                    "kind" => "panic"
                )
                .increment(1);
                warn!("{} predictor panicked: {}", slot, join_error);
                None
            }
            Err(_) => {
                record_failure(slot, &Error::Timeout);
                warn!("{} predictor exceeded {:?}", slot, self.timeout());
                None
            }
        }
    }

    /// Run every available predictor concurrently
    pub async fn predict_all(&self, image: Arc<ImageInput>) -> FusionInputs {
        let (general, common, garbage) = tokio::join!(
            self.predict_slot(SlotId::General, Arc::clone(&image)),
            self.predict_slot(SlotId::Common, Arc::clone(&image)),
            self.predict_slot(SlotId::Garbage, image),
        );

        FusionInputs {
            general,
            common,
            garbage,
        }
    }

    fn snapshot(&self, slot: SlotId) -> Arc<SlotState> {
        self.slots[slot.index()].read().clone()
    }
}

/// Load one slot; the flag is set when the artifact does not exist
fn load_slot(
    config: &ClassifierConfig,
    loader: &dyn PredictorLoader,
    slot: SlotId,
) -> (SlotState, bool) {
    let slot_config = config.slots.get(slot);
    let path = slot_config.resolve_path(&config.models_dir);

    let mut descriptor = ModelDescriptor {
        id: slot_config.id.clone(),
        specialty: slot_config.specialty_set(),
        loaded: false,
        purpose: slot_config.purpose.clone(),
        path: path.display().to_string(),
    };

    if !slot_config.enabled {
        info!("{} slot disabled, skipping '{}'", slot, slot_config.id);
        let state = SlotState {
            descriptor,
            predictor: None,
        };
        return (state, false);
    }

    let mut missing = false;
    let predictor = match loader.load(slot_config, &config.models_dir) {
        Ok(predictor) => {
            info!("✓ Loaded {} model '{}'", slot, slot_config.id);
            Some(predictor)
        }
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(
                "{} model '{}' not found at {}, slot unavailable",
                slot,
                slot_config.id,
                path.display()
            );
            missing = true;
            None
        }
        Err(e) => {
            warn!("✗ Failed to load {} model '{}': {}", slot, slot_config.id, e);
            None
        }
    };

    descriptor.loaded = predictor.is_some();

    let state = SlotState {
        descriptor,
        predictor,
    };
    (state, missing)
}

fn record_failure(slot: SlotId, error: &Error) {
    metrics::counter!(
        "civiclens_predictor_failures_total",
        "slot" => slot.as_str(),
        "kind" => error.kind()
    )
    .increment(1);
}
