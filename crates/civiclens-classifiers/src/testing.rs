//! Test doubles for the predictor port
//!
//! Compiled for this crate's tests and behind the `testing` feature, for
//! downstream tests that need a registry without model weights on disk.

use crate::config::{ClassifierConfig, SlotConfig};
use crate::input::{ImageInput, InputSpec, Layout};
use crate::predictor::{Predictor, PredictorLoader};
use crate::slot::SlotId;
use civiclens_core::{Error, Prediction, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Behavior {
    Answer(Prediction),
    Fail(String),
    Panic,
}

/// Predictor returning a fixed answer, an error, or a panic
pub struct MockPredictor {
    name: String,
    labels: Vec<String>,
    behavior: Behavior,
    latency: Option<Duration>,
    call_count: AtomicU32,
}

impl MockPredictor {
    /// Always predict `label` with `confidence`
    pub fn new(label: &str, confidence: f32) -> Self {
        let prediction = Prediction::new(label, confidence);
        Self::with_behavior(vec![prediction.label.clone()], Behavior::Answer(prediction))
    }

    /// Always return a classifier error
    pub fn failing(message: &str) -> Self {
        Self::with_behavior(vec![], Behavior::Fail(message.to_string()))
    }

    /// Always panic
    pub fn panicking() -> Self {
        Self::with_behavior(vec![], Behavior::Panic)
    }

    /// Block the calling thread for `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of times `predict` was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn with_behavior(labels: Vec<String>, behavior: Behavior) -> Self {
        Self {
            name: "mock".to_string(),
            labels,
            behavior,
            latency: None,
            call_count: AtomicU32::new(0),
        }
    }
}

impl Predictor for MockPredictor {
    fn predict(&self, _image: &ImageInput) -> Result<Prediction> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        match &self.behavior {
            Behavior::Answer(prediction) => Ok(prediction.clone()),
            Behavior::Fail(message) => Err(Error::classifier(message.clone())),
            Behavior::Panic => panic!("mock predictor panicked"),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn input_spec(&self) -> InputSpec {
        InputSpec::square(1, Layout::FlatHwc)
    }
}

enum Artifact {
    Ready(Arc<dyn Predictor>),
    Broken(String),
}

/// Loader serving predictors from memory, keyed by model id
///
/// Models without an entry behave like a missing file. Entries can be
/// replaced at any time to exercise reloads.
#[derive(Default)]
pub struct MockLoader {
    artifacts: Mutex<HashMap<String, Artifact>>,
    loads: Mutex<HashMap<String, usize>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `predictor` for the default model of `slot`
    pub fn with(self, slot: SlotId, predictor: impl Predictor + 'static) -> Self {
        self.set(slot, Arc::new(predictor));
        self
    }

    /// Fail to load the default model of `slot` with a non-`NotFound` error
    pub fn with_broken(self, slot: SlotId) -> Self {
        self.break_slot(slot);
        self
    }

    /// Replace the predictor served for the default model of `slot`
    pub fn set(&self, slot: SlotId, predictor: Arc<dyn Predictor>) {
        self.artifacts
            .lock()
            .insert(default_id(slot), Artifact::Ready(predictor));
    }

    /// Make the default model of `slot` fail to load
    pub fn break_slot(&self, slot: SlotId) {
        self.artifacts
            .lock()
            .insert(default_id(slot), Artifact::Broken("corrupt weights".to_string()));
    }

    /// Remove the artifact for the default model of `slot`
    pub fn remove(&self, slot: SlotId) {
        self.artifacts.lock().remove(&default_id(slot));
    }

    /// Number of load attempts for the default model of `slot`
    pub fn load_count(&self, slot: SlotId) -> usize {
        self.loads
            .lock()
            .get(&default_id(slot))
            .copied()
            .unwrap_or(0)
    }
}

impl PredictorLoader for MockLoader {
    fn load(&self, config: &SlotConfig, models_dir: &Path) -> Result<Arc<dyn Predictor>> {
        *self.loads.lock().entry(config.id.clone()).or_insert(0) += 1;

        match self.artifacts.lock().get(&config.id) {
            Some(Artifact::Ready(predictor)) => Ok(Arc::clone(predictor)),
            Some(Artifact::Broken(reason)) => Err(Error::classifier(reason.clone())),
            None => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", config.resolve_path(models_dir).display()),
            ))),
        }
    }

    fn backend(&self) -> &str {
        "mock"
    }
}

fn default_id(slot: SlotId) -> String {
    ClassifierConfig::default().slots.get(slot).id.clone()
}
