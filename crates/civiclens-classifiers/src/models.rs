//! Candle-backed image predictors
//!
//! Two architectures cover the deployed models: a ResNet-50 (general and
//! garbage slots) and a softmax head over flattened pixels (common slot).
//! Weights are read from safetensors; the ResNet expects torchvision
//! parameter names, the linear head expects `classifier.weight` and
//! `classifier.bias`.

use crate::config::{ArchitectureSpec, DeviceSpec, SlotConfig};
use crate::input::{ImageInput, InputSpec, Layout};
use crate::predictor::{Predictor, PredictorLoader};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Func, Linear, Module, VarBuilder};
use candle_transformers::models::resnet;
use civiclens_core::{Error, Prediction, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Loader that builds Candle predictors from slot configuration
pub struct CandleLoader {
    device: Device,
}

impl CandleLoader {
    /// Create a loader on the requested device, falling back to CPU when the
    /// accelerator is unavailable
    pub fn new(spec: DeviceSpec) -> Self {
        Self {
            device: resolve_device(spec),
        }
    }
}

impl PredictorLoader for CandleLoader {
    fn load(&self, config: &SlotConfig, models_dir: &Path) -> Result<Arc<dyn Predictor>> {
        let path = config.resolve_path(models_dir);
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("model weights not found at {}", path.display()),
            )));
        }

        let vb = load_var_builder(&path, &self.device)?;
        let num_labels = config.labels.len();

        let predictor: Arc<dyn Predictor> = match config.architecture {
            ArchitectureSpec::Resnet50 { input_size } => {
                let model = resnet::resnet50(num_labels, vb)
                    .map_err(|e| Error::classifier(format!("Failed to build ResNet-50: {}", e)))?;
                Arc::new(ResNetPredictor {
                    name: config.id.clone(),
                    labels: config.labels.clone(),
                    model,
                    device: self.device.clone(),
                    spec: InputSpec::square(input_size, Layout::Chw),
                })
            }
            ArchitectureSpec::Linear { input_size } => {
                let spec = InputSpec::square(input_size, Layout::FlatHwc);
                let head = candle_nn::linear(spec.len(), num_labels, vb.pp("classifier"))
                    .map_err(|e| {
                        Error::classifier(format!("Failed to load classification head: {}", e))
                    })?;
                Arc::new(LinearPredictor {
                    name: config.id.clone(),
                    labels: config.labels.clone(),
                    head,
                    device: self.device.clone(),
                    spec,
                })
            }
        };

        info!(
            "Loaded {} ({:?}, {} labels) from {}",
            config.id,
            config.architecture,
            num_labels,
            path.display()
        );

        Ok(predictor)
    }

    fn backend(&self) -> &str {
        "candle"
    }
}

/// ResNet-50 image classifier
pub struct ResNetPredictor {
    name: String,
    labels: Vec<String>,
    model: Func<'static>,
    device: Device,
    spec: InputSpec,
}

impl Predictor for ResNetPredictor {
    fn predict(&self, image: &ImageInput) -> Result<Prediction> {
        let data = image.to_tensor_data(&self.spec);
        let input = Tensor::from_vec(
            data,
            (1, 3, self.spec.height as usize, self.spec.width as usize),
            &self.device,
        )
        .map_err(|e| Error::classifier(format!("Failed to build input tensor: {}", e)))?;

        let logits = self
            .model
            .forward(&input)
            .map_err(|e| Error::classifier(format!("Forward pass failed: {}", e)))?;

        Prediction::from_scores(&self.labels, &to_probabilities(&logits)?)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn input_spec(&self) -> InputSpec {
        self.spec
    }
}

/// Softmax head over flattened pixels
pub struct LinearPredictor {
    name: String,
    labels: Vec<String>,
    head: Linear,
    device: Device,
    spec: InputSpec,
}

impl Predictor for LinearPredictor {
    fn predict(&self, image: &ImageInput) -> Result<Prediction> {
        let data = image.to_tensor_data(&self.spec);
        let input = Tensor::from_vec(data, (1, self.spec.len()), &self.device)
            .map_err(|e| Error::classifier(format!("Failed to build input tensor: {}", e)))?;

        let logits = self
            .head
            .forward(&input)
            .map_err(|e| Error::classifier(format!("Forward pass failed: {}", e)))?;

        Prediction::from_scores(&self.labels, &to_probabilities(&logits)?)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn input_spec(&self) -> InputSpec {
        self.spec
    }
}

fn resolve_device(spec: DeviceSpec) -> Device {
    let device = match spec {
        DeviceSpec::Cpu => return Device::Cpu,
        DeviceSpec::Cuda { index } => Device::new_cuda(index.unwrap_or(0)),
        DeviceSpec::Metal { index } => Device::new_metal(index.unwrap_or(0)),
    };

    device.unwrap_or_else(|e| {
        warn!("Failed to initialize {:?}, using CPU: {}", spec, e);
        Device::Cpu
    })
}

fn load_var_builder(weights_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    // The weights file must not be modified while mapped.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::classifier(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

fn to_probabilities(logits: &Tensor) -> Result<Vec<f32>> {
    candle_nn::ops::softmax(logits, D::Minus1)
        .map_err(|e| Error::classifier(format!("Softmax failed: {}", e)))?
        .squeeze(0)
        .map_err(|e| Error::classifier(format!("Squeeze failed: {}", e)))?
        .to_vec1()
        .map_err(|e| Error::classifier(format!("Failed to convert to vec: {}", e)))
}
