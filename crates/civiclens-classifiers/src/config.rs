//! Configuration for registry slots and model loading

use crate::slot::SlotId;
use civiclens_core::{normalize_label, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for all classifier slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Directory relative slot paths are resolved against
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Device to run inference on
    #[serde(default)]
    pub device: DeviceSpec,

    /// Per-predictor inference budget; a slower predictor counts as absent
    #[serde(default = "default_timeout_ms")]
    pub predictor_timeout_ms: u64,

    /// Slot configurations
    #[serde(default)]
    pub slots: SlotsConfig,
}

/// The three named registry slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsConfig {
    #[serde(default = "SlotConfig::general")]
    pub general: SlotConfig,

    #[serde(default = "SlotConfig::common")]
    pub common: SlotConfig,

    #[serde(default = "SlotConfig::garbage")]
    pub garbage: SlotConfig,
}

/// Configuration for a single slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Model identifier exposed through `/models/info`
    pub id: String,

    /// Weights file (safetensors), absolute or relative to `models_dir`
    pub path: PathBuf,

    /// Model architecture
    pub architecture: ArchitectureSpec,

    /// Class names in model output order
    pub labels: Vec<String>,

    /// Labels this model is trusted on
    #[serde(default)]
    pub specialty: Vec<String>,

    /// Human-readable purpose
    #[serde(default)]
    pub purpose: String,

    /// Disabled slots are never loaded
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Supported model architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArchitectureSpec {
    /// ResNet-50 backbone with a classification head, channel-major input
    Resnet50 {
        #[serde(default = "default_resnet_input")]
        input_size: u32,
    },

    /// Softmax head over the flattened, rescaled RGB pixels
    Linear {
        #[serde(default = "default_linear_input")]
        input_size: u32,
    },
}

impl ArchitectureSpec {
    pub fn input_size(&self) -> u32 {
        match self {
            Self::Resnet50 { input_size } | Self::Linear { input_size } => *input_size,
        }
    }
}

/// Device specification (for config files)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda { index: Option<usize> },
    Metal { index: Option<usize> },
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            device: DeviceSpec::Cpu,
            predictor_timeout_ms: default_timeout_ms(),
            slots: SlotsConfig::default(),
        }
    }
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            general: SlotConfig::general(),
            common: SlotConfig::common(),
            garbage: SlotConfig::garbage(),
        }
    }
}

impl SlotsConfig {
    /// Configuration of one slot
    pub fn get(&self, slot: SlotId) -> &SlotConfig {
        match slot {
            SlotId::General => &self.general,
            SlotId::Common => &self.common,
            SlotId::Garbage => &self.garbage,
        }
    }
}

impl SlotConfig {
    /// Default general multi-class classifier
    pub fn general() -> Self {
        Self {
            id: "resnet50".to_string(),
            path: PathBuf::from("resnet50_civic_model.safetensors"),
            architecture: ArchitectureSpec::Resnet50 {
                input_size: default_resnet_input(),
            },
            labels: labels(&["garbage", "pothole", "streetlight", "water_leak"]),
            specialty: labels(&["streetlight"]),
            purpose: "Streetlight detection (higher accuracy)".to_string(),
            enabled: true,
        }
    }

    /// Default pothole/garbage specialist
    pub fn common() -> Self {
        Self {
            id: "simple_cnn".to_string(),
            path: PathBuf::from("simple_cnn_model.safetensors"),
            architecture: ArchitectureSpec::Linear {
                input_size: default_linear_input(),
            },
            labels: labels(&["garbage", "pothole"]),
            specialty: labels(&["pothole", "garbage"]),
            purpose: "Pothole and garbage detection".to_string(),
            enabled: true,
        }
    }

    /// Default garbage vs. not-garbage specialist
    pub fn garbage() -> Self {
        Self {
            id: "garbage_detector".to_string(),
            path: PathBuf::from("resnet50_garbage_model.safetensors"),
            architecture: ArchitectureSpec::Resnet50 {
                input_size: default_resnet_input(),
            },
            labels: labels(&["garbage", "not_garbage"]),
            specialty: labels(&["garbage"]),
            purpose: "Specialized garbage detection model".to_string(),
            enabled: true,
        }
    }

    /// Resolve the weights path against `models_dir`
    pub fn resolve_path(&self, models_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            models_dir.join(&self.path)
        }
    }

    /// Normalized specialty labels
    pub fn specialty_set(&self) -> BTreeSet<String> {
        self.specialty.iter().map(|l| normalize_label(l)).collect()
    }

    fn validate(&self, slot: SlotId) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::config(format!("slot '{}' declares no labels", slot)));
        }

        let unique: BTreeSet<String> = self.labels.iter().map(|l| normalize_label(l)).collect();
        if unique.len() != self.labels.len() {
            return Err(Error::config(format!(
                "slot '{}' declares duplicate labels after normalization",
                slot
            )));
        }

        if self.architecture.input_size() == 0 {
            return Err(Error::config(format!("slot '{}' has zero input size", slot)));
        }

        Ok(())
    }
}

impl ClassifierConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid classifier config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check slot definitions and limits
    pub fn validate(&self) -> Result<()> {
        if self.predictor_timeout_ms == 0 {
            return Err(Error::config("predictor_timeout_ms must be positive"));
        }
        let mut ids = BTreeSet::new();
        for slot in SlotId::ALL {
            let slot_config = self.slots.get(slot);
            slot_config.validate(slot)?;
            if !ids.insert(slot_config.id.as_str()) {
                return Err(Error::config(format!(
                    "slot '{}' reuses model id '{}'",
                    slot, slot_config.id
                )));
            }
        }
        Ok(())
    }

    pub fn predictor_timeout(&self) -> Duration {
        Duration::from_millis(self.predictor_timeout_ms)
    }
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./ml-models/model_weights")
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_resnet_input() -> u32 {
    224
}

fn default_linear_input() -> u32 {
    64
}

fn default_true() -> bool {
    true
}
