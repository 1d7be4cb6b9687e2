//! Service configuration

use civiclens_classifiers::ClassifierConfig;
use civiclens_policy::FusionThresholds;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Classifier slots and model loading
    #[serde(default)]
    pub classifiers: ClassifierConfig,

    /// Fusion rule thresholds
    #[serde(default)]
    pub fusion: FusionThresholds,

    /// Seed for fallback answers; entropy when unset
    #[serde(default)]
    pub fallback_seed: Option<u64>,

    /// Answer 400 for undecodable images instead of a random fallback
    #[serde(default)]
    pub reject_undecodable_images: bool,

    /// Maximum accepted request body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Command-line overrides applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub models_dir: Option<PathBuf>,
    pub fallback_seed: Option<u64>,
}

impl ServiceConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: impl AsRef<Path>, overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let config_path = config_path.as_ref();

        // Try to load from file, or use defaults
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(listen) = &overrides.listen {
            config.listen = listen.clone();
        }

        if let Some(port) = overrides.port {
            config.port = port;
        }

        if let Some(models_dir) = &overrides.models_dir {
            config.classifiers.models_dir = models_dir.clone();
        }

        if overrides.fallback_seed.is_some() {
            config.fallback_seed = overrides.fallback_seed;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check limits and classifier definitions
    pub fn validate(&self) -> anyhow::Result<()> {
        self.classifiers.validate()?;

        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be positive");
        }

        Ok(())
    }

    /// Socket address to bind
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.listen, self.port).parse()?)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            classifiers: ClassifierConfig::default(),
            fusion: FusionThresholds::default(),
            fallback_seed: None,
            reject_undecodable_images: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
