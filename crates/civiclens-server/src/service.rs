//! Classification service: decoding, inference, fusion, and model management
//!
//! Every classify and severity call yields an answer. Undecodable input,
//! missing models and failing predictors all degrade to a fallback answer
//! unless strict image validation is enabled.

use civiclens_classifiers::{ClassifierRegistry, ImageInput, ReloadOutcome, SlotId};
use civiclens_core::{
    AreaDecision, AreaType, Error, IssueType, Result, Severity, SeverityDecision,
};
use civiclens_policy::{
    area_type, severity_from, validate_coordinates, FallbackGenerator, FusionOutcome, FusionPolicy,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;

/// Shared classification service
pub struct ClassificationService {
    registry: Arc<ClassifierRegistry>,
    policy: FusionPolicy,
    fallback: FallbackGenerator,
    reject_undecodable_images: bool,
}

impl ClassificationService {
    pub fn new(registry: Arc<ClassifierRegistry>, config: &ServiceConfig) -> Self {
        if config.fallback_seed.is_some() {
            info!("Fallback answers use a fixed seed");
        }

        Self {
            registry,
            policy: FusionPolicy::new(config.fusion),
            fallback: FallbackGenerator::new(config.fallback_seed),
            reject_undecodable_images: config.reject_undecodable_images,
        }
    }

    pub fn registry(&self) -> &Arc<ClassifierRegistry> {
        &self.registry
    }

    /// Classify an encoded image into an issue type
    pub async fn classify<B>(&self, image: B) -> Result<FusionOutcome>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let request_id = Uuid::new_v4();

        let Some(image) = self.decode(image, request_id).await? else {
            return Ok(FusionOutcome {
                decision: self.fallback.issue(),
                rule: None,
                corroboration: None,
            });
        };

        let inputs = self.registry.predict_all(image).await;
        let outcome = self.policy.evaluate(&inputs, &self.fallback);

        match outcome.rule {
            Some(rule) => {
                metrics::counter!("civiclens_decisions_total", "rule" => rule).increment(1);
            }
            None => {
                metrics::counter!("civiclens_fallbacks_total", "reason" => "no_signal").increment(1);
            }
        }

        if let Some(corroboration) = &outcome.corroboration {
            debug!(
                %request_id,
                "Garbage specialist reported '{}' ({:.3})",
                corroboration.label,
                corroboration.confidence
            );
        }

        info!(
            %request_id,
            present = inputs.present(),
            rule = outcome.rule.unwrap_or("fallback"),
            "Classified as {} ({:.3})",
            outcome.decision.issue_type,
            outcome.decision.confidence
        );

        Ok(outcome)
    }

    /// Severity of the issue shown in an encoded image.
    ///
    /// Uses the confidence of the first predictor to answer, in the order
    /// general, common, garbage.
    pub async fn severity<B>(&self, image: B) -> Result<SeverityDecision>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let request_id = Uuid::new_v4();

        let Some(image) = self.decode(image, request_id).await? else {
            return Ok(self.fallback.severity());
        };

        let mut confidence = None;
        for slot in SlotId::ALL {
            if let Some(prediction) = self.registry.predict_slot(slot, Arc::clone(&image)).await {
                debug!(%request_id, "Severity confidence from {}", slot);
                confidence = Some(prediction.confidence);
                break;
            }
        }

        if confidence.is_none() {
            metrics::counter!("civiclens_fallbacks_total", "reason" => "no_signal").increment(1);
        }

        let decision = severity_from(confidence, &self.fallback);
        info!(
            %request_id,
            "Severity {} ({:.3})",
            decision.severity.as_str(),
            decision.confidence
        );

        Ok(decision)
    }

    /// Area type for a coordinate pair; the confidence is synthetic
    pub fn area_type(&self, latitude: f64, longitude: f64) -> Result<AreaDecision> {
        validate_coordinates(latitude, longitude)?;
        Ok(area_type(latitude, longitude, &self.fallback))
    }

    /// Model availability and the label sets of each decision
    pub fn models_info(&self) -> ModelsInfo {
        let models = self
            .registry
            .descriptors()
            .into_iter()
            .map(|(slot, descriptor)| {
                (
                    descriptor.id,
                    ModelInfo {
                        slot,
                        available: descriptor.loaded,
                        path: descriptor.path,
                        purpose: descriptor.purpose,
                        specialty: descriptor.specialty,
                    },
                )
            })
            .collect();

        ModelsInfo {
            active_model: "combined",
            models,
            classification_model: CategoryInfo {
                name: "Civic Issue Classifier",
                classes: IssueType::ALL.to_vec(),
                version: env!("CARGO_PKG_VERSION"),
            },
            severity_model: CategoryInfo {
                name: "Severity Classifier",
                classes: Severity::ALL.to_vec(),
                version: env!("CARGO_PKG_VERSION"),
            },
            area_type_model: CategoryInfo {
                name: "Area Type Classifier",
                classes: AreaType::ALL.to_vec(),
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }

    /// Reload one slot, or every slot when `slot` is `None`
    pub async fn reload(&self, slot: Option<SlotId>) -> Result<ReloadReport> {
        let registry = Arc::clone(&self.registry);

        let report = tokio::task::spawn_blocking(move || match slot {
            Some(slot) => {
                let outcome = registry.reload(slot);
                let descriptor = registry.descriptor(slot);
                let message = match outcome {
                    ReloadOutcome::Loaded => {
                        format!("{} model '{}' reloaded successfully", slot, descriptor.id)
                    }
                    ReloadOutcome::Kept => format!(
                        "{} model file not found at {}, keeping current model '{}'",
                        slot, descriptor.path, descriptor.id
                    ),
                    ReloadOutcome::Unavailable => {
                        format!("Failed to load {} model from {}", slot, descriptor.path)
                    }
                };
                let loaded = outcome.is_loaded();
                ReloadReport {
                    success: loaded,
                    message,
                    models: BTreeMap::from([(slot, loaded)]),
                }
            }
            None => {
                let models = registry.reload_all();
                let loaded = models.values().filter(|loaded| **loaded).count();
                ReloadReport {
                    success: loaded > 0,
                    message: format!("Reloaded {}/{} models", loaded, models.len()),
                    models,
                }
            }
        })
        .await
        .map_err(|e| Error::internal(format!("reload task failed: {}", e)))?;

        info!("{}", report.message);
        Ok(report)
    }

    /// Decode on the blocking pool; `None` means answer with a fallback
    async fn decode<B>(&self, image: B, request_id: Uuid) -> Result<Option<Arc<ImageInput>>>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let decoded = tokio::task::spawn_blocking(move || ImageInput::decode(image.as_ref()))
            .await
            .unwrap_or_else(|e| Err(Error::internal(format!("image decoding panicked: {}", e))));

        match decoded {
            Ok(image) => Ok(Some(Arc::new(image))),
            Err(e) if self.reject_undecodable_images => Err(e),
            Err(e) => {
                warn!(%request_id, "Answering with fallback: {}", e);
                metrics::counter!("civiclens_fallbacks_total", "reason" => "undecodable_image")
                    .increment(1);
                Ok(None)
            }
        }
    }
}

/// Response of `/models/info`
#[derive(Debug, Clone, Serialize)]
pub struct ModelsInfo {
    pub active_model: &'static str,
    pub models: BTreeMap<String, ModelInfo>,
    pub classification_model: CategoryInfo<IssueType>,
    pub severity_model: CategoryInfo<Severity>,
    pub area_type_model: CategoryInfo<AreaType>,
}

/// One registry slot as reported by `/models/info`
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub slot: SlotId,
    pub available: bool,
    pub path: String,
    pub purpose: String,
    pub specialty: BTreeSet<String>,
}

/// Label set of one decision kind
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo<T> {
    pub name: &'static str,
    pub classes: Vec<T>,
    pub version: &'static str,
}

/// Response of `/models/reload`
#[derive(Debug, Clone, Serialize)]
pub struct ReloadReport {
    pub success: bool,
    pub message: String,
    pub models: BTreeMap<SlotId, bool>,
}
