//! CivicLens Server
//!
//! HTTP surface for the classification service: issue type, severity and
//! area type, plus model inspection and reload.

pub mod config;
pub mod routes;
pub mod service;

pub use config::{ConfigOverrides, ServiceConfig};
pub use routes::{create_router, AppError, AppState, ImageUpload};
pub use service::{ClassificationService, ModelsInfo, ReloadReport};
