//! CivicLens Server
//!
//! Classifies photos of civic issues (potholes, garbage, broken
//! streetlights, water leaks) by fusing several image classifiers, and
//! derives severity and area type.

use anyhow::Result;
use civiclens_classifiers::ClassifierRegistry;
use civiclens_server::{create_router, AppState, ClassificationService, ConfigOverrides, ServiceConfig};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "civiclens-server")]
#[command(about = "CivicLens civic issue classification service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "civiclens.yaml", env = "CIVICLENS_CONFIG")]
    config: PathBuf,

    /// Directory holding model weights
    #[arg(short, long, env = "CIVICLENS_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Seed for fallback answers
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen: self.listen.clone(),
            port: self.port,
            models_dir: self.models_dir.clone(),
            fallback_seed: self.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    info!("Starting CivicLens Server");

    // Load configuration
    let config = ServiceConfig::load(&cli.config, &cli.overrides())?;
    info!("Configuration loaded successfully");
    info!("Models directory: {}", config.classifiers.models_dir.display());
    info!("Predictor timeout: {:?}", config.classifiers.predictor_timeout());

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Load classifiers; missing models leave their slot empty
    let classifier_config = config.classifiers.clone();
    let registry =
        tokio::task::spawn_blocking(move || ClassifierRegistry::load(classifier_config)).await?;
    if registry.loaded_count() == 0 {
        warn!("No models loaded, every classification will be a fallback answer");
    }

    let service = ClassificationService::new(Arc::new(registry), &config);
    let addr = config.socket_addr()?;

    let state = AppState {
        config: Arc::new(config),
        service: Arc::new(service),
        metrics_handle,
    };

    // Build and run the server with graceful shutdown
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("civiclens=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("civiclens=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "civiclens_requests_total",
        "Total number of requests processed by endpoint"
    );
    metrics::describe_counter!(
        "civiclens_decisions_total",
        "Total number of fusion decisions by deciding rule"
    );
    metrics::describe_counter!(
        "civiclens_fallbacks_total",
        "Total number of random fallback answers by reason"
    );
    metrics::describe_counter!(
        "civiclens_predictor_failures_total",
        "Total number of predictor errors, panics, and timeouts by slot"
    );
    metrics::describe_histogram!(
        "civiclens_inference_latency_us",
        metrics::Unit::Microseconds,
        "Predictor inference latency in microseconds by slot"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
