//! Fraud service - HTTP prediction endpoint for the fitted fraud pipeline
//!
//! Loads the model artifact once at startup and serves predictions until
//! Ctrl-C. A missing or invalid artifact is fatal.

use anyhow::{Context, Result};
use fraud_lib::{
    inference::{FraudClassifier, FraudModel},
    observability::{ServiceMetrics, StructuredLogger},
};
use fraud_service::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fraud-service");

    let config = ServiceConfig::load().context("failed to load service configuration")?;
    info!(
        host = %config.host,
        port = config.port,
        model_path = %config.model_path.display(),
        "Service configured"
    );

    let model = FraudModel::load(&config.model_path).with_context(|| {
        format!(
            "failed to load model artifact from {}",
            config.model_path.display()
        )
    })?;

    let metrics = ServiceMetrics::new();
    metrics.set_model_version(model.model_version(), model.fingerprint());

    let logger = StructuredLogger::new("fraud-service");
    logger.log_startup(SERVICE_VERSION, Some(model.model_version()));

    let model: Arc<dyn FraudClassifier> = Arc::new(model);
    let app_state = Arc::new(api::AppState::new(Some(model), metrics, logger));

    api::serve(&config.bind_address(), app_state).await?;
    info!("Shutting down");

    Ok(())
}
