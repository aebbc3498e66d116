//! HTTP API for fraud prediction, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fraud_lib::{
    health::{HealthResponse, ReadinessResponse, ServiceStatus},
    inference::FraudClassifier,
    models::{PredictionResponse, TransactionRecord},
    observability::{ServiceMetrics, StructuredLogger},
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: Option<Arc<dyn FraudClassifier>>,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        model: Option<Arc<dyn FraudClassifier>>,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            model,
            metrics,
            logger,
        }
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus::from_model_loaded(self.model.is_some())
    }
}

/// Error returned to clients as `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn not_ready() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            detail: "Model not ready".to_string(),
        }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// Liveness plus model state; always 200
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse::new(state.status()))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = ReadinessResponse::from_status(state.status());

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Score a single transaction
///
/// The body is validated before model availability is checked, so a
/// malformed request is a 422 even when no model is loaded.
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransactionRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => {
            let detail = rejection.body_text();
            state.metrics.inc_rejected("invalid");
            state.logger.log_rejected("invalid", &detail);
            return Err(ApiError::unprocessable(detail));
        }
    };
    if let Err(e) = record.validate() {
        let detail = e.to_string();
        state.metrics.inc_rejected("invalid");
        state.logger.log_rejected("invalid", &detail);
        return Err(ApiError::unprocessable(detail));
    }

    let Some(model) = state.model.as_ref() else {
        state.metrics.inc_rejected("not_ready");
        return Err(ApiError::not_ready());
    };

    let start = Instant::now();
    let records = std::slice::from_ref(&record);
    let scored = model.predict(records).and_then(|labels| {
        model
            .predict_proba(records)
            .map(|probabilities| (labels, probabilities))
    });
    let (labels, probabilities) = match scored {
        Ok(scored) => scored,
        Err(e) => {
            error!(error = %e, "Prediction failed");
            state.metrics.inc_prediction_errors();
            return Err(ApiError::internal(e.to_string()));
        }
    };

    let (Some(&label), Some(&fraud_probability)) = (labels.first(), probabilities.first()) else {
        state.metrics.inc_prediction_errors();
        return Err(ApiError::internal("model returned no prediction"));
    };
    let response = PredictionResponse {
        is_fraud: label == 1,
        fraud_probability,
    };

    state
        .metrics
        .observe_prediction_latency(start.elapsed().as_secs_f64());
    state.metrics.inc_predictions(response.is_fraud);
    state.logger.log_prediction(
        &record.transaction_type,
        record.amount,
        response.is_fraud,
        response.fraud_probability,
        model.model_version(),
    );

    Ok(Json(response))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server; returns after Ctrl-C once in-flight requests finish
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let logger = state.logger.clone();
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            logger.log_shutdown("SIGINT received");
        })
        .await?;

    Ok(())
}
