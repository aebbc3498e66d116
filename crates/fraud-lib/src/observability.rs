//! Observability infrastructure for the fraud service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, errors, model version)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors: IntCounter,
    rejected_requests: IntCounterVec,
    model_version_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "fraud_service_prediction_latency_seconds",
                "Time spent scoring a transaction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "fraud_service_predictions_total",
                "Number of predictions served, by outcome",
                &["outcome"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter!(
                "fraud_service_prediction_errors_total",
                "Number of predictions that failed inside the model"
            )
            .expect("Failed to register prediction_errors"),

            rejected_requests: register_int_counter_vec!(
                "fraud_service_rejected_requests_total",
                "Number of prediction requests rejected before scoring, by reason",
                &["reason"]
            )
            .expect("Failed to register rejected_requests"),

            model_version_info: register_gauge_vec!(
                "fraud_service_model_version_info",
                "Information about the currently loaded model",
                &["version", "fingerprint"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, is_fraud: bool) {
        let outcome = if is_fraud { "fraud" } else { "legit" };
        self.inner()
            .predictions_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    /// Count a request rejected before scoring (`invalid`, `not_ready`)
    pub fn inc_rejected(&self, reason: &str) {
        self.inner()
            .rejected_requests
            .with_label_values(&[reason])
            .inc();
    }

    pub fn set_model_version(&self, version: &str, fingerprint: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, fingerprint])
            .set(1.0);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_version: Option<&str>) {
        info!(
            event = "service_started",
            service = %self.service_name,
            service_version = %version,
            model_version = model_version.unwrap_or("none"),
            "Fraud service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Fraud service shutting down"
        );
    }

    pub fn log_prediction(
        &self,
        transaction_type: &str,
        amount: f64,
        is_fraud: bool,
        fraud_probability: f64,
        model_version: &str,
    ) {
        if is_fraud {
            warn!(
                event = "fraud_predicted",
                service = %self.service_name,
                transaction_type = %transaction_type,
                amount = amount,
                fraud_probability = fraud_probability,
                model_version = %model_version,
                "Transaction flagged as fraud"
            );
        } else {
            info!(
                event = "prediction_served",
                service = %self.service_name,
                transaction_type = %transaction_type,
                amount = amount,
                fraud_probability = fraud_probability,
                model_version = %model_version,
                "Transaction scored"
            );
        }
    }

    pub fn log_training_completed(
        &self,
        model_version: &str,
        accuracy: f64,
        roc_auc: f64,
        model_path: &str,
    ) {
        info!(
            event = "training_completed",
            service = %self.service_name,
            model_version = %model_version,
            accuracy = accuracy,
            roc_auc = roc_auc,
            model_path = %model_path,
            "Model training completed"
        );
    }

    pub fn log_rejected(&self, reason: &str, detail: &str) {
        warn!(
            event = "prediction_rejected",
            service = %self.service_name,
            reason = %reason,
            detail = %detail,
            "Prediction request rejected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        // Prometheus uses a global registry; repeated handles share one instance.
        let metrics = ServiceMetrics::new();
        let again = ServiceMetrics::new();

        metrics.observe_prediction_latency(0.001);
        metrics.inc_predictions(true);
        again.inc_predictions(false);
        metrics.inc_prediction_errors();
        metrics.inc_rejected("invalid");
        metrics.set_model_version("20260101000000", "abc123");
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("fraud-service");
        assert_eq!(logger.service_name, "fraud-service");
    }
}
