//! Health and readiness reporting for the prediction service
//!
//! The service has two states: `model_not_loaded` and `ready` (reported as
//! `ok`). The transition happens once at startup and never reverses.

use serde::{Deserialize, Serialize};

/// Service status as exposed by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Model loaded, predictions available
    Ok,
    /// No model loaded; predictions are rejected
    ModelNotLoaded,
}

impl ServiceStatus {
    pub fn from_model_loaded(loaded: bool) -> Self {
        if loaded {
            ServiceStatus::Ok
        } else {
            ServiceStatus::ModelNotLoaded
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceStatus::Ok)
    }
}

/// Health response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
}

impl HealthResponse {
    pub fn new(status: ServiceStatus) -> Self {
        Self { status }
    }
}

/// Readiness response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    pub fn from_status(status: ServiceStatus) -> Self {
        if status.is_ready() {
            Self {
                ready: true,
                reason: None,
            }
        } else {
            Self {
                ready: false,
                reason: Some("Model not loaded".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let ok = serde_json::to_value(HealthResponse::new(ServiceStatus::Ok)).unwrap();
        assert_eq!(ok, serde_json::json!({"status": "ok"}));

        let not_loaded =
            serde_json::to_value(HealthResponse::new(ServiceStatus::ModelNotLoaded)).unwrap();
        assert_eq!(not_loaded, serde_json::json!({"status": "model_not_loaded"}));
    }

    #[test]
    fn test_readiness_follows_status() {
        assert!(ReadinessResponse::from_status(ServiceStatus::Ok).ready);

        let readiness = ReadinessResponse::from_status(ServiceStatus::ModelNotLoaded);
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[test]
    fn test_ready_reason_omitted_from_json() {
        let json = serde_json::to_value(ReadinessResponse::from_status(ServiceStatus::Ok)).unwrap();
        assert_eq!(json, serde_json::json!({"ready": true}));
    }
}
