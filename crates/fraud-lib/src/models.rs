//! Core data models for the fraud detection pipeline

use crate::error::{FraudError, Result};
use serde::{Deserialize, Serialize};

/// A single transaction as received from the upstream data source or a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Discrete time step of the simulation
    pub step: u64,
    /// Transaction type category (PAYMENT, TRANSFER, CASH_OUT, ...)
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_orig: f64,
    #[serde(rename = "newbalanceOrig")]
    pub new_balance_orig: f64,
    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,
    #[serde(rename = "nameOrig", default)]
    pub name_orig: Option<String>,
    #[serde(rename = "nameDest", default)]
    pub name_dest: Option<String>,
    #[serde(rename = "isFlaggedFraud", default)]
    pub is_flagged_fraud: u64,
}

impl TransactionRecord {
    /// Check the constraints that serde cannot express.
    ///
    /// `step` and `isFlaggedFraud` are unsigned, so negative values never
    /// make it past deserialization.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(FraudError::InvalidRecord {
                field: "amount",
                reason: format!("must be a non-negative number, got {}", self.amount),
            });
        }

        let balances = [
            ("oldbalanceOrg", self.old_balance_orig),
            ("newbalanceOrig", self.new_balance_orig),
            ("oldbalanceDest", self.old_balance_dest),
            ("newbalanceDest", self.new_balance_dest),
        ];
        for (field, value) in balances {
            if !value.is_finite() {
                return Err(FraudError::InvalidRecord {
                    field,
                    reason: "must be a finite number".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Prediction output returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub is_fraud: bool,
    pub fraud_probability: f64,
}
