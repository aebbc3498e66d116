//! Error types for the fraud detection library

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading data, training, or running inference
#[derive(Debug, Error)]
pub enum FraudError {
    #[error("dataset not found at {0}")]
    DatasetNotFound(PathBuf),

    #[error("model artifact not found at {0}")]
    ArtifactNotFound(PathBuf),

    #[error("dataset contains no rows")]
    EmptyDataset,

    #[error("target column '{0}' is not present in the dataset")]
    MissingTargetColumn(String),

    #[error("feature column '{0}' is not present in the input")]
    MissingColumn(String),

    #[error("column '{column}' is {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing value in numeric column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("invalid label '{value}' in column '{column}': expected 0 or 1")]
    InvalidLabel { column: String, value: String },

    #[error("training labels contain a single class; at least two are required")]
    SingleClass,

    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("cannot stratify split: {0}")]
    Stratification(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("pipeline has not been fitted")]
    NotFitted,

    #[error("invalid field '{field}': {reason}")]
    InvalidRecord { field: &'static str, reason: String },

    #[error("unsupported artifact format version {found} (expected {expected})")]
    ArtifactVersion { found: u32, expected: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FraudError>;
