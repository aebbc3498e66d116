//! Fraud detection library
//!
//! This crate provides the core functionality for:
//! - Loading transaction datasets and preparing feature tables
//! - Fitting the preprocessing + logistic regression pipeline
//! - Stratified evaluation and metrics reporting
//! - Artifact persistence and inference
//! - Health checks and observability for the prediction service

pub mod artifact;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod health;
pub mod inference;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod split;
pub mod trainer;

pub use artifact::PipelineArtifact;
pub use dataset::{prepare_features, Column, Table};
pub use error::{FraudError, Result};
pub use evaluation::{ClassMetrics, MetricsReport};
pub use health::{HealthResponse, ReadinessResponse, ServiceStatus};
pub use inference::{FraudClassifier, FraudModel};
pub use models::{PredictionResponse, TransactionRecord};
pub use observability::{ServiceMetrics, StructuredLogger};
pub use pipeline::{build_model_pipeline, FeatureSchema, ModelPipeline};
pub use trainer::{train, train_with_outcome, DataConfig, ModelConfig, TrainingOutcome};
