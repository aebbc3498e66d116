//! Inference over a persisted pipeline
//!
//! [`FraudModel`] loads the artifact written by the trainer and scores
//! transaction records. The [`FraudClassifier`] trait is the seam the
//! service uses, so handlers never depend on the concrete model type.

use crate::artifact::PipelineArtifact;
use crate::dataset::{prepare_features, Table, DEFAULT_DROP_COLUMNS};
use crate::error::Result;
use crate::models::TransactionRecord;
use crate::pipeline::FeatureSchema;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Trait for classifier implementations backing the prediction endpoint
pub trait FraudClassifier: Send + Sync {
    /// 0/1 label per record, in input order
    fn predict(&self, records: &[TransactionRecord]) -> Result<Vec<u8>>;

    /// Positive-class probability per record, in input order
    fn predict_proba(&self, records: &[TransactionRecord]) -> Result<Vec<f64>>;

    /// Version string of the loaded model
    fn model_version(&self) -> &str;
}

/// Fitted pipeline loaded from disk
#[derive(Debug, Clone)]
pub struct FraudModel {
    artifact: PipelineArtifact,
    fingerprint: String,
}

impl FraudModel {
    /// Load the artifact; fails if the file is missing or invalid
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        let (artifact, fingerprint) = PipelineArtifact::load(model_path)?;

        info!(
            path = %model_path.display(),
            model_version = %artifact.model_version,
            fingerprint = %fingerprint,
            "Loaded fraud model"
        );

        Ok(Self {
            artifact,
            fingerprint,
        })
    }

    /// SHA-256 of the artifact bytes
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.artifact.schema()
    }

    /// Identifier columns are stripped unless the model was trained on them
    fn features(&self, records: &[TransactionRecord]) -> Table {
        let schema = self.schema();
        let unused: Vec<&str> = DEFAULT_DROP_COLUMNS
            .iter()
            .copied()
            .filter(|column| !schema.contains(column))
            .collect();
        prepare_features(&Table::from_records(records), &unused)
    }
}

impl FraudClassifier for FraudModel {
    fn predict(&self, records: &[TransactionRecord]) -> Result<Vec<u8>> {
        let start = Instant::now();
        let labels = self.artifact.pipeline.predict(&self.features(records))?;
        debug!(
            rows = records.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Predicted labels"
        );
        Ok(labels)
    }

    fn predict_proba(&self, records: &[TransactionRecord]) -> Result<Vec<f64>> {
        let start = Instant::now();
        let probabilities = self
            .artifact
            .pipeline
            .predict_proba(&self.features(records))?;
        debug!(
            rows = records.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Predicted probabilities"
        );
        Ok(probabilities)
    }

    fn model_version(&self) -> &str {
        &self.artifact.model_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FraudError;

    #[test]
    fn test_load_missing_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FraudModel::load(dir.path().join("fraud_model.json")).unwrap_err();
        assert!(matches!(err, FraudError::ArtifactNotFound(_)));
    }
}
