//! Persistence of the fitted pipeline
//!
//! The artifact is a single JSON document: format version, creation time,
//! model version, and the fitted pipeline (schema included). It is written
//! once per training run and overwritten by retraining.

use crate::error::{FraudError, Result};
use crate::pipeline::{FeatureSchema, ModelPipeline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

/// Bumped whenever the serialized pipeline layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Default location of the fitted pipeline
pub const DEFAULT_MODEL_PATH: &str = "models/fraud_model.json";

/// Default location of the metrics report
pub const DEFAULT_METRICS_PATH: &str = "models/metrics.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub model_version: String,
    pub pipeline: ModelPipeline,
}

impl PipelineArtifact {
    /// Wrap a fitted pipeline; the model version is derived from the creation time
    pub fn new(pipeline: ModelPipeline) -> Result<Self> {
        if !pipeline.is_fitted() {
            return Err(FraudError::NotFitted);
        }
        let created_at = Utc::now();
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_version: created_at.format("%Y%m%d%H%M%S").to_string(),
            created_at,
            pipeline,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.pipeline.schema()
    }

    /// Write the artifact, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let bytes = serde_json::to_vec(self)?;
        fs::write(path, &bytes)?;
        info!(
            path = %path.display(),
            model_version = %self.model_version,
            bytes = bytes.len(),
            "Saved model artifact"
        );
        Ok(())
    }

    /// Read an artifact, returning it together with the SHA-256 of its bytes
    pub fn load(path: &Path) -> Result<(Self, String)> {
        if !path.exists() {
            return Err(FraudError::ArtifactNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let artifact: Self = serde_json::from_slice(&bytes)?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(FraudError::ArtifactVersion {
                found: artifact.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if !artifact.pipeline.is_fitted() {
            return Err(FraudError::NotFitted);
        }

        Ok((artifact, compute_checksum(&bytes)))
    }
}

/// Compute SHA256 checksum
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Serialize `value` as indented JSON, creating parent directories as needed
pub fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::build_model_pipeline;

    #[test]
    fn test_checksum_is_sha256_hex() {
        let checksum = compute_checksum(b"hello");
        assert_eq!(
            checksum,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_unfitted_pipeline_cannot_be_wrapped() {
        let pipeline = build_model_pipeline(FeatureSchema::default());
        assert!(matches!(
            PipelineArtifact::new(pipeline),
            Err(FraudError::NotFitted)
        ));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineArtifact::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, FraudError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_corrupt_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            PipelineArtifact::load(&path),
            Err(FraudError::Json(_))
        ));
    }

    #[test]
    fn test_write_pretty_json_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("metrics.json");
        write_pretty_json(&path, &serde_json::json!({"a": 1})).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"a\": 1"));
    }
}
