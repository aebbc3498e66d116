//! Training entrypoint: load, split, fit, evaluate, persist

use crate::artifact::{write_pretty_json, PipelineArtifact, DEFAULT_METRICS_PATH, DEFAULT_MODEL_PATH};
use crate::dataset::{prepare_features, Table, DEFAULT_DROP_COLUMNS, TARGET_COLUMN};
use crate::error::{FraudError, Result};
use crate::evaluation::MetricsReport;
use crate::pipeline::{build_model_pipeline, FeatureSchema};
use crate::split::stratified_split;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// How to load and prepare the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub csv_path: PathBuf,
    pub target_column: String,
    /// Columns removed before training; an empty list means the defaults
    pub drop_columns: Vec<String>,
}

impl DataConfig {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            target_column: TARGET_COLUMN.to_string(),
            drop_columns: DEFAULT_DROP_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_drop_columns(mut self, drop_columns: Vec<String>) -> Self {
        self.drop_columns = drop_columns;
        self
    }

    pub fn with_target_column(mut self, target_column: impl Into<String>) -> Self {
        self.target_column = target_column.into();
        self
    }

    /// Columns actually dropped: the configured list, or the defaults when it is empty
    pub fn effective_drop_columns(&self) -> Vec<String> {
        if self.drop_columns.is_empty() {
            DEFAULT_DROP_COLUMNS.iter().map(|s| s.to_string()).collect()
        } else {
            self.drop_columns.clone()
        }
    }
}

/// Split, seed and output locations for a training run
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub test_size: f64,
    pub random_state: u64,
    pub model_output_path: PathBuf,
    pub metrics_output_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            model_output_path: PathBuf::from(DEFAULT_MODEL_PATH),
            metrics_output_path: PathBuf::from(DEFAULT_METRICS_PATH),
        }
    }
}

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub report: MetricsReport,
    pub artifact: PipelineArtifact,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Load the dataset from disk
pub fn load_data(config: &DataConfig) -> Result<Table> {
    if !config.csv_path.exists() {
        return Err(FraudError::DatasetNotFound(config.csv_path.clone()));
    }
    let table = Table::from_csv_path(&config.csv_path)?;
    if table.n_rows() == 0 {
        return Err(FraudError::EmptyDataset);
    }
    Ok(table)
}

/// Train the fraud detection model and persist the artefacts to disk
pub fn train(data_config: &DataConfig, model_config: &ModelConfig) -> Result<MetricsReport> {
    Ok(train_with_outcome(data_config, model_config)?.report)
}

/// Like [`train`], also returning the fitted artifact and partition sizes
pub fn train_with_outcome(
    data_config: &DataConfig,
    model_config: &ModelConfig,
) -> Result<TrainingOutcome> {
    let start = Instant::now();
    let raw = load_data(data_config)?;
    info!(
        path = %data_config.csv_path.display(),
        rows = raw.n_rows(),
        columns = raw.n_columns(),
        "Loaded training data"
    );

    if !raw.contains(&data_config.target_column) {
        return Err(FraudError::MissingTargetColumn(
            data_config.target_column.clone(),
        ));
    }
    let labels = raw.labels(&data_config.target_column)?;

    let mut drop_columns = data_config.effective_drop_columns();
    drop_columns.push(data_config.target_column.clone());
    let features = prepare_features(&raw, &drop_columns);

    let split = stratified_split(&labels, model_config.test_size, model_config.random_state)?;
    let x_train = features.take_rows(&split.train);
    let x_test = features.take_rows(&split.test);
    let y_train: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();
    let y_test: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();

    let schema = FeatureSchema::infer(&features);
    if schema.is_empty() {
        return Err(FraudError::InvalidConfig(
            "no feature columns left after dropping columns".to_string(),
        ));
    }
    debug!(
        numeric = ?schema.numeric,
        categorical = ?schema.categorical,
        "Inferred feature schema"
    );

    let mut pipeline = build_model_pipeline(schema);
    pipeline.fit(&x_train, &y_train)?;

    let predictions = pipeline.predict(&x_test)?;
    let probabilities = pipeline.predict_proba(&x_test)?;
    let report = MetricsReport::evaluate(&y_test, &predictions, &probabilities)?;

    let artifact = PipelineArtifact::new(pipeline)?;
    artifact.save(&model_config.model_output_path)?;
    write_pretty_json(&model_config.metrics_output_path, &report)?;

    info!(
        train_rows = split.train.len(),
        test_rows = split.test.len(),
        accuracy = report.accuracy,
        roc_auc = report.roc_auc,
        model_path = %model_config.model_output_path.display(),
        metrics_path = %model_config.metrics_output_path.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Training completed"
    );

    Ok(TrainingOutcome {
        report,
        artifact,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
    })
}
