//! End-to-end training and reload tests

use fraud_lib::{
    dataset::{prepare_features, Table, DEFAULT_DROP_COLUMNS},
    inference::{FraudClassifier, FraudModel},
    models::TransactionRecord,
    trainer::{train_with_outcome, DataConfig, ModelConfig},
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const HEADER: &str = "step,type,amount,nameOrig,oldbalanceOrg,newbalanceOrig,nameDest,oldbalanceDest,newbalanceDest,isFraud,isFlaggedFraud\n";

fn write_dataset(dir: &Path) -> PathBuf {
    let kinds = ["PAYMENT", "CASH_OUT", "TRANSFER", "DEBIT", "CASH_IN"];
    let mut csv = String::from(HEADER);
    for i in 0..50u32 {
        let fraud = i % 5 == 2;
        let kind = kinds[(i % 5) as usize];
        let amount = if fraud {
            20_000.0 + f64::from(i) * 37.5
        } else {
            150.0 + f64::from(i) * 12.25
        };
        let old_balance = amount + f64::from(i % 7) * 100.0;
        let new_balance = if fraud { 0.0 } else { old_balance - amount };
        writeln!(
            csv,
            "{},{},{},C{},{},{},C{},{},{},{},0",
            i % 10 + 1,
            kind,
            amount,
            1000 + i,
            old_balance,
            new_balance,
            2000 + i,
            f64::from(i % 3) * 250.0,
            f64::from(i % 3) * 250.0 + amount,
            u8::from(fraud)
        )
        .unwrap();
    }
    let path = dir.join("transactions.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn model_config(dir: &Path) -> ModelConfig {
    ModelConfig {
        model_output_path: dir.join("models").join("fraud_model.json"),
        metrics_output_path: dir.join("models").join("metrics.json"),
        ..ModelConfig::default()
    }
}

fn records_from_csv(path: &Path) -> Vec<TransactionRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .deserialize::<TransactionRecord>()
        .map(|record| record.unwrap())
        .collect()
}

#[test]
fn test_reloaded_model_matches_in_memory_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path());
    let config = model_config(dir.path());

    let outcome = train_with_outcome(&DataConfig::new(&data), &config).unwrap();
    let model = FraudModel::load(&config.model_output_path).unwrap();
    assert_eq!(model.model_version(), outcome.artifact.model_version);
    assert_eq!(model.fingerprint().len(), 64);

    let records = records_from_csv(&data);
    let features = prepare_features(&Table::from_records(&records), &DEFAULT_DROP_COLUMNS);

    let expected_labels = outcome.artifact.pipeline.predict(&features).unwrap();
    let expected_proba = outcome.artifact.pipeline.predict_proba(&features).unwrap();

    assert_eq!(model.predict(&records).unwrap(), expected_labels);
    assert_eq!(model.predict_proba(&records).unwrap(), expected_proba);
    assert_eq!(expected_labels.len(), records.len());
    assert!(expected_proba.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_metrics_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path());
    let config = model_config(dir.path());

    let outcome = train_with_outcome(&DataConfig::new(&data), &config).unwrap();
    assert_eq!(outcome.train_rows, 40);
    assert_eq!(outcome.test_rows, 10);

    let content = std::fs::read_to_string(&config.metrics_output_path).unwrap();
    let metrics: serde_json::Value = serde_json::from_str(&content).unwrap();

    for class in ["0", "1", "macro avg", "weighted avg"] {
        for field in ["precision", "recall", "f1-score", "support"] {
            assert!(
                metrics[class].get(field).is_some(),
                "missing {field} for {class}"
            );
        }
    }
    assert_eq!(metrics["0"]["support"], serde_json::json!(8));
    assert_eq!(metrics["1"]["support"], serde_json::json!(2));

    let roc_auc = metrics["roc_auc"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&roc_auc));
    assert_eq!(metrics["accuracy"].as_f64().unwrap(), outcome.report.accuracy);
}

#[test]
fn test_retraining_overwrites_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path());
    let config = model_config(dir.path());

    train_with_outcome(&DataConfig::new(&data), &config).unwrap();
    let first = FraudModel::load(&config.model_output_path).unwrap();

    let drop_step = DataConfig::new(&data).with_drop_columns(vec!["step".to_string()]);
    train_with_outcome(&drop_step, &config).unwrap();
    let second = FraudModel::load(&config.model_output_path).unwrap();

    assert!(first.schema().contains("step"));
    assert!(!second.schema().contains("step"));
    assert_ne!(first.fingerprint(), second.fingerprint());
}

#[test]
fn test_empty_drop_list_model_can_score_records() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path());
    let config = model_config(dir.path());

    let no_drops = DataConfig::new(&data).with_drop_columns(Vec::new());
    train_with_outcome(&no_drops, &config).unwrap();
    let model = FraudModel::load(&config.model_output_path).unwrap();

    assert!(!model.schema().contains("nameOrig"));
    assert!(!model.schema().contains("nameDest"));

    let records = records_from_csv(&data);
    assert_eq!(model.predict(&records).unwrap().len(), records.len());
    assert_eq!(model.predict_proba(&records[..1]).unwrap().len(), 1);
}

#[test]
fn test_model_trained_on_identifiers_can_score_records() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path());
    let config = model_config(dir.path());

    let keep_ids = DataConfig::new(&data).with_drop_columns(vec!["step".to_string()]);
    train_with_outcome(&keep_ids, &config).unwrap();
    let model = FraudModel::load(&config.model_output_path).unwrap();
    assert!(model.schema().contains("nameOrig"));

    let mut records = records_from_csv(&data);
    assert_eq!(model.predict(&records).unwrap().len(), records.len());

    // missing identifiers encode as an unseen category
    records[0].name_orig = None;
    records[0].name_dest = None;
    let probabilities = model.predict_proba(&records[..1]).unwrap();
    assert!((0.0..=1.0).contains(&probabilities[0]));
}
