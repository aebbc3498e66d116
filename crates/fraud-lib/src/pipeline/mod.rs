//! Preprocessing + classifier pipeline
//!
//! A [`ModelPipeline`] chains a [`ColumnTransformer`] (standardized numeric
//! columns followed by one-hot encoded categorical columns) with a
//! [`LogisticRegression`] classifier. The same pipeline is fitted by the
//! trainer and persisted for inference.

mod encoder;
mod logistic;
mod scaler;

pub use encoder::OneHotEncoder;
pub use logistic::{
    sigmoid, ClassWeight, LogisticParams, LogisticRegression, DEFAULT_MAX_ITER, DEFAULT_TOLERANCE,
};
pub use scaler::{ScalerParams, StandardScaler};

use crate::dataset::{Column, Table};
use crate::error::{FraudError, Result};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Numeric feature columns of the transaction dataset
pub const NUMERIC_FEATURES: [&str; 7] = [
    "step",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
    "isFlaggedFraud",
];

/// Categorical feature columns of the transaction dataset
pub const CATEGORICAL_FEATURES: [&str; 1] = ["type"];

/// Explicit split of feature columns by type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            numeric: NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect(),
            categorical: CATEGORICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FeatureSchema {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    /// Derive the schema from the column types of a feature table
    pub fn infer(features: &Table) -> Self {
        let mut schema = Self::new(Vec::new(), Vec::new());
        for (name, column) in features.columns() {
            match column {
                Column::Numeric(_) => schema.numeric.push(name.to_string()),
                Column::Categorical(_) => schema.categorical.push(name.to_string()),
            }
        }
        schema
    }

    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.categorical.is_empty()
    }

    /// Whether `name` is a numeric or categorical feature of the schema
    pub fn contains(&self, name: &str) -> bool {
        self.numeric
            .iter()
            .chain(&self.categorical)
            .any(|column| column == name)
    }
}

/// Applies the scaler to numeric columns and the encoder to categorical
/// columns, concatenating the results in that order. Columns outside the
/// schema are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    schema: FeatureSchema,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl ColumnTransformer {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn is_fitted(&self) -> bool {
        let numeric_ready = self.schema.numeric.is_empty() || self.scaler.is_fitted();
        let categorical_ready = self.schema.categorical.is_empty() || self.encoder.is_fitted();
        numeric_ready && categorical_ready
    }

    pub fn fit(&mut self, features: &Table) -> Result<()> {
        if !self.schema.numeric.is_empty() {
            let numeric = self.numeric_block(features)?;
            self.scaler.fit(&numeric)?;
        }
        if !self.schema.categorical.is_empty() {
            let categorical = self.categorical_columns(features)?;
            self.encoder.fit(&categorical)?;
        }
        Ok(())
    }

    pub fn transform(&self, features: &Table) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(FraudError::NotFitted);
        }

        let mut blocks = Vec::with_capacity(2);
        if !self.schema.numeric.is_empty() {
            blocks.push(self.scaler.transform(&self.numeric_block(features)?)?);
        }
        if !self.schema.categorical.is_empty() {
            blocks.push(self.encoder.transform(&self.categorical_columns(features)?)?);
        }

        match blocks.len() {
            0 => Ok(Array2::zeros((features.n_rows(), 0))),
            1 => Ok(blocks.remove(0)),
            _ => {
                let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
                concatenate(Axis(1), &views)
                    .map_err(|e| FraudError::InvalidConfig(format!("cannot join feature blocks: {}", e)))
            }
        }
    }

    /// Gather numeric schema columns into a row-major matrix
    fn numeric_block(&self, features: &Table) -> Result<Array2<f64>> {
        let n_rows = features.n_rows();
        let mut block = Array2::zeros((n_rows, self.schema.numeric.len()));

        for (j, name) in self.schema.numeric.iter().enumerate() {
            let values = match features.column(name) {
                Some(Column::Numeric(values)) => values,
                Some(other) => {
                    return Err(FraudError::ColumnType {
                        column: name.clone(),
                        expected: "numeric",
                        found: other.kind(),
                    })
                }
                None => return Err(FraudError::MissingColumn(name.clone())),
            };
            for (i, &value) in values.iter().enumerate() {
                if value.is_nan() {
                    return Err(FraudError::MissingValue {
                        column: name.clone(),
                        row: i,
                    });
                }
                block[[i, j]] = value;
            }
        }

        Ok(block)
    }

    fn categorical_columns<'a>(&self, features: &'a Table) -> Result<Vec<&'a [String]>> {
        self.schema
            .categorical
            .iter()
            .map(|name| match features.column(name) {
                Some(Column::Categorical(values)) => Ok(values.as_slice()),
                Some(other) => Err(FraudError::ColumnType {
                    column: name.clone(),
                    expected: "categorical",
                    found: other.kind(),
                }),
                None => Err(FraudError::MissingColumn(name.clone())),
            })
            .collect()
    }
}

/// Fitted-or-not composition of preprocessor and classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPipeline {
    preprocessor: ColumnTransformer,
    classifier: LogisticRegression,
}

impl ModelPipeline {
    pub fn new(preprocessor: ColumnTransformer, classifier: LogisticRegression) -> Self {
        Self {
            preprocessor,
            classifier,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.preprocessor.schema()
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }

    pub fn is_fitted(&self) -> bool {
        self.preprocessor.is_fitted() && self.classifier.is_fitted()
    }

    /// Fit the preprocessor, then the classifier on its output
    pub fn fit(&mut self, features: &Table, labels: &[u8]) -> Result<()> {
        if features.n_rows() == 0 {
            return Err(FraudError::EmptyDataset);
        }
        if features.n_rows() != labels.len() {
            return Err(FraudError::LengthMismatch {
                features: features.n_rows(),
                labels: labels.len(),
            });
        }

        self.preprocessor.fit(features)?;
        let transformed = self.preprocessor.transform(features)?;
        debug!(
            rows = transformed.nrows(),
            encoded_features = transformed.ncols(),
            "Preprocessed training features"
        );
        self.classifier.fit(&transformed, labels)
    }

    pub fn predict(&self, features: &Table) -> Result<Vec<u8>> {
        let transformed = self.transform_for_inference(features)?;
        self.classifier.predict(&transformed)
    }

    pub fn predict_proba(&self, features: &Table) -> Result<Vec<f64>> {
        let transformed = self.transform_for_inference(features)?;
        Ok(self.classifier.predict_proba(&transformed)?.to_vec())
    }

    fn transform_for_inference(&self, features: &Table) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(FraudError::NotFitted);
        }
        self.preprocessor.transform(features)
    }
}

/// Create the unfit preprocessing + classifier pipeline used during training
pub fn build_model_pipeline(schema: FeatureSchema) -> ModelPipeline {
    ModelPipeline::new(
        ColumnTransformer::new(schema),
        LogisticRegression::new()
            .with_class_weight(ClassWeight::Balanced)
            .with_max_iter(DEFAULT_MAX_ITER),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{prepare_features, DEFAULT_DROP_COLUMNS, TARGET_COLUMN};

    const FIXTURE: &str = "\
step,type,amount,oldbalanceOrg,newbalanceOrig,oldbalanceDest,newbalanceDest,nameOrig,nameDest,isFlaggedFraud,isFraud
1,PAYMENT,100.0,500.0,400.0,0.0,0.0,C123,M123,0,0
2,TRANSFER,250.5,1000.0,749.5,0.0,250.5,C456,M456,0,1
3,CASH_OUT,80.0,600.0,520.0,0.0,0.0,C789,M789,0,0
4,TRANSFER,120.0,750.0,630.0,50.0,170.0,C012,M012,1,1
";

    fn fixture() -> (Table, Vec<u8>) {
        let table = Table::from_csv_reader(FIXTURE.as_bytes()).unwrap();
        let labels = table.labels(TARGET_COLUMN).unwrap();
        (prepare_features(&table, &DEFAULT_DROP_COLUMNS), labels)
    }

    fn fitted() -> (ModelPipeline, Table) {
        let (features, labels) = fixture();
        let mut pipeline = build_model_pipeline(FeatureSchema::infer(&features));
        pipeline.fit(&features, &labels).unwrap();
        (pipeline, features)
    }

    #[test]
    fn test_schema_inference_matches_defaults() {
        let (features, _) = fixture();
        let schema = FeatureSchema::infer(&features);
        assert_eq!(schema.categorical, vec!["type".to_string()]);
        assert_eq!(schema.numeric.len(), NUMERIC_FEATURES.len());
        for name in NUMERIC_FEATURES {
            assert!(schema.contains(name));
        }
        assert!(schema.contains("type"));
        assert!(!schema.contains("nameOrig"));
        assert!(!schema.contains(TARGET_COLUMN));
    }

    #[test]
    fn test_pipeline_can_fit_on_synthetic_data() {
        let (pipeline, features) = fitted();
        let predictions = pipeline.predict(&features).unwrap();
        assert_eq!(predictions.len(), 4);
        assert!(predictions.iter().all(|&p| p <= 1));
    }

    #[test]
    fn test_fitted_pipeline_separates_training_rows() {
        let (pipeline, features) = fitted();
        assert_eq!(pipeline.predict(&features).unwrap(), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (pipeline, features) = fitted();
        let probabilities = pipeline.predict_proba(&features).unwrap();
        assert_eq!(probabilities.len(), 4);
        assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_unseen_category_does_not_fail() {
        let (pipeline, _) = fitted();
        let csv = "\
step,type,amount,oldbalanceOrg,newbalanceOrig,oldbalanceDest,newbalanceDest,isFlaggedFraud
5,DEBIT,10.0,100.0,90.0,0.0,10.0,0
";
        let table = Table::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(pipeline.predict(&table).unwrap().len(), 1);

        let encoded = pipeline.preprocessor().transform(&table).unwrap();
        let categorical = encoded.slice(ndarray::s![0, NUMERIC_FEATURES.len()..]);
        assert!(categorical.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let (features, _) = fixture();
        let pipeline = build_model_pipeline(FeatureSchema::infer(&features));
        assert!(matches!(
            pipeline.predict(&features),
            Err(FraudError::NotFitted)
        ));
    }

    #[test]
    fn test_missing_feature_column_fails_fast() {
        let (pipeline, features) = fitted();
        let without_amount = features.drop_columns(&["amount"]);
        assert!(matches!(
            pipeline.predict(&without_amount),
            Err(FraudError::MissingColumn(name)) if name == "amount"
        ));
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let (pipeline, features) = fitted();
        let table = Table::from_csv_reader(FIXTURE.as_bytes()).unwrap();
        assert_eq!(
            pipeline.predict(&table).unwrap(),
            pipeline.predict(&features).unwrap()
        );
    }

    #[test]
    fn test_numeric_only_schema() {
        let (features, labels) = fixture();
        let schema = FeatureSchema::new(vec!["amount".to_string(), "step".to_string()], Vec::new());
        let mut pipeline = build_model_pipeline(schema);
        pipeline.fit(&features, &labels).unwrap();
        assert_eq!(pipeline.predict(&features).unwrap().len(), 4);
    }

    #[test]
    fn test_nan_values_rejected() {
        let (pipeline, _) = fitted();
        let csv = "\
step,type,amount,oldbalanceOrg,newbalanceOrig,oldbalanceDest,newbalanceDest,isFlaggedFraud
5,PAYMENT,,100.0,90.0,0.0,10.0,0
6,PAYMENT,3.0,100.0,90.0,0.0,10.0,0
";
        let table = Table::from_csv_reader(csv.as_bytes()).unwrap();
        assert!(matches!(
            pipeline.predict(&table),
            Err(FraudError::MissingValue { row: 0, .. })
        ));
    }
}
