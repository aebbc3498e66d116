//! Tabular record sets and feature preparation
//!
//! A [`Table`] is a small column-oriented frame: every column is either
//! numeric or categorical, and all columns share the same row count.
//! Tables are built from CSV files for training and from
//! [`TransactionRecord`]s for inference.

use crate::error::{FraudError, Result};
use crate::models::TransactionRecord;
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Name of the binary fraud label column
pub const TARGET_COLUMN: &str = "isFraud";

/// Identifier columns dropped before training and inference
pub const DEFAULT_DROP_COLUMNS: [&str; 2] = ["nameOrig", "nameDest"];

/// Column values
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human readable kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Column::Numeric(_) => "numeric",
            Column::Categorical(_) => "categorical",
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Numeric(values) => Column::Numeric(rows.iter().map(|&i| values[i]).collect()),
            Column::Categorical(values) => {
                Column::Categorical(rows.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }

    /// Infer the column type from raw CSV cells.
    ///
    /// A column is numeric when every non-empty cell parses as a number and
    /// at least one cell is non-empty. Empty numeric cells become NaN.
    fn from_cells(cells: Vec<String>) -> Column {
        let mut any_value = false;
        let numeric = cells.iter().all(|cell| {
            if cell.is_empty() {
                true
            } else {
                any_value = true;
                cell.parse::<f64>().is_ok()
            }
        });

        if numeric && any_value {
            Column::Numeric(
                cells
                    .iter()
                    .map(|cell| cell.parse::<f64>().unwrap_or(f64::NAN))
                    .collect(),
            )
        } else {
            Column::Categorical(cells)
        }
    }
}

/// Ordered collection of equally sized named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<(String, Column)>,
    n_rows: usize,
}

impl Table {
    /// Create a table from named columns, checking that lengths agree
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((name, column)) = columns.iter().find(|(_, c)| c.len() != n_rows) {
            return Err(FraudError::InvalidConfig(format!(
                "column '{}' has {} rows, expected {}",
                name,
                column.len(),
                n_rows
            )));
        }
        Ok(Self { columns, n_rows })
    }

    /// Load a headed CSV file from disk
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FraudError::DatasetNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let table = Self::from_csv_reader(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            rows = table.n_rows(),
            columns = table.n_columns(),
            "Loaded CSV dataset"
        );
        Ok(table)
    }

    /// Parse headed CSV data from any reader
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

        for record in reader.records() {
            let record = record?;
            for (column, value) in cells.iter_mut().zip(record.iter()) {
                column.push(value.to_string());
            }
        }

        let columns = headers
            .iter()
            .zip(cells)
            .map(|(name, cells)| (name.to_string(), Column::from_cells(cells)))
            .collect();
        Self::new(columns)
    }

    /// Build a table from transaction records, preserving their order.
    ///
    /// Missing identifiers are stored as empty strings.
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let numeric = |f: fn(&TransactionRecord) -> f64| {
            Column::Numeric(records.iter().map(f).collect())
        };
        let categorical = |f: fn(&TransactionRecord) -> String| {
            Column::Categorical(records.iter().map(f).collect())
        };

        let columns = vec![
            ("step".to_string(), numeric(|r| r.step as f64)),
            ("type".to_string(), categorical(|r| r.transaction_type.clone())),
            ("amount".to_string(), numeric(|r| r.amount)),
            ("oldbalanceOrg".to_string(), numeric(|r| r.old_balance_orig)),
            ("newbalanceOrig".to_string(), numeric(|r| r.new_balance_orig)),
            ("oldbalanceDest".to_string(), numeric(|r| r.old_balance_dest)),
            ("newbalanceDest".to_string(), numeric(|r| r.new_balance_dest)),
            (
                "nameOrig".to_string(),
                categorical(|r| r.name_orig.clone().unwrap_or_default()),
            ),
            (
                "nameDest".to_string(),
                categorical(|r| r.name_dest.clone().unwrap_or_default()),
            ),
            ("isFlaggedFraud".to_string(), numeric(|r| r.is_flagged_fraud as f64)),
        ];

        Self {
            columns,
            n_rows: records.len(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, column)| column)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Return a copy without the named columns; absent names are ignored
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Table {
        let columns = self
            .columns
            .iter()
            .filter(|(column, _)| !names.iter().any(|name| name.as_ref() == column))
            .cloned()
            .collect();
        Table {
            columns,
            n_rows: self.n_rows,
        }
    }

    /// Return a copy containing only the given rows, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(name, column)| (name.clone(), column.take(rows)))
            .collect();
        Table {
            columns,
            n_rows: rows.len(),
        }
    }

    /// Read a binary label column as 0/1 values
    pub fn labels(&self, name: &str) -> Result<Vec<u8>> {
        let column = self
            .column(name)
            .ok_or_else(|| FraudError::MissingTargetColumn(name.to_string()))?;

        let invalid = |value: String| FraudError::InvalidLabel {
            column: name.to_string(),
            value,
        };

        match column {
            Column::Numeric(values) => values
                .iter()
                .map(|&v| {
                    if v == 0.0 {
                        Ok(0)
                    } else if v == 1.0 {
                        Ok(1)
                    } else {
                        Err(invalid(v.to_string()))
                    }
                })
                .collect(),
            Column::Categorical(values) => values
                .iter()
                .map(|v| match v.as_str() {
                    "0" => Ok(0),
                    "1" => Ok(1),
                    other => Err(invalid(other.to_string())),
                })
                .collect(),
        }
    }
}

/// Return the feature table used by the model.
///
/// Drops `drop_columns` (absent names are ignored) and always drops the
/// target label column.
pub fn prepare_features<S: AsRef<str>>(table: &Table, drop_columns: &[S]) -> Table {
    table
        .drop_columns(drop_columns)
        .drop_columns(&[TARGET_COLUMN])
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
step,type,amount,oldbalanceOrg,newbalanceOrig,nameOrig,oldbalanceDest,newbalanceDest,nameDest,isFlaggedFraud,isFraud
1,PAYMENT,100.0,500.0,400.0,C123,0.0,0.0,M123,0,0
2,TRANSFER,250.5,1000.0,749.5,C456,0.0,250.5,M456,0,1
3,CASH_OUT,80.0,600.0,520.0,C789,0.0,0.0,M789,0,0
4,TRANSFER,120.0,750.0,630.0,C012,50.0,170.0,M012,1,1
";

    fn fixture() -> Table {
        Table::from_csv_reader(FIXTURE.as_bytes()).unwrap()
    }

    #[test]
    fn test_csv_type_inference() {
        let table = fixture();
        assert_eq!(table.n_rows(), 4);
        assert_eq!(table.n_columns(), 11);
        assert_eq!(table.column("amount").unwrap().kind(), "numeric");
        assert_eq!(table.column("type").unwrap().kind(), "categorical");
        assert_eq!(table.column("nameOrig").unwrap().kind(), "categorical");
    }

    #[test]
    fn test_empty_numeric_cell_becomes_nan() {
        let table = Table::from_csv_reader("a,b\n1,x\n,y\n".as_bytes()).unwrap();
        match table.column("a").unwrap() {
            Column::Numeric(values) => {
                assert_eq!(values[0], 1.0);
                assert!(values[1].is_nan());
            }
            other => panic!("expected numeric column, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_features_drops_target_and_ids() {
        let features = prepare_features(&fixture(), &DEFAULT_DROP_COLUMNS);
        assert!(!features.contains(TARGET_COLUMN));
        assert!(!features.contains("nameOrig"));
        assert!(!features.contains("nameDest"));
        assert_eq!(features.n_columns(), 8);
        assert_eq!(features.n_rows(), 4);
    }

    #[test]
    fn test_prepare_features_ignores_absent_columns() {
        let table = fixture().drop_columns(&["nameOrig", TARGET_COLUMN]);
        let features = prepare_features(&table, &["nameOrig", "doesNotExist"]);
        assert!(!features.contains("nameOrig"));
        assert!(!features.contains(TARGET_COLUMN));
        assert!(features.contains("nameDest"));
    }

    #[test]
    fn test_labels_parsed_as_binary() {
        assert_eq!(fixture().labels(TARGET_COLUMN).unwrap(), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_labels_reject_non_binary_values() {
        let table = Table::from_csv_reader("x,isFraud\n1,0\n2,3\n".as_bytes()).unwrap();
        assert!(matches!(
            table.labels(TARGET_COLUMN),
            Err(FraudError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn test_missing_target_column() {
        let table = fixture().drop_columns(&[TARGET_COLUMN]);
        assert!(matches!(
            table.labels(TARGET_COLUMN),
            Err(FraudError::MissingTargetColumn(_))
        ));
    }

    #[test]
    fn test_take_rows_preserves_order() {
        let subset = fixture().take_rows(&[3, 0]);
        assert_eq!(subset.n_rows(), 2);
        assert_eq!(
            subset.column("step"),
            Some(&Column::Numeric(vec![4.0, 1.0]))
        );
    }

    #[test]
    fn test_from_records_layout() {
        let record = TransactionRecord {
            step: 7,
            transaction_type: "PAYMENT".to_string(),
            amount: 12.5,
            old_balance_orig: 100.0,
            new_balance_orig: 87.5,
            old_balance_dest: 0.0,
            new_balance_dest: 0.0,
            name_orig: None,
            name_dest: Some("M1".to_string()),
            is_flagged_fraud: 0,
        };
        let table = Table::from_records(&[record]);
        assert_eq!(table.n_rows(), 1);
        assert_eq!(
            table.column("nameOrig"),
            Some(&Column::Categorical(vec![String::new()]))
        );
        assert_eq!(table.column("step"), Some(&Column::Numeric(vec![7.0])));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Table::from_csv_path(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, FraudError::DatasetNotFound(_)));
    }
}
