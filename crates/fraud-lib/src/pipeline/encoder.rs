//! One-hot encoding of categorical features
//!
//! Each input column contributes one indicator per category seen during
//! fitting. Categories that were never seen encode as all zeros.

use crate::error::{FraudError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted vocabulary per input column; `None` until fitted
    categories: Option<Vec<Vec<String>>>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.categories.is_some()
    }

    pub fn categories(&self) -> Option<&[Vec<String>]> {
        self.categories.as_deref()
    }

    /// Total number of output indicator columns
    pub fn n_outputs(&self) -> usize {
        self.categories
            .as_ref()
            .map(|c| c.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn fit(&mut self, columns: &[&[String]]) -> Result<()> {
        let categories: Vec<Vec<String>> = columns
            .iter()
            .map(|values| {
                values
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        self.categories = Some(categories);
        Ok(())
    }

    pub fn transform(&self, columns: &[&[String]]) -> Result<Array2<f64>> {
        let categories = self.categories.as_ref().ok_or(FraudError::NotFitted)?;
        if columns.len() != categories.len() {
            return Err(FraudError::InvalidConfig(format!(
                "encoder fitted on {} columns, got {}",
                categories.len(),
                columns.len()
            )));
        }

        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut encoded = Array2::zeros((n_rows, self.n_outputs()));

        let mut offset = 0;
        for (values, vocabulary) in columns.iter().zip(categories) {
            for (row, value) in values.iter().enumerate() {
                if let Ok(index) = vocabulary.binary_search(value) {
                    encoded[[row, offset + index]] = 1.0;
                }
            }
            offset += vocabulary.len();
        }

        Ok(encoded)
    }
}
