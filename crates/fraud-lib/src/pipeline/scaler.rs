//! Standardization of numeric features to zero mean and unit variance

use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Learned per-column statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

/// Rescales each column by its training mean and population standard deviation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Option<ScalerParams>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    pub fn params(&self) -> Option<&ScalerParams> {
        self.params.as_ref()
    }

    /// Learn column means and scales. Constant columns get a scale of 1.
    pub fn fit(&mut self, data: &Array2<f64>) -> Result<()> {
        if data.nrows() == 0 {
            return Err(FraudError::EmptyDataset);
        }

        let mean = data.mean_axis(Axis(0)).ok_or(FraudError::EmptyDataset)?;
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < f64::EPSILON { 1.0 } else { s });

        self.params = Some(ScalerParams { mean, scale });
        Ok(())
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.params.as_ref().ok_or(FraudError::NotFitted)?;
        Ok((data - &params.mean) / &params.scale)
    }

    pub fn fit_transform(&mut self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(data)?;
        self.transform(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zero_mean_unit_variance() {
        let data = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();

        for column in scaled.axis_iter(Axis(1)) {
            assert!(column.mean().unwrap().abs() < 1e-12);
            assert!((column.std(0.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_is_centered_only() {
        let data = array![[5.0], [5.0], [5.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();

        assert_eq!(scaler.params().unwrap().scale[0], 1.0);
        assert!(scaled.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(FraudError::NotFitted)
        ));
    }
}
