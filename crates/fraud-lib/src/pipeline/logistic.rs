//! Binary logistic regression
//!
//! Minimises the L2-regularised, class-weighted log loss
//!
//! ```text
//! 0.5 * ||w||^2 + C * sum_i s_i * logloss(y_i, sigmoid(x_i . w + b))
//! ```
//!
//! with a damped Newton solver. The intercept is not penalised. With
//! balanced weighting, `s_i = n / (2 * n_class(y_i))` so both classes
//! contribute equally to the loss regardless of imbalance.

use crate::error::{FraudError, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default iteration cap for the solver
pub const DEFAULT_MAX_ITER: usize = 1000;

/// Default gradient tolerance for convergence
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Armijo sufficient-decrease constant for the line search
const ARMIJO: f64 = 1e-4;

/// Maximum number of step halvings per Newton iteration
const MAX_HALVINGS: usize = 40;

/// Per-class sample weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// Every sample has weight 1
    Uniform,
    /// Inverse class frequency: `n_samples / (n_classes * n_class)`
    Balanced,
}

/// Learned coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub coef: Array1<f64>,
    pub intercept: f64,
    pub n_iter: usize,
    pub converged: bool,
}

/// Logistic regression classifier for 0/1 labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularisation strength
    pub c: f64,
    pub class_weight: ClassWeight,
    pub max_iter: usize,
    pub tol: f64,
    params: Option<LogisticParams>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            class_weight: ClassWeight::Balanced,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOLERANCE,
            params: None,
        }
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn params(&self) -> Option<&LogisticParams> {
        self.params.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        if x.nrows() == 0 {
            return Err(FraudError::EmptyDataset);
        }
        if x.nrows() != y.len() {
            return Err(FraudError::LengthMismatch {
                features: x.nrows(),
                labels: y.len(),
            });
        }

        let n_positive = y.iter().filter(|&&label| label == 1).count();
        let n_negative = y.len() - n_positive;
        if n_positive == 0 || n_negative == 0 {
            return Err(FraudError::SingleClass);
        }

        let weights = self.sample_weights(y, n_negative, n_positive);
        let targets = Array1::from_iter(y.iter().map(|&label| f64::from(label)));
        let design = with_bias_column(x);
        let n_params = design.ncols();

        let mut theta = Array1::<f64>::zeros(n_params);
        let mut loss = self.objective(&design, &targets, &weights, &theta);
        let mut converged = false;
        let mut n_iter = 0;

        while n_iter < self.max_iter {
            let probabilities = design.dot(&theta).mapv(sigmoid);
            let gradient = self.gradient(&design, &targets, &weights, &theta, &probabilities);

            if gradient.iter().fold(0.0_f64, |m, g| m.max(g.abs())) <= self.tol {
                converged = true;
                break;
            }
            n_iter += 1;

            let hessian = self.hessian(&design, &weights, &probabilities);
            let direction = match solve(&hessian, &gradient) {
                Some(direction) => direction,
                None => {
                    warn!("Hessian not positive definite, stopping solver early");
                    break;
                }
            };

            let decrease = gradient.dot(&direction);
            let mut step = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_HALVINGS {
                let candidate = &theta - &(&direction * step);
                let candidate_loss = self.objective(&design, &targets, &weights, &candidate);
                if candidate_loss <= loss - ARMIJO * step * decrease {
                    theta = candidate;
                    loss = candidate_loss;
                    accepted = true;
                    break;
                }
                step *= 0.5;
            }

            if !accepted {
                debug!(n_iter, loss, "Line search made no progress");
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                max_iter = self.max_iter,
                "Logistic regression did not converge; using last iterate"
            );
        }

        let intercept = theta[n_params - 1];
        let coef = theta.slice(ndarray::s![..n_params - 1]).to_owned();
        debug!(n_iter, converged, loss, "Fitted logistic regression");

        self.params = Some(LogisticParams {
            coef,
            intercept,
            n_iter,
            converged,
        });
        Ok(())
    }

    /// Signed distance to the decision boundary for each row
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let params = self.params.as_ref().ok_or(FraudError::NotFitted)?;
        if x.ncols() != params.coef.len() {
            return Err(FraudError::InvalidConfig(format!(
                "classifier expects {} features, got {}",
                params.coef.len(),
                x.ncols()
            )));
        }
        Ok(x.dot(&params.coef) + params.intercept)
    }

    /// Positive-class probability for each row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// 0/1 label for each row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>> {
        Ok(self
            .decision_function(x)?
            .iter()
            .map(|&z| u8::from(z > 0.0))
            .collect())
    }

    fn sample_weights(&self, y: &[u8], n_negative: usize, n_positive: usize) -> Array1<f64> {
        match self.class_weight {
            ClassWeight::Uniform => Array1::ones(y.len()),
            ClassWeight::Balanced => {
                let n = y.len() as f64;
                let negative = n / (2.0 * n_negative as f64);
                let positive = n / (2.0 * n_positive as f64);
                Array1::from_iter(
                    y.iter()
                        .map(|&label| if label == 1 { positive } else { negative }),
                )
            }
        }
    }

    fn objective(
        &self,
        design: &Array2<f64>,
        targets: &Array1<f64>,
        weights: &Array1<f64>,
        theta: &Array1<f64>,
    ) -> f64 {
        let n_coef = theta.len() - 1;
        let penalty = 0.5 * theta.iter().take(n_coef).map(|w| w * w).sum::<f64>();
        let margins = design.dot(theta);
        let data_loss: f64 = margins
            .iter()
            .zip(targets.iter())
            .zip(weights.iter())
            .map(|((&z, &t), &s)| s * (log1p_exp(z) - t * z))
            .sum();
        penalty + self.c * data_loss
    }

    fn gradient(
        &self,
        design: &Array2<f64>,
        targets: &Array1<f64>,
        weights: &Array1<f64>,
        theta: &Array1<f64>,
        probabilities: &Array1<f64>,
    ) -> Array1<f64> {
        let residual = (probabilities - targets) * weights * self.c;
        let mut gradient = design.t().dot(&residual);
        let n_coef = theta.len() - 1;
        for i in 0..n_coef {
            gradient[i] += theta[i];
        }
        gradient
    }

    fn hessian(
        &self,
        design: &Array2<f64>,
        weights: &Array1<f64>,
        probabilities: &Array1<f64>,
    ) -> Array2<f64> {
        let curvature = probabilities.mapv(|p| p * (1.0 - p)) * weights * self.c;
        let weighted = design * &curvature.insert_axis(Axis(1));
        let mut hessian = design.t().dot(&weighted);
        let n_params = hessian.nrows();
        for i in 0..n_params - 1 {
            hessian[[i, i]] += 1.0;
        }
        // keeps the intercept row solvable once probabilities saturate
        hessian[[n_params - 1, n_params - 1]] += 1e-10;
        hessian
    }
}

/// Numerically stable logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow
fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn with_bias_column(x: &Array2<f64>) -> Array2<f64> {
    let mut design = Array2::ones((x.nrows(), x.ncols() + 1));
    design.slice_mut(ndarray::s![.., ..x.ncols()]).assign(x);
    design
}

/// Newton direction `H^-1 g` via Cholesky; `None` when `H` is not positive definite
fn solve(hessian: &Array2<f64>, gradient: &Array1<f64>) -> Option<Array1<f64>> {
    let n = gradient.len();
    let h = DMatrix::from_fn(n, n, |i, j| hessian[[i, j]]);
    let g = DVector::from_iterator(n, gradient.iter().copied());
    let direction = h.cholesky()?.solve(&g);
    Some(Array1::from_iter(direction.iter().copied()))
}
