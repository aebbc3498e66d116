//! Classification quality metrics for the held-out partition
//!
//! The report layout follows the familiar "classification report" shape:
//! one entry per class label, `accuracy`, `macro avg` and `weighted avg`,
//! followed by `roc_auc` and a 2x2 `confusion_matrix`.

use crate::error::{FraudError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Precision, recall and F1 for one class (or an average over classes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: u64,
}

/// Evaluation summary written next to the model artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    /// Keyed by class label ("0", "1")
    #[serde(flatten)]
    pub classes: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassMetrics,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassMetrics,
    pub roc_auc: f64,
    /// Rows are true labels, columns predicted labels
    pub confusion_matrix: Vec<Vec<u64>>,
}

impl MetricsReport {
    /// Build the report from true labels, predicted labels and positive-class scores
    pub fn evaluate(y_true: &[u8], y_pred: &[u8], scores: &[f64]) -> Result<Self> {
        if y_true.len() != y_pred.len() || y_true.len() != scores.len() {
            return Err(FraudError::LengthMismatch {
                features: y_pred.len(),
                labels: y_true.len(),
            });
        }
        if y_true.is_empty() {
            return Err(FraudError::EmptyDataset);
        }

        let matrix = confusion_matrix(y_true, y_pred);
        let total = y_true.len() as u64;

        let mut classes = BTreeMap::new();
        for class in 0..2usize {
            let true_positive = matrix[class][class];
            let predicted = matrix[0][class] + matrix[1][class];
            let support = matrix[class][0] + matrix[class][1];

            let precision = ratio(true_positive, predicted);
            let recall = ratio(true_positive, support);
            classes.insert(
                class.to_string(),
                ClassMetrics {
                    precision,
                    recall,
                    f1_score: f1(precision, recall),
                    support,
                },
            );
        }

        let macro_avg = average(classes.values(), |_| 1.0, total);
        let weighted_avg = average(classes.values(), |m| m.support as f64, total);
        let accuracy = ratio(matrix[0][0] + matrix[1][1], total);

        Ok(Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
            roc_auc: roc_auc(y_true, scores)?,
            confusion_matrix: matrix.iter().map(|row| row.to_vec()).collect(),
        })
    }

    pub fn class(&self, label: u8) -> Option<&ClassMetrics> {
        self.classes.get(&label.to_string())
    }
}

/// 2x2 confusion matrix indexed `[true][predicted]`
pub fn confusion_matrix(y_true: &[u8], y_pred: &[u8]) -> [[u64; 2]; 2] {
    let mut matrix = [[0u64; 2]; 2];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        matrix[usize::from(t.min(1))][usize::from(p.min(1))] += 1;
    }
    matrix
}

/// Area under the ROC curve via the rank-sum statistic; ties share the
/// average rank. Requires both classes to be present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Result<f64> {
    let n_positive = y_true.iter().filter(|&&t| t == 1).count();
    let n_negative = y_true.len() - n_positive;
    if n_positive == 0 || n_negative == 0 {
        return Err(FraudError::SingleClass);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; tied block [start, end) shares the mean rank
        let mean_rank = (start + end + 1) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = mean_rank;
        }
        start = end;
    }

    let positive_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&t, _)| t == 1)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_positive as f64;
    let u = positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Ok(u / (n_pos * n_negative as f64))
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn average<'a>(
    metrics: impl Iterator<Item = &'a ClassMetrics> + Clone,
    weight: impl Fn(&ClassMetrics) -> f64,
    total: u64,
) -> ClassMetrics {
    let weight_sum: f64 = metrics.clone().map(&weight).sum();
    let mean = |field: fn(&ClassMetrics) -> f64| {
        if weight_sum == 0.0 {
            0.0
        } else {
            metrics.clone().map(|m| field(m) * weight(m)).sum::<f64>() / weight_sum
        }
    };
    ClassMetrics {
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1_score: mean(|m| m.f1_score),
        support: total,
    }
}
