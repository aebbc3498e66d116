//! Stratified train/test splitting

use crate::error::{FraudError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so both partitions keep the class proportions of `labels`.
///
/// The test partition receives `ceil(test_size * n)` rows, distributed over
/// classes in proportion to their size (largest remainder first). Every class
/// must have at least two members and end up in both partitions. The split is
/// deterministic for a given `seed`.
pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FraudError::InvalidConfig(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n = labels.len();
    if n == 0 {
        return Err(FraudError::EmptyDataset);
    }

    let mut classes: Vec<(u8, Vec<usize>)> = Vec::new();
    for (index, &label) in labels.iter().enumerate() {
        match classes.iter_mut().find(|(class, _)| *class == label) {
            Some((_, members)) => members.push(index),
            None => classes.push((label, vec![index])),
        }
    }
    classes.sort_by_key(|(class, _)| *class);

    if let Some((class, members)) = classes.iter().find(|(_, members)| members.len() < 2) {
        return Err(FraudError::Stratification(format!(
            "the least populated class ({}) has only {} member(s); at least 2 are required",
            class,
            members.len()
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n - n_test;
    if n_test < classes.len() || n_train < classes.len() {
        return Err(FraudError::Stratification(format!(
            "{} test and {} train rows cannot hold all {} classes",
            n_test,
            n_train,
            classes.len()
        )));
    }

    let allocation = allocate(&classes, n_test, n);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for ((_, members), take) in classes.iter().zip(allocation) {
        let mut shuffled = members.clone();
        shuffled.shuffle(&mut rng);
        let (class_test, class_train) = shuffled.split_at(take);
        test.extend_from_slice(class_test);
        train.extend_from_slice(class_train);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok(SplitIndices { train, test })
}

/// Number of test rows per class, each clamped to `[1, size - 1]`
fn allocate(classes: &[(u8, Vec<usize>)], n_test: usize, n: usize) -> Vec<usize> {
    let exact: Vec<f64> = classes
        .iter()
        .map(|(_, members)| members.len() as f64 * n_test as f64 / n as f64)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut remaining = n_test.saturating_sub(counts.iter().sum());
    let mut order: Vec<usize> = (0..classes.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });
    for &i in order.iter().cycle().take(order.len() * 2) {
        if remaining == 0 {
            break;
        }
        if counts[i] < classes[i].1.len() - 1 {
            counts[i] += 1;
            remaining -= 1;
        }
    }

    for (count, (_, members)) in counts.iter_mut().zip(classes) {
        *count = (*count).clamp(1, members.len() - 1);
    }
    counts
}
