//! Train/test partitioning

use crate::error::{LoanflowError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Deterministic random partition: the same seed over the same input
/// ordering always yields the same split.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>)> {
    let n_samples = x.nrows();
    if n_samples != y.len() {
        return Err(LoanflowError::DataError(format!(
            "feature/target length mismatch: {n_samples} vs {}",
            y.len()
        )));
    }
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(LoanflowError::DataError(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let test_size = ((n_samples as f64) * test_fraction).ceil() as usize;
    if test_size == 0 || test_size >= n_samples {
        return Err(LoanflowError::DataError(format!(
            "cannot split {n_samples} samples with test_fraction {test_fraction}"
        )));
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(test_size);

    Ok((
        gather_rows(x, train_idx),
        gather_rows(x, test_idx),
        gather(y, train_idx),
        gather(y, test_idx),
    ))
}

fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    let n_cols = x.ncols();
    let mut rows = Vec::with_capacity(indices.len() * n_cols);
    for &i in indices {
        rows.extend(x.row(i).iter().copied());
    }
    Array2::from_shape_vec((indices.len(), n_cols), rows).unwrap()
}

fn gather(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    indices.iter().map(|&i| y[i]).collect()
}
