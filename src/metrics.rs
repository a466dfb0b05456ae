//! Scoring harness
//!
//! Pure functions over prediction/actual pairs; safe to call from any worker.

use crate::error::{RegsearchError, Result};
use ndarray::ArrayView1;

fn check_lengths(predictions: &ArrayView1<f64>, actuals: &ArrayView1<f64>) -> Result<()> {
    if predictions.len() != actuals.len() {
        return Err(RegsearchError::DataError(format!(
            "{} predictions scored against {} actuals",
            predictions.len(),
            actuals.len()
        )));
    }
    if predictions.is_empty() {
        return Err(RegsearchError::DataError("cannot score zero predictions".to_string()));
    }
    Ok(())
}

/// Mean squared error: `mean((p_i - a_i)^2)`
pub fn score<'a, 'b>(
    predictions: impl Into<ArrayView1<'a, f64>>,
    actuals: impl Into<ArrayView1<'b, f64>>,
) -> Result<f64> {
    let (predictions, actuals) = (predictions.into(), actuals.into());
    check_lengths(&predictions, &actuals)?;

    let sum: f64 = predictions
        .iter()
        .zip(actuals.iter())
        .map(|(p, a)| (p - a) * (p - a))
        .sum();
    Ok(sum / predictions.len() as f64)
}

pub fn rmse<'a, 'b>(
    predictions: impl Into<ArrayView1<'a, f64>>,
    actuals: impl Into<ArrayView1<'b, f64>>,
) -> Result<f64> {
    score(predictions, actuals).map(f64::sqrt)
}

/// Coefficient of determination.
///
/// A constant target has no variance to explain: a perfect fit scores 1,
/// anything else 0.
pub fn r_squared<'a, 'b>(
    predictions: impl Into<ArrayView1<'a, f64>>,
    actuals: impl Into<ArrayView1<'b, f64>>,
) -> Result<f64> {
    let (predictions, actuals) = (predictions.into(), actuals.into());
    check_lengths(&predictions, &actuals)?;

    let mean = actuals.sum() / actuals.len() as f64;
    let ss_res: f64 = predictions
        .iter()
        .zip(actuals.iter())
        .map(|(p, a)| (a - p) * (a - p))
        .sum();
    let ss_tot: f64 = actuals.iter().map(|a| (a - mean) * (a - mean)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// `1 - (1 - r2) (n - 1) / (n - p - 1)` for `p` predictors plus an intercept
pub fn adjusted_r_squared(r2: f64, n_samples: usize, n_predictors: usize) -> Result<f64> {
    if n_samples <= n_predictors + 1 {
        return Err(RegsearchError::DataError(format!(
            "adjusted R² needs more than {} samples for {} predictors, got {}",
            n_predictors + 1,
            n_predictors,
            n_samples
        )));
    }
    let n = n_samples as f64;
    let p = n_predictors as f64;
    Ok(1.0 - (1.0 - r2) * (n - 1.0) / (n - p - 1.0))
}
