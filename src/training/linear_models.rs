//! Linear model fitting
//!
//! Ordinary least squares and ridge regression solved through the centered
//! normal equations. The intercept is never penalized.

use super::cross_validation::{CVResults, KFold};
use crate::data::{Dataset, Formula};
use crate::error::{RegsearchError, Result};
use crate::metrics;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relative pivot tolerance below which a design is treated as rank deficient
const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-10;

/// Solve the symmetric positive-definite system `a x = b` by Cholesky
/// decomposition. Returns `None` when a pivot falls below `tol` relative to
/// the largest diagonal entry of `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>, tol: f64) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let scale = a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let threshold = tol * scale.max(f64::MIN_POSITIVE);

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= threshold {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan elimination with partial pivoting on `[a | b]` (fallback)
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>, tol: f64) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let threshold = tol * scale.max(f64::MIN_POSITIVE);

    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < threshold {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                if factor != 0.0 {
                    for j in 0..=n {
                        aug[[row, j]] -= factor * aug[[col, j]];
                    }
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// `intercept + x · coefficients`, row-wise.
///
/// Used for every linear prediction, including ridge refits whose fitter
/// exposes only coefficients.
pub fn linear_predict(
    intercept: f64,
    coefficients: ArrayView1<f64>,
    x: ArrayView2<f64>,
) -> Result<Array1<f64>> {
    if x.ncols() != coefficients.len() {
        return Err(RegsearchError::ShapeError {
            expected: format!("{} feature columns", coefficients.len()),
            actual: format!("{} feature columns", x.ncols()),
        });
    }
    Ok(x.dot(&coefficients) + intercept)
}

/// Outcome of one linear fit. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub formula: Formula,
    pub intercept: f64,
    /// One weight per formula predictor, in formula order
    pub coefficients: Vec<f64>,
    /// In-sample R²
    pub r2: f64,
    /// In-sample adjusted R²
    pub adjusted_r2: f64,
    /// L2 penalty used; 0 for ordinary least squares
    pub penalty: f64,
    pub n_samples: usize,
}

impl FitResult {
    /// Weight of a predictor by name
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.formula
            .predictors()
            .iter()
            .position(|p| p == name)
            .map(|i| self.coefficients[i])
    }

    /// `(predictor, weight)` pairs in formula order
    pub fn named_coefficients(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.formula
            .predictors()
            .iter()
            .map(String::as_str)
            .zip(self.coefficients.iter().copied())
    }

    /// Predict the target for every row of `data`
    pub fn predict(&self, data: &Dataset) -> Result<Array1<f64>> {
        let x = data.design(&self.formula)?;
        linear_predict(self.intercept, ArrayView1::from(&self.coefficients), x.view())
    }
}

/// Fitting backend driven by the search engines
pub trait LinearFitter: Send + Sync {
    /// Short backend name for logs and reports
    fn name(&self) -> &str;

    /// Fit `formula` on `data`. `penalty == 0` is ordinary least squares,
    /// `penalty > 0` is ridge.
    fn fit(&self, formula: &Formula, data: &Dataset, penalty: f64) -> Result<FitResult>;

    /// Mean validation MSE of `formula` at `penalty` over the folds of `kfold`.
    ///
    /// A failed fit in any fold fails the whole evaluation.
    fn cross_validate(
        &self,
        formula: &Formula,
        data: &Dataset,
        penalty: f64,
        kfold: &KFold,
    ) -> Result<CVResults> {
        let folds = kfold.split(data.n_samples())?;
        let mut scores = Vec::with_capacity(folds.len());

        for fold in &folds {
            let train = data.select_rows(&fold.train_indices);
            let valid = data.select_rows(&fold.test_indices);
            let fit = self.fit(formula, &train, penalty)?;
            let predictions = fit.predict(&valid)?;
            scores.push(metrics::score(&predictions, valid.target())?);
        }

        Ok(CVResults::from_scores(scores))
    }
}

/// Closed-form fitter over the centered normal equations.
///
/// Solves `(XcᵀXc + penalty·I) w = Xcᵀyc` by Cholesky with a Gauss-Jordan
/// fallback. A rank-deficient design (duplicated or constant predictor under
/// OLS) is reported as [`RegsearchError::FitFailure`], never regularized away.
#[derive(Debug, Clone)]
pub struct NormalEquationFitter {
    pivot_tolerance: f64,
}

impl Default for NormalEquationFitter {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalEquationFitter {
    pub fn new() -> Self {
        Self {
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }

    pub fn with_pivot_tolerance(mut self, tol: f64) -> Self {
        self.pivot_tolerance = tol;
        self
    }

    fn solve(&self, formula: &Formula, xtx: &Array2<f64>, xty: &Array1<f64>) -> Result<Array1<f64>> {
        if let Some(w) = cholesky_solve(xtx, xty, self.pivot_tolerance) {
            return Ok(w);
        }
        gauss_jordan_solve(xtx, xty, self.pivot_tolerance)
            .ok_or_else(|| RegsearchError::fit_failure(formula, "rank-deficient design matrix"))
    }
}

impl LinearFitter for NormalEquationFitter {
    fn name(&self) -> &str {
        "normal-equations"
    }

    fn fit(&self, formula: &Formula, data: &Dataset, penalty: f64) -> Result<FitResult> {
        if !(penalty >= 0.0 && penalty.is_finite()) {
            return Err(RegsearchError::ConfigError(format!(
                "penalty must be a finite value >= 0, got {}",
                penalty
            )));
        }

        let x = data.design(formula)?;
        let y = data.target();
        let (n_samples, n_features) = x.dim();

        if n_samples <= n_features + 1 {
            return Err(RegsearchError::fit_failure(
                formula,
                format!(
                    "{} samples cannot support {} predictors plus an intercept",
                    n_samples, n_features
                ),
            ));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| RegsearchError::fit_failure(formula, "empty design matrix"))?;
        let y_mean = y.mean().unwrap_or(0.0);
        let x_centered = &x - &x_mean;
        let y_centered = y - y_mean;

        let mut xtx = x_centered.t().dot(&x_centered);
        for i in 0..n_features {
            xtx[[i, i]] += penalty;
        }
        let xty = x_centered.t().dot(&y_centered);

        let coefficients = self.solve(formula, &xtx, &xty)?;
        if coefficients.iter().any(|w| !w.is_finite()) {
            return Err(RegsearchError::fit_failure(formula, "non-finite coefficients"));
        }
        let intercept = y_mean - coefficients.dot(&x_mean);

        let fitted = linear_predict(intercept, coefficients.view(), x.view())?;
        let r2 = metrics::r_squared(&fitted, y)?;
        let adjusted_r2 = metrics::adjusted_r_squared(r2, n_samples, n_features)?;

        debug!(
            formula = %formula,
            penalty,
            r2,
            adjusted_r2,
            n_samples,
            "fitted linear model"
        );

        Ok(FitResult {
            formula: formula.clone(),
            intercept,
            coefficients: coefficients.to_vec(),
            r2,
            adjusted_r2,
            penalty,
            n_samples,
        })
    }
}
