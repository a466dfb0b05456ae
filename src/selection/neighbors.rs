//! Neighborhood-size sweep for KNN regression

use super::{CancelToken, Evaluation, EvaluationTable, Grid};
use crate::data::{Formula, Split};
use crate::error::{RegsearchError, Result};
use crate::metrics;
use crate::training::{KNNRegressor, WeightScheme};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborOutcome {
    pub formula: Formula,
    pub weights: WeightScheme,
    /// Held-out MSE per k, in grid order
    pub table: EvaluationTable<usize>,
    pub best: Option<Evaluation<usize>>,
    pub cancelled: bool,
}

/// Single-split sweep over neighborhood sizes.
///
/// Expects a split whose features are already standardized.
#[derive(Debug, Clone)]
pub struct NeighborSweep {
    grid: Grid<usize>,
    weights: WeightScheme,
}

impl Default for NeighborSweep {
    fn default() -> Self {
        Self::new(Grid::range(2, 10))
    }
}

impl NeighborSweep {
    pub fn new(grid: Grid<usize>) -> Self {
        Self {
            grid,
            weights: WeightScheme::Uniform,
        }
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    fn validate(&self, n_train: usize) -> Result<()> {
        if self.grid.is_empty() {
            return Err(RegsearchError::ConfigError("neighborhood grid is empty".to_string()));
        }
        if let Some(&k) = self.grid.iter().find(|&&k| k == 0 || k > n_train) {
            return Err(RegsearchError::ConfigError(format!(
                "k = {} must be between 1 and the {} training rows",
                k, n_train
            )));
        }
        Ok(())
    }

    /// Score every k on `split.test` using `formula`'s predictors as the
    /// feature space
    pub fn run(&self, split: &Split, formula: &Formula, cancel: &CancelToken) -> Result<NeighborOutcome> {
        self.validate(split.train.n_samples())?;
        if formula.is_empty() {
            return Err(RegsearchError::ConfigError(
                "neighbor sweep needs at least one predictor".to_string(),
            ));
        }
        let x_train = split.train.design(formula)?;
        let x_test = split.test.design(formula)?;
        let y_train = split.train.target();
        let y_test = split.test.target();

        let results: Vec<Option<Result<f64>>> = self
            .grid
            .values()
            .par_iter()
            .map(|&k| {
                if cancel.is_cancelled() {
                    return None;
                }
                let evaluate = || -> Result<f64> {
                    let mut knn = KNNRegressor::with_k(k).with_weights(self.weights);
                    knn.fit(&x_train, y_train)?;
                    let predictions = knn.predict(&x_test)?;
                    metrics::score(&predictions, y_test)
                };
                Some(evaluate())
            })
            .collect();

        let mut table = EvaluationTable::new();
        let mut cancelled = false;
        for (&k, result) in self.grid.iter().zip(results) {
            match result {
                Some(mse) => {
                    let mse = mse?;
                    debug!(k, mse, "neighbor candidate scored");
                    table.push(k, mse);
                }
                None => cancelled = true,
            }
        }

        let best = table.best().cloned();
        if let Some(b) = &best {
            info!(
                formula = %formula,
                best_k = b.value,
                mse = b.mse,
                evaluated = table.len(),
                cancelled,
                "neighbor sweep finished"
            );
        }

        Ok(NeighborOutcome {
            formula: formula.clone(),
            weights: self.weights,
            table,
            best,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{split, Dataset};
    use ndarray::{Array1, Array2};

    fn line_split() -> Split {
        let x = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(10, |i| 2.0 * i as f64);
        let ds = Dataset::new(vec!["x".into()], x, y).unwrap();
        split(&ds, 0.2, 42).unwrap()
    }

    #[test]
    fn test_table_follows_grid_order() {
        let s = line_split();
        let formula = Formula::from_names(["x"]).unwrap();
        let outcome = NeighborSweep::new(Grid::range(1, 4))
            .run(&s, &formula, &CancelToken::new())
            .unwrap();

        let ks: Vec<usize> = outcome.table.rows().iter().map(|r| r.value).collect();
        assert_eq!(ks, vec![1, 2, 3, 4]);
        let best = outcome.best.unwrap();
        assert_eq!(best.mse, outcome.table.best().unwrap().mse);
    }

    #[test]
    fn test_k_larger_than_train_rejected() {
        let s = line_split();
        let formula = Formula::from_names(["x"]).unwrap();
        let err = NeighborSweep::new(Grid::new(vec![2, 9]))
            .run(&s, &formula, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, RegsearchError::ConfigError(_)));
    }

    #[test]
    fn test_empty_grid_rejected() {
        let s = line_split();
        let formula = Formula::from_names(["x"]).unwrap();
        let err = NeighborSweep::new(Grid::new(vec![]))
            .run(&s, &formula, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, RegsearchError::ConfigError(_)));
    }

    #[test]
    fn test_unknown_predictor() {
        let s = line_split();
        let formula = Formula::from_names(["sqft_lot"]).unwrap();
        let err = NeighborSweep::default().run(&s, &formula, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, RegsearchError::FeatureNotFound(_)));
    }

    #[test]
    fn test_cancelled_sweep_keeps_nothing() {
        let s = line_split();
        let formula = Formula::from_names(["x"]).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let outcome = NeighborSweep::new(Grid::range(1, 3)).run(&s, &formula, &token).unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.table.is_empty());
        assert!(outcome.best.is_none());
    }
}
