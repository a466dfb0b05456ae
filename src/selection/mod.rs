//! Model-selection engines
//!
//! Provides the searches that drive the fitters:
//! - Greedy forward selection over predictors
//! - Fixed subset evaluation
//! - Neighborhood-size sweep for KNN
//! - Two-phase penalty sweep for ridge
//! - Final comparison by held-out MSE

pub mod cancel;
pub mod compare;
pub mod forward;
pub mod neighbors;
pub mod ridge;
pub mod subsets;

pub use cancel::CancelToken;
pub use compare::{compare, RankedModel, Ranking};
pub use forward::{ForwardOutcome, ForwardSelection, SelectedModel, Trajectory, TrajectoryStep};
pub use neighbors::{NeighborOutcome, NeighborSweep};
pub use ridge::{RidgeModel, RidgeOutcome, RidgeSweep};
pub use subsets::{evaluate_subsets, SubsetEvaluation, SubsetOutcome};

use crate::error::{RegsearchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered candidate values for one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid<T>(Vec<T>);

impl<T> Grid<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[T] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }
}

impl Grid<usize> {
    /// `lo..=hi`
    pub fn range(lo: usize, hi: usize) -> Self {
        Self((lo..=hi).collect())
    }
}

impl Grid<f64> {
    /// Linear grid from `low` to `high` in steps of `step`, both ends included.
    ///
    /// Every value is clamped into `[low, high]`. When the step would produce
    /// more than `max_points` values, `max_points` evenly spaced values are
    /// used instead.
    pub fn linear(low: f64, high: f64, step: f64, max_points: usize) -> Result<Self> {
        if !(low.is_finite() && high.is_finite() && low <= high) {
            return Err(RegsearchError::ConfigError(format!(
                "invalid grid bounds [{}, {}]",
                low, high
            )));
        }
        if !(step > 0.0 && step.is_finite()) {
            return Err(RegsearchError::ConfigError(format!("grid step must be > 0, got {}", step)));
        }
        if max_points < 2 {
            return Err(RegsearchError::ConfigError(format!(
                "a refined grid needs at least 2 points, got {}",
                max_points
            )));
        }

        let width = high - low;
        if width == 0.0 {
            return Ok(Self(vec![low]));
        }

        // cap in f64: a wide bracket over a small step overflows usize
        let raw = width / step + 1e-9;
        if raw.floor() + 1.0 > max_points as f64 {
            let spacing = width / (max_points - 1) as f64;
            let mut values: Vec<f64> = (0..max_points)
                .map(|i| (low + i as f64 * spacing).clamp(low, high))
                .collect();
            values[max_points - 1] = high;
            return Ok(Self(values));
        }

        let steps = raw.floor() as usize;
        let mut values: Vec<f64> = (0..=steps)
            .map(|i| (low + i as f64 * step).clamp(low, high))
            .collect();
        let last = values.len() - 1;
        if high - values[last] > step * 1e-6 && values.len() < max_points {
            values.push(high);
        } else {
            values[last] = high;
        }
        Ok(Self(values))
    }

    pub fn min(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::max)
    }
}

/// One row of an evaluation table: a candidate value and its error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation<T> {
    pub value: T,
    pub mse: f64,
}

/// A candidate that could not be evaluated, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub candidate: String,
    pub reason: String,
}

impl CandidateFailure {
    pub fn new(candidate: impl fmt::Display, error: &RegsearchError) -> Self {
        Self {
            candidate: candidate.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Evaluation records of one sweep, in grid order.
///
/// Failed candidates are kept apart from the scored rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTable<T> {
    rows: Vec<Evaluation<T>>,
    failures: Vec<CandidateFailure>,
}

impl<T> Default for EvaluationTable<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> EvaluationTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: T, mse: f64) {
        self.rows.push(Evaluation { value, mse });
    }

    pub fn record_failure(&mut self, failure: CandidateFailure) {
        self.failures.push(failure);
    }

    pub fn rows(&self) -> &[Evaluation<T>] {
        &self.rows
    }

    pub fn failures(&self) -> &[CandidateFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Minimum-error row; ties go to the earliest row
    pub fn best(&self) -> Option<&Evaluation<T>> {
        self.rows.iter().fold(None, |best, row| match best {
            Some(b) if b.mse <= row.mse => Some(b),
            _ => Some(row),
        })
    }

    /// Rows ordered by ascending error, ties kept in table order
    pub fn ranked(&self) -> Vec<&Evaluation<T>> {
        let mut rows: Vec<&Evaluation<T>> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.mse.total_cmp(&b.mse));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_ties_go_to_earliest() {
        let mut table = EvaluationTable::new();
        table.push(2usize, 5.0);
        table.push(3, 1.0);
        table.push(4, 1.0);
        assert_eq!(table.best().unwrap().value, 3);
        assert_eq!(table.ranked()[1].value, 4);
    }

    #[test]
    fn test_empty_table_has_no_best() {
        let table: EvaluationTable<f64> = EvaluationTable::new();
        assert!(table.best().is_none());
    }

    #[test]
    fn test_linear_grid_includes_endpoints() {
        let grid = Grid::linear(0.1, 1.0, 0.01, 2001).unwrap();
        assert_eq!(grid.len(), 91);
        assert_eq!(grid.values()[0], 0.1);
        assert_eq!(*grid.values().last().unwrap(), 1.0);
        assert!(grid.iter().all(|v| (0.1..=1.0).contains(v)));
    }

    #[test]
    fn test_linear_grid_uneven_step() {
        let grid = Grid::linear(0.0, 0.25, 0.1, 100).unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(*grid.values().last().unwrap(), 0.25);
    }

    #[test]
    fn test_linear_grid_capped() {
        let grid = Grid::linear(0.0, 100.0, 0.01, 11).unwrap();
        assert_eq!(grid.len(), 11);
        assert!((grid.values()[1] - 10.0).abs() < 1e-12);
        assert_eq!(grid.max(), Some(100.0));
    }

    #[test]
    fn test_linear_grid_wide_bracket_capped() {
        let grid = Grid::linear(0.001, 1e20, 0.01, 2001).unwrap();
        assert_eq!(grid.len(), 2001);
        assert_eq!(grid.min(), Some(0.001));
        assert_eq!(grid.max(), Some(1e20));
        assert!(grid.values().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_linear_grid_never_exceeds_cap() {
        // 0.25 / 0.1 gives 3 stepped points plus the endpoint
        let grid = Grid::linear(0.0, 0.25, 0.1, 3).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(*grid.values().last().unwrap(), 0.25);
    }

    #[test]
    fn test_linear_grid_degenerate_and_invalid() {
        assert_eq!(Grid::linear(1.0, 1.0, 0.01, 10).unwrap().values(), &[1.0]);
        assert!(Grid::linear(1.0, 0.5, 0.01, 10).is_err());
        assert!(Grid::linear(0.0, 1.0, 0.0, 10).is_err());
        assert!(Grid::linear(0.0, 1.0, 0.1, 1).is_err());
    }

    #[test]
    fn test_range_grid() {
        assert_eq!(Grid::range(2, 10).values(), &[2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }
}
