//! Greedy forward selection
//!
//! Each round tries every remaining predictor on top of the current
//! selection, keeps the one with the highest in-sample R², and records the
//! grown formula. The reported model is the round with the highest adjusted
//! R², which can be an interior round.

use super::{CancelToken, CandidateFailure};
use crate::data::{Formula, Split};
use crate::error::{RegsearchError, Result};
use crate::metrics;
use crate::training::{FitResult, LinearFitter};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// One round of the search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// 1-based round number
    pub round: usize,
    /// Predictor added this round
    pub added: String,
    pub formula: Formula,
    pub fit: FitResult,
    /// Trial fits of this round that failed
    pub failures: Vec<CandidateFailure>,
}

/// Append-only sequence of rounds; formula size grows by one per step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory {
    steps: Vec<TrajectoryStep>,
}

impl Trajectory {
    fn push(&mut self, step: TrajectoryStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[TrajectoryStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&TrajectoryStep> {
        self.steps.last()
    }

    /// Step with maximum adjusted R²; ties go to the earliest round
    pub fn best_by_adjusted_r2(&self) -> Option<&TrajectoryStep> {
        self.steps.iter().fold(None, |best, step| match best {
            Some(b) if b.fit.adjusted_r2 >= step.fit.adjusted_r2 => Some(b),
            _ => Some(step),
        })
    }
}

/// The formula chosen from the trajectory, scored on held-out data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedModel {
    pub round: usize,
    pub formula: Formula,
    pub fit: FitResult,
    pub test_mse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardOutcome {
    pub trajectory: Trajectory,
    pub best: Option<SelectedModel>,
    /// Predictors left over when every trial of a round failed
    pub unfittable: Vec<String>,
    pub cancelled: bool,
}

/// Forward-selection engine over a set of candidate predictors
pub struct ForwardSelection<'a> {
    fitter: &'a dyn LinearFitter,
    candidates: Option<Vec<String>>,
}

impl<'a> ForwardSelection<'a> {
    /// Search over every predictor in the training schema
    pub fn new(fitter: &'a dyn LinearFitter) -> Self {
        Self {
            fitter,
            candidates: None,
        }
    }

    /// Restrict the search to `candidates`, in the given order
    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = Some(candidates);
        self
    }

    fn candidate_pool(&self, split: &Split) -> Result<Vec<String>> {
        let pool = match &self.candidates {
            Some(c) => c.clone(),
            None => split.train.schema().to_vec(),
        };
        if pool.is_empty() {
            return Err(RegsearchError::ConfigError(
                "forward selection needs at least one candidate predictor".to_string(),
            ));
        }
        // duplicate and unknown names are rejected before any fit
        let formula = Formula::from_names(pool.iter().cloned())?;
        split.train.resolve(&formula)?;
        split.test.resolve(&formula)?;
        Ok(pool)
    }

    /// Run every round on `split.train`, then score the chosen formula on
    /// `split.test`
    pub fn run(&self, split: &Split, cancel: &CancelToken) -> Result<ForwardOutcome> {
        let start = Instant::now();
        let mut remaining = self.candidate_pool(split)?;
        let mut selected = Formula::empty();
        let mut trajectory = Trajectory::default();
        let mut unfittable = Vec::new();
        let mut cancelled = false;

        info!(
            candidates = remaining.len(),
            train_rows = split.train.n_samples(),
            fitter = self.fitter.name(),
            "starting forward selection"
        );

        while !remaining.is_empty() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let round = trajectory.len() + 1;

            let trials = remaining
                .par_iter()
                .map(|name| {
                    let formula = selected.with(name.as_str())?;
                    let fit = self.fitter.fit(&formula, &split.train, 0.0);
                    Ok((formula, fit))
                })
                .collect::<Result<Vec<(Formula, Result<FitResult>)>>>()?;

            let mut failures = Vec::new();
            let mut winner: Option<(usize, FitResult)> = None;

            for (position, (formula, trial)) in trials.into_iter().enumerate() {
                match trial {
                    Ok(fit) => {
                        debug!(round, formula = %formula, r2 = fit.r2, "trial fit");
                        let better = match &winner {
                            None => true,
                            Some((_, best)) => fit.r2 > best.r2,
                        };
                        if better {
                            winner = Some((position, fit));
                        }
                    }
                    Err(err @ RegsearchError::FitFailure { .. }) => {
                        warn!(round, formula = %formula, error = %err, "trial fit failed");
                        failures.push(CandidateFailure::new(&formula, &err));
                    }
                    Err(err) => return Err(err),
                }
            }

            let Some((position, fit)) = winner else {
                warn!(
                    round,
                    remaining = remaining.len(),
                    "every trial fit failed; stopping forward selection"
                );
                unfittable = std::mem::take(&mut remaining);
                break;
            };

            let added = remaining.remove(position);
            selected = fit.formula.clone();
            info!(
                round,
                added = %added,
                r2 = fit.r2,
                adjusted_r2 = fit.adjusted_r2,
                "forward selection round complete"
            );
            trajectory.push(TrajectoryStep {
                round,
                added,
                formula: selected.clone(),
                fit,
                failures,
            });
        }

        let best = match trajectory.best_by_adjusted_r2() {
            Some(step) => {
                let predictions = step.fit.predict(&split.test)?;
                let test_mse = metrics::score(&predictions, split.test.target())?;
                Some(SelectedModel {
                    round: step.round,
                    formula: step.formula.clone(),
                    fit: step.fit.clone(),
                    test_mse,
                })
            }
            None => None,
        };

        if let Some(model) = &best {
            info!(
                round = model.round,
                formula = %model.formula,
                adjusted_r2 = model.fit.adjusted_r2,
                test_mse = model.test_mse,
                elapsed_ms = start.elapsed().as_millis() as u64,
                cancelled,
                "forward selection finished"
            );
        }

        Ok(ForwardOutcome {
            trajectory,
            best,
            unfittable,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{split, Dataset};
    use crate::training::NormalEquationFitter;
    use ndarray::{Array1, Array2};

    /// y = 1 + 3a + 0.5b, c is an exact copy of a
    fn with_copy() -> Dataset {
        let n = 40;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let a = i as f64;
            let b = ((i * 7) % 11) as f64;
            match j {
                0 => a,
                1 => b,
                _ => a,
            }
        });
        let y: Array1<f64> = x.rows().into_iter().map(|r| 1.0 + 3.0 * r[0] + 0.5 * r[1]).collect();
        Dataset::new(vec!["a".into(), "b".into(), "c".into()], x, y).unwrap()
    }

    #[test]
    fn test_rank_deficient_predictor_reported_unfittable() {
        let s = split(&with_copy(), 0.25, 3).unwrap();
        let fitter = NormalEquationFitter::new();
        let outcome = ForwardSelection::new(&fitter).run(&s, &CancelToken::new()).unwrap();

        assert_eq!(outcome.trajectory.len(), 2);
        assert_eq!(outcome.trajectory.steps()[0].added, "a");
        assert_eq!(outcome.trajectory.steps()[1].added, "b");
        // c collides with a in round 2
        assert_eq!(outcome.trajectory.steps()[1].failures.len(), 1);
        assert_eq!(outcome.unfittable, vec!["c".to_string()]);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_tie_goes_to_first_remaining() {
        let s = split(&with_copy(), 0.25, 3).unwrap();
        let fitter = NormalEquationFitter::new();
        let outcome = ForwardSelection::new(&fitter)
            .with_candidates(vec!["c".into(), "b".into(), "a".into()])
            .run(&s, &CancelToken::new())
            .unwrap();
        // a and c fit identically; c comes first in the candidate order
        assert_eq!(outcome.trajectory.steps()[0].added, "c");
        assert_eq!(outcome.unfittable, vec!["a".to_string()]);
    }

    #[test]
    fn test_unknown_candidate_fails_fast() {
        let s = split(&with_copy(), 0.25, 3).unwrap();
        let fitter = NormalEquationFitter::new();
        let err = ForwardSelection::new(&fitter)
            .with_candidates(vec!["a".into(), "waterfront".into()])
            .run(&s, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, RegsearchError::FeatureNotFound(_)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let s = split(&with_copy(), 0.25, 3).unwrap();
        let fitter = NormalEquationFitter::new();
        let token = CancelToken::new();
        token.cancel();
        let outcome = ForwardSelection::new(&fitter).run(&s, &token).unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.trajectory.is_empty());
        assert!(outcome.best.is_none());
    }
}
