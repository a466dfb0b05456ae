//! Scoring of caller-supplied named formulas

use super::{CancelToken, CandidateFailure};
use crate::data::{NamedFormula, Split};
use crate::error::{RegsearchError, Result};
use crate::metrics;
use crate::training::{FitResult, LinearFitter};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetEvaluation {
    pub candidate: NamedFormula,
    pub fit: FitResult,
    pub test_mse: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsetOutcome {
    /// Scored candidates, in input order
    pub evaluations: Vec<SubsetEvaluation>,
    pub failures: Vec<CandidateFailure>,
    pub cancelled: bool,
}

impl SubsetOutcome {
    /// Lowest held-out MSE; ties go to the earliest candidate
    pub fn best(&self) -> Option<&SubsetEvaluation> {
        self.evaluations.iter().fold(None, |best, e| match best {
            Some(b) if b.test_mse <= e.test_mse => Some(b),
            _ => Some(e),
        })
    }
}

/// Fit each candidate by OLS on `split.train` and score it on `split.test`.
///
/// Unknown predictors fail the whole call before any fit; a fit failure is
/// recorded against its candidate only.
pub fn evaluate_subsets(
    fitter: &dyn LinearFitter,
    split: &Split,
    candidates: &[NamedFormula],
    cancel: &CancelToken,
) -> Result<SubsetOutcome> {
    if candidates.is_empty() {
        return Err(RegsearchError::ConfigError("no candidate subsets to evaluate".to_string()));
    }
    for candidate in candidates {
        split.train.resolve(&candidate.formula)?;
    }

    let results: Vec<Option<Result<SubsetEvaluation>>> = candidates
        .par_iter()
        .map(|candidate| {
            if cancel.is_cancelled() {
                return None;
            }
            let evaluate = || -> Result<SubsetEvaluation> {
                let fit = fitter.fit(&candidate.formula, &split.train, 0.0)?;
                let predictions = fit.predict(&split.test)?;
                let test_mse = metrics::score(&predictions, split.test.target())?;
                Ok(SubsetEvaluation {
                    candidate: candidate.clone(),
                    fit,
                    test_mse,
                })
            };
            Some(evaluate())
        })
        .collect();

    let mut outcome = SubsetOutcome::default();
    for (candidate, result) in candidates.iter().zip(results) {
        match result {
            Some(Ok(evaluation)) => outcome.evaluations.push(evaluation),
            Some(Err(err @ RegsearchError::FitFailure { .. })) => {
                warn!(candidate = %candidate.name, error = %err, "subset fit failed");
                outcome.failures.push(CandidateFailure::new(&candidate.name, &err));
            }
            Some(Err(err)) => return Err(err),
            None => outcome.cancelled = true,
        }
    }

    if let Some(best) = outcome.best() {
        info!(
            best = %best.candidate.name,
            formula = %best.candidate.formula,
            test_mse = best.test_mse,
            evaluated = outcome.evaluations.len(),
            failed = outcome.failures.len(),
            "subset evaluation finished"
        );
    }
    Ok(outcome)
}
