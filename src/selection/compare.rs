//! Final ranking of the engines' winners

use crate::error::{RegsearchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedModel {
    /// 1-based position
    pub rank: usize,
    pub name: String,
    pub mse: f64,
}

/// Models ordered by ascending held-out MSE, ties broken by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranking {
    entries: Vec<RankedModel>,
}

impl Ranking {
    /// The lowest-error model; `None` only for an empty ranking
    pub fn recommended(&self) -> Option<&RankedModel> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[RankedModel] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&RankedModel> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rank `(model name, held-out MSE)` pairs.
///
/// Fails on empty input, duplicate names, or a non-finite MSE.
pub fn compare<I, S>(results: I) -> Result<Ranking>
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    let mut pairs: Vec<(String, f64)> = results.into_iter().map(|(n, m)| (n.into(), m)).collect();
    if pairs.is_empty() {
        return Err(RegsearchError::DataError("no models to compare".to_string()));
    }

    let mut seen = HashSet::with_capacity(pairs.len());
    for (name, mse) in &pairs {
        if !seen.insert(name.as_str()) {
            return Err(RegsearchError::DataError(format!("model '{}' reported twice", name)));
        }
        if !mse.is_finite() {
            return Err(RegsearchError::DataError(format!(
                "model '{}' has non-finite MSE {}",
                name, mse
            )));
        }
    }

    pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    let entries = pairs
        .into_iter()
        .enumerate()
        .map(|(i, (name, mse))| RankedModel {
            rank: i + 1,
            name,
            mse,
        })
        .collect();

    Ok(Ranking { entries })
}
