//! Dataset model
//!
//! Provides the typed inputs every search consumes:
//! - `Dataset`: ordered records over a fixed predictor schema
//! - `Record`: one observation viewed as predictor name -> value
//! - `Formula`: ordered, duplicate-free set of predictor names
//! - `Split`: deterministic train/test partition

mod formula;
pub mod loader;
pub mod split;

pub use formula::{Formula, NamedFormula};
pub use loader::load_csv;
pub use split::{held_out_size, split, Split};

use crate::error::{RegsearchError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One observation: predictor values in schema order plus the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub values: Vec<(String, f64)>,
    pub target: f64,
}

impl Record {
    /// Value of a predictor by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Ordered records sharing one predictor schema.
///
/// Rows are stored as an `n x p` feature matrix plus an `n` target vector.
/// Every value is finite; there is no missing-value representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Vec<String>,
    features: Array2<f64>,
    target: Array1<f64>,
    target_name: String,
}

impl Dataset {
    /// Create a dataset, validating shape, schema uniqueness and finiteness
    pub fn new(schema: Vec<String>, features: Array2<f64>, target: Array1<f64>) -> Result<Self> {
        if features.ncols() != schema.len() {
            return Err(RegsearchError::ShapeError {
                expected: format!("{} feature columns", schema.len()),
                actual: format!("{} feature columns", features.ncols()),
            });
        }
        if features.nrows() != target.len() {
            return Err(RegsearchError::ShapeError {
                expected: format!("target length = {}", features.nrows()),
                actual: format!("target length = {}", target.len()),
            });
        }

        let mut seen = HashSet::with_capacity(schema.len());
        for name in &schema {
            if name.is_empty() {
                return Err(RegsearchError::DataError("empty predictor name in schema".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(RegsearchError::DataError(format!("duplicate predictor '{}' in schema", name)));
            }
        }

        if let Some(((row, col), v)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(RegsearchError::DataError(format!(
                "non-finite value {} for predictor '{}' in row {}",
                v, schema[col], row
            )));
        }
        if let Some((row, v)) = target.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(RegsearchError::DataError(format!("non-finite target {} in row {}", v, row)));
        }

        Ok(Self {
            schema,
            features,
            target,
            target_name: "target".to_string(),
        })
    }

    /// Build a dataset from records; each record must cover the whole schema
    pub fn from_records(schema: Vec<String>, records: &[Record]) -> Result<Self> {
        let p = schema.len();
        let mut data = Vec::with_capacity(records.len() * p);
        let mut target = Vec::with_capacity(records.len());

        for (row, record) in records.iter().enumerate() {
            for name in &schema {
                let value = record.get(name).ok_or_else(|| {
                    RegsearchError::DataError(format!("record {} has no value for '{}'", row, name))
                })?;
                data.push(value);
            }
            target.push(record.target);
        }

        let features = Array2::from_shape_vec((records.len(), p), data)?;
        Self::new(schema, features, Array1::from_vec(target))
    }

    /// Set the name reported for the target column
    pub fn with_target_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = name.into();
        self
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_predictors(&self) -> usize {
        self.schema.len()
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Position of a predictor in the schema
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.schema
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| RegsearchError::FeatureNotFound(name.to_string()))
    }

    /// Schema positions of a formula's predictors, in formula order
    pub fn resolve(&self, formula: &Formula) -> Result<Vec<usize>> {
        formula
            .predictors()
            .iter()
            .map(|name| self.column_index(name))
            .collect()
    }

    /// Design matrix restricted to the formula's predictors (no intercept column)
    pub fn design(&self, formula: &Formula) -> Result<Array2<f64>> {
        let columns = self.resolve(formula)?;
        Ok(self.features.select(Axis(1), &columns))
    }

    /// New dataset holding the given rows in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            schema: self.schema.clone(),
            features: self.features.select(Axis(0), indices),
            target: self.target.select(Axis(0), indices),
            target_name: self.target_name.clone(),
        }
    }

    /// Same schema and target, replaced feature values
    pub(crate) fn with_features(&self, features: Array2<f64>) -> Result<Self> {
        Self::new(self.schema.clone(), features, self.target.clone())
            .map(|d| d.with_target_name(self.target_name.clone()))
    }

    /// Row `i` as a named record
    pub fn record(&self, i: usize) -> Record {
        let row = self.features.row(i);
        Record {
            values: self
                .schema
                .iter()
                .cloned()
                .zip(row.iter().copied())
                .collect(),
            target: self.target[i],
        }
    }

    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.n_samples()).map(move |i| self.record(i))
    }
}
