//! Candidate formulas

use crate::error::{RegsearchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered set of predictor names taking part in a linear model.
///
/// Order records selection order; it does not change fitted coefficients.
/// Growth is functional: [`Formula::with`] returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Formula(Vec<String>);

impl Formula {
    /// The intercept-only formula
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build from names, rejecting duplicates and empty names
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .try_fold(Self::empty(), |acc, name| acc.with(name))
    }

    /// Copy of this formula with `name` appended
    pub fn with(&self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegsearchError::DataError("empty predictor name".to_string()));
        }
        if self.contains(&name) {
            return Err(RegsearchError::DataError(format!(
                "predictor '{}' already in formula [{}]",
                name, self
            )));
        }
        let mut predictors = self.0.clone();
        predictors.push(name);
        Ok(Self(predictors))
    }

    pub fn predictors(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|p| p == name)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", self.0.join(" + "))
        }
    }
}

impl TryFrom<Vec<String>> for Formula {
    type Error = RegsearchError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::from_names(names)
    }
}

impl From<Formula> for Vec<String> {
    fn from(formula: Formula) -> Self {
        formula.0
    }
}

/// A formula with a caller-chosen label, e.g. a baseline or a fixed subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFormula {
    pub name: String,
    pub formula: Formula,
}

impl NamedFormula {
    pub fn new(name: impl Into<String>, formula: Formula) -> Self {
        Self {
            name: name.into(),
            formula,
        }
    }
}
