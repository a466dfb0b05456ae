//! Model training module
//!
//! Provides the estimators the search engines drive:
//! - Linear models (OLS and ridge) behind the `LinearFitter` trait
//! - K-Nearest Neighbors regression
//! - K-fold cross-validation

pub mod cross_validation;
pub mod knn;
pub mod linear_models;

pub use cross_validation::{CVResults, CVSplit, KFold};
pub use knn::{KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::{linear_predict, FitResult, LinearFitter, NormalEquationFitter};
