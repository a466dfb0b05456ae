//! regsearch - model selection for tabular regression
//!
//! Given a cleaned feature matrix and target, this crate:
//! - greedily grows linear models by forward selection, keeping the round
//!   with the best adjusted R²
//! - sweeps the neighborhood size of a k-nearest-neighbor regressor
//! - sweeps the ridge penalty in two phases (coarse, then refined) by k-fold CV
//! - ranks every winner by held-out mean squared error
//!
//! # Modules
//!
//! - [`data`] - Dataset, formulas, train/test split, CSV loading
//! - [`preprocessing`] - Standardization with reusable statistics
//! - [`metrics`] - MSE, R² and adjusted R²
//! - [`training`] - Linear fitter, KNN regressor, k-fold splitting
//! - [`selection`] - Search engines and the model comparator
//! - [`pipeline`] - End-to-end driver producing a `PipelineReport`
//! - [`synthetic`] - Seeded data with a known linear generating formula
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use regsearch::prelude::*;
//!
//! let dataset = LinearSpec::housing().generate(100, 42)?;
//! let report = Pipeline::new(PipelineConfig::default()).run(&dataset, &CancelToken::new())?;
//! if let Some(best) = report.recommended() {
//!     println!("{} (mse {:.3})", best.name, best.mse);
//! }
//! # Ok::<(), regsearch::error::RegsearchError>(())
//! ```

// Core error handling
pub mod error;

pub mod config;
pub mod data;
pub mod metrics;
pub mod pipeline;
pub mod preprocessing;
pub mod selection;
pub mod synthetic;
pub mod training;

// Services
pub mod cli;

pub use error::{RegsearchError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::data::{load_csv, split, Dataset, Formula, NamedFormula, Record, Split};
    pub use crate::error::{RegsearchError, Result};
    pub use crate::metrics::score;
    pub use crate::pipeline::{Pipeline, PipelineReport};
    pub use crate::preprocessing::{standardize, ScalerStats, ScalingPolicy};
    pub use crate::selection::{
        compare, evaluate_subsets, CancelToken, ForwardSelection, Grid, NeighborSweep, Ranking, RidgeSweep,
    };
    pub use crate::synthetic::LinearSpec;
    pub use crate::training::{linear_predict, FitResult, KFold, LinearFitter, NormalEquationFitter, WeightScheme};
}
