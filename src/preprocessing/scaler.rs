//! Feature standardization

use crate::data::Dataset;
use crate::error::{RegsearchError, Result};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// How the test side of a split is scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingPolicy {
    /// Fit statistics on train, apply the same affine map to test
    #[default]
    TrainStatistics,
    /// Scale each side with its own statistics (legacy behaviour)
    PerPartition,
}

/// Per-predictor center and scale learned from one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerStats {
    schema: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl ScalerStats {
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Population standard deviation, with 1.0 standing in for constant columns
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Apply `(x - mean) / scale` column-wise. Targets are left untouched.
    pub fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        if dataset.schema() != self.schema.as_slice() {
            return Err(RegsearchError::DataError(format!(
                "scaler fitted on [{}] cannot transform [{}]",
                self.schema.join(", "),
                dataset.schema().join(", ")
            )));
        }

        let mut x = dataset.features().clone();
        for (j, mut column) in x.axis_iter_mut(Axis(1)).enumerate() {
            let (center, scale) = (self.mean[j], self.scale[j]);
            column.mapv_inplace(|v| (v - center) / scale);
        }
        dataset.with_features(x)
    }
}

/// Z-score scaler: `(x - mean) / std`
pub struct StandardScaler;

impl StandardScaler {
    /// Learn per-predictor mean and population standard deviation
    pub fn fit(dataset: &Dataset) -> Result<ScalerStats> {
        if dataset.n_samples() == 0 {
            return Err(RegsearchError::DataError("cannot standardize an empty dataset".to_string()));
        }

        let x = dataset.features();
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| RegsearchError::DataError("cannot standardize an empty dataset".to_string()))?;
        // ddof = 0: population variance
        let scale = x
            .var_axis(Axis(0), 0.0)
            .mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 });

        Ok(ScalerStats {
            schema: dataset.schema().to_vec(),
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        })
    }

    /// Fit and transform in one step
    pub fn fit_transform(dataset: &Dataset) -> Result<(Dataset, ScalerStats)> {
        let stats = Self::fit(dataset)?;
        let scaled = stats.transform(dataset)?;
        Ok((scaled, stats))
    }
}

/// Standardize a dataset, returning the stats for reuse on another dataset
pub fn standardize(dataset: &Dataset) -> Result<(Dataset, ScalerStats)> {
    StandardScaler::fit_transform(dataset)
}
