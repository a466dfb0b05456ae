//! CSV loading for already-cleaned, all-numeric data

use super::Dataset;
use crate::error::{RegsearchError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Load a CSV file with a header row into a [`Dataset`].
///
/// Every column other than `target` becomes a predictor, in file order.
/// Values are cast to f64; nulls and non-numeric columns are rejected.
pub fn load_csv(path: impl AsRef<Path>, target: &str) -> Result<Dataset> {
    let path = path.as_ref();
    let start = Instant::now();

    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let dataset = from_dataframe(&df, target)?;
    info!(
        path = %path.display(),
        rows = dataset.n_samples(),
        predictors = dataset.n_predictors(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "loaded dataset"
    );
    Ok(dataset)
}

/// Convert a numeric DataFrame into a [`Dataset`]
pub fn from_dataframe(df: &DataFrame, target: &str) -> Result<Dataset> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    if !names.iter().any(|n| n == target) {
        return Err(RegsearchError::FeatureNotFound(target.to_string()));
    }

    let schema: Vec<String> = names.iter().filter(|n| n.as_str() != target).cloned().collect();
    let n_rows = df.height();
    let mut x = Array2::zeros((n_rows, schema.len()));

    for (j, name) in schema.iter().enumerate() {
        let values = numeric_column(df, name)?;
        for (i, v) in values.into_iter().enumerate() {
            x[[i, j]] = v;
        }
    }
    let y = Array1::from_vec(numeric_column(df, target)?);

    Ok(Dataset::new(schema, x, y)?.with_target_name(target))
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| RegsearchError::FeatureNotFound(name.to_string()))?;
    match column.dtype() {
        DataType::Float64
        | DataType::Float32
        | DataType::Int64
        | DataType::Int32
        | DataType::UInt64
        | DataType::UInt32 => {}
        other => {
            return Err(RegsearchError::DataError(format!(
                "column '{}' has non-numeric type {}",
                name, other
            )));
        }
    }
    let casted = column.cast(&DataType::Float64)?;
    casted
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| RegsearchError::DataError(format!("missing value in column '{}' at row {}", name, row)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dataframe() {
        let df = df!(
            "sqft_living" => &[1180.0, 2570.0, 770.0],
            "grade" => &[7i64, 7, 6],
            "price" => &[221900.0, 538000.0, 180000.0]
        )
        .unwrap();

        let ds = from_dataframe(&df, "price").unwrap();
        assert_eq!(ds.schema(), &["sqft_living".to_string(), "grade".to_string()]);
        assert_eq!(ds.target_name(), "price");
        assert_eq!(ds.features()[[2, 1]], 6.0);
    }

    #[test]
    fn test_missing_target() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        assert!(matches!(from_dataframe(&df, "price"), Err(RegsearchError::FeatureNotFound(_))));
    }

    #[test]
    fn test_rejects_text_column() {
        let df = df!(
            "zipcode" => &["98178", "98125"],
            "price" => &[1.0, 2.0]
        )
        .unwrap();
        assert!(matches!(from_dataframe(&df, "price"), Err(RegsearchError::DataError(_))));
    }

    #[test]
    fn test_rejects_nulls() {
        let df = df!(
            "a" => &[Some(1.0), None],
            "price" => &[1.0, 2.0]
        )
        .unwrap();
        assert!(matches!(from_dataframe(&df, "price"), Err(RegsearchError::DataError(_))));
    }
}
