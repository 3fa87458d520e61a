//! Missing-value imputation

use crate::error::{LoanflowError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Imputation strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace missing numeric values with the column mean
    Mean,
    /// Replace missing categorical values with the most frequent value
    MostFrequent,
}

/// Fitted fill value for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
enum FillValue {
    Number(f64),
    Category(String),
}

/// Column imputer with per-column fitted fill values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, FillValue>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Compute fill values for the given columns.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| LoanflowError::ColumnNotFound(col_name.to_string()))?;
            let series = column.as_materialized_series();

            let fill = match self.strategy {
                ImputeStrategy::Mean => FillValue::Number(mean_of(series)?),
                ImputeStrategy::MostFrequent => FillValue::Category(mode_of(series)?),
            };
            self.fill_values.insert(col_name.to_string(), fill);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill missing values using the fitted statistics. Columns that were
    /// fitted but are absent from `df` are skipped; never raises for nulls.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(LoanflowError::NotFitted);
        }

        let mut result = df.clone();

        for (col_name, fill) in &self.fill_values {
            let Ok(column) = df.column(col_name) else {
                continue;
            };
            let series = column.as_materialized_series().clone();

            let filled = match fill {
                FillValue::Number(value) => fill_numeric(&series, *value)?,
                FillValue::Category(value) => fill_categorical(&series, value)?,
            };

            result
                .with_column(filled)
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fitted fill value for a numeric column, if any.
    pub fn fill_number(&self, column: &str) -> Option<f64> {
        match self.fill_values.get(column) {
            Some(FillValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    /// Fitted fill value for a categorical column, if any.
    pub fn fill_category(&self, column: &str) -> Option<&str> {
        match self.fill_values.get(column) {
            Some(FillValue::Category(v)) => Some(v.as_str()),
            _ => None,
        }
    }
}

fn mean_of(series: &Series) -> Result<f64> {
    let casted = series
        .cast(&DataType::Float64)
        .map_err(|e| LoanflowError::DataError(e.to_string()))?;
    let ca = casted
        .f64()
        .map_err(|e| LoanflowError::DataError(e.to_string()))?;
    // An all-null column imputes to 0.0 rather than failing
    Ok(ca.mean().unwrap_or(0.0))
}

fn mode_of(series: &Series) -> Result<String> {
    let ca = series
        .str()
        .map_err(|e| LoanflowError::DataError(e.to_string()))?;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in ca.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    // Ties break lexicographically so fit is deterministic
    let mode = counts
        .into_iter()
        .max_by(|(a_val, a_n), (b_val, b_n)| a_n.cmp(b_n).then(b_val.cmp(a_val)))
        .map(|(value, _)| value.to_string());

    Ok(mode.unwrap_or_else(|| "inconnu".to_string()))
}

fn fill_numeric(series: &Series, value: f64) -> Result<Series> {
    let casted = series
        .cast(&DataType::Float64)
        .map_err(|e| LoanflowError::DataError(e.to_string()))?;
    let ca = casted
        .f64()
        .map_err(|e| LoanflowError::DataError(e.to_string()))?;

    let filled: Float64Chunked = ca
        .into_iter()
        .map(|v| Some(v.unwrap_or(value)))
        .collect();

    Ok(filled.with_name(series.name().clone()).into_series())
}

fn fill_categorical(series: &Series, value: &str) -> Result<Series> {
    let ca = series
        .str()
        .map_err(|e| LoanflowError::DataError(e.to_string()))?;

    let filled: Vec<&str> = ca.into_iter().map(|v| v.unwrap_or(value)).collect();

    Ok(Series::new(series.name().clone(), filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_imputation() {
        let df = df!(
            "x" => &[Some(1.0), None, Some(3.0)],
        )
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        let result = imputer.fit_transform(&df, &["x"]).unwrap();

        let ca = result.column("x").unwrap().f64().unwrap();
        assert_eq!(ca.get(1), Some(2.0));
        assert_eq!(imputer.fill_number("x"), Some(2.0));
    }

    #[test]
    fn test_most_frequent_imputation() {
        let df = df!(
            "c" => &[Some("a"), Some("b"), Some("b"), None],
        )
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let result = imputer.fit_transform(&df, &["c"]).unwrap();

        let ca = result.column("c").unwrap().str().unwrap();
        assert_eq!(ca.get(3), Some("b"));
    }

    #[test]
    fn test_mode_tie_breaks_lexicographically() {
        let df = df!(
            "c" => &[Some("b"), Some("a"), Some("a"), Some("b")],
        )
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        imputer.fit(&df, &["c"]).unwrap();
        assert_eq!(imputer.fill_category("c"), Some("a"));
    }

    #[test]
    fn test_absent_column_is_skipped_at_transform() {
        let df = df!("x" => &[1.0, 2.0]).unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        imputer.fit(&df, &["x"]).unwrap();

        let other = df!("y" => &[1.0]).unwrap();
        let result = imputer.transform(&other).unwrap();
        assert!(result.column("y").is_ok());
    }

    #[test]
    fn test_unfitted_transform_fails() {
        let df = df!("x" => &[1.0]).unwrap();
        let imputer = Imputer::new(ImputeStrategy::Mean);
        assert!(imputer.transform(&df).is_err());
    }
}
