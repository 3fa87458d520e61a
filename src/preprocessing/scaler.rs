//! Feature standardization

use crate::error::{LoanflowError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fitted parameters for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    mean: f64,
    scale: f64,
}

/// Z-score standardizer: (x - mean) / std, fitted per column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit mean/std per column. Expects imputed (null-free) numeric columns.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| LoanflowError::ColumnNotFound(col_name.to_string()))?;
            let ca = column
                .as_materialized_series()
                .f64()
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(1).unwrap_or(1.0);
            self.params.insert(
                col_name.to_string(),
                ScalerParams {
                    mean,
                    // Constant columns scale by 1.0 instead of dividing by zero
                    scale: if std == 0.0 { 1.0 } else { std },
                },
            );
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Standardize every fitted column present in `df`.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(LoanflowError::NotFitted);
        }

        let mut result = df.clone();

        for (col_name, params) in &self.params {
            let Ok(column) = df.column(col_name) else {
                continue;
            };
            let ca = column
                .as_materialized_series()
                .f64()
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;

            let scaled: Float64Chunked = ca
                .into_iter()
                .map(|opt| opt.map(|v| (v - params.mean) / params.scale))
                .collect();

            result
                .with_column(scaled.with_name(col_name.as_str().into()).into_series())
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fitted mean for a column, if any.
    pub fn mean(&self, column: &str) -> Option<f64> {
        self.params.get(column).map(|p| p.mean)
    }
}
