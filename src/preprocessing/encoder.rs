//! Categorical one-hot encoding

use crate::error::{LoanflowError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One-hot encoder with a vocabulary fixed at fit time.
///
/// Column order and per-column category order are frozen when fitted, so the
/// encoded block layout is stable across fit/transform/serialize cycles.
/// Values never seen at fit time encode to an all-zero block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// (column, sorted category vocabulary), in fitted column order
    vocabularies: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the category vocabulary of each column, in the given order.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.vocabularies.clear();

        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| LoanflowError::ColumnNotFound(col_name.to_string()))?;
            let ca = column
                .as_materialized_series()
                .str()
                .map_err(|e| LoanflowError::DataError(e.to_string()))?
                .clone();

            let mut vocabulary: Vec<String> = ca
                .into_iter()
                .flatten()
                .map(|v| v.to_string())
                .collect();
            vocabulary.sort();
            vocabulary.dedup();

            self.vocabularies.push((col_name.to_string(), vocabulary));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Encode the fitted columns of `df` into a DataFrame of indicator
    /// columns named `{column}_{category}`, in the frozen order. A fitted
    /// column absent from `df` (or a null value) encodes to all zeros.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(LoanflowError::NotFitted);
        }

        let height = df.height();
        let mut encoded: Vec<Column> = Vec::new();

        for (col_name, vocabulary) in &self.vocabularies {
            let values: Vec<Option<String>> = match df.column(col_name) {
                Ok(column) => {
                    let ca = column
                        .as_materialized_series()
                        .str()
                        .map_err(|e| LoanflowError::DataError(e.to_string()))?
                        .clone();
                    ca.into_iter().map(|v| v.map(|s| s.to_string())).collect()
                }
                Err(_) => vec![None; height],
            };

            for category in vocabulary {
                let flags: Vec<f64> = values
                    .iter()
                    .map(|v| match v {
                        Some(value) if value == category => 1.0,
                        _ => 0.0,
                    })
                    .collect();
                encoded.push(Column::new(format!("{col_name}_{category}").into(), flags));
            }
        }

        DataFrame::new(encoded).map_err(|e| LoanflowError::DataError(e.to_string()))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Encoded column names in the frozen output order.
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|(col, vocabulary)| {
                vocabulary.iter().map(move |v| format!("{col}_{v}"))
            })
            .collect()
    }

    /// Fitted vocabulary for one column, if any.
    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        self.vocabularies
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, vocabulary)| vocabulary.as_slice())
    }
}
