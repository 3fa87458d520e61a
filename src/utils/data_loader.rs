//! Data loading utilities

use crate::error::{LoanflowError, Result};
use polars::prelude::*;
use std::fs::File;
use tracing::debug;

const TRUTHY_TOKENS: &[&str] = &["oui", "yes", "true", "vrai", "1"];
const FALSY_TOKENS: &[&str] = &["non", "no", "false", "faux", "0"];

/// CSV loader for client exports.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file with a header row.
    pub fn load_csv(path: &str) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| LoanflowError::DataError(e.to_string()))?;

        let reader = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .into_reader_with_file_handle(file);

        reader
            .finish()
            .map_err(|e| LoanflowError::DataError(e.to_string()))
    }

    /// Load a CSV file and coerce free-text boolean columns.
    pub fn load_clients_csv(path: &str) -> Result<DataFrame> {
        let df = Self::load_csv(path)?;
        coerce_truthy_columns(&df)
    }
}

/// Convert every string column whose values are all truthy/falsy-like tokens
/// ("oui"/"non" and common variants) into a boolean column. Unrecognized
/// tokens and nulls stay null.
pub fn coerce_truthy_columns(df: &DataFrame) -> Result<DataFrame> {
    let mut result = df.clone();

    let candidates: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .map(|c| c.name().to_string())
        .collect();

    for name in candidates {
        let series = result
            .column(&name)
            .map_err(|e| LoanflowError::DataError(e.to_string()))?
            .as_materialized_series()
            .clone();
        let ca = series
            .str()
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;

        let mut all_boolean_like = true;
        let mut seen_any = false;
        for value in ca.into_iter().flatten() {
            seen_any = true;
            if parse_truthy(value).is_none() {
                all_boolean_like = false;
                break;
            }
        }

        if !all_boolean_like || !seen_any {
            continue;
        }

        debug!(column = %name, "coercing truthy/falsy column to boolean");
        let coerced: Vec<Option<bool>> = ca.into_iter().map(|v| v.and_then(parse_truthy)).collect();
        result
            .with_column(Series::new(name.as_str().into(), coerced))
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
    }

    Ok(result)
}

fn parse_truthy(value: &str) -> Option<bool> {
    let token = value.trim().to_lowercase();
    if TRUTHY_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSY_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}
