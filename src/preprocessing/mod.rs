//! Data preprocessing module
//!
//! Two stages, applied in order at training and inference time:
//! - Manual transformations: policy drops, age binning, region grouping,
//!   account-age derivation, missing-value indicators, rent clamping.
//! - Statistical pipeline: mean/mode imputation, standardization, one-hot
//!   encoding, fitted once and replayed read-only.

mod config;
mod encoder;
mod imputer;
mod scaler;
pub mod manual;
mod pipeline;

pub use config::PreprocessingConfig;
pub use encoder::OneHotEncoder;
pub use imputer::{ImputeStrategy, Imputer};
pub use manual::{apply_manual_transformations, ManualTransforms};
pub use pipeline::LoanPreprocessor;
pub use scaler::StandardScaler;

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column data type for preprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
    Passthrough,
}

/// Feature statistics computed during fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStats {
    pub name: String,
    pub dtype: ColumnType,
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub categories: Option<Vec<String>>,
}

impl FeatureStats {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
            count: 0,
            null_count: 0,
            mean: None,
            std: None,
            min: None,
            max: None,
            categories: None,
        }
    }

    /// Compute statistics from a numeric series
    pub fn from_numeric_series(name: &str, series: &Series) -> Result<Self> {
        let mut stats = Self::new(name, ColumnType::Numeric);
        stats.count = series.len();
        stats.null_count = series.null_count();

        if let Ok(casted) = series.cast(&DataType::Float64) {
            if let Ok(ca) = casted.f64() {
                stats.mean = ca.mean();
                stats.std = ca.std(1);
                stats.min = ca.min();
                stats.max = ca.max();
            }
        }

        Ok(stats)
    }

    /// Compute statistics from a categorical series
    pub fn from_categorical_series(name: &str, series: &Series) -> Result<Self> {
        let mut stats = Self::new(name, ColumnType::Categorical);
        stats.count = series.len();
        stats.null_count = series.null_count();

        if let Ok(ca) = series.str() {
            let mut categories: Vec<String> = ca
                .into_iter()
                .flatten()
                .map(|s| s.to_string())
                .collect();
            categories.sort();
            categories.dedup();
            stats.categories = Some(categories);
        }

        Ok(stats)
    }
}
