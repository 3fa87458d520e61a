//! Fitted preprocessing pipeline
//!
//! Fit-once, replay-forever: the pipeline learns imputation, scaling, and
//! encoding statistics from historical data, freezes the output column order,
//! and is then serialized and reused read-only for every inference.

use crate::error::{LoanflowError, Result};
use crate::schema::{ColumnPlan, ColumnPolicy, TARGET_COLUMN};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::{
    config::PreprocessingConfig,
    encoder::OneHotEncoder,
    imputer::Imputer,
    scaler::StandardScaler,
    ColumnType, FeatureStats,
};

/// Statistical preprocessing pipeline for loan records.
///
/// Output layout, fixed at fit time: scaled numeric block (declared order),
/// one-hot blocks (vocabulary order per column), passthrough indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPreprocessor {
    config: PreprocessingConfig,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    passthrough_columns: Vec<String>,
    numeric_imputer: Option<Imputer>,
    categorical_imputer: Option<Imputer>,
    scaler: Option<StandardScaler>,
    encoder: Option<OneHotEncoder>,
    feature_stats: HashMap<String, FeatureStats>,
    is_fitted: bool,
}

impl LoanPreprocessor {
    /// Create a new pipeline with the default (strict) configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            config,
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            passthrough_columns: Vec::new(),
            numeric_imputer: None,
            categorical_imputer: None,
            scaler: None,
            encoder: None,
            feature_stats: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the pipeline on a training batch that has already been through the
    /// manual transform stage. Fails if the target column is absent.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        if df.column(TARGET_COLUMN).is_err() {
            return Err(LoanflowError::ColumnNotFound(TARGET_COLUMN.to_string()));
        }

        let features = df
            .drop(TARGET_COLUMN)
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;

        let plan = ColumnPlan::for_policy(self.config.policy);
        self.numeric_columns = present_columns(&features, &plan.numerical);
        self.categorical_columns = present_columns(&features, &plan.categorical);
        self.passthrough_columns = present_columns(&features, &plan.passthrough);

        let features = cast_columns_to_f64(&features, &self.numeric_columns)?;
        self.compute_statistics(&features)?;

        if !self.numeric_columns.is_empty() {
            let mut imputer = Imputer::new(self.config.numeric_impute_strategy.clone());
            let cols: Vec<&str> = self.numeric_columns.iter().map(|s| s.as_str()).collect();
            imputer.fit(&features, &cols)?;

            // The scaler is fitted on imputed values, exactly as transform
            // will see them
            let imputed = imputer.transform(&features)?;
            let mut scaler = StandardScaler::new();
            scaler.fit(&imputed, &cols)?;

            self.numeric_imputer = Some(imputer);
            self.scaler = Some(scaler);
        }

        if !self.categorical_columns.is_empty() {
            let mut imputer = Imputer::new(self.config.categorical_impute_strategy.clone());
            let cols: Vec<&str> = self.categorical_columns.iter().map(|s| s.as_str()).collect();
            imputer.fit(&features, &cols)?;

            let imputed = imputer.transform(&features)?;
            let mut encoder = OneHotEncoder::new();
            encoder.fit(&imputed, &cols)?;

            self.categorical_imputer = Some(imputer);
            self.encoder = Some(encoder);
        }

        self.is_fitted = true;
        info!(
            policy = %self.config.policy,
            numeric = self.numeric_columns.len(),
            categorical = self.categorical_columns.len(),
            passthrough = self.passthrough_columns.len(),
            features = self.feature_names().len(),
            "preprocessing pipeline fitted"
        );
        Ok(self)
    }

    /// Apply the fitted statistics to a batch. Never raises for missing or
    /// unknown values: absent columns are synthesized as entirely missing,
    /// nulls are imputed, unseen categories encode to zero blocks.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(LoanflowError::NotFitted);
        }

        let mut work = df.clone();
        if work.column(TARGET_COLUMN).is_ok() {
            work = work
                .drop(TARGET_COLUMN)
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        }

        let work = self.synthesize_missing_columns(work)?;
        let work = cast_columns_to_f64(&work, &self.numeric_columns)?;

        // Numeric block: impute then scale
        let mut numeric = work.clone();
        if let Some(ref imputer) = self.numeric_imputer {
            numeric = imputer.transform(&numeric)?;
        }
        if let Some(ref scaler) = self.scaler {
            numeric = scaler.transform(&numeric)?;
        }

        let mut result = if self.numeric_columns.is_empty() {
            DataFrame::empty()
        } else {
            numeric
                .select(self.numeric_columns.iter().map(|s| s.as_str()))
                .map_err(|e| LoanflowError::DataError(e.to_string()))?
        };

        // Categorical block: impute then one-hot encode
        if let (Some(imputer), Some(encoder)) = (&self.categorical_imputer, &self.encoder) {
            let imputed = imputer.transform(&work)?;
            let encoded = encoder.transform(&imputed)?;
            result = if result.width() == 0 {
                encoded
            } else {
                result
                    .hstack(encoded.get_columns())
                    .map_err(|e| LoanflowError::DataError(e.to_string()))?
            };
        }

        // Passthrough block: forwarded unscaled, nulls become 0.0
        for col_name in &self.passthrough_columns {
            let column = work
                .column(col_name)
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
            let casted = column
                .cast(&DataType::Float64)
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
            let values: Vec<f64> = casted
                .f64()
                .map_err(|e| LoanflowError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            result = result
                .hstack(&[Column::new(col_name.as_str().into(), values)])
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Transform and convert to a row-major feature matrix.
    pub fn feature_matrix(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let transformed = self.transform(df)?;
        let names = self.feature_names();
        let height = transformed.height();

        let col_data: Vec<Vec<f64>> = names
            .iter()
            .map(|name| {
                let values: Vec<f64> = transformed
                    .column(name)
                    .map_err(|_| LoanflowError::ColumnNotFound(name.clone()))?
                    .f64()
                    .map_err(|e| LoanflowError::DataError(e.to_string()))?
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect();
                Ok(values)
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        Ok(Array2::from_shape_fn((height, names.len()), |(r, c)| {
            col_data[c][r]
        }))
    }

    /// Extract the target vector from a training batch.
    pub fn target(df: &DataFrame) -> Result<Array1<f64>> {
        let column = df
            .column(TARGET_COLUMN)
            .map_err(|_| LoanflowError::ColumnNotFound(TARGET_COLUMN.to_string()))?;
        let casted = column
            .cast(&DataType::Float64)
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        let ca = casted
            .f64()
            .map_err(|e| LoanflowError::DataError(e.to_string()))?;

        if ca.null_count() > 0 {
            return Err(LoanflowError::DataError(format!(
                "{TARGET_COLUMN} contains {} null values",
                ca.null_count()
            )));
        }

        Ok(ca.into_iter().map(|v| v.unwrap_or(0.0)).collect())
    }

    /// Output feature names in the frozen matrix order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric_columns.clone();
        if let Some(ref encoder) = self.encoder {
            names.extend(encoder.feature_names());
        }
        names.extend(self.passthrough_columns.clone());
        names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names().len()
    }

    pub fn policy(&self) -> ColumnPolicy {
        self.config.policy
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Per-column statistics computed at fit time
    pub fn feature_stats(&self) -> &HashMap<String, FeatureStats> {
        &self.feature_stats
    }

    /// Serialize the fitted pipeline to a JSON artifact.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json).map_err(|e| {
            LoanflowError::ArtifactError(format!(
                "cannot write pipeline artifact {}: {e}",
                path.as_ref().display()
            ))
        })
    }

    /// Load a fitted pipeline artifact. A missing or corrupt file is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LoanflowError::ArtifactError(format!(
                "cannot read pipeline artifact {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let pipeline: Self = serde_json::from_str(&json).map_err(|e| {
            LoanflowError::ArtifactError(format!(
                "corrupt pipeline artifact {}: {e}",
                path.as_ref().display()
            ))
        })?;
        if !pipeline.is_fitted {
            return Err(LoanflowError::ArtifactError(format!(
                "pipeline artifact {} was never fitted",
                path.as_ref().display()
            )));
        }
        Ok(pipeline)
    }

    /// Fitted columns absent at transform time are treated as entirely
    /// missing: synthesized as all-null, then imputed like any other null.
    fn synthesize_missing_columns(&self, mut df: DataFrame) -> Result<DataFrame> {
        let height = df.height();

        for col_name in &self.numeric_columns {
            if df.column(col_name).is_err() {
                warn!(column = %col_name, "numeric column absent at transform, imputing entirely");
                df.with_column(Series::full_null(
                    col_name.as_str().into(),
                    height,
                    &DataType::Float64,
                ))
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
            }
        }
        for col_name in &self.categorical_columns {
            if df.column(col_name).is_err() {
                warn!(column = %col_name, "categorical column absent at transform, imputing entirely");
                df.with_column(Series::full_null(
                    col_name.as_str().into(),
                    height,
                    &DataType::String,
                ))
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
            }
        }
        for col_name in &self.passthrough_columns {
            if df.column(col_name).is_err() {
                df.with_column(Series::new(col_name.as_str().into(), vec![0.0; height]))
                    .map_err(|e| LoanflowError::DataError(e.to_string()))?;
            }
        }

        Ok(df)
    }

    fn compute_statistics(&mut self, df: &DataFrame) -> Result<()> {
        self.feature_stats.clear();

        for col_name in &self.numeric_columns {
            if let Ok(column) = df.column(col_name) {
                let series = column.as_materialized_series();
                let stats = FeatureStats::from_numeric_series(col_name, series)?;
                self.feature_stats.insert(col_name.clone(), stats);
            }
        }

        for col_name in &self.categorical_columns {
            if let Ok(column) = df.column(col_name) {
                let series = column.as_materialized_series();
                let stats = FeatureStats::from_categorical_series(col_name, series)?;
                self.feature_stats.insert(col_name.clone(), stats);
            }
        }

        for col_name in &self.passthrough_columns {
            if df.column(col_name).is_ok() {
                self.feature_stats.insert(
                    col_name.clone(),
                    FeatureStats::new(col_name, ColumnType::Passthrough),
                );
            }
        }

        Ok(())
    }
}

impl Default for LoanPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Columns of `plan_columns` actually present in the frame, in plan order.
/// Absent columns are schema drift: logged, then ignored for the lifetime of
/// the fitted pipeline.
fn present_columns(df: &DataFrame, plan_columns: &[String]) -> Vec<String> {
    plan_columns
        .iter()
        .filter(|col| {
            let present = df.column(col).is_ok();
            if !present {
                warn!(column = %col, "planned column absent at fit, excluded from pipeline");
            }
            present
        })
        .cloned()
        .collect()
}

/// Cast the named columns to Float64 for consistent numeric processing.
fn cast_columns_to_f64(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut result = df.clone();
    for col_name in columns {
        let Ok(column) = df.column(col_name) else {
            continue;
        };
        if column.dtype() != &DataType::Float64 {
            let casted = column
                .cast(&DataType::Float64)
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
            result
                .with_column(casted)
                .map_err(|e| LoanflowError::DataError(e.to_string()))?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::manual::apply_manual_transformations;

    fn derived_df() -> DataFrame {
        let raw = df!(
            "age" => &[Some(25.0), Some(40.0), Some(55.0), Some(70.0)],
            "revenu_estime_mois" => &[Some(2000.0), None, Some(3000.0), Some(2500.0)],
            "loyer_mensuel" => &[Some(700.0), Some(800.0), None, Some(650.0)],
            "historique_credits" => &[Some(2.0), None, Some(1.0), Some(3.0)],
            "region" => &["Île-de-France", "Bretagne", "Corse", "Occitanie"],
            "niveau_etude" => &[Some("bac"), Some("master"), None, Some("bac")],
            "montant_pret" => &[10000.0, 12000.0, 8000.0, 15000.0],
        )
        .unwrap();
        apply_manual_transformations(&raw, ColumnPolicy::Strict).unwrap()
    }

    #[test]
    fn test_fit_requires_target() {
        let df = df!("revenu_estime_mois" => &[2000.0]).unwrap();
        let mut pipeline = LoanPreprocessor::new();
        match pipeline.fit(&df) {
            Err(LoanflowError::ColumnNotFound(col)) => assert_eq!(col, TARGET_COLUMN),
            other => panic!("expected ColumnNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_fit_transform_round_trip_is_deterministic() {
        let df = derived_df();
        let mut pipeline = LoanPreprocessor::new();
        let first = pipeline.fit_transform(&df).unwrap();
        let second = pipeline.transform(&df).unwrap();

        assert_eq!(first.shape(), second.shape());
        for name in pipeline.feature_names() {
            let a = first.column(&name).unwrap().f64().unwrap();
            let b = second.column(&name).unwrap().f64().unwrap();
            for (x, y) in a.into_iter().zip(b.into_iter()) {
                assert_eq!(x, y, "column {name} drifted between fit and transform");
            }
        }
    }

    #[test]
    fn test_output_width_is_stable_for_unseen_rows() {
        let df = derived_df();
        let mut pipeline = LoanPreprocessor::new();
        let fitted = pipeline.fit_transform(&df).unwrap();

        let unseen = df!(
            "revenu_estime_mois" => &[2100.0],
            "region" => &["Wallonia"],
        )
        .unwrap();
        let unseen = apply_manual_transformations(&unseen, ColumnPolicy::Strict).unwrap();
        let transformed = pipeline.transform(&unseen).unwrap();

        assert_eq!(transformed.width(), fitted.width());
        assert_eq!(transformed.height(), 1);
    }

    #[test]
    fn test_unknown_category_encodes_to_zero_block() {
        let df = derived_df();
        let mut pipeline = LoanPreprocessor::new();
        pipeline.fit(&df).unwrap();

        let unseen = df!(
            "region" => &["Terra Incognita"],
            "montant_pret" => &[0.0],
        )
        .unwrap();
        let unseen = apply_manual_transformations(&unseen, ColumnPolicy::Strict).unwrap();
        let out = pipeline.transform(&unseen).unwrap();

        for name in pipeline.feature_names() {
            if name.starts_with("region_") {
                let ca = out.column(&name).unwrap().f64().unwrap();
                assert_eq!(ca.get(0), Some(0.0), "{name} must be zero for unseen region");
            }
        }
    }

    #[test]
    fn test_feature_order_numeric_then_onehot_then_passthrough() {
        let df = derived_df();
        let mut pipeline = LoanPreprocessor::new();
        pipeline.fit(&df).unwrap();

        let names = pipeline.feature_names();
        let first_onehot = names.iter().position(|n| n.contains("_region_")).unwrap();
        let first_indicator = names.iter().position(|n| n.ends_with("_manquant")).unwrap();
        let last_numeric = names
            .iter()
            .position(|n| n == "revenu_estime_mois")
            .unwrap();

        assert!(last_numeric < first_onehot);
        assert!(first_onehot < first_indicator);
    }

    #[test]
    fn test_feature_matrix_shape() {
        let df = derived_df();
        let mut pipeline = LoanPreprocessor::new();
        pipeline.fit(&df).unwrap();

        let matrix = pipeline.feature_matrix(&df).unwrap();
        assert_eq!(matrix.nrows(), 4);
        assert_eq!(matrix.ncols(), pipeline.n_features());
        assert!(matrix.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_target_extraction() {
        let df = derived_df();
        let y = LoanPreprocessor::target(&df).unwrap();
        assert_eq!(y.len(), 4);
        assert_eq!(y[0], 10000.0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let df = derived_df();
        let mut pipeline = LoanPreprocessor::new();
        let before = pipeline.fit_transform(&df).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor.json");
        pipeline.save(&path).unwrap();

        let loaded = LoanPreprocessor::load(&path).unwrap();
        let after = loaded.transform(&df).unwrap();

        assert_eq!(loaded.feature_names(), pipeline.feature_names());
        for name in loaded.feature_names() {
            let a = before.column(&name).unwrap().f64().unwrap();
            let b = after.column(&name).unwrap().f64().unwrap();
            for (x, y) in a.into_iter().zip(b.into_iter()) {
                assert_eq!(x, y);
            }
        }
    }

    #[test]
    fn test_load_missing_artifact_fails() {
        match LoanPreprocessor::load("/nonexistent/preprocessor.json") {
            Err(LoanflowError::ArtifactError(_)) => {}
            other => panic!("expected ArtifactError, got {other:?}"),
        }
    }
}
