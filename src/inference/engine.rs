//! Serving-side inference engine
//!
//! Holds the fitted pipeline and trained model as immutable state, loaded
//! once from their artifacts. Every prediction replays the fixed stage
//! order: manual transforms, then the fitted pipeline, then the model.
//! All methods take `&self`, so one engine can be shared behind `Arc`
//! across concurrent requests without coordination.

use crate::error::{LoanflowError, Result};
use crate::preprocessing::{apply_manual_transformations, LoanPreprocessor};
use crate::schema::{ClientRecord, ColumnPolicy};
use crate::training::MLPRegressor;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

pub struct InferenceEngine {
    preprocessor: LoanPreprocessor,
    model: MLPRegressor,
}

impl InferenceEngine {
    /// Load both artifacts. Any missing or corrupt artifact is fatal: the
    /// serving process must not start without a usable pipeline and model.
    pub fn load(preprocessor_path: impl AsRef<Path>, model_path: impl AsRef<Path>) -> Result<Self> {
        let preprocessor = LoanPreprocessor::load(&preprocessor_path)?;
        let model = MLPRegressor::load(&model_path)?;

        if preprocessor.n_features() != model.n_features() {
            return Err(LoanflowError::ArtifactError(format!(
                "pipeline produces {} features but model expects {}",
                preprocessor.n_features(),
                model.n_features()
            )));
        }

        info!(
            preprocessor = %preprocessor_path.as_ref().display(),
            model = %model_path.as_ref().display(),
            policy = %preprocessor.policy(),
            features = preprocessor.n_features(),
            "inference engine loaded"
        );

        Ok(Self {
            preprocessor,
            model,
        })
    }

    /// Build an engine from already-constructed parts (used by tests and by
    /// callers that manage artifacts themselves).
    pub fn from_parts(preprocessor: LoanPreprocessor, model: MLPRegressor) -> Result<Self> {
        if preprocessor.n_features() != model.n_features() {
            return Err(LoanflowError::ArtifactError(format!(
                "pipeline produces {} features but model expects {}",
                preprocessor.n_features(),
                model.n_features()
            )));
        }
        Ok(Self {
            preprocessor,
            model,
        })
    }

    /// Predict one loan-amount estimate per raw row, rounded to 2 decimals.
    pub fn predict_batch(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let derived = apply_manual_transformations(df, self.preprocessor.policy())?;
        let x = self.preprocessor.feature_matrix(&derived)?;
        let y = self.model.predict(&x)?;
        Ok(y.iter().map(|v| round2(*v)).collect())
    }

    /// Predict for a single client record.
    pub fn predict_one(&self, record: &ClientRecord) -> Result<f64> {
        let df = ClientRecord::to_dataframe(std::slice::from_ref(record))?;
        let estimates = self.predict_batch(&df)?;
        estimates
            .first()
            .copied()
            .ok_or_else(|| LoanflowError::DataError("empty prediction batch".to_string()))
    }

    pub fn policy(&self) -> ColumnPolicy {
        self.preprocessor.policy()
    }

    pub fn n_features(&self) -> usize {
        self.preprocessor.n_features()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }
}

/// Round to 2 decimals for presentation.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::PreprocessingConfig;
    use crate::training::MLPConfig;

    fn fitted_parts() -> (LoanPreprocessor, MLPRegressor) {
        let df = df!(
            "age" => &[25.0, 40.0, 55.0, 70.0, 33.0, 48.0],
            "revenu_estime_mois" => &[2000.0, 2400.0, 3000.0, 2500.0, 2200.0, 2800.0],
            "region" => &["Île-de-France", "Bretagne", "Corse", "Occitanie", "Normandie", "Bretagne"],
            "montant_pret" => &[10000.0, 12000.0, 15000.0, 12500.0, 11000.0, 14000.0],
        )
        .unwrap();
        let derived =
            apply_manual_transformations(&df, ColumnPolicy::Strict).unwrap();

        let mut preprocessor = LoanPreprocessor::with_config(PreprocessingConfig::default());
        preprocessor.fit(&derived).unwrap();

        let x = preprocessor.feature_matrix(&derived).unwrap();
        let y = LoanPreprocessor::target(&derived).unwrap();
        let mut model = MLPRegressor::new(MLPConfig {
            max_epochs: 5,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        (preprocessor, model)
    }

    #[test]
    fn test_predict_one_returns_rounded_finite_estimate() {
        let (preprocessor, model) = fitted_parts();
        let engine = InferenceEngine::from_parts(preprocessor, model).unwrap();

        let record = ClientRecord {
            age: Some(35.0),
            revenu_estime_mois: Some(2300.0),
            region: Some("Bretagne".to_string()),
            ..Default::default()
        };

        let estimate = engine.predict_one(&record).unwrap();
        assert!(estimate.is_finite());
        assert_eq!(estimate, round2(estimate), "estimate must carry 2 decimals at most");
    }

    #[test]
    fn test_missing_artifacts_are_fatal() {
        let result = InferenceEngine::load("/nonexistent/pre.json", "/nonexistent/model.json");
        assert!(matches!(result, Err(LoanflowError::ArtifactError(_))));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1234.5678), 1234.57);
        assert_eq!(round2(-0.005), -0.01);
    }
}
