//! Training driver
//!
//! Runs the full offline batch job: manual transforms, pipeline fit,
//! deterministic split, model training (optionally warm-started from a prior
//! model), held-out evaluation, and artifact persistence. No pipeline
//! artifact is published unless every stage succeeds.

use crate::error::{LoanflowError, Result};
use crate::preprocessing::{
    apply_manual_transformations, LoanPreprocessor, PreprocessingConfig,
};
use crate::schema::ColumnPolicy;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use super::{
    metrics::RegressionMetrics,
    neural_network::{MLPConfig, MLPRegressor},
    split::train_test_split,
};

/// Configuration for one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Column-inclusion policy
    pub policy: ColumnPolicy,
    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the split and weight initialization
    pub seed: u64,
    /// Training epochs
    pub epochs: usize,
    /// Hidden layer widths
    pub hidden_layers: Vec<usize>,
    /// Learning rate
    pub learning_rate: f64,
    /// Mini-batch size
    pub batch_size: usize,
    /// Prior model to warm-start from, if any
    pub warm_start_model: Option<PathBuf>,
    /// Directory receiving the pipeline and model artifacts
    pub output_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            policy: ColumnPolicy::Strict,
            test_fraction: 0.2,
            seed: 42,
            epochs: 50,
            hidden_layers: vec![64, 32],
            learning_rate: 0.001,
            batch_size: 32,
            warm_start_model: None,
            output_dir: PathBuf::from("models"),
        }
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub policy: ColumnPolicy,
    pub metrics: RegressionMetrics,
    pub n_features: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub preprocessor_path: PathBuf,
    pub model_path: PathBuf,
}

/// Offline training engine.
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Run the batch job on a raw training frame.
    pub fn run(&self, df: &DataFrame) -> Result<TrainingReport> {
        info!(
            rows = df.height(),
            policy = %self.config.policy,
            "starting training run"
        );

        let derived = apply_manual_transformations(df, self.config.policy)?;

        let mut preprocessor = LoanPreprocessor::with_config(
            PreprocessingConfig::new().with_policy(self.config.policy),
        );
        preprocessor.fit(&derived)?;

        let x = preprocessor.feature_matrix(&derived)?;
        let y = LoanPreprocessor::target(&derived)?;

        let (x_train, x_test, y_train, y_test) =
            train_test_split(&x, &y, self.config.test_fraction, self.config.seed)?;

        let mlp_config = MLPConfig {
            hidden_layers: self.config.hidden_layers.clone(),
            learning_rate: self.config.learning_rate,
            max_epochs: self.config.epochs,
            batch_size: self.config.batch_size,
            random_state: Some(self.config.seed),
            ..Default::default()
        };

        let mut model = MLPRegressor::new(mlp_config);
        if let Some(ref path) = self.config.warm_start_model {
            let prior = MLPRegressor::load(path)?;
            info!(prior = %path.display(), "warm-starting from prior model");
            model = model.with_warm_start(&prior);
        }

        model.fit(&x_train, &y_train)?;

        let y_pred = model.predict(&x_test)?;
        let metrics = RegressionMetrics::compute(&y_test, &y_pred);
        info!(
            mse = metrics.mse,
            mae = metrics.mae,
            r2 = metrics.r2,
            n_test = metrics.n_samples,
            "evaluation on held-out split"
        );

        std::fs::create_dir_all(&self.config.output_dir).map_err(|e| {
            LoanflowError::ArtifactError(format!(
                "cannot create output directory {}: {e}",
                self.config.output_dir.display()
            ))
        })?;

        let preprocessor_path = self.config.output_dir.join("preprocessor.json");
        let model_path = self.config.output_dir.join("model.json");
        preprocessor.save(&preprocessor_path)?;
        model.save(&model_path)?;
        info!(
            preprocessor = %preprocessor_path.display(),
            model = %model_path.display(),
            "artifacts written"
        );

        Ok(TrainingReport {
            policy: self.config.policy,
            metrics,
            n_features: preprocessor.n_features(),
            n_train: y_train.len(),
            n_test: y_test.len(),
            preprocessor_path,
            model_path,
        })
    }
}
