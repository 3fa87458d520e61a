//! loanflow - Loan-amount prediction pipeline
//!
//! Tabular client data is cleaned, transformed into numeric feature vectors,
//! used to train a feed-forward regression model, and served through a
//! prediction endpoint. The manual transform stage and the fitted statistical
//! pipeline together define a contract that inference replays exactly.
//!
//! # Modules
//!
//! - [`schema`] - Client record types and column-inclusion policies
//! - [`preprocessing`] - Manual transforms and the fitted statistical pipeline
//! - [`training`] - Splitting, the regressor, metrics, and the training driver
//! - [`inference`] - Read-only serving of fitted artifacts
//! - [`server`] - HTTP prediction endpoint
//! - [`cli`] - Command-line interface
//! - [`utils`] - CSV ingestion helpers

// Core error handling
pub mod error;

// Data model and governance
pub mod schema;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod inference;

// Services
pub mod server;
pub mod cli;

// Utilities
pub mod utils;

pub use error::{LoanflowError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{LoanflowError, Result};
    pub use crate::inference::InferenceEngine;
    pub use crate::preprocessing::{
        apply_manual_transformations, LoanPreprocessor, ManualTransforms, PreprocessingConfig,
    };
    pub use crate::schema::{ClientRecord, ClientUpdate, ColumnPlan, ColumnPolicy};
    pub use crate::training::{
        train_test_split, MLPConfig, MLPRegressor, RegressionMetrics, TrainEngine, TrainingConfig,
    };
}
