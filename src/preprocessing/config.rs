//! Preprocessing configuration

use crate::schema::ColumnPolicy;
use serde::{Deserialize, Serialize};
use super::ImputeStrategy;

/// Configuration for the statistical pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Column-inclusion policy driving the manual stage and column plan
    pub policy: ColumnPolicy,

    /// Strategy for handling missing numeric values
    pub numeric_impute_strategy: ImputeStrategy,

    /// Strategy for handling missing categorical values
    pub categorical_impute_strategy: ImputeStrategy,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            policy: ColumnPolicy::Strict,
            numeric_impute_strategy: ImputeStrategy::Mean,
            categorical_impute_strategy: ImputeStrategy::MostFrequent,
        }
    }
}

impl PreprocessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the column policy
    pub fn with_policy(mut self, policy: ColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder method to set the numeric impute strategy
    pub fn with_numeric_impute(mut self, strategy: ImputeStrategy) -> Self {
        self.numeric_impute_strategy = strategy;
        self
    }

    /// Builder method to set the categorical impute strategy
    pub fn with_categorical_impute(mut self, strategy: ImputeStrategy) -> Self {
        self.categorical_impute_strategy = strategy;
        self
    }
}
