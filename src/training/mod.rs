//! Model training module
//!
//! Deterministic splitting, a feed-forward regressor with warm-start
//! support, regression metrics, and the offline training driver.

mod engine;
mod metrics;
mod neural_network;
mod split;

pub use engine::{TrainEngine, TrainingConfig, TrainingReport};
pub use metrics::RegressionMetrics;
pub use neural_network::{MLPConfig, MLPRegressor};
pub use split::train_test_split;
