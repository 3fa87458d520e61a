//! Application state

use crate::inference::InferenceEngine;
use std::sync::Arc;

/// State shared across handlers.
///
/// The engine is constructed once at startup and never mutated afterwards,
/// so no lock is needed: concurrent requests read the same fitted pipeline
/// and model.
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            started_at: chrono::Utc::now(),
        }
    }
}
