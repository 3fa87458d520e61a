//! Inference module
//!
//! Read-only serving of the fitted pipeline and trained model.

mod engine;

pub use engine::InferenceEngine;
