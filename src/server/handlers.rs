//! Request handlers

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::schema::ClientRecord;

use super::{error::Result, state::AppState};

#[derive(Serialize)]
pub struct PredictionResponse {
    pub montant_pret: f64,
}

/// POST /api/predict — one loan-amount estimate for one client record.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(record): Json<ClientRecord>,
) -> Result<Json<PredictionResponse>> {
    let estimate = state.engine.predict_one(&record)?;
    info!(estimate, "prediction served");
    Ok(Json(PredictionResponse {
        montant_pret: estimate,
    }))
}

/// GET /api/health — liveness probe.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "started_at": state.started_at.to_rfc3339(),
    }))
}

/// GET /api/model — fitted pipeline and model summary.
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "policy": state.engine.policy().to_string(),
        "n_features": state.engine.n_features(),
        "feature_names": state.engine.feature_names(),
    }))
}
