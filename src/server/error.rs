//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::LoanflowError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Prediction error: {0}")]
    Prediction(#[from] LoanflowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ServerError::Prediction(err) => match err {
                // Data-shaped problems are the caller's to fix
                LoanflowError::DataError(msg) | LoanflowError::ColumnNotFound(msg) => {
                    (StatusCode::BAD_REQUEST, msg.clone())
                }
                other => {
                    tracing::error!(detail = %other, "Prediction failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Prediction failed. Check server logs for details.".to_string(),
                    )
                }
            },
            ServerError::Json(_) => (StatusCode::BAD_REQUEST, "Invalid JSON format".to_string()),
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
