use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::bracket::BracketService;
use crate::event::EventBus;
use crate::livematch::LiveMatchEngine;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub bracket: Arc<BracketService>,
    pub matches: Arc<LiveMatchEngine>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(
        bracket: Arc<BracketService>,
        matches: Arc<LiveMatchEngine>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            bracket,
            matches,
            event_bus,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown tournament, match, or team id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation rejected because the target is not in a state that allows it
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::StorageError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Storage error: {}", msg),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
