//! Request/response API: synchronous record reads that advance playback
//! cursors, discovery endpoints, cursor reset, and the push handshake.

pub mod handlers;
pub mod routes;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::cursor::CursorStore;
use crate::store::RecordStore;
use crate::ws::hub::Hub;

/// Shared application state injected into every handler and the upgrade
/// endpoint. Hubs are empty when push is disabled.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub cursors: Arc<CursorStore>,
    pub hubs: Arc<HashMap<&'static str, Arc<Hub>>>,
    pub shutdown: CancellationToken,
    pub loaded_at: DateTime<Utc>,
}

/// API error envelope; everything renders as `{"error": ...}` with the
/// matching status code.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Masks all but the first four characters of a subscriber key for logs.
pub fn mask_key(key: &str) -> String {
    if key.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", &key[..4])
    }
}
