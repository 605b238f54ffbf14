//! Push handshake: exchanges an API key for per-hub connection URLs.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::api::{mask_key, ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct NegotiateResponse {
    pub websocket_urls: BTreeMap<String, String>,
}

/// `GET /negotiate`. The subscriber key arrives as `Authorization: Basic
/// <key>`; the returned URLs embed a `key:<uuid>` access token. The real
/// service hands out JWTs here, the replay server just needs the key to
/// travel with the connection.
pub async fn negotiate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NegotiateResponse>, ApiError> {
    let api_key = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .unwrap_or_default();

    if api_key.is_empty() {
        debug!("negotiate request missing authorization");
        return Err(ApiError::Unauthorized("missing authorization".to_string()));
    }

    let conn_id = Uuid::new_v4().to_string();
    let token = format!("{api_key}:{conn_id}");

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.to_string())
        .unwrap_or_else(|| format!("localhost:{}", state.config.port));

    let websocket_urls = state
        .hubs
        .keys()
        .map(|name| {
            (
                name.to_string(),
                format!("ws://{host}/ws/{name}?access_token={token}"),
            )
        })
        .collect();

    debug!(conn_id = %conn_id, key = %mask_key(api_key), "negotiate successful");

    Ok(Json(NegotiateResponse { websocket_urls }))
}
