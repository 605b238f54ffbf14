//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, and latency.
//! Subscriber keys in query strings are masked before they reach the log.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::{info, warn};

pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(mask_query_key);

    // Skip logging for health checks to reduce noise
    if path == "/health" {
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let latency = start.elapsed();
    let status = response.status().as_u16();

    if status >= 500 {
        warn!(
            method = %method,
            path = %path,
            query = query.as_deref().unwrap_or(""),
            status = status,
            latency_ms = latency.as_millis() as u64,
            "request failed (5xx)"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            query = query.as_deref().unwrap_or(""),
            status = status,
            latency_ms = latency.as_millis() as u64,
            "request completed"
        );
    }

    response
}

/// Masks the value of any `key` or `access_token` parameter in a raw query
/// string, preserving parameter order.
fn mask_query_key(raw_query: &str) -> String {
    raw_query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if name == "key" || name == "access_token" => {
                if value.len() > 4 {
                    format!("{name}={}****", &value[..4])
                } else {
                    format!("{name}=****")
                }
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
