//! Router construction. Record, discovery, and control endpoints are always
//! mounted; the negotiate and upgrade routes only exist when push is
//! enabled (the hubs map is empty otherwise).

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;
use crate::middleware::request_logging;
use crate::ws::{conn, negotiate};

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/tickers", get(handlers::tickers))
        .route("/dates", get(handlers::dates))
        .route("/date", get(handlers::current_date))
        .route("/cache/reset", post(handlers::reset_cache))
        .route("/orderflow/:ticker", get(handlers::orderflow_latest))
        .route("/classic/:ticker/:aggregation", get(handlers::classic_chain))
        .route(
            "/classic/:ticker/:aggregation/majors",
            get(handlers::classic_majors),
        )
        .route(
            "/classic/:ticker/:aggregation/maxchange",
            get(handlers::classic_maxchange),
        )
        .route("/state/:ticker/:kind", get(handlers::state_profile))
        .route("/state/:ticker/:kind/majors", get(handlers::state_majors))
        .route(
            "/state/:ticker/:kind/maxchange",
            get(handlers::state_maxchange),
        )
        .route(
            "/download/classic/:ticker/:aggregation",
            get(handlers::download_classic),
        )
        .route("/download/state/:ticker/:kind", get(handlers::download_state));

    if !state.hubs.is_empty() {
        router = router
            .route("/negotiate", get(negotiate::negotiate))
            .route("/ws/:hub", get(conn::upgrade));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(request_logging))
        .with_state(state)
}
