//! Prometheus scrape endpoint

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};

use crate::AppState;
use crate::metrics::{REGISTRY, USERS_TOTAL};

/// GET /metrics
///
/// Refreshes the active user gauge, then renders the registry in text format.
async fn scrape(State(state): State<AppState>) -> Response {
    match state.db.count_active_users().await {
        Ok(count) => USERS_TOTAL.set(count),
        Err(error) => tracing::warn!(%error, "Failed to refresh user gauge"),
    }

    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&REGISTRY.gather()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

/// Router serving `/metrics`, left outside the API's auth layer
pub fn metrics_router() -> Router<AppState> {
    Router::new().route("/metrics", get(scrape))
}
