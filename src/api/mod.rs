//! API layer
//!
//! HTTP handlers for:
//! - Accounts and sessions
//! - User directory and follows
//! - Dashboard (activity feed)
//! - Images, likes and ranking
//! - Metrics (Prometheus)

mod accounts;
mod dashboard;
mod dto;
mod images;
pub mod metrics;
mod users;

use axum::{
    Json, Router, middleware,
    routing::{delete, get, post},
};

use crate::AppState;
use crate::auth::require_auth;
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;

pub use dto::*;
pub use metrics::metrics_router;

/// Create the JSON API router
///
/// Routes are split into public and authenticated endpoints.
pub fn api_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/login", post(accounts::login))
        .route("/accounts/logout", post(accounts::logout))
        .route("/images/:id/:slug", get(images::image_detail));

    let authenticated_routes = Router::new()
        .route(
            "/accounts/me",
            get(accounts::me)
                .patch(accounts::edit)
                .delete(accounts::deactivate),
        )
        .route("/users", get(users::list_users))
        .route("/users/follow", post(users::follow))
        .route("/users/:username", get(users::get_user))
        .route("/dashboard", get(dashboard::dashboard))
        .route(
            "/images",
            get(images::list_images).post(images::create_image),
        )
        .route("/images/ranking", get(images::ranking))
        .route("/images/like", post(images::like_image))
        .route("/images/:id", delete(images::delete_image))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public_routes.merge(authenticated_routes)
}

/// Report a follow/like outcome as `{"status": "ok" | "error"}`
///
/// Lookup and validation failures collapse into `error`; an unreachable
/// ranking store still surfaces as 503.
fn toggle_status(
    endpoint: &'static str,
    result: Result<(), AppError>,
) -> Result<Json<StatusResponse>, AppError> {
    match result {
        Ok(()) => {
            HTTP_REQUESTS_TOTAL
                .with_label_values(&["POST", endpoint, "200"])
                .inc();
            Ok(Json(StatusResponse::ok()))
        }
        Err(error @ AppError::RankingUnavailable(_)) => Err(error),
        Err(error) => {
            tracing::info!(endpoint, %error, "Request reported as error status");
            HTTP_REQUESTS_TOTAL
                .with_label_values(&["POST", endpoint, "200"])
                .inc();
            Ok(Json(StatusResponse::error()))
        }
    }
}
