//! Dashboard (activity feed) endpoint

use axum::extract::{Json, State};

use super::dto::{DashboardResponse, FeedEntryResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};

/// GET /api/dashboard
///
/// Recent activity of the users the caller follows, or of everyone when
/// the caller follows no one. The caller's own actions are never shown.
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/dashboard"])
        .start_timer();

    let entries = state
        .feed()
        .dashboard(&session.user_id, state.config.feed.page_size)
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/dashboard", "200"])
        .inc();

    Ok(Json(DashboardResponse {
        actions: entries.into_iter().map(FeedEntryResponse::from).collect(),
    }))
}
