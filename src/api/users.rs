//! User directory and follow endpoints

use std::collections::HashMap;

use axum::{
    Form,
    extract::{Json, Path, State},
};

use super::dto::{StatusResponse, ToggleForm, UserDetailResponse, UserResponse};
use super::toggle_status;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{TargetRef, verbs};
use crate::error::AppError;
use crate::metrics::{
    DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS, HTTP_REQUEST_DURATION_SECONDS,
    HTTP_REQUESTS_TOTAL,
};

/// GET /api/users
///
/// All active users.
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/users"])
        .start_timer();

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "users"])
        .start_timer();
    let users = state.accounts().list_active().await?;
    let ids: Vec<String> = users.iter().map(|user| user.id.clone()).collect();
    let profiles: HashMap<String, _> = state
        .db
        .get_profiles_by_user_ids(&ids)
        .await?
        .into_iter()
        .map(|profile| (profile.user_id.clone(), profile))
        .collect();
    DB_QUERIES_TOTAL.with_label_values(&["SELECT", "users"]).inc();
    db_timer.observe_duration();

    let response = users
        .iter()
        .map(|user| UserResponse::new(user, profiles.get(&user.id)))
        .collect();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/users", "200"])
        .inc();

    Ok(Json(response))
}

/// GET /api/users/:username
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<UserDetailResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/users/:username"])
        .start_timer();

    let detail = state.accounts().detail(&session.user_id, &username).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/users/:username", "200"])
        .inc();

    Ok(Json(detail.into()))
}

/// POST /api/users/follow
///
/// Form fields `id` (target user) and `action` (`follow`, anything else
/// unfollows). Missing targets and other failures report `error`.
pub async fn follow(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Form(form): Form<ToggleForm>,
) -> Result<Json<StatusResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/users/follow"])
        .start_timer();

    let result = toggle_follow(&state, &session.user_id, &form).await;
    toggle_status("/api/users/follow", result)
}

async fn toggle_follow(state: &AppState, user_id: &str, form: &ToggleForm) -> Result<(), AppError> {
    let graph = state.graph();

    if form.action == "follow" {
        let target = state.accounts().get_active_user(&form.id).await?;
        if graph.follow(user_id, &target.id).await? {
            state
                .actions()
                .record(user_id, verbs::FOLLOWING, Some(&TargetRef::User(target.id)))
                .await?;
        }
    } else {
        // deactivated users can still be unfollowed
        let target = state.db.get_user(&form.id).await?.ok_or(AppError::NotFound)?;
        graph.unfollow(user_id, &target.id).await?;
    }

    Ok(())
}
