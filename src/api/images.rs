//! Image endpoints

use axum::{
    Form,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};

use super::dto::{
    ImageDetailResponse, ImageListQuery, ImagePageResponse, ImageResponse, StatusResponse,
    ToggleForm,
};
use super::toggle_status;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};
use crate::service::NewImage;

/// POST /api/images
pub async fn create_image(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(form): Json<NewImage>,
) -> Result<(StatusCode, Json<ImageResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/images"])
        .start_timer();

    let image = state.images().create(&session.user_id, form).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/images", "201"])
        .inc();

    Ok((StatusCode::CREATED, Json(image.into())))
}

/// GET /api/images?page=N&images_only=1
pub async fn list_images(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Query(query): Query<ImageListQuery>,
) -> Result<Json<ImagePageResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/images"])
        .start_timer();

    let page = state
        .images()
        .list(&session.user_id, query.page.as_deref(), query.is_partial())
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/images", "200"])
        .inc();

    Ok(Json(ImagePageResponse {
        images: page.images.into_iter().map(ImageResponse::from).collect(),
        page: page.page.map(Into::into),
    }))
}

/// GET /api/images/ranking
///
/// Most viewed images, highest score first.
pub async fn ranking(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
) -> Result<Json<Vec<ImageResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/images/ranking"])
        .start_timer();

    let images = state.images().ranking().await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/images/ranking", "200"])
        .inc();

    Ok(Json(images.into_iter().map(ImageResponse::from).collect()))
}

/// GET /api/images/:id/:slug
///
/// Public. Each request counts as a view.
pub async fn image_detail(
    State(state): State<AppState>,
    Path((id, slug)): Path<(String, String)>,
) -> Result<Json<ImageDetailResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/images/:id/:slug"])
        .start_timer();

    let detail = state.images().detail(&id, &slug).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/images/:id/:slug", "200"])
        .inc();

    Ok(Json(detail.into()))
}

/// DELETE /api/images/:id
///
/// Owner only.
pub async fn delete_image(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/api/images/:id"])
        .start_timer();

    state.images().delete(&session.user_id, &id).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["DELETE", "/api/images/:id", "204"])
        .inc();

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/images/like
///
/// Form fields `id` (image) and `action` (`like`, anything else unlikes).
pub async fn like_image(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Form(form): Form<ToggleForm>,
) -> Result<Json<StatusResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/images/like"])
        .start_timer();

    let result = state
        .images()
        .set_like(&session.user_id, &form.id, form.action == "like")
        .await
        .map(|_| ());
    toggle_status("/api/images/like", result)
}
