//! Account endpoints

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::dto::{AccountResponse, LoginRequest, LoginResponse};
use crate::AppState;
use crate::auth::{CurrentUser, SESSION_COOKIE, Session, create_session_token};
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};
use crate::service::{NewAccount, ProfileEdit};

/// POST /api/accounts/register
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<NewAccount>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/accounts/register"])
        .start_timer();

    let accounts = state.accounts();
    let user = accounts.register(form).await?;
    let profile = accounts.get_profile(&user.id).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/accounts/register", "201"])
        .inc();

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse::new(&user, profile.as_ref())),
    ))
}

/// POST /api/accounts/login
///
/// Returns the session token in the body and as the `session` cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/accounts/login"])
        .start_timer();

    let accounts = state.accounts();
    let user = accounts.login(&request.username, &request.password).await?;
    let profile = accounts.get_profile(&user.id).await?;

    let session = Session::start(&user.id, &user.username, state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax);

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/accounts/login", "200"])
        .inc();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            account: AccountResponse::new(&user, profile.as_ref()),
        }),
    ))
}

/// POST /api/accounts/logout
///
/// Sessions are stateless; this only clears the cookie.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

/// GET /api/accounts/me
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<AccountResponse>, AppError> {
    let accounts = state.accounts();
    let user = accounts.get_active_user(&session.user_id).await?;
    let profile = accounts.get_profile(&user.id).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/accounts/me", "200"])
        .inc();

    Ok(Json(AccountResponse::new(&user, profile.as_ref())))
}

/// PATCH /api/accounts/me
pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(edit): Json<ProfileEdit>,
) -> Result<Json<AccountResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["PATCH", "/api/accounts/me"])
        .start_timer();

    let (user, profile) = state.accounts().edit(&session.user_id, edit).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["PATCH", "/api/accounts/me", "200"])
        .inc();

    Ok(Json(AccountResponse::new(&user, Some(&profile))))
}

/// DELETE /api/accounts/me
///
/// Deactivates the account and clears the session cookie.
pub async fn deactivate(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    state.accounts().deactivate(&session.user_id).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["DELETE", "/api/accounts/me", "204"])
        .inc();

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    ))
}
