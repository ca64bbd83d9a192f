//! Login, token refresh, logout and the current-user profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use clinic_core::User;

use crate::auth::{CurrentUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

/// Verifies credentials and sets both token cookies.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<User>)> {
    let user = state
        .db
        .users()
        .authenticate(&payload.username, &payload.password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    let (access, refresh) = state.jwt.session_cookies(&user)?;
    info!(username = %user.username, role = %user.role, "User logged in");

    Ok((jar.add(access).add(refresh), Json(user)))
}

/// Exchanges a valid refresh cookie for a new cookie pair.
///
/// The role is re-read from the database, so role changes and
/// deactivation take effect here.
async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<User>)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("Refresh token missing".to_string()))?;

    let claims = state.jwt.validate_refresh_token(&token)?;

    let user = match state.db.users().get(&claims.sub).await {
        Ok(user) if user.is_active => user,
        Ok(_) | Err(clinic_db::DbError::NotFound { .. }) => {
            warn!(user_id = %claims.sub, "Refresh for unknown or inactive user");
            return Err(ApiError::unauthorized());
        }
        Err(e) => return Err(e.into()),
    };

    let (access, refresh) = state.jwt.session_cookies(&user)?;
    Ok((jar.add(access).add(refresh), Json(user)))
}

/// Clears both token cookies.
async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    info!(username = %user.username, "User logged out");
    let jar = jar
        .add(state.jwt.removal_cookie(ACCESS_COOKIE))
        .add(state.jwt.removal_cookie(REFRESH_COOKIE));
    (jar, StatusCode::NO_CONTENT)
}

async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<User>> {
    let user = state.db.users().get(&user.id).await?;
    Ok(Json(user))
}
