//! Authentication and capability middleware.
//!
//! ```text
//! request ─► require_auth ─► require_capability(cap) ─► handler
//!              │                   │
//!              │ 401 no/bad token  │ 403 role lacks cap
//!              ▼                   ▼
//!         CurrentUser in extensions, renewed access cookie on the
//!         response when the token is inside the renewal window
//! ```

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::{debug, warn};

use clinic_core::Capability;

use crate::auth::{extract_bearer_token, CurrentUser, ACCESS_COOKIE};
use crate::error::ApiError;
use crate::AppState;

/// Routes under `/api/` reachable without an access token.
const PUBLIC_API_ROUTES: &[&str] = &["/api/auth/login", "/api/auth/refresh"];

/// Requires a valid access token on every `/api/` route except login and refresh.
///
/// The token comes from the `access_token` cookie, falling back to
/// `Authorization: Bearer`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path();
    if !path.starts_with("/api/") || PUBLIC_API_ROUTES.contains(&path) {
        return Ok(next.run(req).await);
    }

    let Some(token) = token_from_request(&req) else {
        warn!(uri = %req.uri(), "Request without access token");
        return Err(ApiError::unauthorized());
    };

    let claims = match state.jwt.validate_access_token(&token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(uri = %req.uri(), "Rejected access token");
            return Err(e);
        }
    };

    let renew = claims.exp - Utc::now().timestamp() <= state.config.jwt_renewal_window_secs;
    let user = CurrentUser::from(claims);
    req.extensions_mut().insert(user.clone());

    let mut response = next.run(req).await;

    if renew {
        let token = state
            .jwt
            .generate_access_token(&user.id, &user.username, user.role)?;
        let cookie = state.jwt.access_cookie(token);
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
                debug!(username = %user.username, "Access token renewed");
            }
            Err(e) => warn!(error = %e, "Could not encode renewed access cookie"),
        }
    }

    Ok(response)
}

fn token_from_request(req: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .map(str::to_string)
}

/// Requires the caller's role to grant `capability`.
///
/// ```ignore
/// Router::new()
///     .route("/api/stock", post(create))
///     .route_layer(middleware::from_fn_with_state(Capability::ManageStock, require_capability));
/// ```
pub async fn require_capability(
    State(capability): State<Capability>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(ApiError::unauthorized)?;

    if !user.has(capability) {
        warn!(
            username = %user.username,
            role = %user.role,
            required = %capability,
            "Permission denied"
        );
        return Err(ApiError::Forbidden(format!(
            "Role {} lacks capability {}",
            user.role, capability
        )));
    }

    Ok(next.run(req).await)
}
