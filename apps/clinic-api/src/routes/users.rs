//! Staff account administration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use tracing::info;

use clinic_core::{Capability, NewUser, User};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::require_capability;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route_layer(middleware::from_fn_with_state(
            Capability::ManageUsers,
            require_capability,
        ))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.users().list().await?))
}

async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.db.users().create(&payload).await?;
    info!(created_by = %admin.username, username = %user.username, "Staff account created");
    Ok((StatusCode::CREATED, Json(user)))
}
