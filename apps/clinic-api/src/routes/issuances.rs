//! Issuance record endpoints: lookup, return and damage.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};

use clinic_core::issuance::RemarksBody;
use clinic_core::{Capability, IssuanceRecord};

use crate::error::{ApiError, ApiResult};
use crate::middleware::require_capability;
use crate::AppState;

pub fn router() -> Router<AppState> {
    let read_routes = Router::new()
        .route("/api/issuances/{id}", get(get_by_id))
        .route_layer(middleware::from_fn_with_state(
            Capability::ViewOrders,
            require_capability,
        ));

    let return_routes = Router::new()
        .route("/api/issuances/{id}/return", post(return_stock))
        .route("/api/issuances/{id}/damage", post(mark_damaged))
        .route_layer(middleware::from_fn_with_state(
            Capability::ReturnStock,
            require_capability,
        ));

    read_routes.merge(return_routes)
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<IssuanceRecord>> {
    Ok(Json(state.db.issuances().get(&id).await?))
}

async fn return_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<IssuanceRecord>> {
    let remarks = remarks_from(&body)?;
    Ok(Json(
        state
            .db
            .issuances()
            .return_stock(&id, remarks.as_deref())
            .await?,
    ))
}

async fn mark_damaged(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<IssuanceRecord>> {
    let remarks = remarks_from(&body)?;
    Ok(Json(
        state
            .db
            .issuances()
            .mark_damaged(&id, remarks.as_deref())
            .await?,
    ))
}

/// The remarks body is optional; an empty request body means no remarks.
fn remarks_from(body: &[u8]) -> ApiResult<Option<String>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: RemarksBody = serde_json::from_slice(body).map_err(|e| ApiError::Validation {
        message: format!("Invalid JSON body: {e}"),
        field: None,
    })?;
    Ok(parsed.remarks)
}
