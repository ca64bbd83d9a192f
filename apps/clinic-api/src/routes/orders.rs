//! Order endpoints, including issuing stock against an order.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{middleware, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use clinic_core::issuance::IssueRequest;
use clinic_core::order::{PaymentRequest, StatusChangeRequest};
use clinic_core::{Capability, IssuanceRecord, IssueOutcome, NewOrder, Order, OrderStatus, OrderWithItems};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::require_capability;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

/// Body of a successful issue.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: IssueOutcome,
}

pub fn router() -> Router<AppState> {
    let read_routes = Router::new()
        .route("/api/orders", get(list))
        .route("/api/orders/{id}", get(get_by_id))
        .route("/api/orders/{id}/issuances", get(list_issuances))
        .route_layer(middleware::from_fn_with_state(
            Capability::ViewOrders,
            require_capability,
        ));

    let manage_routes = Router::new()
        .route("/api/orders", post(create))
        .route("/api/orders/{id}", axum::routing::delete(remove))
        .route("/api/orders/{id}/payments", post(record_payment))
        .route("/api/orders/{id}/status", patch(update_status))
        .route_layer(middleware::from_fn_with_state(
            Capability::ManageOrders,
            require_capability,
        ));

    let issue_routes = Router::new()
        .route("/api/orders/{id}/issue", post(issue_stock))
        .route_layer(middleware::from_fn_with_state(
            Capability::IssueStock,
            require_capability,
        ));

    read_routes.merge(manage_routes).merge(issue_routes)
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list(filter.status).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderWithItems>> {
    Ok(Json(state.db.orders().get(&id).await?))
}

async fn list_issuances(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<IssuanceRecord>>> {
    state.db.orders().get_order(&id).await?;
    Ok(Json(state.db.issuances().list_for_order(&id).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewOrder>,
) -> ApiResult<(StatusCode, Json<OrderWithItems>)> {
    let order = state.db.orders().create(&payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.orders().delete(&id).await?;
    info!(order_id = %id, deleted_by = %user.username, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<PaymentRequest>,
) -> ApiResult<Json<Order>> {
    Ok(Json(
        state
            .db
            .orders()
            .record_payment(&id, payload.amount_cents)
            .await?,
    ))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<StatusChangeRequest>,
) -> ApiResult<Json<Order>> {
    Ok(Json(
        state.db.orders().update_status(&id, payload.status).await?,
    ))
}

/// Decrements stock, records the issuance and advances the order in one transaction.
async fn issue_stock(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<IssueRequest>,
) -> ApiResult<Json<IssueResponse>> {
    let outcome = state
        .db
        .issuances()
        .issue_stock_to_order(&id, &payload)
        .await?;
    info!(
        issuance_number = %outcome.issuance.issuance_number,
        user = %user.username,
        "Issue request completed"
    );
    Ok(Json(IssueResponse {
        success: true,
        outcome,
    }))
}
