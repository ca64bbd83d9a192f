//! Stock intake, lookup and the inventory summary.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::Deserialize;

use clinic_core::{Capability, Department, InventorySnapshot, IssuanceRecord, NewStockItem, StockItem};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::require_capability;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StockFilter {
    pub department: Option<Department>,
}

pub fn router() -> Router<AppState> {
    let read_routes = Router::new()
        .route("/api/stock", get(list))
        .route("/api/stock/summary", get(summary))
        .route("/api/stock/{id}", get(get_by_id))
        .route("/api/stock/{id}/issuances", get(list_issuances))
        .route_layer(middleware::from_fn_with_state(
            Capability::ViewOrders,
            require_capability,
        ));

    let manage_routes = Router::new()
        .route("/api/stock", axum::routing::post(create))
        .route_layer(middleware::from_fn_with_state(
            Capability::ManageStock,
            require_capability,
        ));

    read_routes.merge(manage_routes)
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<StockFilter>,
) -> ApiResult<Json<Vec<StockItem>>> {
    Ok(Json(state.db.stock().list(filter.department).await?))
}

async fn summary(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<StockFilter>,
) -> ApiResult<Json<InventorySnapshot>> {
    Ok(Json(state.db.stock().snapshot(filter.department).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StockItem>> {
    Ok(Json(state.db.stock().get(&id).await?))
}

async fn list_issuances(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<IssuanceRecord>>> {
    state.db.stock().get(&id).await?;
    Ok(Json(state.db.issuances().list_for_stock_item(&id).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewStockItem>,
) -> ApiResult<(StatusCode, Json<StockItem>)> {
    let item = state.db.stock().create(&payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}
