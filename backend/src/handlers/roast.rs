//! HTTP handlers for roast batch ledger endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use shared::lot::RoastLevel;

use crate::error::AppResult;
use crate::services::roast::{
    AdjustInventoryInput, AdjustmentOutcome, CreateRoastBatchInput, InventoryAdjustment,
    LotPreview, LowStockProduct, RoastBatch, RoastBatchSummary, RoastService,
};
use crate::AppState;

/// Enter a roast batch; returns the assigned (or reused) lot code
pub async fn create_roast_batch(
    State(state): State<AppState>,
    Json(input): Json<CreateRoastBatchInput>,
) -> AppResult<Json<RoastBatch>> {
    let service = RoastService::new(state.db);
    let batch = service.create_roast_batch(input).await?;
    Ok(Json(batch))
}

/// Query parameters for batch listing
#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    #[serde(default)]
    pub in_stock: bool,
}

/// List roast batches
pub async fn list_roast_batches(
    State(state): State<AppState>,
    Query(query): Query<ListBatchesQuery>,
) -> AppResult<Json<Vec<RoastBatchSummary>>> {
    let service = RoastService::new(state.db);
    let batches = service.list_batches(query.in_stock).await?;
    Ok(Json(batches))
}

/// Get a roast batch
pub async fn get_roast_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<RoastBatch>> {
    let service = RoastService::new(state.db);
    let batch = service.get_batch(batch_id).await?;
    Ok(Json(batch))
}

/// Get a roast batch by the lot code printed on packaging
pub async fn get_roast_batch_by_lot(
    State(state): State<AppState>,
    Path(lot): Path<String>,
) -> AppResult<Json<RoastBatch>> {
    let service = RoastService::new(state.db);
    let batch = service.get_batch_by_lot(&lot).await?;
    Ok(Json(batch))
}

/// Products with total availability below the configured threshold
pub async fn low_stock_products(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LowStockProduct>>> {
    let threshold = Decimal::from(state.config.stock.low_stock_threshold_g);
    let service = RoastService::new(state.db);
    let products = service.low_stock_products(threshold).await?;
    Ok(Json(products))
}

/// Input for previewing a lot code
#[derive(Debug, Deserialize)]
pub struct LotPreviewInput {
    pub product_id: Uuid,
    pub roast_level: RoastLevel,
    pub roast_date: NaiveDate,
}

/// Preview the lot code a roast entry would receive
pub async fn preview_lot(
    State(state): State<AppState>,
    Json(input): Json<LotPreviewInput>,
) -> AppResult<Json<LotPreview>> {
    let service = RoastService::new(state.db);
    let preview = service
        .preview_lot(input.product_id, input.roast_level, input.roast_date)
        .await?;
    Ok(Json(preview))
}

/// Manually adjust availability with an audit comment
pub async fn adjust_inventory(
    State(state): State<AppState>,
    Json(input): Json<AdjustInventoryInput>,
) -> AppResult<Json<AdjustmentOutcome>> {
    let service = RoastService::new(state.db);
    let outcome = service.adjust_inventory(input).await?;
    Ok(Json(outcome))
}

/// Query parameters for adjustment history
#[derive(Debug, Deserialize)]
pub struct AdjustmentHistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    50
}

/// Adjustment history for a product
pub async fn adjustment_history(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<AdjustmentHistoryQuery>,
) -> AppResult<Json<Vec<InventoryAdjustment>>> {
    let service = RoastService::new(state.db);
    let adjustments = service.adjustment_history(product_id, query.limit).await?;
    Ok(Json(adjustments))
}
