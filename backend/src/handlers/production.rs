//! HTTP handlers for production allocation endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::production::{
    AllocateProductionInput, ProductionBatchDetail, ProductionService, ProductionSummary,
};
use crate::AppState;

/// Allocate a production run from roast batch sources
pub async fn allocate_production(
    State(state): State<AppState>,
    Json(input): Json<AllocateProductionInput>,
) -> AppResult<Json<ProductionBatchDetail>> {
    let service = ProductionService::new(state.db);
    let batch = service.allocate_production(input).await?;
    Ok(Json(batch))
}

/// Query parameters for production listing
#[derive(Debug, Deserialize)]
pub struct ListProductionsQuery {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    50
}

/// List production runs with their source lots
pub async fn list_productions(
    State(state): State<AppState>,
    Query(query): Query<ListProductionsQuery>,
) -> AppResult<Json<Vec<ProductionSummary>>> {
    let service = ProductionService::new(state.db);
    let productions = service.list_productions(query.limit).await?;
    Ok(Json(productions))
}

/// Get a production run with its provenance
pub async fn get_production(
    State(state): State<AppState>,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<ProductionBatchDetail>> {
    let service = ProductionService::new(state.db);
    let batch = service.get_production(production_id).await?;
    Ok(Json(batch))
}

/// Reverse a production run entered in error
pub async fn reverse_production(
    State(state): State<AppState>,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductionService::new(state.db);
    service.reverse_production(production_id).await?;
    Ok(Json(()))
}
