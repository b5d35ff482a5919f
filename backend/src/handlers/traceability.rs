//! HTTP handlers for traceability endpoints
//!
//! Lot codes contain slashes, so these routes capture the whole tail of
//! the path.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::services::traceability::{LotTrace, ProductionTrace, TraceabilityService};
use crate::AppState;

/// Forward trace: roast lot to green origin and production uses
pub async fn trace_lot(
    State(state): State<AppState>,
    Path(lot): Path<String>,
) -> AppResult<Json<LotTrace>> {
    let service = TraceabilityService::new(state.db);
    let trace = service.trace_lot(&lot).await?;
    Ok(Json(trace))
}

/// Backward trace: production lot to its source roast batches
pub async fn trace_production(
    State(state): State<AppState>,
    Path(lot): Path<String>,
) -> AppResult<Json<ProductionTrace>> {
    let service = TraceabilityService::new(state.db);
    let trace = service.trace_production(&lot).await?;
    Ok(Json(trace))
}
