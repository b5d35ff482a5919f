//! HTTP handlers for market session endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::market::{
    MarketService, MarketSession, MarketSessionItem, OpenSessionInput, PrepareItemInput,
    RestoreInput, SaleReceipt, SellInput, SessionDetail,
};
use crate::AppState;

/// Open a market session, optionally carrying over unsold stock
pub async fn open_session(
    State(state): State<AppState>,
    Json(input): Json<OpenSessionInput>,
) -> AppResult<Json<MarketSession>> {
    let service = MarketService::new(state.db);
    let session = service.open_session(input).await?;
    Ok(Json(session))
}

/// List market sessions
pub async fn list_sessions(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<MarketSession>>> {
    let service = MarketService::new(state.db);
    let sessions = service.list_sessions().await?;
    Ok(Json(sessions))
}

/// Get a session with its items and totals
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionDetail>> {
    let service = MarketService::new(state.db);
    let session = service.get_session(session_id).await?;
    Ok(Json(session))
}

/// Prepare stock of one (product, lot) for a session
pub async fn prepare_item(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(input): Json<PrepareItemInput>,
) -> AppResult<Json<MarketSessionItem>> {
    let service = MarketService::new(state.db);
    let item = service.prepare(session_id, input).await?;
    Ok(Json(item))
}

/// Sell a cart against a session (all-or-nothing)
pub async fn sell(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(input): Json<SellInput>,
) -> AppResult<Json<SaleReceipt>> {
    let service = MarketService::new(state.db);
    let receipt = service.sell(session_id, input).await?;
    Ok(Json(receipt))
}

/// Restore stock after a cancelled receipt
pub async fn restore(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(input): Json<RestoreInput>,
) -> AppResult<Json<MarketSessionItem>> {
    let service = MarketService::new(state.db);
    let item = service.restore(session_id, input).await?;
    Ok(Json(item))
}

/// Close a session (terminal)
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<MarketSession>> {
    let service = MarketService::new(state.db);
    let session = service.close_session(session_id).await?;
    Ok(Json(session))
}
