//! Route definitions for the Roast Tracker engine

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Traceability (lot codes contain slashes, so capture the tail)
        .route("/trace/lot/*lot", get(handlers::trace_lot))
        .route("/trace/production/*lot", get(handlers::trace_production))
        // Catalog
        .nest("/catalog", catalog_routes())
        // Roast batch ledger
        .nest("/roast", roast_routes())
        // Production allocation
        .nest("/production", production_routes())
        // Market sessions
        .nest("/market", market_routes())
        // RoastTime import
        .nest("/roasttime", roasttime_routes())
}

/// Catalog routes
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/green-coffee",
            get(handlers::list_green_coffee).post(handlers::create_green_coffee),
        )
        .route(
            "/green-coffee/:id",
            get(handlers::get_green_coffee).put(handlers::update_green_coffee),
        )
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::deactivate_product),
        )
}

/// Roast batch ledger routes
fn roast_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/batches",
            get(handlers::list_roast_batches).post(handlers::create_roast_batch),
        )
        .route("/batches/:batch_id", get(handlers::get_roast_batch))
        .route("/batches/by-lot/*lot", get(handlers::get_roast_batch_by_lot))
        .route("/low-stock", get(handlers::low_stock_products))
        .route("/lot-preview", post(handlers::preview_lot))
        .route("/adjustments", post(handlers::adjust_inventory))
        .route(
            "/adjustments/:product_id",
            get(handlers::adjustment_history),
        )
}

/// Production allocation routes
fn production_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_productions).post(handlers::allocate_production),
        )
        .route("/:production_id", get(handlers::get_production))
        .route("/:production_id/reverse", post(handlers::reverse_production))
}

/// Market session routes
fn market_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::open_session),
        )
        .route("/sessions/:session_id", get(handlers::get_session))
        .route("/sessions/:session_id/items", post(handlers::prepare_item))
        .route("/sessions/:session_id/sell", post(handlers::sell))
        .route("/sessions/:session_id/restore", post(handlers::restore))
        .route("/sessions/:session_id/close", post(handlers::close_session))
}

/// RoastTime import routes
fn roasttime_routes() -> Router<AppState> {
    Router::new()
        .route("/roasts", get(handlers::list_roasttime_roasts))
        .route("/roasts/:uid", get(handlers::get_roasttime_roast))
        .route("/summary", get(handlers::roasttime_summary))
}
