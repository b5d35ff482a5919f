//! HTTP handlers for catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::catalog::{
    CatalogService, CoffeeProduct, CreateGreenCoffeeInput, CreateProductInput, GreenCoffee,
    UpdateGreenCoffeeInput, UpdateProductInput,
};
use crate::AppState;

/// Register a green coffee lot
pub async fn create_green_coffee(
    State(state): State<AppState>,
    Json(input): Json<CreateGreenCoffeeInput>,
) -> AppResult<Json<GreenCoffee>> {
    let service = CatalogService::new(state.db);
    let coffee = service.create_green_coffee(input).await?;
    Ok(Json(coffee))
}

/// Get a green coffee lot
pub async fn get_green_coffee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GreenCoffee>> {
    let service = CatalogService::new(state.db);
    let coffee = service.get_green_coffee(id).await?;
    Ok(Json(coffee))
}

/// List green coffee lots
pub async fn list_green_coffee(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<GreenCoffee>>> {
    let service = CatalogService::new(state.db);
    let coffees = service.list_green_coffee().await?;
    Ok(Json(coffees))
}

/// Update a green coffee lot
pub async fn update_green_coffee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateGreenCoffeeInput>,
) -> AppResult<Json<GreenCoffee>> {
    let service = CatalogService::new(state.db);
    let coffee = service.update_green_coffee(id, input).await?;
    Ok(Json(coffee))
}

/// Query parameters for product listing
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// Create a coffee product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<CoffeeProduct>> {
    let service = CatalogService::new(state.db);
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// Get a coffee product
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CoffeeProduct>> {
    let service = CatalogService::new(state.db);
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// List coffee products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<CoffeeProduct>>> {
    let service = CatalogService::new(state.db);
    let products = service.list_products(query.active_only).await?;
    Ok(Json(products))
}

/// Update a coffee product
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<CoffeeProduct>> {
    let service = CatalogService::new(state.db);
    let product = service.update_product(id, input).await?;
    Ok(Json(product))
}

/// Deactivate a coffee product
pub async fn deactivate_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = CatalogService::new(state.db);
    service.deactivate_product(id).await?;
    Ok(Json(()))
}
