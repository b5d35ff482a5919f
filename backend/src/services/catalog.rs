//! Catalog service: green coffee lots and coffee products
//!
//! The rest of the engine treats these as opaque foreign keys; the only
//! ledger rule here is that green stock never goes negative.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::lot::RoastLevel;

use crate::error::{AppError, AppResult};

/// Catalog service for raw materials and products
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Green coffee record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GreenCoffee {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub process: Option<String>,
    pub variety: Option<String>,
    pub tasting_notes: Option<String>,
    pub supplier: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub current_stock_g: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a green coffee lot
#[derive(Debug, Deserialize)]
pub struct CreateGreenCoffeeInput {
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub process: Option<String>,
    pub variety: Option<String>,
    pub tasting_notes: Option<String>,
    pub supplier: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub current_stock_g: Option<Decimal>,
}

/// Input for updating a green coffee lot
#[derive(Debug, Deserialize)]
pub struct UpdateGreenCoffeeInput {
    pub name: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub process: Option<String>,
    pub variety: Option<String>,
    pub tasting_notes: Option<String>,
    pub supplier: Option<String>,
    pub current_stock_g: Option<Decimal>,
}

/// Coffee product record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CoffeeProduct {
    pub id: Uuid,
    pub name: String,
    pub green_coffee_id: Option<Uuid>,
    pub roast_level: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a coffee product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub green_coffee_id: Option<Uuid>,
    pub roast_level: RoastLevel,
    pub description: Option<String>,
}

/// Input for updating a coffee product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub green_coffee_id: Option<Uuid>,
    pub roast_level: Option<RoastLevel>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

const GREEN_COLUMNS: &str = "id, name, country, region, process, variety, tasting_notes, \
     supplier, purchase_date, current_stock_g, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, name, green_coffee_id, roast_level, description, is_active, created_at";

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a green coffee lot
    pub async fn create_green_coffee(
        &self,
        input: CreateGreenCoffeeInput,
    ) -> AppResult<GreenCoffee> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }
        if input.country.trim().is_empty() {
            return Err(AppError::validation("country", "Country is required"));
        }
        let stock = input.current_stock_g.unwrap_or(Decimal::ZERO);
        if stock < Decimal::ZERO {
            return Err(AppError::validation("current_stock_g", "Stock cannot be negative"));
        }

        let coffee = sqlx::query_as::<_, GreenCoffee>(&format!(
            "INSERT INTO green_coffee \
                 (name, country, region, process, variety, tasting_notes, supplier, \
                  purchase_date, current_stock_g) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {GREEN_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.country.trim())
        .bind(&input.region)
        .bind(&input.process)
        .bind(&input.variety)
        .bind(&input.tasting_notes)
        .bind(&input.supplier)
        .bind(input.purchase_date)
        .bind(stock)
        .fetch_one(&self.db)
        .await?;

        Ok(coffee)
    }

    /// Get a green coffee lot by ID
    pub async fn get_green_coffee(&self, id: Uuid) -> AppResult<GreenCoffee> {
        let coffee = sqlx::query_as::<_, GreenCoffee>(&format!(
            "SELECT {GREEN_COLUMNS} FROM green_coffee WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Green coffee".to_string()))?;

        Ok(coffee)
    }

    /// List green coffee lots
    pub async fn list_green_coffee(&self) -> AppResult<Vec<GreenCoffee>> {
        let coffees = sqlx::query_as::<_, GreenCoffee>(&format!(
            "SELECT {GREEN_COLUMNS} FROM green_coffee ORDER BY country, name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(coffees)
    }

    /// Update a green coffee lot
    pub async fn update_green_coffee(
        &self,
        id: Uuid,
        input: UpdateGreenCoffeeInput,
    ) -> AppResult<GreenCoffee> {
        let existing = self.get_green_coffee(id).await?;

        let name = input.name.unwrap_or(existing.name);
        let country = input.country.unwrap_or(existing.country);
        let region = input.region.or(existing.region);
        let process = input.process.or(existing.process);
        let variety = input.variety.or(existing.variety);
        let tasting_notes = input.tasting_notes.or(existing.tasting_notes);
        let supplier = input.supplier.or(existing.supplier);
        let stock = input.current_stock_g.unwrap_or(existing.current_stock_g);

        if stock < Decimal::ZERO {
            return Err(AppError::validation("current_stock_g", "Stock cannot be negative"));
        }

        let coffee = sqlx::query_as::<_, GreenCoffee>(&format!(
            "UPDATE green_coffee \
             SET name = $1, country = $2, region = $3, process = $4, variety = $5, \
                 tasting_notes = $6, supplier = $7, current_stock_g = $8, updated_at = now() \
             WHERE id = $9 \
             RETURNING {GREEN_COLUMNS}"
        ))
        .bind(&name)
        .bind(&country)
        .bind(&region)
        .bind(&process)
        .bind(&variety)
        .bind(&tasting_notes)
        .bind(&supplier)
        .bind(stock)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(coffee)
    }

    /// Create a coffee product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<CoffeeProduct> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name", "Name is required"));
        }

        if let Some(green_id) = input.green_coffee_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM green_coffee WHERE id = $1)",
            )
            .bind(green_id)
            .fetch_one(&self.db)
            .await?;

            if !exists {
                return Err(AppError::NotFound("Green coffee".to_string()));
            }
        }

        let product = sqlx::query_as::<_, CoffeeProduct>(&format!(
            "INSERT INTO coffee_products (name, green_coffee_id, roast_level, description) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.green_coffee_id)
        .bind(input.roast_level.code())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    /// Get a coffee product by ID
    pub async fn get_product(&self, id: Uuid) -> AppResult<CoffeeProduct> {
        let product = sqlx::query_as::<_, CoffeeProduct>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM coffee_products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Coffee product".to_string()))?;

        Ok(product)
    }

    /// List coffee products
    pub async fn list_products(&self, active_only: bool) -> AppResult<Vec<CoffeeProduct>> {
        let query = if active_only {
            format!(
                "SELECT {PRODUCT_COLUMNS} FROM coffee_products WHERE is_active = true ORDER BY name"
            )
        } else {
            format!("SELECT {PRODUCT_COLUMNS} FROM coffee_products ORDER BY name")
        };

        let products = sqlx::query_as::<_, CoffeeProduct>(&query)
            .fetch_all(&self.db)
            .await?;

        Ok(products)
    }

    /// Update a coffee product
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<CoffeeProduct> {
        let existing = self.get_product(id).await?;

        let name = input.name.unwrap_or(existing.name);
        let green_coffee_id = input.green_coffee_id.or(existing.green_coffee_id);
        let roast_level = input
            .roast_level
            .map(|l| l.code().to_string())
            .unwrap_or(existing.roast_level);
        let description = input.description.or(existing.description);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let product = sqlx::query_as::<_, CoffeeProduct>(&format!(
            "UPDATE coffee_products \
             SET name = $1, green_coffee_id = $2, roast_level = $3, description = $4, \
                 is_active = $5 \
             WHERE id = $6 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&name)
        .bind(green_coffee_id)
        .bind(&roast_level)
        .bind(&description)
        .bind(is_active)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    /// Deactivate a product (soft delete; ledger rows keep referencing it)
    pub async fn deactivate_product(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE coffee_products SET is_active = false WHERE id = $1",
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Coffee product".to_string()));
        }

        Ok(())
    }
}
