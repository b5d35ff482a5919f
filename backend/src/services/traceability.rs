//! Traceability queries: walk the ledger graph from any lot
//!
//! Forward: roast lot → originating green coffee and every production run
//! that drew from the batch. Backward: production lot → its source roast
//! batches and their green origins. Pure reads over the provenance rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Traceability service for lot provenance lookups
#[derive(Clone)]
pub struct TraceabilityService {
    db: PgPool,
}

/// Forward trace of a roast lot
#[derive(Debug, Serialize)]
pub struct LotTrace {
    pub roast_batch: TracedRoastBatch,
    pub product: TracedProduct,
    pub green_coffee: Option<TracedGreenCoffee>,
    pub productions: Vec<TracedProductionUse>,
}

/// Roast batch slice of a trace
#[derive(Debug, Serialize, FromRow)]
pub struct TracedRoastBatch {
    pub id: Uuid,
    pub lot_number: String,
    pub roast_date: NaiveDate,
    pub roast_level: String,
    pub green_weight_g: Decimal,
    pub roasted_weight_g: Decimal,
    pub available_weight_g: Decimal,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TracedProduct {
    pub id: Uuid,
    pub name: String,
    pub roast_level: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TracedGreenCoffee {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub process: Option<String>,
    pub variety: Option<String>,
}

/// A production run that consumed part of a roast batch
#[derive(Debug, Serialize, FromRow)]
pub struct TracedProductionUse {
    pub production_batch_id: Uuid,
    pub production_lot: String,
    pub production_type: String,
    pub production_date: NaiveDate,
    pub weight_used_g: Decimal,
}

/// Backward trace of a production lot.
///
/// Whole-bean style runs reuse the roast lot verbatim, so one lot string
/// may cover several packaging runs; each run is reported separately.
#[derive(Debug, Serialize)]
pub struct ProductionTrace {
    pub production_lot: String,
    pub runs: Vec<ProductionRun>,
}

#[derive(Debug, Serialize)]
pub struct ProductionRun {
    pub production_batch_id: Uuid,
    pub production_type: String,
    pub production_date: NaiveDate,
    pub quantity: i32,
    pub total_coffee_used_g: Decimal,
    pub sources: Vec<TracedSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advent_days: Option<Vec<TracedAdventDay>>,
}

/// One source roast batch of a production run, with its green origin
#[derive(Debug, Serialize, FromRow)]
pub struct TracedSource {
    pub roast_batch_id: Uuid,
    pub lot_number: String,
    pub roast_date: NaiveDate,
    pub roast_level: String,
    pub weight_used_g: Decimal,
    pub product_name: String,
    pub green_coffee_name: Option<String>,
    pub green_coffee_country: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TracedAdventDay {
    pub day_number: i32,
    pub lot_number: String,
    pub weight_g: Decimal,
}

impl TraceabilityService {
    /// Create a new TraceabilityService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Forward trace: where a roast lot came from and where it went.
    pub async fn trace_lot(&self, lot_code: &str) -> AppResult<LotTrace> {
        let roast_batch = sqlx::query_as::<_, TracedRoastBatch>(
            "SELECT id, lot_number, roast_date, roast_level, green_weight_g, \
                    roasted_weight_g, available_weight_g \
             FROM roast_batches WHERE lot_number = $1",
        )
        .bind(lot_code)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Roast batch".to_string()))?;

        let product = sqlx::query_as::<_, TracedProduct>(
            "SELECT cp.id, cp.name, cp.roast_level \
             FROM coffee_products cp \
             JOIN roast_batches rb ON rb.product_id = cp.id \
             WHERE rb.id = $1",
        )
        .bind(roast_batch.id)
        .fetch_one(&self.db)
        .await?;

        let green_coffee = sqlx::query_as::<_, TracedGreenCoffee>(
            "SELECT gc.id, gc.name, gc.country, gc.region, gc.process, gc.variety \
             FROM green_coffee gc \
             JOIN coffee_products cp ON cp.green_coffee_id = gc.id \
             WHERE cp.id = $1",
        )
        .bind(product.id)
        .fetch_optional(&self.db)
        .await?;

        let productions = sqlx::query_as::<_, TracedProductionUse>(
            "SELECT pb.id AS production_batch_id, pb.production_lot, pb.production_type, \
                    pb.production_date, ps.weight_used_g \
             FROM production_sources ps \
             JOIN production_batches pb ON pb.id = ps.production_batch_id \
             WHERE ps.roast_batch_id = $1 \
             ORDER BY pb.production_date, pb.created_at",
        )
        .bind(roast_batch.id)
        .fetch_all(&self.db)
        .await?;

        Ok(LotTrace {
            roast_batch,
            product,
            green_coffee,
            productions,
        })
    }

    /// Backward trace: which roast batches fed a production lot.
    pub async fn trace_production(&self, production_lot: &str) -> AppResult<ProductionTrace> {
        let batches: Vec<(Uuid, String, NaiveDate, i32, Decimal)> = sqlx::query_as(
            "SELECT id, production_type, production_date, quantity, total_coffee_used_g \
             FROM production_batches \
             WHERE production_lot = $1 \
             ORDER BY created_at",
        )
        .bind(production_lot)
        .fetch_all(&self.db)
        .await?;

        if batches.is_empty() {
            return Err(AppError::NotFound("Production batch".to_string()));
        }

        let mut runs = Vec::with_capacity(batches.len());
        for (id, production_type, production_date, quantity, total_coffee_used_g) in batches {
            let sources = self.run_sources(id).await?;
            let advent_days = if production_type == "advent" {
                Some(self.run_advent_days(production_lot).await?)
            } else {
                None
            };

            runs.push(ProductionRun {
                production_batch_id: id,
                production_type,
                production_date,
                quantity,
                total_coffee_used_g,
                sources,
                advent_days,
            });
        }

        Ok(ProductionTrace {
            production_lot: production_lot.to_string(),
            runs,
        })
    }

    async fn run_sources(&self, production_batch_id: Uuid) -> AppResult<Vec<TracedSource>> {
        let sources = sqlx::query_as::<_, TracedSource>(
            "SELECT ps.roast_batch_id, rb.lot_number, rb.roast_date, rb.roast_level, \
                    ps.weight_used_g, cp.name AS product_name, \
                    gc.name AS green_coffee_name, gc.country AS green_coffee_country \
             FROM production_sources ps \
             JOIN roast_batches rb ON rb.id = ps.roast_batch_id \
             JOIN coffee_products cp ON cp.id = rb.product_id \
             LEFT JOIN green_coffee gc ON gc.id = cp.green_coffee_id \
             WHERE ps.production_batch_id = $1 \
             ORDER BY ps.source_order",
        )
        .bind(production_batch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(sources)
    }

    async fn run_advent_days(&self, advent_lot: &str) -> AppResult<Vec<TracedAdventDay>> {
        let days = sqlx::query_as::<_, TracedAdventDay>(
            "SELECT ac.day_number, rb.lot_number, ac.weight_g \
             FROM advent_contents ac \
             JOIN roast_batches rb ON rb.id = ac.roast_batch_id \
             WHERE ac.advent_lot = $1 \
             ORDER BY ac.day_number",
        )
        .bind(advent_lot)
        .fetch_all(&self.db)
        .await?;

        Ok(days)
    }
}
