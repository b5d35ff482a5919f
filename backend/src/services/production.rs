//! Production allocation engine: converts roasted coffee into packaged runs
//!
//! An allocation may draw partial weight from several roast batches (advent
//! calendars, blended packaging runs). The whole call is one transaction:
//! every source reservation succeeds or the allocation fails with no
//! visible effect.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::lot::{lot_from_category, ProductionType, RoastLevel};
use shared::validation::{validate_advent_days, validate_positive_quantity, validate_sized_total};

use crate::error::{AppError, AppResult};
use crate::services::lot::LotSequencer;
use crate::services::roast::RoastService;

/// Production service managing packaging runs and their provenance
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

/// Production batch record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductionBatch {
    pub id: Uuid,
    pub production_lot: String,
    pub production_type: String,
    pub package_size_g: Option<i32>,
    pub quantity: i32,
    pub total_coffee_used_g: Decimal,
    pub production_date: NaiveDate,
    pub produced_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One source line of an allocation, in caller-supplied order
#[derive(Debug, Clone, Deserialize)]
pub struct ProductionSourceInput {
    pub roast_batch_id: Uuid,
    pub weight_g: Decimal,
    /// Advent calendar day this source fills (advent runs only)
    pub advent_day: Option<i32>,
}

/// Input for allocating a production run
#[derive(Debug, Deserialize)]
pub struct AllocateProductionInput {
    pub production_type: ProductionType,
    pub quantity: i32,
    pub production_date: NaiveDate,
    /// Ordered source list; the engine preserves the caller's order and
    /// never picks batches itself.
    pub sources: Vec<ProductionSourceInput>,
    pub produced_by: Option<String>,
    pub notes: Option<String>,
}

/// Provenance line of a production batch
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductionSource {
    pub roast_batch_id: Uuid,
    pub lot_number: String,
    pub weight_used_g: Decimal,
    pub source_order: i32,
}

/// Advent calendar day content
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdventContent {
    pub day_number: i32,
    pub roast_batch_id: Uuid,
    pub lot_number: String,
    pub weight_g: Decimal,
}

/// Production batch with its provenance
#[derive(Debug, Clone, Serialize)]
pub struct ProductionBatchDetail {
    #[serde(flatten)]
    pub batch: ProductionBatch,
    pub sources: Vec<ProductionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advent_days: Option<Vec<AdventContent>>,
}

/// Production listing row with aggregated source lots
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductionSummary {
    pub id: Uuid,
    pub production_lot: String,
    pub production_type: String,
    pub package_size_g: Option<i32>,
    pub quantity: i32,
    pub total_coffee_used_g: Decimal,
    pub production_date: NaiveDate,
    pub source_lots: Option<String>,
}

const PRODUCTION_COLUMNS: &str = "id, production_lot, production_type, package_size_g, quantity, \
     total_coffee_used_g, production_date, produced_by, notes, created_at";

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Allocate a production run from one or more roast batches.
    ///
    /// All-or-nothing: every reservation and every provenance row commits
    /// together, or the call fails (`InsufficientStock` when any source
    /// falls short) leaving every batch untouched.
    pub async fn allocate_production(
        &self,
        input: AllocateProductionInput,
    ) -> AppResult<ProductionBatchDetail> {
        let total_mass = Self::validate(&input)?;

        let mut tx = self.db.begin().await?;

        // The first source anchors the lot: whole-bean style runs reuse its
        // roast lot verbatim, drip lots embed its roast level.
        let first = &input.sources[0];
        let (first_lot, first_level): (String, String) = sqlx::query_as(
            "SELECT lot_number, roast_level FROM roast_batches WHERE id = $1",
        )
        .bind(first.roast_batch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Roast batch".to_string()))?;

        let production_lot = if input.production_type.reuses_roast_lot() {
            first_lot
        } else {
            let level = RoastLevel::from_code(&first_level);
            let category = input
                .production_type
                .lot_category(level)
                .ok_or_else(|| AppError::Internal("No lot category for production type".into()))?;
            let sequence =
                LotSequencer::next_sequence(&mut tx, &category, input.production_date).await?;
            lot_from_category(&category, input.production_date, sequence as u32)
        };

        // Reserve every source in caller order; the first shortfall aborts
        // the transaction and rolls back the reservations already taken.
        for source in &input.sources {
            RoastService::reserve(&mut tx, source.roast_batch_id, source.weight_g).await?;
        }

        let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
            "INSERT INTO production_batches \
                 (production_lot, production_type, package_size_g, quantity, \
                  total_coffee_used_g, production_date, produced_by, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PRODUCTION_COLUMNS}"
        ))
        .bind(&production_lot)
        .bind(input.production_type.as_str())
        .bind(input.production_type.package_size_g())
        .bind(input.quantity)
        .bind(total_mass)
        .bind(input.production_date)
        .bind(&input.produced_by)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        for (order, source) in input.sources.iter().enumerate() {
            sqlx::query(
                "INSERT INTO production_sources \
                     (production_batch_id, roast_batch_id, weight_used_g, source_order) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(batch.id)
            .bind(source.roast_batch_id)
            .bind(source.weight_g)
            .bind(order as i32)
            .execute(&mut *tx)
            .await?;
        }

        if input.production_type == ProductionType::Advent {
            let calendar_year = input.production_date.year();
            for source in &input.sources {
                // validated above: every advent source carries a day
                let day = source.advent_day.unwrap_or_default();
                sqlx::query(
                    "INSERT INTO advent_contents \
                         (advent_lot, calendar_year, day_number, roast_batch_id, weight_g) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(&production_lot)
                .bind(calendar_year)
                .bind(day)
                .bind(source.roast_batch_id)
                .bind(source.weight_g)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            "allocated production {} ({} g from {} sources)",
            batch.production_lot,
            batch.total_coffee_used_g,
            input.sources.len()
        );

        self.get_production(batch.id).await
    }

    fn validate(input: &AllocateProductionInput) -> AppResult<Decimal> {
        validate_positive_quantity(input.quantity)
            .map_err(|e| AppError::validation("quantity", e))?;

        if input.sources.is_empty() {
            return Err(AppError::validation("sources", "At least one source is required"));
        }

        let mut total = Decimal::ZERO;
        for source in &input.sources {
            if source.weight_g <= Decimal::ZERO {
                return Err(AppError::validation("sources", "Source weights must be positive"));
            }
            total += source.weight_g;
        }

        validate_sized_total(input.production_type, input.quantity, total)
            .map_err(|e| AppError::validation("sources", e))?;

        if input.production_type == ProductionType::Advent {
            let days: Vec<i32> = input
                .sources
                .iter()
                .filter_map(|s| s.advent_day)
                .collect();
            if days.len() != input.sources.len() {
                return Err(AppError::validation(
                    "sources",
                    "Every advent source must name its calendar day",
                ));
            }
            validate_advent_days(&days).map_err(|e| AppError::validation("sources", e))?;
        } else if input.sources.iter().any(|s| s.advent_day.is_some()) {
            return Err(AppError::validation(
                "sources",
                "Calendar days only apply to advent production",
            ));
        }

        if input.production_type.reuses_roast_lot() && input.sources.len() != 1 {
            return Err(AppError::validation(
                "sources",
                "This production type packages a single roast batch",
            ));
        }

        Ok(total)
    }

    /// Reverse a production run entered in error: release every source
    /// back to its roast batch and drop the provenance rows.
    pub async fn reverse_production(&self, production_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
            "SELECT {PRODUCTION_COLUMNS} FROM production_batches WHERE id = $1 FOR UPDATE"
        ))
        .bind(production_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Production batch".to_string()))?;

        let sources: Vec<(Uuid, Decimal)> = sqlx::query_as(
            "SELECT roast_batch_id, weight_used_g FROM production_sources \
             WHERE production_batch_id = $1 ORDER BY source_order",
        )
        .bind(production_id)
        .fetch_all(&mut *tx)
        .await?;

        for (roast_batch_id, weight) in &sources {
            RoastService::release(&mut tx, *roast_batch_id, *weight).await?;
        }

        if batch.production_type == ProductionType::Advent.as_str() {
            sqlx::query("DELETE FROM advent_contents WHERE advent_lot = $1")
                .bind(&batch.production_lot)
                .execute(&mut *tx)
                .await?;
        }

        // production_sources rows cascade with the batch
        sqlx::query("DELETE FROM production_batches WHERE id = $1")
            .bind(production_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("reversed production {}", batch.production_lot);
        Ok(())
    }

    /// Get a production batch with its provenance
    pub async fn get_production(&self, production_id: Uuid) -> AppResult<ProductionBatchDetail> {
        let batch = sqlx::query_as::<_, ProductionBatch>(&format!(
            "SELECT {PRODUCTION_COLUMNS} FROM production_batches WHERE id = $1"
        ))
        .bind(production_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Production batch".to_string()))?;

        let sources = sqlx::query_as::<_, ProductionSource>(
            "SELECT ps.roast_batch_id, rb.lot_number, ps.weight_used_g, ps.source_order \
             FROM production_sources ps \
             JOIN roast_batches rb ON rb.id = ps.roast_batch_id \
             WHERE ps.production_batch_id = $1 \
             ORDER BY ps.source_order",
        )
        .bind(production_id)
        .fetch_all(&self.db)
        .await?;

        let advent_days = if batch.production_type == ProductionType::Advent.as_str() {
            Some(self.advent_contents(&batch.production_lot).await?)
        } else {
            None
        };

        Ok(ProductionBatchDetail {
            batch,
            sources,
            advent_days,
        })
    }

    async fn advent_contents(&self, advent_lot: &str) -> AppResult<Vec<AdventContent>> {
        let contents = sqlx::query_as::<_, AdventContent>(
            "SELECT ac.day_number, ac.roast_batch_id, rb.lot_number, ac.weight_g \
             FROM advent_contents ac \
             JOIN roast_batches rb ON rb.id = ac.roast_batch_id \
             WHERE ac.advent_lot = $1 \
             ORDER BY ac.day_number",
        )
        .bind(advent_lot)
        .fetch_all(&self.db)
        .await?;

        Ok(contents)
    }

    /// List production runs with their aggregated source lots, newest first
    pub async fn list_productions(&self, limit: i64) -> AppResult<Vec<ProductionSummary>> {
        let productions = sqlx::query_as::<_, ProductionSummary>(
            r#"
            SELECT pb.id, pb.production_lot, pb.production_type, pb.package_size_g,
                   pb.quantity, pb.total_coffee_used_g, pb.production_date,
                   STRING_AGG(rb.lot_number, ', ' ORDER BY ps.source_order) AS source_lots
            FROM production_batches pb
            LEFT JOIN production_sources ps ON ps.production_batch_id = pb.id
            LEFT JOIN roast_batches rb ON rb.id = ps.roast_batch_id
            GROUP BY pb.id
            ORDER BY pb.production_date DESC, pb.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(productions)
    }
}
