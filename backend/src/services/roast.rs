//! Roast batch ledger: the source-of-truth record of roasted coffee
//!
//! Each batch carries a deterministic lot code and an available-weight
//! counter. Only the reserve/release pair (called from the production
//! allocation transaction) and audited manual adjustments may move that
//! counter.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::lot::{roast_lot, RoastLevel};
use shared::validation::validate_positive_mass;

use crate::error::{AppError, AppResult};
use crate::services::lot::LotSequencer;

/// Roast service managing the roasted-coffee ledger
#[derive(Clone)]
pub struct RoastService {
    db: PgPool,
}

/// Roast batch record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoastBatch {
    pub id: Uuid,
    pub lot_number: String,
    pub product_id: Uuid,
    pub roast_date: NaiveDate,
    pub roast_level: String,
    pub day_sequence: i32,
    pub green_weight_g: Decimal,
    pub roasted_weight_g: Decimal,
    pub available_weight_g: Decimal,
    pub weight_loss_percent: Option<Decimal>,
    pub roasttime_uid: Option<String>,
    pub preheat_temp: Option<Decimal>,
    pub charge_temp: Option<Decimal>,
    pub first_crack_time: Option<i32>,
    pub first_crack_temp: Option<Decimal>,
    pub drop_temp: Option<Decimal>,
    pub total_roast_time: Option<i32>,
    pub ambient_temp: Option<Decimal>,
    pub humidity: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

const BATCH_COLUMNS: &str = "id, lot_number, product_id, roast_date, roast_level, day_sequence, \
     green_weight_g, roasted_weight_g, available_weight_g, weight_loss_percent, \
     roasttime_uid, preheat_temp, charge_temp, first_crack_time, first_crack_temp, \
     drop_temp, total_roast_time, ambient_temp, humidity, notes, created_at";

/// Input for entering a roast batch
#[derive(Debug, Deserialize)]
pub struct CreateRoastBatchInput {
    pub product_id: Uuid,
    pub roast_level: RoastLevel,
    pub roast_date: NaiveDate,
    pub green_weight_g: Decimal,
    pub roasted_weight_g: Decimal,
    /// Explicit day sequence for retroactive entries
    pub custom_sequence: Option<i64>,
    pub roasttime_uid: Option<String>,
    pub preheat_temp: Option<Decimal>,
    pub charge_temp: Option<Decimal>,
    pub first_crack_time: Option<i32>,
    pub first_crack_temp: Option<Decimal>,
    pub drop_temp: Option<Decimal>,
    pub total_roast_time: Option<i32>,
    pub ambient_temp: Option<Decimal>,
    pub humidity: Option<Decimal>,
    pub notes: Option<String>,
}

/// Roast batch with product context for listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoastBatchSummary {
    pub id: Uuid,
    pub lot_number: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub country: Option<String>,
    pub roast_date: NaiveDate,
    pub roast_level: String,
    pub roasted_weight_g: Decimal,
    pub available_weight_g: Decimal,
}

/// Per-product availability below the low-stock threshold
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LowStockProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub roast_level: String,
    pub country: Option<String>,
    pub total_available_g: Decimal,
}

/// Manual adjustment kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Add,
    Subtract,
    Set,
    Correction,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Add => "add",
            AdjustmentType::Subtract => "subtract",
            AdjustmentType::Set => "set",
            AdjustmentType::Correction => "correction",
        }
    }
}

/// Input for a manual inventory adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustInventoryInput {
    pub product_id: Uuid,
    /// Adjust one specific batch instead of the product total
    pub batch_id: Option<Uuid>,
    pub adjustment_type: AdjustmentType,
    pub amount_g: Decimal,
    /// Mandatory: every manual change carries an audit comment
    pub comment: String,
}

/// Outcome of a manual inventory adjustment
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentOutcome {
    pub adjustment_id: Uuid,
    pub previous_total_g: Decimal,
    pub new_total_g: Decimal,
}

/// Audit record of a manual adjustment
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryAdjustment {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub adjustment_type: String,
    pub amount_g: Decimal,
    pub previous_total_g: Decimal,
    pub new_total_g: Decimal,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Preview of the lot code a roast entry would receive
#[derive(Debug, Clone, Serialize)]
pub struct LotPreview {
    pub lot_number: String,
    pub next_sequence: i64,
    pub reuses_existing: bool,
}

impl RoastService {
    /// Create a new RoastService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Enter a roast batch.
    ///
    /// Same product + same roast level + same calendar day merge into the
    /// existing batch and return its lot code; only a genuinely new roast
    /// allocates the next day sequence. The whole operation (sequence
    /// allocation, green stock decrement, insert) is one transaction.
    pub async fn create_roast_batch(&self, input: CreateRoastBatchInput) -> AppResult<RoastBatch> {
        validate_positive_mass(input.green_weight_g)
            .map_err(|e| AppError::validation("green_weight_g", e))?;
        validate_positive_mass(input.roasted_weight_g)
            .map_err(|e| AppError::validation("roasted_weight_g", e))?;
        if input.roasted_weight_g >= input.green_weight_g {
            return Err(AppError::validation(
                "roasted_weight_g",
                "Roasted weight must be less than green weight",
            ));
        }
        if let Some(seq) = input.custom_sequence {
            if seq < 1 {
                return Err(AppError::validation(
                    "custom_sequence",
                    "Sequence must be at least 1",
                ));
            }
        }

        let mut retried = false;
        loop {
            match self.try_create_roast_batch(&input).await {
                Err(AppError::DuplicateLotConflict(lot))
                    if !retried && input.custom_sequence.is_none() =>
                {
                    // lost a sequence race; re-read the counter and try again
                    tracing::warn!("lot {} raced with a concurrent roast entry, retrying", lot);
                    retried = true;
                }
                other => return other,
            }
        }
    }

    async fn try_create_roast_batch(&self, input: &CreateRoastBatchInput) -> AppResult<RoastBatch> {
        let mut tx = self.db.begin().await?;

        // Lookup-before-insert: an existing batch for this
        // (product, level, day) key owns the lot code.
        let existing = sqlx::query_as::<_, RoastBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM roast_batches \
             WHERE product_id = $1 AND roast_level = $2 AND roast_date = $3 \
               AND lot_number NOT LIKE 'ADJ-%' \
             FOR UPDATE"
        ))
        .bind(input.product_id)
        .bind(input.roast_level.code())
        .bind(input.roast_date)
        .fetch_optional(&mut *tx)
        .await?;

        let batch = if let Some(batch) = existing {
            Self::consume_green_stock(&mut tx, input.product_id, input.green_weight_g).await?;

            let merged = sqlx::query_as::<_, RoastBatch>(&format!(
                "UPDATE roast_batches \
                 SET green_weight_g = green_weight_g + $1, \
                     roasted_weight_g = roasted_weight_g + $2, \
                     available_weight_g = available_weight_g + $2, \
                     weight_loss_percent = ((green_weight_g + $1) - (roasted_weight_g + $2)) \
                         / (green_weight_g + $1) * 100 \
                 WHERE id = $3 \
                 RETURNING {BATCH_COLUMNS}"
            ))
            .bind(input.green_weight_g)
            .bind(input.roasted_weight_g)
            .bind(batch.id)
            .fetch_one(&mut *tx)
            .await?;

            tracing::info!("merged roast entry into existing batch {}", merged.lot_number);
            merged
        } else {
            let category = input.roast_level.code();
            let sequence = match input.custom_sequence {
                Some(seq) => {
                    LotSequencer::reserve_custom_sequence(&mut tx, category, input.roast_date, seq)
                        .await?;
                    seq
                }
                None => {
                    LotSequencer::next_sequence(&mut tx, category, input.roast_date).await?
                }
            };
            let lot_number = roast_lot(input.roast_level, input.roast_date, sequence as u32);

            Self::consume_green_stock(&mut tx, input.product_id, input.green_weight_g).await?;

            let weight_loss =
                calculate_weight_loss(input.green_weight_g, input.roasted_weight_g);

            let inserted = sqlx::query_as::<_, RoastBatch>(&format!(
                "INSERT INTO roast_batches ( \
                     lot_number, product_id, roast_date, roast_level, day_sequence, \
                     green_weight_g, roasted_weight_g, available_weight_g, weight_loss_percent, \
                     roasttime_uid, preheat_temp, charge_temp, first_crack_time, first_crack_temp, \
                     drop_temp, total_roast_time, ambient_temp, humidity, notes \
                 ) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
                 RETURNING {BATCH_COLUMNS}"
            ))
            .bind(&lot_number)
            .bind(input.product_id)
            .bind(input.roast_date)
            .bind(input.roast_level.code())
            .bind(sequence as i32)
            .bind(input.green_weight_g)
            .bind(input.roasted_weight_g)
            .bind(weight_loss)
            .bind(&input.roasttime_uid)
            .bind(input.preheat_temp)
            .bind(input.charge_temp)
            .bind(input.first_crack_time)
            .bind(input.first_crack_temp)
            .bind(input.drop_temp)
            .bind(input.total_roast_time)
            .bind(input.ambient_temp)
            .bind(input.humidity)
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::DuplicateLotConflict(lot_number.clone())
                } else {
                    e.into()
                }
            })?;

            tracing::info!("created roast batch {}", inserted.lot_number);
            inserted
        };

        tx.commit().await?;
        Ok(batch)
    }

    /// Decrement the product's green coffee stock by the charged mass.
    /// Products without a linked green coffee skip the ledger.
    async fn consume_green_stock(
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
        green_mass_g: Decimal,
    ) -> AppResult<()> {
        let green_coffee_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT green_coffee_id FROM coffee_products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Coffee product".to_string()))?;

        let Some(green_id) = green_coffee_id else {
            return Ok(());
        };

        let result = sqlx::query(
            "UPDATE green_coffee \
             SET current_stock_g = current_stock_g - $1, updated_at = now() \
             WHERE id = $2 AND current_stock_g >= $1",
        )
        .bind(green_mass_g)
        .bind(green_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InsufficientStock(format!(
                "Green coffee stock is below the requested {} g",
                green_mass_g
            )));
        }

        Ok(())
    }

    /// Reserve mass from a batch inside the caller's transaction.
    ///
    /// The only mutator of available weight on the allocation path; the
    /// guarded update makes check-and-decrement a single atomic statement.
    pub async fn reserve(
        tx: &mut Transaction<'_, Postgres>,
        batch_id: Uuid,
        mass_g: Decimal,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE roast_batches \
             SET available_weight_g = available_weight_g - $1 \
             WHERE id = $2 AND available_weight_g >= $1",
        )
        .bind(mass_g)
        .bind(batch_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let state: Option<(String, Decimal)> = sqlx::query_as(
                "SELECT lot_number, available_weight_g FROM roast_batches WHERE id = $1",
            )
            .bind(batch_id)
            .fetch_optional(&mut **tx)
            .await?;

            return Err(match state {
                Some((lot, available)) => AppError::InsufficientStock(format!(
                    "Batch {} has {} g available, {} g requested",
                    lot, available, mass_g
                )),
                None => AppError::NotFound("Roast batch".to_string()),
            });
        }

        Ok(())
    }

    /// Return previously reserved mass to a batch (reversed production).
    /// Never pushes availability above the roasted weight.
    pub async fn release(
        tx: &mut Transaction<'_, Postgres>,
        batch_id: Uuid,
        mass_g: Decimal,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE roast_batches \
             SET available_weight_g = available_weight_g + $1 \
             WHERE id = $2 AND available_weight_g + $1 <= roasted_weight_g",
        )
        .bind(mass_g)
        .bind(batch_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let state: Option<(String, Decimal, Decimal)> = sqlx::query_as(
                "SELECT lot_number, available_weight_g, roasted_weight_g \
                 FROM roast_batches WHERE id = $1",
            )
            .bind(batch_id)
            .fetch_optional(&mut **tx)
            .await?;

            return Err(match state {
                Some((lot, available, roasted)) => AppError::OverRestoration(format!(
                    "Releasing {} g to batch {} would exceed its roasted weight \
                     ({} g available of {} g)",
                    mass_g, lot, available, roasted
                )),
                None => AppError::NotFound("Roast batch".to_string()),
            });
        }

        Ok(())
    }

    /// Get a roast batch by ID
    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<RoastBatch> {
        let batch = sqlx::query_as::<_, RoastBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM roast_batches WHERE id = $1"
        ))
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Roast batch".to_string()))?;

        Ok(batch)
    }

    /// Get a roast batch by its lot number
    pub async fn get_batch_by_lot(&self, lot_number: &str) -> AppResult<RoastBatch> {
        let batch = sqlx::query_as::<_, RoastBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM roast_batches WHERE lot_number = $1"
        ))
        .bind(lot_number)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Roast batch".to_string()))?;

        Ok(batch)
    }

    /// Latest committed available weight for a batch
    pub async fn available_weight(&self, batch_id: Uuid) -> AppResult<Decimal> {
        let available: Option<Decimal> = sqlx::query_scalar(
            "SELECT available_weight_g FROM roast_batches WHERE id = $1",
        )
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?;

        available.ok_or_else(|| AppError::NotFound("Roast batch".to_string()))
    }

    /// List roast batches with product context, newest roast first
    pub async fn list_batches(&self, in_stock_only: bool) -> AppResult<Vec<RoastBatchSummary>> {
        let base = "SELECT rb.id, rb.lot_number, rb.product_id, cp.name AS product_name, \
                    gc.country, rb.roast_date, rb.roast_level, rb.roasted_weight_g, \
                    rb.available_weight_g \
                    FROM roast_batches rb \
                    JOIN coffee_products cp ON cp.id = rb.product_id \
                    LEFT JOIN green_coffee gc ON gc.id = cp.green_coffee_id";

        let query = if in_stock_only {
            format!(
                "{base} WHERE rb.available_weight_g > 0 ORDER BY rb.roast_date DESC, rb.created_at DESC"
            )
        } else {
            format!("{base} ORDER BY rb.roast_date DESC, rb.created_at DESC")
        };

        let batches = sqlx::query_as::<_, RoastBatchSummary>(&query)
            .fetch_all(&self.db)
            .await?;

        Ok(batches)
    }

    /// Active products whose total available weight is below the threshold
    pub async fn low_stock_products(
        &self,
        threshold_g: Decimal,
    ) -> AppResult<Vec<LowStockProduct>> {
        let products = sqlx::query_as::<_, LowStockProduct>(
            r#"
            SELECT cp.id AS product_id, cp.name AS product_name, cp.roast_level, gc.country,
                   COALESCE(SUM(rb.available_weight_g), 0) AS total_available_g
            FROM coffee_products cp
            LEFT JOIN green_coffee gc ON gc.id = cp.green_coffee_id
            LEFT JOIN roast_batches rb ON rb.product_id = cp.id
            WHERE cp.is_active = true
            GROUP BY cp.id, cp.name, cp.roast_level, gc.country
            HAVING COALESCE(SUM(rb.available_weight_g), 0) < $1
            ORDER BY COALESCE(SUM(rb.available_weight_g), 0) ASC
            "#,
        )
        .bind(threshold_g)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Preview the lot code a roast entry would receive, without allocating.
    pub async fn preview_lot(
        &self,
        product_id: Uuid,
        level: RoastLevel,
        date: NaiveDate,
    ) -> AppResult<LotPreview> {
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT lot_number FROM roast_batches \
             WHERE product_id = $1 AND roast_level = $2 AND roast_date = $3 \
               AND lot_number NOT LIKE 'ADJ-%'",
        )
        .bind(product_id)
        .bind(level.code())
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        let next_sequence = LotSequencer::peek_sequence(&self.db, level.code(), date).await?;

        Ok(match existing {
            Some(lot_number) => LotPreview {
                lot_number,
                next_sequence,
                reuses_existing: true,
            },
            None => LotPreview {
                lot_number: roast_lot(level, date, next_sequence as u32),
                next_sequence,
                reuses_existing: false,
            },
        })
    }
}

impl RoastService {
    /// Manually adjust availability with a mandatory audit comment.
    ///
    /// Product-level adds go to the newest batch (or a synthesized
    /// adjustment batch), subtractions drain oldest batches first, and
    /// set/correction applies the difference to the total.
    pub async fn adjust_inventory(
        &self,
        input: AdjustInventoryInput,
    ) -> AppResult<AdjustmentOutcome> {
        if input.comment.trim().is_empty() {
            return Err(AppError::validation(
                "comment",
                "Comment is required for the audit trail",
            ));
        }
        if input.amount_g < Decimal::ZERO
            || (input.amount_g == Decimal::ZERO
                && matches!(input.adjustment_type, AdjustmentType::Add | AdjustmentType::Subtract))
        {
            return Err(AppError::validation("amount_g", "Amount must be positive"));
        }

        let mut tx = self.db.begin().await?;

        // Lock every batch of the product so the totals stay consistent
        // while we redistribute.
        let batches: Vec<(Uuid, Decimal, Decimal)> = sqlx::query_as(
            "SELECT id, available_weight_g, roasted_weight_g FROM roast_batches \
             WHERE product_id = $1 ORDER BY roast_date ASC, created_at ASC \
             FOR UPDATE",
        )
        .bind(input.product_id)
        .fetch_all(&mut *tx)
        .await?;

        let product_level: String = sqlx::query_scalar(
            "SELECT roast_level FROM coffee_products WHERE id = $1",
        )
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Coffee product".to_string()))?;

        let previous_total: Decimal = batches.iter().map(|(_, avail, _)| *avail).sum();

        let new_total = match input.batch_id {
            Some(batch_id) => {
                Self::adjust_single_batch(&mut tx, &batches, batch_id, &input).await?;
                Self::product_total(&mut tx, input.product_id).await?
            }
            None => {
                Self::adjust_product_total(
                    &mut tx,
                    &batches,
                    &input,
                    previous_total,
                    &product_level,
                )
                .await?
            }
        };

        let adjustment_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO inventory_adjustments
                (product_id, batch_id, adjustment_type, amount_g, previous_total_g, new_total_g, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(input.product_id)
        .bind(input.batch_id)
        .bind(input.adjustment_type.as_str())
        .bind(input.amount_g)
        .bind(previous_total)
        .bind(new_total)
        .bind(input.comment.trim())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AdjustmentOutcome {
            adjustment_id,
            previous_total_g: previous_total,
            new_total_g: new_total,
        })
    }

    async fn adjust_single_batch(
        tx: &mut Transaction<'_, Postgres>,
        batches: &[(Uuid, Decimal, Decimal)],
        batch_id: Uuid,
        input: &AdjustInventoryInput,
    ) -> AppResult<()> {
        let (_, available, roasted) = batches
            .iter()
            .find(|(id, _, _)| *id == batch_id)
            .ok_or_else(|| AppError::NotFound("Roast batch".to_string()))?;

        let target = match input.adjustment_type {
            AdjustmentType::Add => *available + input.amount_g,
            AdjustmentType::Subtract => Decimal::ZERO.max(*available - input.amount_g),
            AdjustmentType::Set | AdjustmentType::Correction => input.amount_g,
        };

        if target > *roasted {
            return Err(AppError::OverRestoration(format!(
                "Adjustment would raise availability to {} g, above the batch's {} g roasted weight",
                target, roasted
            )));
        }

        sqlx::query("UPDATE roast_batches SET available_weight_g = $1 WHERE id = $2")
            .bind(target)
            .bind(batch_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn adjust_product_total(
        tx: &mut Transaction<'_, Postgres>,
        batches: &[(Uuid, Decimal, Decimal)],
        input: &AdjustInventoryInput,
        previous_total: Decimal,
        roast_level: &str,
    ) -> AppResult<Decimal> {
        match input.adjustment_type {
            AdjustmentType::Add => {
                Self::add_to_product(tx, batches, input, roast_level, input.amount_g).await?;
                Ok(previous_total + input.amount_g)
            }
            AdjustmentType::Subtract => {
                let drained = Self::drain_oldest_first(tx, batches, input.amount_g).await?;
                Ok(previous_total - drained)
            }
            AdjustmentType::Set | AdjustmentType::Correction => {
                if input.amount_g >= previous_total {
                    let surplus = input.amount_g - previous_total;
                    if surplus > Decimal::ZERO {
                        Self::add_to_product(tx, batches, input, roast_level, surplus).await?;
                    }
                } else {
                    Self::drain_oldest_first(tx, batches, previous_total - input.amount_g).await?;
                }
                Ok(input.amount_g)
            }
        }
    }

    /// Add mass to the newest batch when it can absorb it, otherwise
    /// synthesize an adjustment batch carrying the remainder.
    async fn add_to_product(
        tx: &mut Transaction<'_, Postgres>,
        batches: &[(Uuid, Decimal, Decimal)],
        input: &AdjustInventoryInput,
        roast_level: &str,
        amount_g: Decimal,
    ) -> AppResult<()> {
        if let Some((id, available, roasted)) = batches.last() {
            if *available + amount_g <= *roasted {
                sqlx::query(
                    "UPDATE roast_batches \
                     SET available_weight_g = available_weight_g + $1 WHERE id = $2",
                )
                .bind(amount_g)
                .bind(*id)
                .execute(&mut **tx)
                .await?;
                return Ok(());
            }
        }

        Self::create_adjustment_batch(tx, input, roast_level, amount_g).await
    }

    async fn drain_oldest_first(
        tx: &mut Transaction<'_, Postgres>,
        batches: &[(Uuid, Decimal, Decimal)],
        amount_g: Decimal,
    ) -> AppResult<Decimal> {
        let mut remaining = amount_g;
        for (id, available, _) in batches {
            if remaining <= Decimal::ZERO {
                break;
            }
            let take = remaining.min(*available);
            if take > Decimal::ZERO {
                sqlx::query(
                    "UPDATE roast_batches \
                     SET available_weight_g = available_weight_g - $1 WHERE id = $2",
                )
                .bind(take)
                .bind(*id)
                .execute(&mut **tx)
                .await?;
                remaining -= take;
            }
        }
        // Clamps at zero when the product held less than requested
        Ok(amount_g - remaining)
    }

    /// Synthesize a batch for stock that appeared outside the roast flow.
    /// Adjustment lots use an `ADJ-YYMMDD-n` code outside the lot grammar.
    async fn create_adjustment_batch(
        tx: &mut Transaction<'_, Postgres>,
        input: &AdjustInventoryInput,
        roast_level: &str,
        amount_g: Decimal,
    ) -> AppResult<()> {
        let today = Utc::now().date_naive();
        let prefix = format!("ADJ-{:02}{:02}{:02}", today.year() % 100, today.month(), today.day());

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roast_batches WHERE lot_number LIKE $1",
        )
        .bind(format!("{prefix}%"))
        .fetch_one(&mut **tx)
        .await?;

        let lot_number = format!("{}-{}", prefix, existing + 1);

        sqlx::query(
            r#"
            INSERT INTO roast_batches
                (lot_number, product_id, roast_date, roast_level, day_sequence,
                 green_weight_g, roasted_weight_g, available_weight_g, notes)
            VALUES ($1, $2, $3, $4, 1, $5, $5, $5, $6)
            "#,
        )
        .bind(&lot_number)
        .bind(input.product_id)
        .bind(today)
        .bind(roast_level)
        .bind(amount_g)
        .bind(format!("Manual inventory adjustment: {}", input.comment.trim()))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn product_total(
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
    ) -> AppResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(available_weight_g), 0) FROM roast_batches WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(total)
    }

    /// Adjustment history for a product, newest first
    pub async fn adjustment_history(
        &self,
        product_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<InventoryAdjustment>> {
        let adjustments = sqlx::query_as::<_, InventoryAdjustment>(
            r#"
            SELECT id, product_id, batch_id, adjustment_type, amount_g,
                   previous_total_g, new_total_g, comment, created_at
            FROM inventory_adjustments
            WHERE product_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(adjustments)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Calculate weight loss percentage
/// Formula: ((green_weight - roasted_weight) / green_weight) × 100
pub fn calculate_weight_loss(green_weight_g: Decimal, roasted_weight_g: Decimal) -> Decimal {
    if green_weight_g.is_zero() {
        return Decimal::ZERO;
    }
    ((green_weight_g - roasted_weight_g) / green_weight_g) * Decimal::from(100)
}
