//! Market stock ledger: per-session prepared/remaining stock at the register
//!
//! Multiple sellers operate concurrently against one session. Carts are
//! all-or-nothing: every line is validated against its remaining quantity
//! under row locks before any line is decremented, so a multi-item cart can
//! never partially oversell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Market service managing selling-event stock
#[derive(Clone)]
pub struct MarketService {
    db: PgPool,
}

/// Market session record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MarketSession {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Prepared stock of one (product, lot) in a session
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MarketSessionItem {
    pub id: Uuid,
    pub session_id: Uuid,
    pub product_id: Uuid,
    pub lot_number: String,
    pub quantity_prepared: i32,
    pub quantity_remaining: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for opening a session
#[derive(Debug, Deserialize)]
pub struct OpenSessionInput {
    pub name: String,
    /// Seed stock by copying the unsold rows of this closed session
    pub carry_from: Option<Uuid>,
}

/// Input for preparing stock
#[derive(Debug, Deserialize)]
pub struct PrepareItemInput {
    pub product_id: Uuid,
    pub lot_number: String,
    pub quantity: i32,
}

/// One cart line of a sale
#[derive(Debug, Clone, Deserialize)]
pub struct SaleLine {
    pub item_id: Uuid,
    pub quantity: i32,
}

/// Input for selling a cart
#[derive(Debug, Deserialize)]
pub struct SellInput {
    pub lines: Vec<SaleLine>,
}

/// Input for restoring stock after a cancelled receipt
#[derive(Debug, Deserialize)]
pub struct RestoreInput {
    pub item_id: Uuid,
    pub quantity: i32,
}

/// Committed result of a sale
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub session_id: Uuid,
    pub lines: Vec<ReceiptLine>,
    pub total_units: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub lot_number: String,
    pub quantity: i32,
    pub quantity_remaining: i32,
}

/// Session with its items and stock totals
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: MarketSession,
    pub items: Vec<MarketSessionItem>,
    pub total_prepared: i32,
    pub total_remaining: i32,
}

impl MarketService {
    /// Create a new MarketService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a session, optionally carrying over the unsold stock of a
    /// previous, closed session (prepared = remaining at close).
    pub async fn open_session(&self, input: OpenSessionInput) -> AppResult<MarketSession> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name", "Session name is required"));
        }

        let mut tx = self.db.begin().await?;

        let session = sqlx::query_as::<_, MarketSession>(
            "INSERT INTO market_sessions (name) VALUES ($1) \
             RETURNING id, name, created_at, closed_at",
        )
        .bind(input.name.trim())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(source_id) = input.carry_from {
            let source: MarketSession = sqlx::query_as(
                "SELECT id, name, created_at, closed_at FROM market_sessions WHERE id = $1",
            )
            .bind(source_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Market session".to_string()))?;

            if source.closed_at.is_none() {
                return Err(AppError::validation(
                    "carry_from",
                    "Stock can only be carried over from a closed session",
                ));
            }

            sqlx::query(
                "INSERT INTO market_session_items \
                     (session_id, product_id, lot_number, quantity_prepared, quantity_remaining) \
                 SELECT $1, product_id, lot_number, quantity_remaining, quantity_remaining \
                 FROM market_session_items \
                 WHERE session_id = $2 AND quantity_remaining > 0",
            )
            .bind(session.id)
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!("opened market session {} ({})", session.name, session.id);
        Ok(session)
    }

    /// Lock the session row and verify it is still open.
    async fn lock_open_session(
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
    ) -> AppResult<()> {
        let closed_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT closed_at FROM market_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(session_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Market session".to_string()))?;

        if closed_at.is_some() {
            return Err(AppError::SessionClosed);
        }

        Ok(())
    }

    /// Prepare stock of one (product, lot) for a session. A product may
    /// appear several times under different lots.
    pub async fn prepare(
        &self,
        session_id: Uuid,
        input: PrepareItemInput,
    ) -> AppResult<MarketSessionItem> {
        if input.quantity <= 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }
        if input.lot_number.trim().is_empty() {
            return Err(AppError::validation("lot_number", "Lot number is required"));
        }

        let mut tx = self.db.begin().await?;
        Self::lock_open_session(&mut tx, session_id).await?;

        let product_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM coffee_products WHERE id = $1)",
        )
        .bind(input.product_id)
        .fetch_one(&mut *tx)
        .await?;

        if !product_exists {
            return Err(AppError::NotFound("Coffee product".to_string()));
        }

        let item = sqlx::query_as::<_, MarketSessionItem>(
            "INSERT INTO market_session_items \
                 (session_id, product_id, lot_number, quantity_prepared, quantity_remaining) \
             VALUES ($1, $2, $3, $4, $4) \
             RETURNING id, session_id, product_id, lot_number, quantity_prepared, \
                       quantity_remaining, created_at",
        )
        .bind(session_id)
        .bind(input.product_id)
        .bind(input.lot_number.trim())
        .bind(input.quantity)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Sell a cart against a session.
    ///
    /// Check-then-apply inside one transaction: all cart lines are locked
    /// and validated before any quantity moves, so a shortfall on the last
    /// line leaves the first line untouched.
    pub async fn sell(&self, session_id: Uuid, input: SellInput) -> AppResult<SaleReceipt> {
        if input.lines.is_empty() {
            return Err(AppError::validation("lines", "Cart is empty"));
        }
        for line in &input.lines {
            if line.quantity <= 0 {
                return Err(AppError::validation("lines", "Line quantities must be positive"));
            }
        }

        // Fold duplicate lines per item; the map's ordering doubles as a
        // deterministic lock order across concurrent sellers.
        let mut wanted: BTreeMap<Uuid, i32> = BTreeMap::new();
        for line in &input.lines {
            *wanted.entry(line.item_id).or_insert(0) += line.quantity;
        }

        let mut tx = self.db.begin().await?;
        Self::lock_open_session(&mut tx, session_id).await?;

        // Validate every line under lock before mutating any of them
        let mut locked: Vec<(Uuid, Uuid, String, i32, i32)> = Vec::with_capacity(wanted.len());
        for (&item_id, &quantity) in &wanted {
            let item: Option<(Uuid, String, i32)> = sqlx::query_as(
                "SELECT product_id, lot_number, quantity_remaining \
                 FROM market_session_items \
                 WHERE id = $1 AND session_id = $2 \
                 FOR UPDATE",
            )
            .bind(item_id)
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?;

            let (product_id, lot_number, remaining) =
                item.ok_or_else(|| AppError::NotFound("Market session item".to_string()))?;

            if quantity > remaining {
                return Err(AppError::InsufficientStock(format!(
                    "Item {} ({}) has {} remaining, {} requested",
                    item_id, lot_number, remaining, quantity
                )));
            }

            locked.push((item_id, product_id, lot_number, quantity, remaining));
        }

        let mut lines = Vec::with_capacity(locked.len());
        let mut total_units = 0;
        for (item_id, product_id, lot_number, quantity, remaining) in locked {
            sqlx::query(
                "UPDATE market_session_items \
                 SET quantity_remaining = quantity_remaining - $1 WHERE id = $2",
            )
            .bind(quantity)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

            total_units += quantity;
            lines.push(ReceiptLine {
                item_id,
                product_id,
                lot_number,
                quantity,
                quantity_remaining: remaining - quantity,
            });
        }

        tx.commit().await?;

        Ok(SaleReceipt {
            session_id,
            lines,
            total_units,
        })
    }

    /// Reverse a cancelled receipt line. Never raises remaining above the
    /// prepared quantity; a duplicate restore is a caller bug and errors.
    pub async fn restore(&self, session_id: Uuid, input: RestoreInput) -> AppResult<MarketSessionItem> {
        if input.quantity <= 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }

        let mut tx = self.db.begin().await?;
        Self::lock_open_session(&mut tx, session_id).await?;

        let restored = sqlx::query_as::<_, MarketSessionItem>(
            "UPDATE market_session_items \
             SET quantity_remaining = quantity_remaining + $1 \
             WHERE id = $2 AND session_id = $3 \
               AND quantity_remaining + $1 <= quantity_prepared \
             RETURNING id, session_id, product_id, lot_number, quantity_prepared, \
                       quantity_remaining, created_at",
        )
        .bind(input.quantity)
        .bind(input.item_id)
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let item = match restored {
            Some(item) => item,
            None => {
                let state: Option<(i32, i32)> = sqlx::query_as(
                    "SELECT quantity_prepared, quantity_remaining \
                     FROM market_session_items WHERE id = $1 AND session_id = $2",
                )
                .bind(input.item_id)
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await?;

                return Err(match state {
                    Some((prepared, remaining)) => AppError::OverRestoration(format!(
                        "Restoring {} would exceed the prepared quantity ({} of {} remaining)",
                        input.quantity, remaining, prepared
                    )),
                    None => AppError::NotFound("Market session item".to_string()),
                });
            }
        };

        tx.commit().await?;
        Ok(item)
    }

    /// Close a session. Terminal: stock numbers freeze for reporting and
    /// every later prepare/sell/restore fails with `SessionClosed`.
    pub async fn close_session(&self, session_id: Uuid) -> AppResult<MarketSession> {
        let closed = sqlx::query_as::<_, MarketSession>(
            "UPDATE market_sessions SET closed_at = now() \
             WHERE id = $1 AND closed_at IS NULL \
             RETURNING id, name, created_at, closed_at",
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?;

        match closed {
            Some(session) => {
                tracing::info!("closed market session {} ({})", session.name, session.id);
                Ok(session)
            }
            None => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM market_sessions WHERE id = $1)",
                )
                .bind(session_id)
                .fetch_one(&self.db)
                .await?;

                Err(if exists {
                    AppError::SessionClosed
                } else {
                    AppError::NotFound("Market session".to_string())
                })
            }
        }
    }

    /// Get a session with its items and totals
    pub async fn get_session(&self, session_id: Uuid) -> AppResult<SessionDetail> {
        let session = sqlx::query_as::<_, MarketSession>(
            "SELECT id, name, created_at, closed_at FROM market_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Market session".to_string()))?;

        let items = sqlx::query_as::<_, MarketSessionItem>(
            "SELECT id, session_id, product_id, lot_number, quantity_prepared, \
                    quantity_remaining, created_at \
             FROM market_session_items \
             WHERE session_id = $1 \
             ORDER BY created_at",
        )
        .bind(session_id)
        .fetch_all(&self.db)
        .await?;

        let total_prepared = items.iter().map(|i| i.quantity_prepared).sum();
        let total_remaining = items.iter().map(|i| i.quantity_remaining).sum();

        Ok(SessionDetail {
            session,
            items,
            total_prepared,
            total_remaining,
        })
    }

    /// List sessions, newest first
    pub async fn list_sessions(&self) -> AppResult<Vec<MarketSession>> {
        let sessions = sqlx::query_as::<_, MarketSession>(
            "SELECT id, name, created_at, closed_at FROM market_sessions \
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(sessions)
    }
}
