//! Day-sequence allocation for lot numbering
//!
//! Counters live in the `lot_sequences` table, one row per (category, date)
//! key. The category is the full lot prefix: `V`/`K`/`S` for roast lots,
//! `TG/V` style for drip, `CB` for cold brew, `AK` for advent calendars.
//! Counters survive restarts and are shared by every instance, unlike an
//! in-process counter.

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::AppResult;

/// Allocates day-sequence numbers for lot codes.
pub struct LotSequencer;

impl LotSequencer {
    /// Allocate the next sequence number for a category on a date.
    ///
    /// Must run inside the transaction that inserts the consuming batch
    /// row: the upsert takes the counter's row lock, so two concurrent
    /// allocations for the same key serialize and can neither duplicate
    /// nor skip a number, and a rolled-back insert returns its number.
    pub async fn next_sequence(
        tx: &mut Transaction<'_, Postgres>,
        category: &str,
        date: NaiveDate,
    ) -> AppResult<i64> {
        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO lot_sequences (category, seq_date, next_seq)
            VALUES ($1, $2, 2)
            ON CONFLICT (category, seq_date)
            DO UPDATE SET next_seq = lot_sequences.next_seq + 1
            RETURNING next_seq - 1
            "#,
        )
        .bind(category)
        .bind(date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(sequence)
    }

    /// Record an explicitly chosen sequence (retroactive entries) so later
    /// automatic allocations skip past it.
    pub async fn reserve_custom_sequence(
        tx: &mut Transaction<'_, Postgres>,
        category: &str,
        date: NaiveDate,
        sequence: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lot_sequences (category, seq_date, next_seq)
            VALUES ($1, $2, $3)
            ON CONFLICT (category, seq_date)
            DO UPDATE SET next_seq = GREATEST(lot_sequences.next_seq, EXCLUDED.next_seq)
            "#,
        )
        .bind(category)
        .bind(date)
        .bind(sequence + 1)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Peek at the sequence a new lot would get, without allocating.
    /// Advisory only; the authoritative number is assigned at insert time.
    pub async fn peek_sequence(db: &PgPool, category: &str, date: NaiveDate) -> AppResult<i64> {
        let next: Option<i64> = sqlx::query_scalar(
            "SELECT next_seq FROM lot_sequences WHERE category = $1 AND seq_date = $2",
        )
        .bind(category)
        .bind(date)
        .fetch_optional(db)
        .await?;

        Ok(next.unwrap_or(1))
    }
}
