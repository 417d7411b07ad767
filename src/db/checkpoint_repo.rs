use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Horizon, PerformanceCheckpoint};

#[derive(Debug, FromRow)]
struct CheckpointRow {
    signal_id: Uuid,
    horizon: String,
    due_at: DateTime<Utc>,
    resolved: bool,
    percent_change: Option<Decimal>,
    liquidity: Option<Decimal>,
    volume: Option<Decimal>,
    whale_activity: Option<Decimal>,
    holder_growth: Option<Decimal>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<CheckpointRow> for PerformanceCheckpoint {
    type Error = EngineError;

    fn try_from(row: CheckpointRow) -> Result<Self, Self::Error> {
        let horizon = Horizon::from_label(&row.horizon)
            .ok_or_else(|| EngineError::Validation(format!("unknown horizon {:?}", row.horizon)))?;

        Ok(PerformanceCheckpoint {
            signal_id: row.signal_id,
            horizon,
            due_at: row.due_at,
            resolved: row.resolved,
            percent_change: row.percent_change,
            liquidity: row.liquidity,
            volume: row.volume,
            whale_activity: row.whale_activity,
            holder_growth: row.holder_growth,
            resolved_at: row.resolved_at,
        })
    }
}

/// Persist the full checkpoint batch for a new signal.
pub async fn insert_batch(
    pool: &PgPool,
    checkpoints: &[PerformanceCheckpoint],
) -> Result<(), EngineError> {
    for cp in checkpoints {
        sqlx::query(
            r#"
            INSERT INTO performance_checkpoints (signal_id, horizon, due_at, resolved)
            VALUES ($1, $2, $3, FALSE)
            ON CONFLICT (signal_id, horizon) DO NOTHING
            "#,
        )
        .bind(cp.signal_id)
        .bind(cp.horizon.label())
        .bind(cp.due_at)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Record a checkpoint resolution. The caller only flips the in-memory
/// resolved flag after this write succeeds.
pub async fn mark_resolved(
    pool: &PgPool,
    checkpoint: &PerformanceCheckpoint,
) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        UPDATE performance_checkpoints
        SET resolved = TRUE,
            percent_change = $3,
            liquidity = $4,
            volume = $5,
            whale_activity = $6,
            holder_growth = $7,
            resolved_at = $8
        WHERE signal_id = $1 AND horizon = $2
        "#,
    )
    .bind(checkpoint.signal_id)
    .bind(checkpoint.horizon.label())
    .bind(checkpoint.percent_change)
    .bind(checkpoint.liquidity)
    .bind(checkpoint.volume)
    .bind(checkpoint.whale_activity)
    .bind(checkpoint.holder_growth)
    .bind(checkpoint.resolved_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Drop the checkpoint set once its signal has expired.
pub async fn delete_for_signal(pool: &PgPool, signal_id: Uuid) -> Result<(), EngineError> {
    sqlx::query("DELETE FROM performance_checkpoints WHERE signal_id = $1")
        .bind(signal_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Load the checkpoint set for one signal, in due order.
pub async fn load_for_signal(
    pool: &PgPool,
    signal_id: Uuid,
) -> Result<Vec<PerformanceCheckpoint>, EngineError> {
    let rows = sqlx::query_as::<_, CheckpointRow>(
        "SELECT signal_id, horizon, due_at, resolved, percent_change, liquidity, volume,
                whale_activity, holder_growth, resolved_at
         FROM performance_checkpoints WHERE signal_id = $1 ORDER BY due_at",
    )
    .bind(signal_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(PerformanceCheckpoint::try_from).collect()
}
