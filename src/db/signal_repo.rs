use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Signal, SignalEvidence, SignalStatus, SignalTier};

#[derive(Debug, FromRow)]
struct SignalRow {
    id: Uuid,
    token: String,
    tier: String,
    confidence: Decimal,
    reference_price: Decimal,
    status: String,
    evidence: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SignalRow> for Signal {
    type Error = EngineError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let tier = SignalTier::from_str(&row.tier)
            .ok_or_else(|| EngineError::Validation(format!("unknown tier {:?}", row.tier)))?;
        let status = SignalStatus::from_str(&row.status)
            .ok_or_else(|| EngineError::Validation(format!("unknown status {:?}", row.status)))?;
        let evidence: SignalEvidence = serde_json::from_str(&row.evidence)
            .map_err(|e| EngineError::Validation(format!("corrupt evidence blob: {e}")))?;

        Ok(Signal {
            id: row.id,
            token: row.token,
            tier,
            confidence: row.confidence,
            reference_price: row.reference_price,
            status,
            evidence,
            created_at: row.created_at,
        })
    }
}

/// Persist a newly accepted signal.
pub async fn insert_signal(pool: &PgPool, signal: &Signal) -> Result<(), EngineError> {
    let evidence = serde_json::to_string(&signal.evidence)
        .map_err(|e| EngineError::Validation(format!("evidence serialization: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO signals (id, token, tier, confidence, reference_price, status, evidence, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(signal.id)
    .bind(&signal.token)
    .bind(signal.tier.as_str())
    .bind(signal.confidence)
    .bind(signal.reference_price)
    .bind(signal.status.as_str())
    .bind(evidence)
    .bind(signal.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Transition a signal to EXPIRED.
pub async fn mark_expired(pool: &PgPool, signal_id: Uuid) -> Result<(), EngineError> {
    sqlx::query("UPDATE signals SET status = 'EXPIRED' WHERE id = $1")
        .bind(signal_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Load all ACTIVE signals for crash-consistent resume.
pub async fn load_active(pool: &PgPool) -> Result<Vec<Signal>, EngineError> {
    let rows = sqlx::query_as::<_, SignalRow>(
        "SELECT id, token, tier, confidence, reference_price, status, evidence, created_at
         FROM signals WHERE status = 'ACTIVE' ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Signal::try_from).collect()
}
