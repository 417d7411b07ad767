use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Running reputation record for an observed wallet. Created on the first
/// observed transaction, mutated on every subsequent transaction and on every
/// checkpoint resolution that attributes credit back to the wallet. Never
/// deleted, only decayed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TraderProfile {
    pub wallet: String,
    /// Rolling accuracy score in [0, 1].
    pub score: Decimal,
    pub calls_observed: i32,
    pub updated_at: DateTime<Utc>,
}

impl TraderProfile {
    pub fn new(wallet: String, prior: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            wallet,
            score: prior,
            calls_observed: 0,
            updated_at: now,
        }
    }
}
