use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time market state for a token, pushed by a collaborator. Only the
/// latest snapshot per token is retained by the evaluator; archival belongs
/// to an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub token: String,
    pub liquidity_usd: Decimal,
    /// Trailing trade volume in USD.
    pub volume_usd: Decimal,
    pub holder_count: i64,
    /// Holder growth rate in percent per hour.
    pub holder_growth_rate: Decimal,
    pub trending: bool,
    pub timestamp: DateTime<Utc>,
}
