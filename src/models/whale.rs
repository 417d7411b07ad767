use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single evaluated whale transaction. Immutable once created; referenced
/// by signal evidence and never re-used across signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhaleEvent {
    pub wallet: String,
    pub token: String,
    /// Transaction size in USD.
    pub tx_size: Decimal,
    /// Computed impact magnitude in [0, 1].
    pub magnitude: Decimal,
    pub timestamp: DateTime<Utc>,
}
