pub mod checkpoint;
pub mod signal;
pub mod snapshot;
pub mod trader;
pub mod whale;

pub use checkpoint::{CheckpointState, Horizon, PerformanceCheckpoint, PerformanceUpdate};
pub use signal::{ConfidenceInput, Signal, SignalEvidence, SignalStatus, SignalTier};
pub use snapshot::MarketSnapshot;
pub use trader::TraderProfile;
pub use whale::WhaleEvent;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::EngineError;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// TradeEvent — core pipeline message
// ---------------------------------------------------------------------------

/// A normalized on-chain transaction pushed by an upstream collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub wallet: String,
    pub token: String,
    pub side: Side,
    /// Transaction size in USD.
    pub size: Decimal,
    /// Token price at transaction time.
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade: wallet={} token={} side={} size={} price={}",
            &self.wallet[..8.min(self.wallet.len())],
            &self.token[..8.min(self.token.len())],
            self.side,
            self.size,
            self.price,
        )
    }
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// Events the engine emits to collaborators (notification dispatch,
/// report formatting, external analytics).
#[derive(Debug, Clone)]
pub enum EngineEvent {
    SignalEmitted(Box<Signal>),
    PerformanceUpdate(PerformanceUpdate),
    TraderOutcome { wallet: String, was_correct: bool },
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

const ID_MIN_LEN: usize = 32;
const ID_MAX_LEN: usize = 44;

fn is_base58(s: &str) -> bool {
    s.chars().all(|c| {
        c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
    })
}

fn validate_id(kind: &str, id: &str) -> Result<(), EngineError> {
    if id.len() < ID_MIN_LEN || id.len() > ID_MAX_LEN || !is_base58(id) {
        return Err(EngineError::Validation(format!(
            "malformed {kind} identifier: {id:?}"
        )));
    }
    Ok(())
}

pub fn validate_wallet_id(wallet: &str) -> Result<(), EngineError> {
    validate_id("wallet", wallet)
}

pub fn validate_token_id(token: &str) -> Result<(), EngineError> {
    validate_id("token", token)
}
