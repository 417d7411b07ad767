use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;

use super::clamp01;
use crate::config::AppConfig;
use crate::errors::EngineError;
use crate::models::{self, MarketSnapshot};

/// Derives a liquidity/holder health score from the latest pushed snapshot
/// per token. Older snapshots are superseded, never archived here.
pub struct MarketMetricsEvaluator {
    snapshots: RwLock<HashMap<String, MarketSnapshot>>,
    liquidity_threshold: Decimal,
    growth_ceiling: Decimal,
    liquidity_weight: Decimal,
    growth_weight: Decimal,
    trending_boost: Decimal,
}

impl MarketMetricsEvaluator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            liquidity_threshold: config.liquidity_healthy_threshold,
            growth_ceiling: config.holder_growth_ceiling,
            liquidity_weight: config.liquidity_weight,
            growth_weight: config.holder_growth_weight,
            trending_boost: config.trending_boost,
        }
    }

    /// Replace the stored snapshot for a token.
    pub fn update(&self, snapshot: MarketSnapshot) -> Result<(), EngineError> {
        models::validate_token_id(&snapshot.token)?;
        let mut snapshots = self.snapshots.write().expect("snapshot lock poisoned");
        snapshots.insert(snapshot.token.clone(), snapshot);
        Ok(())
    }

    pub fn snapshot(&self, token: &str) -> Option<MarketSnapshot> {
        let snapshots = self.snapshots.read().expect("snapshot lock poisoned");
        snapshots.get(token).cloned()
    }

    /// Health score in [0, 1]: soft-clamped liquidity, normalized holder
    /// growth, and a trending boost. Never-seen tokens get a neutral 0.5 —
    /// a valid condition, not an error.
    pub fn health(&self, token: &str) -> Decimal {
        let Some(snapshot) = self.snapshot(token) else {
            return Decimal::new(5, 1);
        };

        let liquidity_factor = if self.liquidity_threshold > Decimal::ZERO {
            clamp01(snapshot.liquidity_usd / self.liquidity_threshold)
        } else {
            Decimal::ONE
        };

        let growth_factor = if self.growth_ceiling > Decimal::ZERO {
            clamp01(snapshot.holder_growth_rate / self.growth_ceiling)
        } else {
            Decimal::ZERO
        };

        let boost = if snapshot.trending {
            self.trending_boost
        } else {
            Decimal::ZERO
        };

        clamp01(
            self.liquidity_weight * liquidity_factor + self.growth_weight * growth_factor + boost,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
