pub mod aggregator;
pub mod market_metrics;
pub mod pattern;
pub mod trader_quality;
pub mod whale_activity;

pub use aggregator::{aggregate, tier_for, ConfidenceWeights, TierThresholds};
pub use market_metrics::MarketMetricsEvaluator;
pub use pattern::PatternAnalyzer;
pub use trader_quality::TraderQualityScorer;
pub use whale_activity::WhaleActivityDetector;

use rust_decimal::Decimal;

/// Clamp a score into the unit interval.
pub(crate) fn clamp01(v: Decimal) -> Decimal {
    v.clamp(Decimal::ZERO, Decimal::ONE)
}
