use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::errors::EngineError;
use crate::models::{ConfidenceInput, SignalTier};

/// Per-component confidence weights. They need not sum to 1; `aggregate`
/// normalizes by the weight sum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub trader_quality: Decimal,
    pub whale_activity: Decimal,
    pub market_health: Decimal,
    pub technical_pattern: Decimal,
}

impl ConfidenceWeights {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            trader_quality: config.trader_weight,
            whale_activity: config.whale_weight,
            market_health: config.market_weight,
            technical_pattern: config.pattern_weight,
        }
    }

    fn sum(&self) -> Decimal {
        self.trader_quality + self.whale_activity + self.market_health + self.technical_pattern
    }
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Tier cut-offs, evaluated highest-first. Non-overlapping by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierThresholds {
    pub s: Decimal,
    pub a: Decimal,
    pub b: Decimal,
    pub c: Decimal,
}

impl TierThresholds {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            s: config.tier_s_threshold,
            a: config.tier_a_threshold,
            b: config.tier_b_threshold,
            c: config.tier_c_threshold,
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Combine the four component scores into a single confidence value in [0, 1].
pub fn aggregate(
    input: &ConfidenceInput,
    weights: &ConfidenceWeights,
) -> Result<Decimal, EngineError> {
    let total = weights.sum();
    if total <= Decimal::ZERO {
        return Err(EngineError::Validation(
            "confidence weights must sum to a positive value".into(),
        ));
    }

    for (name, score) in [
        ("trader_quality", input.trader_quality),
        ("whale_activity", input.whale_activity),
        ("market_health", input.market_health),
        ("technical_pattern", input.technical_pattern),
    ] {
        if score < Decimal::ZERO || score > Decimal::ONE {
            return Err(EngineError::Validation(format!(
                "component score {name}={score} outside [0, 1]"
            )));
        }
    }

    let weighted = input.trader_quality * weights.trader_quality
        + input.whale_activity * weights.whale_activity
        + input.market_health * weights.market_health
        + input.technical_pattern * weights.technical_pattern;

    Ok(weighted / total)
}

/// Map a confidence value to its discrete tier. Total over all inputs.
pub fn tier_for(confidence: Decimal, thresholds: &TierThresholds) -> SignalTier {
    if confidence >= thresholds.s {
        SignalTier::S
    } else if confidence >= thresholds.a {
        SignalTier::A
    } else if confidence >= thresholds.b {
        SignalTier::B
    } else if confidence >= thresholds.c {
        SignalTier::C
    } else {
        SignalTier::Rejected
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn input(trader: Decimal, whale: Decimal, market: Decimal, pattern: Decimal) -> ConfidenceInput {
        ConfidenceInput {
            token: "So11111111111111111111111111111111111111112".into(),
            trader_quality: trader,
            whale_activity: whale,
            market_health: market,
            technical_pattern: pattern,
        }
    }

    #[test]
    fn test_tier_for_fixed_points() {
        let t = TierThresholds::default();
        assert_eq!(tier_for(Decimal::new(95, 2), &t), SignalTier::S);
        assert_eq!(tier_for(Decimal::new(85, 2), &t), SignalTier::A);
        assert_eq!(tier_for(Decimal::new(65, 2), &t), SignalTier::B);
        assert_eq!(tier_for(Decimal::new(35, 2), &t), SignalTier::C);
        assert_eq!(tier_for(Decimal::new(10, 2), &t), SignalTier::Rejected);
    }

    #[test]
    fn test_tier_for_is_total_at_boundaries() {
        let t = TierThresholds::default();
        assert_eq!(tier_for(Decimal::new(90, 2), &t), SignalTier::S);
        assert_eq!(tier_for(Decimal::new(80, 2), &t), SignalTier::A);
        assert_eq!(tier_for(Decimal::new(60, 2), &t), SignalTier::B);
        assert_eq!(tier_for(Decimal::new(30, 2), &t), SignalTier::C);
        assert_eq!(tier_for(Decimal::ZERO, &t), SignalTier::Rejected);
        assert_eq!(tier_for(Decimal::ONE, &t), SignalTier::S);
    }

    #[test]
    fn test_aggregate_default_weights() {
        // 0.3*0.5 + 0.3*0.7 + 0.25*0.6 + 0.15*0.4 = 0.57
        let i = input(
            Decimal::new(5, 1),
            Decimal::new(7, 1),
            Decimal::new(6, 1),
            Decimal::new(4, 1),
        );
        let c = aggregate(&i, &ConfidenceWeights::default()).unwrap();
        assert_eq!(c, Decimal::new(57, 2));
    }

    #[test]
    fn test_aggregate_normalizes_unnormalized_weights() {
        let i = input(Decimal::ONE, Decimal::ONE, Decimal::ONE, Decimal::ONE);
        let w = ConfidenceWeights {
            trader_quality: Decimal::from(3),
            whale_activity: Decimal::from(3),
            market_health: Decimal::from(2),
            technical_pattern: Decimal::from(2),
        };
        assert_eq!(aggregate(&i, &w).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_aggregate_rejects_zero_weight_sum() {
        let i = input(Decimal::ONE, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        let w = ConfidenceWeights {
            trader_quality: Decimal::ZERO,
            whale_activity: Decimal::ZERO,
            market_health: Decimal::ZERO,
            technical_pattern: Decimal::ZERO,
        };
        assert!(aggregate(&i, &w).is_err());
    }

    #[test]
    fn test_aggregate_rejects_out_of_range_component() {
        let i = input(
            Decimal::from(2),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert!(aggregate(&i, &ConfidenceWeights::default()).is_err());
    }
}
