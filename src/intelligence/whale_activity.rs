use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::clamp01;
use crate::config::AppConfig;
use crate::errors::EngineError;
use crate::models::{self, WhaleEvent};

struct DetectorState {
    /// Recent transaction sizes per wallet, most recent last.
    history: HashMap<String, VecDeque<Decimal>>,
    /// Latest collapsed event per (wallet, token), for burst detection.
    burst: HashMap<(String, String), WhaleEvent>,
    /// Latest collapsed event per token, for resolution-time reads.
    latest: HashMap<String, WhaleEvent>,
}

/// Evaluates a transaction burst against a wallet's historical size and the
/// token's pool depth to produce an impact magnitude in [0, 1].
///
/// Rapid repeated events from one wallet on one token are burst-collapsed:
/// only the latest magnitude is retained, never summed, so a single economic
/// action split across several transactions is not double-counted.
pub struct WhaleActivityDetector {
    state: Mutex<DetectorState>,
    collapse_window: Duration,
    activity_window: Duration,
    history_window: usize,
    history_scale: Decimal,
    history_weight: Decimal,
    depth_weight: Decimal,
}

impl WhaleActivityDetector {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            state: Mutex::new(DetectorState {
                history: HashMap::new(),
                burst: HashMap::new(),
                latest: HashMap::new(),
            }),
            collapse_window: Duration::seconds(config.whale_collapse_window_secs as i64),
            activity_window: Duration::seconds(config.whale_activity_window_secs as i64),
            history_window: config.whale_history_window,
            history_scale: config.whale_history_scale,
            history_weight: config.whale_history_weight,
            depth_weight: config.whale_depth_weight,
        }
    }

    /// Evaluate a transaction. `liquidity` is the token's current pool depth
    /// as routed in by the caller; a shallow pool scores higher than a deep
    /// one for the same size. Unknown liquidity falls back to a neutral
    /// depth factor rather than failing.
    pub fn evaluate(
        &self,
        wallet: &str,
        token: &str,
        tx_size: Decimal,
        liquidity: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<WhaleEvent, EngineError> {
        models::validate_wallet_id(wallet)?;
        models::validate_token_id(token)?;
        if tx_size <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "transaction size must be positive, got {tx_size}"
            )));
        }

        let mut state = self.state.lock().expect("detector lock poisoned");

        let burst_key = (wallet.to_string(), token.to_string());
        let collapsed = state
            .burst
            .get(&burst_key)
            .map(|prev| now - prev.timestamp <= self.collapse_window)
            .unwrap_or(false);

        let history = state.history.entry(wallet.to_string()).or_default();
        if collapsed {
            // Same economic action split across transactions: the previous
            // partial is superseded, not accumulated.
            history.pop_back();
        }
        let avg_size = if history.is_empty() {
            tx_size
        } else {
            history.iter().copied().sum::<Decimal>() / Decimal::from(history.len() as i64)
        };
        history.push_back(tx_size);
        while history.len() > self.history_window {
            history.pop_front();
        }

        let history_factor = clamp01(tx_size / (avg_size * self.history_scale));
        let depth_factor = match liquidity {
            Some(l) if l > Decimal::ZERO => clamp01(Decimal::from(2) * tx_size / l),
            _ => Decimal::new(5, 1), // neutral when depth is unknown
        };

        let magnitude = clamp01(
            self.history_weight * history_factor + self.depth_weight * depth_factor,
        );

        let event = WhaleEvent {
            wallet: wallet.to_string(),
            token: token.to_string(),
            tx_size,
            magnitude,
            timestamp: now,
        };

        state.burst.insert(burst_key, event.clone());
        state.latest.insert(token.to_string(), event.clone());

        Ok(event)
    }

    /// Latest retained impact magnitude for a token, if recent enough to
    /// still count as activity.
    pub fn activity(&self, token: &str, now: DateTime<Utc>) -> Option<Decimal> {
        let state = self.state.lock().expect("detector lock poisoned");
        state
            .latest
            .get(token)
            .filter(|e| now - e.timestamp <= self.activity_window)
            .map(|e| e.magnitude)
    }

    #[cfg(test)]
    fn history_len(&self, wallet: &str) -> usize {
        let state = self.state.lock().expect("detector lock poisoned");
        state.history.get(wallet).map(|h| h.len()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const TOKEN: &str = "So11111111111111111111111111111111111111112";

    fn detector() -> WhaleActivityDetector {
        WhaleActivityDetector::new(&AppConfig::default())
    }

    #[test]
    fn test_first_large_tx_against_shallow_liquidity_scores_high() {
        let d = detector();
        let event = d
            .evaluate(
                WALLET,
                TOKEN,
                Decimal::from(5_000),
                Some(Decimal::from(10_000)),
                Utc::now(),
            )
            .unwrap();
        // history factor 0.2, depth factor saturated: 0.3*0.2 + 0.7*1.0 = 0.76
        assert!(event.magnitude >= Decimal::new(7, 1), "got {}", event.magnitude);
    }

    #[test]
    fn test_deep_liquidity_scores_lower_than_shallow() {
        let d = detector();
        let now = Utc::now();
        let shallow = d
            .evaluate(WALLET, TOKEN, Decimal::from(5_000), Some(Decimal::from(10_000)), now)
            .unwrap();

        let d2 = detector();
        let deep = d2
            .evaluate(WALLET, TOKEN, Decimal::from(5_000), Some(Decimal::from(1_000_000)), now)
            .unwrap();

        assert!(deep.magnitude < shallow.magnitude);
    }

    #[test]
    fn test_burst_collapses_to_latest_magnitude() {
        let d = detector();
        let start = Utc::now();
        let liquidity = Some(Decimal::from(100_000));

        d.evaluate(WALLET, TOKEN, Decimal::from(1_000), liquidity, start)
            .unwrap();
        d.evaluate(
            WALLET,
            TOKEN,
            Decimal::from(2_000),
            liquidity,
            start + Duration::seconds(10),
        )
        .unwrap();
        let last = d
            .evaluate(
                WALLET,
                TOKEN,
                Decimal::from(1_500),
                liquidity,
                start + Duration::seconds(20),
            )
            .unwrap();

        // Exactly one retained magnitude equal to the latest evaluation.
        assert_eq!(
            d.activity(TOKEN, start + Duration::seconds(20)),
            Some(last.magnitude)
        );
        // The burst collapsed into a single history entry, not three.
        assert_eq!(d.history_len(WALLET), 1);
    }

    #[test]
    fn test_events_outside_collapse_window_accumulate_history() {
        let d = detector();
        let start = Utc::now();
        d.evaluate(WALLET, TOKEN, Decimal::from(1_000), None, start)
            .unwrap();
        d.evaluate(
            WALLET,
            TOKEN,
            Decimal::from(1_000),
            None,
            start + Duration::seconds(120),
        )
        .unwrap();
        assert_eq!(d.history_len(WALLET), 2);
    }

    #[test]
    fn test_activity_expires_outside_window() {
        let d = detector();
        let start = Utc::now();
        d.evaluate(WALLET, TOKEN, Decimal::from(1_000), None, start)
            .unwrap();
        assert!(d.activity(TOKEN, start + Duration::seconds(60)).is_some());
        assert!(d.activity(TOKEN, start + Duration::hours(2)).is_none());
    }

    #[test]
    fn test_rejects_malformed_inputs() {
        let d = detector();
        assert!(d
            .evaluate("bad", TOKEN, Decimal::ONE, None, Utc::now())
            .is_err());
        assert!(d
            .evaluate(WALLET, TOKEN, Decimal::ZERO, None, Utc::now())
            .is_err());
    }
}
