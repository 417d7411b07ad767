use std::sync::Arc;

use rust_decimal::Decimal;

use super::clamp01;
use crate::config::AppConfig;
use crate::errors::EngineError;
use crate::models::{self, Side, TradeEvent, TraderProfile};
use crate::services::wallet_service::WalletService;

/// Maintains a rolling reputation score per observed wallet. Scoring is pure
/// in-memory; persistence of the backing profiles flows through the
/// `WalletService`.
pub struct TraderQualityScorer {
    wallets: Arc<WalletService>,
    prior: Decimal,
    alpha: Decimal,
    buy_nudge: Decimal,
    sell_nudge: Decimal,
}

impl TraderQualityScorer {
    pub fn new(wallets: Arc<WalletService>, config: &AppConfig) -> Self {
        Self {
            wallets,
            prior: config.trader_neutral_prior,
            alpha: config.trader_learning_rate,
            buy_nudge: config.trader_buy_nudge,
            sell_nudge: config.trader_sell_nudge,
        }
    }

    /// Register a transaction from a wallet: bump its call count and apply a
    /// small activity nudge. Never fails for a well-formed wallet id.
    pub fn observe(&self, event: &TradeEvent) -> Result<TraderProfile, EngineError> {
        models::validate_wallet_id(&event.wallet)?;

        let nudge = match event.side {
            Side::Buy => self.buy_nudge,
            Side::Sell => self.sell_nudge,
        };

        Ok(self.wallets.update(&event.wallet, |profile| {
            profile.calls_observed += 1;
            profile.score = clamp01(profile.score + nudge);
        }))
    }

    /// Current score in [0, 1]; the neutral prior for unseen wallets.
    pub fn score(&self, wallet: &str) -> Decimal {
        self.wallets
            .get(wallet)
            .map(|p| p.score)
            .unwrap_or(self.prior)
    }

    /// Apply a decayed outcome update at checkpoint resolution:
    /// `score' = score * (1 - α) + outcome * α`, clamped to [0, 1].
    /// The write-through to storage is best-effort; a failed write keeps the
    /// in-memory score and is retried at the next flush.
    pub async fn record_outcome(&self, wallet: &str, was_correct: bool) -> Result<(), EngineError> {
        models::validate_wallet_id(wallet)?;

        let outcome = if was_correct {
            Decimal::ONE
        } else {
            Decimal::ZERO
        };
        let alpha = self.alpha;

        let updated = self.wallets.update(wallet, |profile| {
            profile.score = clamp01(profile.score * (Decimal::ONE - alpha) + outcome * alpha);
        });

        tracing::debug!(
            wallet = %wallet,
            score = %updated.score,
            was_correct,
            "Trader outcome recorded"
        );

        if let Err(e) = self.wallets.persist(wallet).await {
            tracing::warn!(error = %e, wallet = %wallet, "Failed to persist trader profile");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
