use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{checkpoint_repo, signal_repo};
use crate::errors::EngineError;
use crate::intelligence::{TraderQualityScorer, WhaleActivityDetector};
use crate::models::{
    CheckpointState, EngineEvent, PerformanceCheckpoint, PerformanceUpdate, Signal, SignalStatus,
};
use crate::registry::SignalRegistry;
use crate::services::MarketDataProvider;

struct TrackedSignal {
    signal: Signal,
    /// Always in resolution order; resolved prefix, unresolved suffix.
    checkpoints: Vec<PerformanceCheckpoint>,
    /// Best percent change across resolutions so far.
    max_gain: Decimal,
    /// Outcome attribution ran for this signal; never repeated when an
    /// expiry write has to be retried.
    outcome_recorded: bool,
}

/// Drives every ACTIVE signal through its eight checkpoints on a fixed tick.
/// Checkpoints within a signal resolve strictly in horizon order; a failed
/// resolution leaves the checkpoint unresolved and is retried next tick.
pub struct PerformanceTracker<P: MarketDataProvider> {
    tracked: Mutex<HashMap<Uuid, TrackedSignal>>,
    provider: Arc<P>,
    registry: Arc<SignalRegistry>,
    scorer: Arc<TraderQualityScorer>,
    whales: Arc<WhaleActivityDetector>,
    events: mpsc::Sender<EngineEvent>,
    pool: Option<PgPool>,
    success_threshold_pct: Decimal,
    provider_timeout: std::time::Duration,
    tick_interval: std::time::Duration,
}

impl<P: MarketDataProvider> PerformanceTracker<P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        provider: Arc<P>,
        registry: Arc<SignalRegistry>,
        scorer: Arc<TraderQualityScorer>,
        whales: Arc<WhaleActivityDetector>,
        events: mpsc::Sender<EngineEvent>,
        pool: Option<PgPool>,
    ) -> Self {
        Self {
            tracked: Mutex::new(HashMap::new()),
            provider,
            registry,
            scorer,
            whales,
            events,
            pool,
            success_threshold_pct: config.success_threshold_pct,
            provider_timeout: std::time::Duration::from_secs(config.provider_timeout_secs),
            tick_interval: std::time::Duration::from_secs(config.tracker_tick_secs),
        }
    }

    /// Begin tracking an accepted signal: schedule its full checkpoint batch.
    /// Re-tracking an already-tracked signal is a no-op.
    pub async fn track(&self, signal: Signal) -> Result<(), EngineError> {
        let mut tracked = self.tracked.lock().await;
        if tracked.contains_key(&signal.id) {
            return Ok(());
        }

        let checkpoints = PerformanceCheckpoint::batch_for(signal.id, signal.created_at);
        if let Some(pool) = &self.pool {
            checkpoint_repo::insert_batch(pool, &checkpoints).await?;
        }

        tracing::info!(
            signal_id = %signal.id,
            token = %signal.token,
            first_due = %checkpoints[0].due_at,
            "Tracking signal"
        );

        tracked.insert(
            signal.id,
            TrackedSignal {
                signal,
                checkpoints,
                max_gain: Decimal::MIN,
                outcome_recorded: false,
            },
        );
        metrics::gauge!("active_signals").set(tracked.len() as f64);
        Ok(())
    }

    /// Rebuild tracking state from storage after a restart. Signals whose
    /// rows say ACTIVE resume at their first unresolved checkpoint; already
    /// resolved checkpoints are left untouched.
    pub async fn restore(&self) -> Result<usize, EngineError> {
        let Some(pool) = &self.pool else {
            return Ok(0);
        };

        let signals = signal_repo::load_active(pool).await?;
        self.registry.restore(&signals).await;

        let mut tracked = self.tracked.lock().await;
        let restored = signals.len();
        for signal in signals {
            let mut checkpoints = checkpoint_repo::load_for_signal(pool, signal.id).await?;
            if checkpoints.is_empty() {
                checkpoints = PerformanceCheckpoint::batch_for(signal.id, signal.created_at);
                checkpoint_repo::insert_batch(pool, &checkpoints).await?;
            }

            let max_gain = checkpoints
                .iter()
                .filter_map(|cp| cp.percent_change)
                .max()
                .unwrap_or(Decimal::MIN);

            tracing::info!(
                signal_id = %signal.id,
                token = %signal.token,
                resolved = checkpoints.iter().filter(|cp| cp.resolved).count(),
                "Restored signal"
            );

            tracked.insert(
                signal.id,
                TrackedSignal {
                    signal,
                    checkpoints,
                    max_gain,
                    outcome_recorded: false,
                },
            );
        }
        metrics::gauge!("active_signals").set(tracked.len() as f64);
        Ok(restored)
    }

    /// One evaluation pass. For each signal, due checkpoints resolve in
    /// horizon order; several overdue checkpoints collapse into this single
    /// pass. A failure stops that signal's progress for this tick so order
    /// is preserved.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let mut tracked = self.tracked.lock().await;
        let mut finished: Vec<Uuid> = Vec::new();

        for (signal_id, entry) in tracked.iter_mut() {
            loop {
                let Some(idx) = entry.checkpoints.iter().position(|cp| !cp.resolved) else {
                    // Every checkpoint resolved but the expiry never
                    // completed (a restart mid-close); finish it now.
                    if self.close_signal(entry).await {
                        finished.push(*signal_id);
                    }
                    break;
                };
                if entry.checkpoints[idx].state(now) != CheckpointState::Due {
                    break;
                }

                match self.resolve_checkpoint(entry, idx, now).await {
                    Ok(()) => {
                        if entry.checkpoints[idx].horizon.is_terminal() {
                            if self.close_signal(entry).await {
                                finished.push(*signal_id);
                            }
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            signal_id = %signal_id,
                            horizon = %entry.checkpoints[idx].horizon,
                            error = %e,
                            "Checkpoint resolution deferred"
                        );
                        break;
                    }
                }
            }
        }

        for signal_id in finished {
            tracked.remove(&signal_id);
        }
        metrics::gauge!("active_signals").set(tracked.len() as f64);
    }

    async fn resolve_checkpoint(
        &self,
        entry: &mut TrackedSignal,
        idx: usize,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let token = entry.signal.token.clone();

        let price = self.fetch_price(&token).await?;
        let snapshot = self.fetch_snapshot(&token).await.ok();

        let reference = entry.signal.reference_price;
        let percent_change = if reference > Decimal::ZERO {
            (price - reference) / reference * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        let cp = &mut entry.checkpoints[idx];
        cp.percent_change = Some(percent_change);
        cp.liquidity = snapshot.as_ref().map(|s| s.liquidity_usd);
        cp.volume = snapshot.as_ref().map(|s| s.volume_usd);
        cp.holder_growth = snapshot.as_ref().map(|s| s.holder_growth_rate);
        cp.whale_activity = self.whales.activity(&token, now);
        cp.resolved_at = Some(now);

        // Storage first; the in-memory flag only flips after a durable write.
        if let Some(pool) = &self.pool {
            checkpoint_repo::mark_resolved(pool, cp).await?;
        }
        cp.resolved = true;

        if percent_change > entry.max_gain {
            entry.max_gain = percent_change;
        }

        let update = PerformanceUpdate {
            signal_id: entry.signal.id,
            token,
            horizon: cp.horizon,
            percent_change,
            price,
            liquidity: cp.liquidity,
            volume: cp.volume,
            holder_growth: cp.holder_growth,
            whale_activity: cp.whale_activity,
            max_gain: entry.max_gain,
            resolved_at: now,
        };

        tracing::info!(
            signal_id = %update.signal_id,
            horizon = %update.horizon,
            percent_change = %update.percent_change,
            max_gain = %update.max_gain,
            "Checkpoint resolved"
        );
        metrics::counter!("checkpoints_resolved_total").increment(1);

        let _ = self
            .events
            .send(EngineEvent::PerformanceUpdate(update))
            .await;

        Ok(())
    }

    /// Terminal checkpoint reached: attribute the outcome to every wallet in
    /// the evidence, release the registry slot, and clean up checkpoints.
    /// Returns false when the expiry write failed; the signal stays tracked
    /// and the close is retried next tick without repeating attribution.
    async fn close_signal(&self, entry: &mut TrackedSignal) -> bool {
        // The call is judged where the signal ends, at the 24h mark. The
        // peak is reported along the way but earns no credit.
        let terminal_change = entry
            .checkpoints
            .last()
            .and_then(|cp| cp.percent_change)
            .unwrap_or(Decimal::ZERO);
        let was_correct = terminal_change >= self.success_threshold_pct;

        if !entry.outcome_recorded {
            let wallets: BTreeSet<String> = entry
                .signal
                .evidence
                .traders
                .iter()
                .map(|p| p.wallet.clone())
                .chain(
                    entry
                        .signal
                        .evidence
                        .whale_events
                        .iter()
                        .map(|e| e.wallet.clone()),
                )
                .collect();

            for wallet in wallets {
                if let Err(e) = self.scorer.record_outcome(&wallet, was_correct).await {
                    tracing::warn!(wallet = %wallet, error = %e, "Outcome attribution failed");
                    continue;
                }
                let _ = self
                    .events
                    .send(EngineEvent::TraderOutcome {
                        wallet,
                        was_correct,
                    })
                    .await;
            }
            entry.outcome_recorded = true;
        }

        let signal = &mut entry.signal;
        if let Err(e) = self.registry.mark_expired(&signal.token, signal.id).await {
            tracing::warn!(signal_id = %signal.id, error = %e, "Expiry persistence deferred");
            return false;
        }
        signal.status = SignalStatus::Expired;

        // Checkpoint rows go only after the expiry is durable, otherwise a
        // restart would recreate the batch and replay the whole lifecycle.
        if let Some(pool) = &self.pool {
            if let Err(e) = checkpoint_repo::delete_for_signal(pool, signal.id).await {
                tracing::warn!(signal_id = %signal.id, error = %e, "Failed to delete checkpoints");
            }
        }

        tracing::info!(
            signal_id = %signal.id,
            token = %signal.token,
            terminal_change = %terminal_change,
            max_gain = %entry.max_gain,
            was_correct,
            "Signal lifecycle complete"
        );
        metrics::counter!("signals_expired_total").increment(1);
        true
    }

    async fn fetch_price(&self, token: &str) -> Result<Decimal, EngineError> {
        match tokio::time::timeout(self.provider_timeout, self.provider.fetch_price(token)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::DataUnavailable(format!(
                "price fetch timed out for {token}"
            ))),
        }
    }

    async fn fetch_snapshot(
        &self,
        token: &str,
    ) -> Result<crate::models::MarketSnapshot, EngineError> {
        match tokio::time::timeout(self.provider_timeout, self.provider.fetch_snapshot(token)).await
        {
            Ok(result) => result,
            Err(_) => Err(EngineError::DataUnavailable(format!(
                "snapshot fetch timed out for {token}"
            ))),
        }
    }

    pub async fn tracked_count(&self) -> usize {
        self.tracked.lock().await.len()
    }

    /// Resolved-checkpoint count for a tracked signal; None once it expired.
    pub async fn resolved_count(&self, signal_id: Uuid) -> Option<usize> {
        let tracked = self.tracked.lock().await;
        tracked
            .get(&signal_id)
            .map(|e| e.checkpoints.iter().filter(|cp| cp.resolved).count())
    }

    #[cfg(test)]
    async fn seed(&self, signal: Signal, checkpoints: Vec<PerformanceCheckpoint>) {
        let max_gain = checkpoints
            .iter()
            .filter_map(|cp| cp.percent_change)
            .max()
            .unwrap_or(Decimal::MIN);
        let mut tracked = self.tracked.lock().await;
        tracked.insert(
            signal.id,
            TrackedSignal {
                signal,
                checkpoints,
                max_gain,
                outcome_recorded: false,
            },
        );
    }

    /// Fixed-interval evaluation loop. Runs until the process shuts down.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick(Utc::now()).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceInput, MarketSnapshot, SignalEvidence, SignalTier, TraderProfile};
    use crate::services::WalletService;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::RwLock;

    const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const TOKEN: &str = "So11111111111111111111111111111111111111112";

    /// Provider with test-settable state, including total absence of data.
    struct StubProvider {
        prices: RwLock<HashMap<String, Decimal>>,
    }

    impl StubProvider {
        fn new() -> Self {
            Self {
                prices: RwLock::new(HashMap::new()),
            }
        }

        fn set_price(&self, token: &str, price: Decimal) {
            self.prices
                .write()
                .unwrap()
                .insert(token.to_string(), price);
        }
    }

    impl MarketDataProvider for StubProvider {
        async fn fetch_price(&self, token: &str) -> Result<Decimal, EngineError> {
            self.prices
                .read()
                .unwrap()
                .get(token)
                .copied()
                .ok_or_else(|| EngineError::DataUnavailable("no price".into()))
        }

        async fn fetch_snapshot(&self, token: &str) -> Result<MarketSnapshot, EngineError> {
            let _ = token;
            Err(EngineError::DataUnavailable("no snapshot".into()))
        }
    }

    struct Harness {
        tracker: PerformanceTracker<StubProvider>,
        provider: Arc<StubProvider>,
        registry: Arc<SignalRegistry>,
        scorer: Arc<TraderQualityScorer>,
        rx: mpsc::Receiver<EngineEvent>,
    }

    fn harness() -> Harness {
        let config = AppConfig::default();
        let provider = Arc::new(StubProvider::new());
        let registry = Arc::new(SignalRegistry::new(&config, None));
        let wallets = Arc::new(WalletService::new(config.trader_neutral_prior, None));
        let scorer = Arc::new(TraderQualityScorer::new(wallets, &config));
        let whales = Arc::new(WhaleActivityDetector::new(&config));
        let (tx, rx) = mpsc::channel(256);

        let tracker = PerformanceTracker::new(
            &config,
            Arc::clone(&provider),
            Arc::clone(&registry),
            Arc::clone(&scorer),
            whales,
            tx,
            None,
        );

        Harness {
            tracker,
            provider,
            registry,
            scorer,
            rx,
        }
    }

    fn signal(created_at: DateTime<Utc>) -> Signal {
        Signal {
            id: Uuid::new_v4(),
            token: TOKEN.into(),
            tier: SignalTier::B,
            confidence: Decimal::new(65, 2),
            reference_price: Decimal::from(100),
            status: crate::models::SignalStatus::Active,
            evidence: SignalEvidence {
                input: ConfidenceInput {
                    token: TOKEN.into(),
                    trader_quality: Decimal::new(5, 1),
                    whale_activity: Decimal::new(76, 2),
                    market_health: Decimal::new(6, 1),
                    technical_pattern: Decimal::new(4, 1),
                },
                whale_events: vec![],
                traders: vec![TraderProfile::new(
                    WALLET.into(),
                    Decimal::new(5, 1),
                    created_at,
                )],
            },
            created_at,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_only_due_checkpoints_resolve() {
        let mut h = harness();
        let t0 = Utc::now();
        let s = signal(t0);
        let id = s.id;

        h.provider.set_price(TOKEN, Decimal::from(110));
        h.tracker.track(s).await.unwrap();

        h.tracker.tick(t0 + Duration::minutes(4)).await;
        assert_eq!(h.tracker.resolved_count(id).await, Some(1));

        h.tracker.tick(t0 + Duration::minutes(6)).await;
        assert_eq!(h.tracker.resolved_count(id).await, Some(2));

        let updates = drain(&mut h.rx);
        assert_eq!(updates.len(), 2);
    }

    #[tokio::test]
    async fn test_missed_checkpoints_collapse_in_order() {
        let mut h = harness();
        let t0 = Utc::now();
        let s = signal(t0);
        let id = s.id;

        h.provider.set_price(TOKEN, Decimal::from(105));
        h.tracker.track(s).await.unwrap();

        // Long outage: everything up to 4h is overdue at once.
        h.tracker.tick(t0 + Duration::hours(5)).await;
        assert_eq!(h.tracker.resolved_count(id).await, Some(7));

        let horizons: Vec<_> = drain(&mut h.rx)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::PerformanceUpdate(u) => Some(u.horizon.label()),
                _ => None,
            })
            .collect();
        assert_eq!(horizons, vec!["3m", "5m", "10m", "30m", "1h", "2h", "4h"]);
    }

    #[tokio::test]
    async fn test_unavailable_data_defers_and_retries() {
        let mut h = harness();
        let t0 = Utc::now();
        let s = signal(t0);
        let id = s.id;

        h.tracker.track(s).await.unwrap();

        // No price yet: nothing resolves, nothing is lost.
        h.tracker.tick(t0 + Duration::minutes(4)).await;
        assert_eq!(h.tracker.resolved_count(id).await, Some(0));
        assert!(drain(&mut h.rx).is_empty());

        h.provider.set_price(TOKEN, Decimal::from(98));
        h.tracker.tick(t0 + Duration::minutes(4)).await;
        assert_eq!(h.tracker.resolved_count(id).await, Some(1));
    }

    #[tokio::test]
    async fn test_terminal_checkpoint_expires_signal_once() {
        let mut h = harness();
        let t0 = Utc::now();
        let s = signal(t0);
        let id = s.id;
        let token = s.token.clone();

        // Register through the real registry so the slot exists.
        h.registry.restore(std::slice::from_ref(&s)).await;
        assert_eq!(h.registry.active_count().await, 1);

        h.provider.set_price(TOKEN, Decimal::from(120));
        h.tracker.track(s).await.unwrap();

        h.tracker.tick(t0 + Duration::hours(25)).await;
        assert_eq!(h.tracker.resolved_count(id).await, None);
        assert_eq!(h.tracker.tracked_count().await, 0);
        assert_eq!(h.registry.active_count().await, 0);

        // Re-ticking after expiry does nothing.
        h.tracker.tick(t0 + Duration::hours(26)).await;
        assert_eq!(h.tracker.tracked_count().await, 0);

        let events = drain(&mut h.rx);
        let updates = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::PerformanceUpdate(_)))
            .count();
        let outcomes: Vec<bool> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::TraderOutcome { was_correct, .. } => Some(*was_correct),
                _ => None,
            })
            .collect();
        assert_eq!(updates, 8);
        // +20% beats the 10% success threshold.
        assert_eq!(outcomes, vec![true]);
        let _ = token;
    }

    #[tokio::test]
    async fn test_outcome_attribution_updates_trader_score() {
        let h = harness();
        let t0 = Utc::now();
        let s = signal(t0);

        // Price never moves: max gain 0% < 10% threshold, outcome negative.
        h.provider.set_price(TOKEN, Decimal::from(100));
        h.tracker.track(s).await.unwrap();
        h.tracker.tick(t0 + Duration::hours(25)).await;

        // 0.5 * 0.8 + 0.0 * 0.2 = 0.4
        assert_eq!(h.scorer.score(WALLET), Decimal::new(40, 2));
    }

    #[tokio::test]
    async fn test_track_is_idempotent() {
        let h = harness();
        let t0 = Utc::now();
        let s = signal(t0);

        h.tracker.track(s.clone()).await.unwrap();
        h.tracker.track(s).await.unwrap();
        assert_eq!(h.tracker.tracked_count().await, 1);
    }

    #[tokio::test]
    async fn test_outcome_judged_at_terminal_not_at_peak() {
        let mut h = harness();
        let t0 = Utc::now();
        let s = signal(t0);

        // Early spike to +50%...
        h.provider.set_price(TOKEN, Decimal::from(150));
        h.tracker.track(s).await.unwrap();
        h.tracker.tick(t0 + Duration::minutes(4)).await;

        // ...but the signal finishes at -10%, below the 10% threshold.
        h.provider.set_price(TOKEN, Decimal::from(90));
        h.tracker.tick(t0 + Duration::hours(25)).await;

        let outcomes: Vec<bool> = drain(&mut h.rx)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::TraderOutcome { was_correct, .. } => Some(was_correct),
                _ => None,
            })
            .collect();
        assert_eq!(outcomes, vec![false]);
        // 0.5 * 0.8 + 0.0 * 0.2 = 0.4
        assert_eq!(h.scorer.score(WALLET), Decimal::new(40, 2));
    }

    #[tokio::test]
    async fn test_restored_fully_resolved_signal_still_expires() {
        let mut h = harness();
        let t0 = Utc::now();
        let s = signal(t0);

        // A restart landed between the terminal resolution and the expiry
        // write: the row is still ACTIVE with every checkpoint resolved.
        h.registry.restore(std::slice::from_ref(&s)).await;
        let mut checkpoints = PerformanceCheckpoint::batch_for(s.id, t0);
        for cp in &mut checkpoints {
            cp.resolved = true;
            cp.percent_change = Some(Decimal::from(25));
            cp.resolved_at = Some(t0 + cp.horizon.offset());
        }
        h.tracker.seed(s, checkpoints).await;

        h.tracker.tick(t0 + Duration::hours(25)).await;

        assert_eq!(h.tracker.tracked_count().await, 0);
        assert_eq!(h.registry.active_count().await, 0);

        // One outcome, no replayed resolutions.
        let events = drain(&mut h.rx);
        assert!(events
            .iter()
            .all(|e| !matches!(e, EngineEvent::PerformanceUpdate(_))));
        let outcomes: Vec<bool> = events
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::TraderOutcome { was_correct, .. } => Some(was_correct),
                _ => None,
            })
            .collect();
        assert_eq!(outcomes, vec![true]);
        // +25% at 24h beats the threshold: 0.5 * 0.8 + 1.0 * 0.2 = 0.6
        assert_eq!(h.scorer.score(WALLET), Decimal::new(60, 2));
    }

    #[tokio::test]
    async fn test_max_gain_retains_peak() {
        let mut h = harness();
        let t0 = Utc::now();
        let s = signal(t0);

        h.provider.set_price(TOKEN, Decimal::from(150));
        h.tracker.track(s).await.unwrap();
        h.tracker.tick(t0 + Duration::minutes(4)).await;

        // Price retraces; max gain must not.
        h.provider.set_price(TOKEN, Decimal::from(90));
        h.tracker.tick(t0 + Duration::minutes(6)).await;

        let gains: Vec<Decimal> = drain(&mut h.rx)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::PerformanceUpdate(u) => Some(u.max_gain),
                _ => None,
            })
            .collect();
        assert_eq!(gains, vec![Decimal::from(50), Decimal::from(50)]);
    }
}
