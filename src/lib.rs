pub mod config;
pub mod db;
pub mod errors;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod services;
pub mod tracker;

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::intelligence::{
    ConfidenceWeights, MarketMetricsEvaluator, PatternAnalyzer, TierThresholds,
    TraderQualityScorer, WhaleActivityDetector,
};
use crate::models::EngineEvent;
use crate::registry::SignalRegistry;
use crate::services::{LatestMarketData, WalletService};
use crate::tracker::PerformanceTracker;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Shared engine state. Cheap to clone via the inner `Arc`s; every component
/// is independently shareable with spawned tasks.
pub struct AppState {
    pub config: AppConfig,
    pub weights: ConfidenceWeights,
    pub thresholds: TierThresholds,
    pub db: Option<PgPool>,
    pub wallets: Arc<WalletService>,
    pub scorer: Arc<TraderQualityScorer>,
    pub whales: Arc<WhaleActivityDetector>,
    pub market: Arc<MarketMetricsEvaluator>,
    pub patterns: Arc<PatternAnalyzer>,
    pub market_data: Arc<LatestMarketData>,
    pub registry: Arc<SignalRegistry>,
    pub tracker: Arc<PerformanceTracker<LatestMarketData>>,
    pub events: mpsc::Sender<EngineEvent>,
}

impl AppState {
    /// Wire up the full engine. The returned receiver carries signal and
    /// performance events for the notification consumer.
    pub fn new(config: AppConfig, db: Option<PgPool>) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let wallets = Arc::new(WalletService::new(config.trader_neutral_prior, db.clone()));
        let scorer = Arc::new(TraderQualityScorer::new(Arc::clone(&wallets), &config));
        let whales = Arc::new(WhaleActivityDetector::new(&config));
        let market = Arc::new(MarketMetricsEvaluator::new(&config));
        let patterns = Arc::new(PatternAnalyzer::new(&config));
        let market_data = Arc::new(LatestMarketData::new(Arc::clone(&market)));
        let registry = Arc::new(SignalRegistry::new(&config, db.clone()));
        let tracker = Arc::new(PerformanceTracker::new(
            &config,
            Arc::clone(&market_data),
            Arc::clone(&registry),
            Arc::clone(&scorer),
            Arc::clone(&whales),
            events.clone(),
            db.clone(),
        ));

        let state = Self {
            weights: ConfidenceWeights::from_config(&config),
            thresholds: TierThresholds::from_config(&config),
            config,
            db,
            wallets,
            scorer,
            whales,
            market,
            patterns,
            market_data,
            registry,
            tracker,
            events,
        };
        (state, rx)
    }

    /// Reload persisted state after a restart: trader profiles plus every
    /// ACTIVE signal and its unresolved checkpoints.
    pub async fn restore(&self) -> Result<(), errors::EngineError> {
        let profiles = self.wallets.restore().await?;
        let signals = self.tracker.restore().await?;
        tracing::info!(profiles, signals, "State restored from storage");
        Ok(())
    }

    /// Flush in-memory state before exit. Signal and checkpoint rows are
    /// written through at mutation time; only trader profiles need a sweep.
    pub async fn shutdown(&self) {
        match self.wallets.persist_all().await {
            Ok(count) => tracing::info!(profiles = count, "Trader profiles flushed"),
            Err(e) => tracing::warn!(error = %e, "Failed to flush trader profiles"),
        }
    }
}
