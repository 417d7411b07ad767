use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;

use crate::errors::EngineError;
use crate::intelligence::MarketMetricsEvaluator;
use crate::models::MarketSnapshot;

/// Read-side seam for checkpoint resolution. The tracker never fetches
/// data itself; it asks a provider for the current view of a token.
pub trait MarketDataProvider: Send + Sync {
    fn fetch_price(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Decimal, EngineError>> + Send;

    fn fetch_snapshot(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<MarketSnapshot, EngineError>> + Send;
}

/// Provider backed by whatever the ingestion side saw last: latest trade
/// price per token plus the evaluator's latest snapshot.
pub struct LatestMarketData {
    metrics: Arc<MarketMetricsEvaluator>,
    prices: RwLock<HashMap<String, Decimal>>,
}

impl LatestMarketData {
    pub fn new(metrics: Arc<MarketMetricsEvaluator>) -> Self {
        Self {
            metrics,
            prices: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_price(&self, token: &str, price: Decimal) {
        let mut prices = self.prices.write().expect("price lock poisoned");
        prices.insert(token.to_string(), price);
    }

    pub fn last_price(&self, token: &str) -> Option<Decimal> {
        let prices = self.prices.read().expect("price lock poisoned");
        prices.get(token).copied()
    }
}

impl MarketDataProvider for LatestMarketData {
    async fn fetch_price(&self, token: &str) -> Result<Decimal, EngineError> {
        self.last_price(token)
            .ok_or_else(|| EngineError::DataUnavailable(format!("no price for token {token}")))
    }

    async fn fetch_snapshot(&self, token: &str) -> Result<MarketSnapshot, EngineError> {
        self.metrics
            .snapshot(token)
            .ok_or_else(|| EngineError::DataUnavailable(format!("no snapshot for token {token}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    const TOKEN: &str = "So11111111111111111111111111111111111111112";

    #[tokio::test]
    async fn test_missing_price_is_data_unavailable() {
        let provider = LatestMarketData::new(Arc::new(MarketMetricsEvaluator::new(
            &AppConfig::default(),
        )));
        let err = provider.fetch_price(TOKEN).await.unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn test_latest_price_wins() {
        let provider = LatestMarketData::new(Arc::new(MarketMetricsEvaluator::new(
            &AppConfig::default(),
        )));
        provider.record_price(TOKEN, Decimal::ONE);
        provider.record_price(TOKEN, Decimal::TWO);
        assert_eq!(provider.fetch_price(TOKEN).await.unwrap(), Decimal::TWO);
    }
}
