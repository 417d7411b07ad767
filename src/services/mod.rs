pub mod market_data;
pub mod notifier;
pub mod wallet_service;

pub use market_data::{LatestMarketData, MarketDataProvider};
pub use notifier::Notifier;
pub use wallet_service::WalletService;
