pub mod pipeline;

pub use pipeline::{handle_market_snapshot, handle_price_series, process_trade_event};
