use rust_decimal::Decimal;
use std::env;

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Engine configuration. Every numeric policy value is environment-tunable;
/// nothing here is a hard-coded constant in the scoring paths.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,

    // Telegram notifier (optional — engine runs without it)
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    // Prometheus exporter listen address, e.g. "0.0.0.0:9100"
    pub metrics_addr: Option<String>,

    // Ingestion
    pub min_transaction_usd: Decimal,

    // Confidence weights (need not sum to 1; the aggregator normalizes)
    pub trader_weight: Decimal,
    pub whale_weight: Decimal,
    pub market_weight: Decimal,
    pub pattern_weight: Decimal,

    // Tier thresholds, evaluated highest-first
    pub tier_s_threshold: Decimal,
    pub tier_a_threshold: Decimal,
    pub tier_b_threshold: Decimal,
    pub tier_c_threshold: Decimal,

    // Trader quality
    pub trader_neutral_prior: Decimal,
    pub trader_learning_rate: Decimal,
    pub trader_buy_nudge: Decimal,
    pub trader_sell_nudge: Decimal,

    // Whale detection
    pub whale_collapse_window_secs: u64,
    pub whale_activity_window_secs: u64,
    pub whale_history_window: usize,
    pub whale_history_scale: Decimal,
    pub whale_history_weight: Decimal,
    pub whale_depth_weight: Decimal,

    // Market health
    pub liquidity_healthy_threshold: Decimal,
    pub holder_growth_ceiling: Decimal,
    pub liquidity_weight: Decimal,
    pub holder_growth_weight: Decimal,
    pub trending_boost: Decimal,

    // Pattern analysis
    pub min_series_len: usize,
    pub pattern_neutral_score: Decimal,
    pub breakout_volume_multiplier: Decimal,

    // Registry
    pub signal_cooldown_secs: u64,
    pub max_signals_per_hour: usize,

    // Performance tracker
    pub tracker_tick_secs: u64,
    pub provider_timeout_secs: u64,
    pub success_threshold_pct: Decimal,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            metrics_addr: None,

            min_transaction_usd: Decimal::from(200),

            trader_weight: Decimal::new(30, 2),  // 0.30
            whale_weight: Decimal::new(30, 2),   // 0.30
            market_weight: Decimal::new(25, 2),  // 0.25
            pattern_weight: Decimal::new(15, 2), // 0.15

            tier_s_threshold: Decimal::new(90, 2), // 0.90
            tier_a_threshold: Decimal::new(80, 2), // 0.80
            tier_b_threshold: Decimal::new(60, 2), // 0.60
            tier_c_threshold: Decimal::new(30, 2), // 0.30

            trader_neutral_prior: Decimal::new(50, 2), // 0.50
            trader_learning_rate: Decimal::new(20, 2), // 0.20
            trader_buy_nudge: Decimal::new(1, 2),      // 0.01
            trader_sell_nudge: Decimal::new(2, 2),     // 0.02

            whale_collapse_window_secs: 30,
            whale_activity_window_secs: 3600,
            whale_history_window: 20,
            whale_history_scale: Decimal::from(5),
            whale_history_weight: Decimal::new(30, 2), // 0.30
            whale_depth_weight: Decimal::new(70, 2),   // 0.70

            liquidity_healthy_threshold: Decimal::from(20_000),
            holder_growth_ceiling: Decimal::from(5),
            liquidity_weight: Decimal::new(50, 2),      // 0.50
            holder_growth_weight: Decimal::new(35, 2),  // 0.35
            trending_boost: Decimal::new(15, 2),        // 0.15

            min_series_len: 10,
            pattern_neutral_score: Decimal::new(40, 2), // 0.40
            breakout_volume_multiplier: Decimal::new(15, 1), // 1.5

            signal_cooldown_secs: 3600,
            max_signals_per_hour: 10,

            tracker_tick_secs: 30,
            provider_timeout_secs: 5,
            success_threshold_pct: Decimal::from(10),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            metrics_addr: env::var("METRICS_ADDR").ok(),

            min_transaction_usd: env_decimal("MIN_TRANSACTION_USD", d.min_transaction_usd),

            trader_weight: env_decimal("TRADER_QUALITY_WEIGHT", d.trader_weight),
            whale_weight: env_decimal("WHALE_ACTIVITY_WEIGHT", d.whale_weight),
            market_weight: env_decimal("MARKET_HEALTH_WEIGHT", d.market_weight),
            pattern_weight: env_decimal("TECHNICAL_PATTERN_WEIGHT", d.pattern_weight),

            tier_s_threshold: env_decimal("TIER_S_THRESHOLD", d.tier_s_threshold),
            tier_a_threshold: env_decimal("TIER_A_THRESHOLD", d.tier_a_threshold),
            tier_b_threshold: env_decimal("TIER_B_THRESHOLD", d.tier_b_threshold),
            tier_c_threshold: env_decimal("TIER_C_THRESHOLD", d.tier_c_threshold),

            trader_neutral_prior: env_decimal("TRADER_NEUTRAL_PRIOR", d.trader_neutral_prior),
            trader_learning_rate: env_decimal("TRADER_LEARNING_RATE", d.trader_learning_rate),
            trader_buy_nudge: env_decimal("TRADER_BUY_NUDGE", d.trader_buy_nudge),
            trader_sell_nudge: env_decimal("TRADER_SELL_NUDGE", d.trader_sell_nudge),

            whale_collapse_window_secs: env_u64(
                "WHALE_COLLAPSE_WINDOW_SECS",
                d.whale_collapse_window_secs,
            ),
            whale_activity_window_secs: env_u64(
                "WHALE_ACTIVITY_WINDOW_SECS",
                d.whale_activity_window_secs,
            ),
            whale_history_window: env_usize("WHALE_HISTORY_WINDOW", d.whale_history_window),
            whale_history_scale: env_decimal("WHALE_HISTORY_SCALE", d.whale_history_scale),
            whale_history_weight: env_decimal("WHALE_HISTORY_WEIGHT", d.whale_history_weight),
            whale_depth_weight: env_decimal("WHALE_DEPTH_WEIGHT", d.whale_depth_weight),

            liquidity_healthy_threshold: env_decimal(
                "LIQUIDITY_HEALTHY_THRESHOLD",
                d.liquidity_healthy_threshold,
            ),
            holder_growth_ceiling: env_decimal("HOLDER_GROWTH_CEILING", d.holder_growth_ceiling),
            liquidity_weight: env_decimal("LIQUIDITY_WEIGHT", d.liquidity_weight),
            holder_growth_weight: env_decimal("HOLDER_GROWTH_WEIGHT", d.holder_growth_weight),
            trending_boost: env_decimal("TRENDING_BOOST", d.trending_boost),

            min_series_len: env_usize("MIN_SERIES_LEN", d.min_series_len),
            pattern_neutral_score: env_decimal("PATTERN_NEUTRAL_SCORE", d.pattern_neutral_score),
            breakout_volume_multiplier: env_decimal(
                "BREAKOUT_VOLUME_MULTIPLIER",
                d.breakout_volume_multiplier,
            ),

            signal_cooldown_secs: env_u64("SIGNAL_COOLDOWN_SECS", d.signal_cooldown_secs),
            max_signals_per_hour: env_usize("SIGNAL_THROTTLING", d.max_signals_per_hour),

            tracker_tick_secs: env_u64("TRACKER_TICK_SECS", d.tracker_tick_secs),
            provider_timeout_secs: env_u64("PROVIDER_TIMEOUT_SECS", d.provider_timeout_secs),
            success_threshold_pct: env_decimal("SUCCESS_THRESHOLD_PCT", d.success_threshold_pct),
        })
    }

    /// Returns true if Telegram notification credentials are configured.
    pub fn has_telegram(&self) -> bool {
        self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }
}
