use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;

use crate::models::{EngineEvent, PerformanceUpdate, Signal};

/// Telegram notification service. Failures are logged but never block the main flow.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            chat_id,
        }
    }

    /// Send a Telegram message. Failures are logged as warnings.
    pub async fn send(&self, message: &str) {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        status = %resp.status(),
                        "Telegram sendMessage returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send Telegram notification");
            }
        }
    }
}

fn token_short(token: &str) -> String {
    if token.len() > 10 {
        format!("{}...{}", &token[..6], &token[token.len() - 4..])
    } else {
        token.to_string()
    }
}

/// Format a new-signal alert — only sent for accepted signals.
pub fn format_signal_alert(signal: &Signal) -> String {
    let input = &signal.evidence.input;
    format!(
        "*New Signal [{}]*\nToken: `{}`\nConfidence: {}\nRef Price: {}\nTrader: {} | Whale: {} | Market: {} | Pattern: {}",
        signal.tier,
        token_short(&signal.token),
        signal.confidence.round_dp(4),
        signal.reference_price,
        input.trader_quality.round_dp(2),
        input.whale_activity.round_dp(2),
        input.market_health.round_dp(2),
        input.technical_pattern.round_dp(2),
    )
}

/// Format a checkpoint performance report.
pub fn format_performance_report(update: &PerformanceUpdate) -> String {
    let mut report = format!(
        "*Performance [{}]*\nToken: `{}`\nChange: {}%\nPrice: {}\nMax Gain: {}%",
        update.horizon,
        token_short(&update.token),
        update.percent_change.round_dp(2),
        update.price,
        update.max_gain.round_dp(2),
    );
    if let Some(liquidity) = update.liquidity {
        report.push_str(&format!("\nLiquidity: ${}", liquidity.round_dp(0)));
    }
    if let Some(volume) = update.volume {
        report.push_str(&format!("\nVolume: ${}", volume.round_dp(0)));
    }
    if let Some(growth) = update.holder_growth {
        report.push_str(&format!("\nHolder Growth: {}%/h", growth.round_dp(2)));
    }
    report
}

/// Drain engine events, forwarding the notable ones to Telegram when
/// configured. Runs until the sending side closes.
pub async fn run_event_consumer(
    mut rx: mpsc::Receiver<EngineEvent>,
    notifier: Option<Arc<Notifier>>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::SignalEmitted(signal) => {
                tracing::info!(
                    signal_id = %signal.id,
                    token = %signal.token,
                    tier = %signal.tier,
                    confidence = %signal.confidence,
                    "Signal emitted"
                );
                if let Some(n) = &notifier {
                    n.send(&format_signal_alert(&signal)).await;
                }
            }
            EngineEvent::PerformanceUpdate(update) => {
                tracing::info!(
                    signal_id = %update.signal_id,
                    horizon = %update.horizon,
                    percent_change = %update.percent_change,
                    "Checkpoint resolved"
                );
                if let Some(n) = &notifier {
                    n.send(&format_performance_report(&update)).await;
                }
            }
            EngineEvent::TraderOutcome { wallet, was_correct } => {
                tracing::debug!(wallet = %wallet, was_correct, "Trader outcome recorded");
            }
        }
    }
}
