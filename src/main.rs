use std::sync::Arc;

use runnerbot::config::AppConfig;
use runnerbot::services::notifier::{run_event_consumer, Notifier};
use runnerbot::{db, metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let pool = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            tracing::info!("Database connected");
            Some(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set — running without persistence");
            None
        }
    };

    metrics::init_metrics(config.metrics_addr.as_deref())?;

    let notifier = if config.has_telegram() {
        let (token, chat_id) = (
            config.telegram_bot_token.clone().unwrap_or_default(),
            config.telegram_chat_id.clone().unwrap_or_default(),
        );
        Some(Arc::new(Notifier::new(token, chat_id)))
    } else {
        tracing::info!("Telegram not configured — alerts will only be logged");
        None
    };

    let (state, event_rx) = AppState::new(config, pool);

    if state.db.is_some() {
        state.restore().await?;
    }

    tokio::spawn(run_event_consumer(event_rx, notifier));
    tokio::spawn(Arc::clone(&state.tracker).run());

    tracing::info!(
        tick_secs = state.config.tracker_tick_secs,
        cooldown_secs = state.config.signal_cooldown_secs,
        "Engine running — press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    state.shutdown().await;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
