use crate::errors::EngineError;
use crate::intelligence::{aggregate, tier_for};
use crate::intelligence::pattern::PricePoint;
use crate::models::{self, ConfidenceInput, MarketSnapshot, Signal, SignalEvidence, TradeEvent};
use crate::registry::SubmitOutcome;
use crate::AppState;

/// Run one normalized trade through the full scoring pipeline. Returns the
/// accepted signal, or None when the event was filtered or the registry
/// rejected the evaluation.
pub async fn process_trade_event(
    state: &AppState,
    event: &TradeEvent,
) -> Result<Option<Signal>, EngineError> {
    let started = std::time::Instant::now();

    models::validate_wallet_id(&event.wallet)?;
    models::validate_token_id(&event.token)?;
    metrics::counter!("trade_events_total").increment(1);

    if event.size < state.config.min_transaction_usd {
        tracing::debug!(
            size = %event.size,
            min = %state.config.min_transaction_usd,
            "Trade below minimum size, skipped"
        );
        return Ok(None);
    }

    let profile = state.scorer.observe(event)?;
    state.market_data.record_price(&event.token, event.price);

    let liquidity = state
        .market
        .snapshot(&event.token)
        .map(|s| s.liquidity_usd);
    let whale_event = state.whales.evaluate(
        &event.wallet,
        &event.token,
        event.size,
        liquidity,
        event.timestamp,
    )?;

    let input = ConfidenceInput {
        token: event.token.clone(),
        trader_quality: profile.score,
        whale_activity: whale_event.magnitude,
        market_health: state.market.health(&event.token),
        technical_pattern: state.patterns.score(&event.token),
    };

    let confidence = aggregate(&input, &state.weights)?;
    let tier = tier_for(confidence, &state.thresholds);

    tracing::debug!(
        token = %event.token,
        confidence = %confidence,
        tier = %tier,
        trader = %input.trader_quality,
        whale = %input.whale_activity,
        market = %input.market_health,
        pattern = %input.technical_pattern,
        "Evaluation scored"
    );

    let evidence = SignalEvidence {
        input,
        whale_events: vec![whale_event],
        traders: vec![profile],
    };

    let outcome = state
        .registry
        .submit(
            &event.token,
            tier,
            confidence,
            event.price,
            evidence,
            event.timestamp,
        )
        .await?;

    let signal = match outcome {
        SubmitOutcome::Accepted(signal) => {
            state.tracker.track((*signal).clone()).await?;
            metrics::counter!("signals_emitted_total").increment(1);
            let _ = state
                .events
                .send(models::EngineEvent::SignalEmitted(signal.clone()))
                .await;
            Some(*signal)
        }
        SubmitOutcome::Rejected(reason) => {
            tracing::debug!(token = %event.token, reason = %reason, "Signal rejected");
            metrics::counter!("signals_rejected_total").increment(1);
            None
        }
    };

    metrics::histogram!("pipeline_latency_seconds").record(started.elapsed().as_secs_f64());
    Ok(signal)
}

/// Route an upstream market snapshot to the metrics evaluator.
pub fn handle_market_snapshot(
    state: &AppState,
    snapshot: MarketSnapshot,
) -> Result<(), EngineError> {
    state.market.update(snapshot)
}

/// Route an upstream price/volume series to the pattern analyzer.
pub fn handle_price_series(
    state: &AppState,
    token: &str,
    points: Vec<PricePoint>,
) -> Result<(), EngineError> {
    state.patterns.update_series(token, points)
}
