use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use runnerbot::config::AppConfig;
use runnerbot::ingestion::{handle_market_snapshot, handle_price_series, process_trade_event};
use runnerbot::intelligence::pattern::PricePoint;
use runnerbot::models::{EngineEvent, MarketSnapshot, Side, SignalTier, TradeEvent};
use runnerbot::AppState;

const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
const TOKEN: &str = "So11111111111111111111111111111111111111112";

fn trade(size: i64, price: Decimal, at: DateTime<Utc>) -> TradeEvent {
    TradeEvent {
        wallet: WALLET.into(),
        token: TOKEN.into(),
        side: Side::Buy,
        size: Decimal::from(size),
        price,
        timestamp: at,
    }
}

fn snapshot(liquidity: i64, growth: i64) -> MarketSnapshot {
    MarketSnapshot {
        token: TOKEN.into(),
        liquidity_usd: Decimal::from(liquidity),
        volume_usd: Decimal::from(40_000),
        holder_count: 1_000,
        holder_growth_rate: Decimal::from(growth),
        trending: false,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_large_trade_in_shallow_pool_emits_tracked_signal() {
    let (state, mut rx) = AppState::new(AppConfig::default(), None);
    let t0 = Utc::now();

    handle_market_snapshot(&state, snapshot(10_000, 5)).unwrap();

    let signal = process_trade_event(&state, &trade(5_000, Decimal::ONE, t0))
        .await
        .unwrap()
        .expect("large trade in shallow pool must produce a signal");

    let input = &signal.evidence.input;
    // Fresh wallet nudged once by a buy, whale near-saturated depth factor,
    // moderate market health, neutral pattern with no series.
    assert_eq!(input.trader_quality, Decimal::new(51, 2));
    assert_eq!(input.whale_activity, Decimal::new(76, 2));
    assert_eq!(input.market_health, Decimal::new(60, 2));
    assert_eq!(input.technical_pattern, Decimal::new(40, 2));

    // 0.3*0.51 + 0.3*0.76 + 0.25*0.6 + 0.15*0.4
    assert_eq!(signal.confidence, Decimal::new(591, 3));
    assert_eq!(signal.tier, SignalTier::C);
    assert_eq!(signal.reference_price, Decimal::ONE);

    // The full checkpoint schedule exists with nothing resolved yet.
    assert_eq!(state.tracker.tracked_count().await, 1);
    assert_eq!(state.tracker.resolved_count(signal.id).await, Some(0));

    match rx.try_recv().unwrap() {
        EngineEvent::SignalEmitted(emitted) => assert_eq!(emitted.id, signal.id),
        other => panic!("expected SignalEmitted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_second_trade_rejected_while_signal_active() {
    let (state, _rx) = AppState::new(AppConfig::default(), None);
    let t0 = Utc::now();

    handle_market_snapshot(&state, snapshot(10_000, 5)).unwrap();

    let first = process_trade_event(&state, &trade(5_000, Decimal::ONE, t0))
        .await
        .unwrap();
    assert!(first.is_some());

    let second = process_trade_event(&state, &trade(6_000, Decimal::ONE, t0 + Duration::minutes(2)))
        .await
        .unwrap();
    assert!(second.is_none());
    assert_eq!(state.tracker.tracked_count().await, 1);
}

#[tokio::test]
async fn test_small_trades_are_filtered_before_scoring() {
    let (state, _rx) = AppState::new(AppConfig::default(), None);

    let result = process_trade_event(&state, &trade(100, Decimal::ONE, Utc::now()))
        .await
        .unwrap();
    assert!(result.is_none());
    // Nothing was observed: the wallet still scores the neutral prior.
    assert_eq!(state.scorer.score(WALLET), Decimal::new(50, 2));
    assert_eq!(state.wallets.count(), 0);
}

#[tokio::test]
async fn test_malformed_event_is_a_validation_error() {
    let (state, _rx) = AppState::new(AppConfig::default(), None);
    let mut event = trade(5_000, Decimal::ONE, Utc::now());
    event.token = "not-base58-!!".into();

    assert!(process_trade_event(&state, &event).await.is_err());
}

#[tokio::test]
async fn test_confirmed_breakout_upgrades_tier() {
    let (state, _rx) = AppState::new(AppConfig::default(), None);
    let t0 = Utc::now();

    handle_market_snapshot(&state, snapshot(10_000, 5)).unwrap();

    // Eleven points; the last breaks the prior high on triple volume.
    let mut points: Vec<PricePoint> = (0..10)
        .map(|i| PricePoint {
            price: Decimal::new(90 + i, 2),
            volume: Decimal::from(1_000),
        })
        .collect();
    points.push(PricePoint {
        price: Decimal::new(120, 2),
        volume: Decimal::from(3_000),
    });
    handle_price_series(&state, TOKEN, points).unwrap();

    let signal = process_trade_event(&state, &trade(5_000, Decimal::ONE, t0))
        .await
        .unwrap()
        .expect("breakout should still emit");

    assert_eq!(signal.evidence.input.technical_pattern, Decimal::ONE);
    // 0.3*0.51 + 0.3*0.76 + 0.25*0.6 + 0.15*1.0 = 0.681
    assert_eq!(signal.confidence, Decimal::new(681, 3));
    assert_eq!(signal.tier, SignalTier::B);
}

#[tokio::test]
async fn test_full_lifecycle_expires_and_attributes_outcome() {
    let (state, mut rx) = AppState::new(AppConfig::default(), None);
    let t0 = Utc::now();

    handle_market_snapshot(&state, snapshot(10_000, 5)).unwrap();

    let signal = process_trade_event(&state, &trade(5_000, Decimal::ONE, t0))
        .await
        .unwrap()
        .expect("accepted");

    // Price never moves, so every checkpoint resolves at 0% and the
    // terminal outcome is negative.
    state.tracker.tick(t0 + Duration::hours(25)).await;

    assert_eq!(state.tracker.tracked_count().await, 0);
    assert_eq!(state.registry.active_count().await, 0);

    let mut updates = 0;
    let mut outcomes = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            EngineEvent::PerformanceUpdate(u) => {
                assert_eq!(u.signal_id, signal.id);
                assert_eq!(u.percent_change, Decimal::ZERO);
                // Resolution carries the snapshot's market figures.
                assert_eq!(u.liquidity, Some(Decimal::from(10_000)));
                assert_eq!(u.volume, Some(Decimal::from(40_000)));
                updates += 1;
            }
            EngineEvent::TraderOutcome { wallet, was_correct } => {
                outcomes.push((wallet, was_correct));
            }
            EngineEvent::SignalEmitted(_) => {}
        }
    }
    assert_eq!(updates, 8);
    assert_eq!(outcomes, vec![(WALLET.to_string(), false)]);

    // Negative outcome decays the nudged score: 0.51 * 0.8 = 0.408
    assert_eq!(state.scorer.score(WALLET), Decimal::new(408, 3));

    // Slot and cooldown have both cleared; the token is eligible again.
    let next = process_trade_event(
        &state,
        &trade(5_000, Decimal::ONE, t0 + Duration::hours(25)),
    )
    .await
    .unwrap();
    assert!(next.is_some());
}

#[tokio::test]
async fn test_profitable_signal_rewards_evidence_wallet() {
    let (state, _rx) = AppState::new(AppConfig::default(), None);
    let t0 = Utc::now();

    handle_market_snapshot(&state, snapshot(10_000, 5)).unwrap();
    process_trade_event(&state, &trade(5_000, Decimal::ONE, t0))
        .await
        .unwrap()
        .expect("accepted");

    // +50% against the reference price beats the 10% success threshold.
    state
        .market_data
        .record_price(TOKEN, Decimal::new(15, 1));
    state.tracker.tick(t0 + Duration::hours(25)).await;

    // 0.51 * 0.8 + 1.0 * 0.2 = 0.608
    assert_eq!(state.scorer.score(WALLET), Decimal::new(608, 3));
}
