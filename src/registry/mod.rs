use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::{EngineError, RejectReason};
use crate::models::{Signal, SignalEvidence, SignalStatus, SignalTier};

/// Outcome of a submission. Rejection is the common path and carries no
/// error semantics.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted(Box<Signal>),
    Rejected(RejectReason),
}

struct RegistryState {
    /// token -> id of its single ACTIVE signal.
    active: HashMap<String, Uuid>,
    /// token -> creation time of the most recent signal, for cooldown.
    last_created: HashMap<String, DateTime<Utc>>,
    /// Creation times inside the trailing hour, for the global throttle.
    recent: VecDeque<DateTime<Utc>>,
}

/// Admission gate for signal emission. All checks and the registration of an
/// accepted signal happen under one lock, so two submissions racing on the
/// same token resolve to exactly one acceptance.
pub struct SignalRegistry {
    state: Mutex<RegistryState>,
    cooldown: Duration,
    max_per_hour: usize,
    pool: Option<PgPool>,
}

impl SignalRegistry {
    pub fn new(config: &AppConfig, pool: Option<PgPool>) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                active: HashMap::new(),
                last_created: HashMap::new(),
                recent: VecDeque::new(),
            }),
            cooldown: Duration::seconds(config.signal_cooldown_secs as i64),
            max_per_hour: config.max_signals_per_hour,
            pool,
        }
    }

    /// Admit or reject a scored evaluation. On acceptance the signal row is
    /// persisted before the in-memory registration becomes visible; a failed
    /// write leaves no registration behind.
    pub async fn submit(
        &self,
        token: &str,
        tier: SignalTier,
        confidence: Decimal,
        reference_price: Decimal,
        evidence: SignalEvidence,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome, EngineError> {
        if tier == SignalTier::Rejected {
            return Ok(SubmitOutcome::Rejected(RejectReason::TierRejected));
        }

        let mut state = self.state.lock().await;

        if state.active.contains_key(token) {
            return Ok(SubmitOutcome::Rejected(RejectReason::ActiveSignal));
        }

        if let Some(last) = state.last_created.get(token) {
            let elapsed = now - *last;
            if elapsed < self.cooldown {
                let remaining_secs = (self.cooldown - elapsed).num_seconds();
                return Ok(SubmitOutcome::Rejected(RejectReason::Cooldown {
                    remaining_secs,
                }));
            }
        }

        let hour_ago = now - Duration::hours(1);
        while state.recent.front().is_some_and(|t| *t < hour_ago) {
            state.recent.pop_front();
        }
        if state.recent.len() >= self.max_per_hour {
            return Ok(SubmitOutcome::Rejected(RejectReason::Throttled));
        }

        let signal = Signal {
            id: Uuid::new_v4(),
            token: token.to_string(),
            tier,
            confidence,
            reference_price,
            status: SignalStatus::Active,
            evidence,
            created_at: now,
        };

        if let Some(pool) = &self.pool {
            crate::db::signal_repo::insert_signal(pool, &signal).await?;
        }

        state.active.insert(token.to_string(), signal.id);
        state.last_created.insert(token.to_string(), now);
        state.recent.push_back(now);

        tracing::info!(
            signal_id = %signal.id,
            token = %signal.token,
            tier = %signal.tier,
            confidence = %signal.confidence,
            "Signal registered"
        );

        Ok(SubmitOutcome::Accepted(Box::new(signal)))
    }

    /// Release a token's active slot after its signal finished tracking.
    /// Idempotent, and a no-op if the slot is held by a different signal.
    pub async fn mark_expired(&self, token: &str, signal_id: Uuid) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock().await;
            if state.active.get(token) == Some(&signal_id) {
                state.active.remove(token);
            }
        }

        if let Some(pool) = &self.pool {
            crate::db::signal_repo::mark_expired(pool, signal_id).await?;
        }

        tracing::info!(signal_id = %signal_id, token = %token, "Signal expired");
        Ok(())
    }

    /// Re-seed registry state from persisted ACTIVE signals on startup.
    pub async fn restore(&self, signals: &[Signal]) {
        let mut state = self.state.lock().await;
        for signal in signals {
            state.active.insert(signal.token.clone(), signal.id);
            state
                .last_created
                .entry(signal.token.clone())
                .and_modify(|t| {
                    if signal.created_at > *t {
                        *t = signal.created_at;
                    }
                })
                .or_insert(signal.created_at);
        }
    }

    pub async fn active_count(&self) -> usize {
        self.state.lock().await.active.len()
    }
}
