use std::fmt;

/// Engine-level error taxonomy. No variant is fatal to the process: the
/// pipeline degrades to neutral scores or retries instead of halting.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed identifiers or inputs. The caller must not retry with the
    /// same input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A collaborator could not supply a snapshot or series at evaluation
    /// time. Evaluators fall back to neutral defaults; the tracker retries
    /// on its next tick.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// A storage write failed. Checkpoints stay unresolved and are retried;
    /// they are never marked resolved without a successful write.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Why the registry declined to emit a signal. Rejections are expected
/// outcomes, not errors — two submissions racing on the same token resolve
/// to one acceptance and one cooldown rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Confidence fell below the lowest tier threshold.
    TierRejected,
    /// An ACTIVE signal already exists for the token.
    ActiveSignal,
    /// The per-token cooldown since the last signal has not elapsed.
    Cooldown { remaining_secs: i64 },
    /// The global signals-per-hour cap was reached.
    Throttled,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TierRejected => write!(f, "confidence below lowest tier threshold"),
            RejectReason::ActiveSignal => write!(f, "active signal already exists"),
            RejectReason::Cooldown { remaining_secs } => {
                write!(f, "cooldown active ({remaining_secs}s remaining)")
            }
            RejectReason::Throttled => write!(f, "hourly signal limit reached"),
        }
    }
}
