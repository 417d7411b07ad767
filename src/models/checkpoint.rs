use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Horizon
// ---------------------------------------------------------------------------

/// Fixed re-evaluation offsets relative to signal creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    M3,
    M5,
    M10,
    M30,
    H1,
    H2,
    H4,
    H24,
}

impl Horizon {
    /// All horizons in resolution order. Checkpoints within a signal resolve
    /// strictly in this order.
    pub const ALL: [Horizon; 8] = [
        Horizon::M3,
        Horizon::M5,
        Horizon::M10,
        Horizon::M30,
        Horizon::H1,
        Horizon::H2,
        Horizon::H4,
        Horizon::H24,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            Horizon::M3 => 3,
            Horizon::M5 => 5,
            Horizon::M10 => 10,
            Horizon::M30 => 30,
            Horizon::H1 => 60,
            Horizon::H2 => 120,
            Horizon::H4 => 240,
            Horizon::H24 => 1440,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Horizon::M3 => "3m",
            Horizon::M5 => "5m",
            Horizon::M10 => "10m",
            Horizon::M30 => "30m",
            Horizon::H1 => "1h",
            Horizon::H2 => "2h",
            Horizon::H4 => "4h",
            Horizon::H24 => "24h",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Horizon::ALL.into_iter().find(|h| h.label() == label)
    }

    /// The 24h horizon closes the signal and triggers outcome attribution.
    pub fn is_terminal(self) -> bool {
        self == Horizon::H24
    }

    pub fn offset(self) -> Duration {
        Duration::minutes(self.minutes())
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointState {
    Scheduled,
    Due,
    Resolved,
}

/// A scheduled future evaluation point for one signal at one horizon. Mutated
/// exactly once at resolution, then immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceCheckpoint {
    pub signal_id: Uuid,
    pub horizon: Horizon,
    pub due_at: DateTime<Utc>,
    pub resolved: bool,
    pub percent_change: Option<Decimal>,
    pub liquidity: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub whale_activity: Option<Decimal>,
    pub holder_growth: Option<Decimal>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PerformanceCheckpoint {
    pub fn scheduled(signal_id: Uuid, horizon: Horizon, created_at: DateTime<Utc>) -> Self {
        Self {
            signal_id,
            horizon,
            due_at: created_at + horizon.offset(),
            resolved: false,
            percent_change: None,
            liquidity: None,
            volume: None,
            whale_activity: None,
            holder_growth: None,
            resolved_at: None,
        }
    }

    /// Build the full batch for a new signal, in resolution order.
    pub fn batch_for(signal_id: Uuid, created_at: DateTime<Utc>) -> Vec<Self> {
        Horizon::ALL
            .into_iter()
            .map(|h| Self::scheduled(signal_id, h, created_at))
            .collect()
    }

    pub fn state(&self, now: DateTime<Utc>) -> CheckpointState {
        if self.resolved {
            CheckpointState::Resolved
        } else if now >= self.due_at {
            CheckpointState::Due
        } else {
            CheckpointState::Scheduled
        }
    }
}

// ---------------------------------------------------------------------------
// PerformanceUpdate — outbound record
// ---------------------------------------------------------------------------

/// Emitted once per resolved checkpoint, consumed by the notification
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceUpdate {
    pub signal_id: Uuid,
    pub token: String,
    pub horizon: Horizon,
    pub percent_change: Decimal,
    pub price: Decimal,
    pub liquidity: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub holder_growth: Option<Decimal>,
    pub whale_activity: Option<Decimal>,
    /// Best percent change seen across resolutions so far.
    pub max_gain: Decimal,
    pub resolved_at: DateTime<Utc>,
}
