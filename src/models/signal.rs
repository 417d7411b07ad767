use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{TraderProfile, WhaleEvent};

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Discrete signal classification derived from a continuous confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalTier {
    S,
    A,
    B,
    C,
    Rejected,
}

impl SignalTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalTier::S => "S",
            SignalTier::A => "A",
            SignalTier::B => "B",
            SignalTier::C => "C",
            SignalTier::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "S" => Some(SignalTier::S),
            "A" => Some(SignalTier::A),
            "B" => Some(SignalTier::B),
            "C" => Some(SignalTier::C),
            "REJECTED" => Some(SignalTier::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for SignalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStatus {
    Active,
    Expired,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Active => "ACTIVE",
            SignalStatus::Expired => "EXPIRED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(SignalStatus::Active),
            "EXPIRED" => Some(SignalStatus::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConfidenceInput + evidence
// ---------------------------------------------------------------------------

/// Component scores for one evaluation, each in [0, 1]. Transient —
/// constructed per evaluation, persisted only inside signal evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInput {
    pub token: String,
    pub trader_quality: Decimal,
    pub whale_activity: Decimal,
    pub market_health: Decimal,
    pub technical_pattern: Decimal,
}

/// Frozen copy of the inputs that produced a signal, used for outcome
/// attribution at the terminal checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvidence {
    pub input: ConfidenceInput,
    pub whale_events: Vec<WhaleEvent>,
    pub traders: Vec<TraderProfile>,
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// An emitted trading opportunity record. Created by the registry; its status
/// is mutated only by the performance tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub token: String,
    pub tier: SignalTier,
    pub confidence: Decimal,
    /// Token price at signal creation, the baseline for percent-change.
    pub reference_price: Decimal,
    pub status: SignalStatus,
    pub evidence: SignalEvidence,
    pub created_at: DateTime<Utc>,
}
