use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::clamp01;
use crate::config::AppConfig;
use crate::errors::EngineError;
use crate::models;

/// One price/volume observation in a token's series, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: Decimal,
    pub volume: Decimal,
}

/// Technical pattern scoring from price/volume series: breakout over rolling
/// resistance with volume confirmation, plus support/resistance proximity.
/// Early-life tokens without enough history score neutral rather than failing.
pub struct PatternAnalyzer {
    series: RwLock<HashMap<String, Vec<PricePoint>>>,
    min_len: usize,
    neutral: Decimal,
    volume_multiplier: Decimal,
}

impl PatternAnalyzer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            min_len: config.min_series_len,
            neutral: config.pattern_neutral_score,
            volume_multiplier: config.breakout_volume_multiplier,
        }
    }

    /// Replace the stored series for a token.
    pub fn update_series(&self, token: &str, points: Vec<PricePoint>) -> Result<(), EngineError> {
        models::validate_token_id(token)?;
        let mut series = self.series.write().expect("series lock poisoned");
        series.insert(token.to_string(), points);
        Ok(())
    }

    /// Pattern score in [0, 1] for the stored series; neutral if no series
    /// has been pushed for the token yet.
    pub fn score(&self, token: &str) -> Decimal {
        let series = self.series.read().expect("series lock poisoned");
        match series.get(token) {
            Some(points) => evaluate(points, self.min_len, self.neutral, self.volume_multiplier),
            None => self.neutral,
        }
    }
}

/// Score a price/volume series. Below `min_len` the series carries too little
/// information and the configured neutral score is returned.
pub fn evaluate(
    points: &[PricePoint],
    min_len: usize,
    neutral: Decimal,
    volume_multiplier: Decimal,
) -> Decimal {
    if points.len() < min_len.max(2) {
        return neutral;
    }

    let (last, window) = points.split_last().expect("len checked above");

    let resistance = window
        .iter()
        .map(|p| p.price)
        .max()
        .expect("window is non-empty");
    let support = window
        .iter()
        .map(|p| p.price)
        .min()
        .expect("window is non-empty");
    let avg_volume = window.iter().map(|p| p.volume).sum::<Decimal>()
        / Decimal::from(window.len() as i64);

    let breakout = if last.price > resistance {
        if last.volume > avg_volume * volume_multiplier {
            Decimal::ONE
        } else {
            // Price broke resistance without volume confirmation.
            Decimal::new(6, 1)
        }
    } else {
        Decimal::ZERO
    };

    // Position within the support/resistance band; near resistance reads as
    // strength, near support as weakness.
    let proximity = if resistance > support {
        clamp01((last.price - support) / (resistance - support))
    } else {
        Decimal::new(5, 1)
    };

    let half = Decimal::new(5, 1);
    clamp01(half * breakout + half * proximity)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
