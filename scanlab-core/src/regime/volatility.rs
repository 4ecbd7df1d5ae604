//! Per-symbol volatility regime.
//!
//! Ratio of short-window to long-window realized volatility (standard
//! deviation of daily returns). Below the low bound the symbol is coiling
//! (contraction), above the high bound it is expanding, in between it is in
//! transition. Pure function of the series; recomputed fresh each run and
//! never persisted as history.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngineError;
use crate::series::SeriesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityRegime {
    Contraction,
    Transition,
    Expansion,
}

impl VolatilityRegime {
    pub fn as_str(self) -> &'static str {
        match self {
            VolatilityRegime::Contraction => "contraction",
            VolatilityRegime::Transition => "transition",
            VolatilityRegime::Expansion => "expansion",
        }
    }
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityRegimeConfig {
    pub short_window: usize,
    pub long_window: usize,
    /// Ratio below this is contraction.
    pub low_bound: f64,
    /// Ratio above this is expansion.
    pub high_bound: f64,
}

impl Default for VolatilityRegimeConfig {
    fn default() -> Self {
        Self {
            short_window: 10,
            long_window: 50,
            low_bound: 0.75,
            high_bound: 1.25,
        }
    }
}

/// One classification, valid for the store's latest date only.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityReading {
    pub regime: VolatilityRegime,
    pub ratio: f64,
    pub short_vol: f64,
    pub long_vol: f64,
}

pub struct VolatilityRegimeClassifier {
    config: VolatilityRegimeConfig,
}

impl VolatilityRegimeClassifier {
    pub fn new(config: VolatilityRegimeConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, store: &SeriesStore) -> Result<VolatilityReading, EngineError> {
        let cfg = &self.config;
        let needed = cfg.long_window + 1;
        if store.len() < needed {
            return Err(EngineError::InsufficientHistory {
                needed,
                have: store.len(),
            });
        }

        let closes = store.closes();
        let mut returns = Vec::with_capacity(closes.len() - 1);
        for i in 1..closes.len() {
            if closes[i - 1] == 0.0 {
                return Err(EngineError::Computation(format!(
                    "{}: zero close in return series",
                    store.symbol()
                )));
            }
            returns.push(closes[i] / closes[i - 1] - 1.0);
        }

        let short_vol = stddev(&returns[returns.len() - cfg.short_window..]);
        let long_vol = stddev(&returns[returns.len() - cfg.long_window..]);

        if long_vol == 0.0 {
            return Err(EngineError::Computation(format!(
                "{}: zero long-window volatility",
                store.symbol()
            )));
        }

        let ratio = short_vol / long_vol;
        let regime = if ratio < cfg.low_bound {
            VolatilityRegime::Contraction
        } else if ratio > cfg.high_bound {
            VolatilityRegime::Expansion
        } else {
            VolatilityRegime::Transition
        };

        Ok(VolatilityReading {
            regime,
            ratio,
            short_vol,
            long_vol,
        })
    }
}

/// Sample standard deviation.
fn stddev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}
