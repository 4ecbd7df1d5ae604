//! Relative-strength ranking, relative volume, and average daily range.
//!
//! Two-pass design: pass one computes each symbol's weighted relative-return
//! score independently (embarrassingly parallel); pass two converts the
//! collected scores into percentile ranks 0-99 across the universe, which
//! needs every score present — the run's one synchronization barrier.
//!
//! All metrics are evaluated at the store's final bar. The orchestrator pins
//! every store to the same as-of date before calling in, so no symbol sees a
//! different benchmark state than another.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::indicators::Roc;
use crate::series::SeriesStore;

/// One trailing-return window and its weight in the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnWindow {
    pub days: usize,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Average-volume window for RVol (the as-of day is excluded).
    pub rvol_window: usize,
    /// Window for the average daily range.
    pub adr_window: usize,
    /// Moving average the ATR extension is measured against.
    pub extension_ma: usize,
    /// Trailing-return windows, most recent weighted heaviest.
    pub return_windows: Vec<ReturnWindow>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        // Quarterly windows with the front quarter double-weighted.
        Self {
            rvol_window: 50,
            adr_window: 20,
            extension_ma: 50,
            return_windows: vec![
                ReturnWindow {
                    days: 63,
                    weight: 0.40,
                },
                ReturnWindow {
                    days: 126,
                    weight: 0.20,
                },
                ReturnWindow {
                    days: 189,
                    weight: 0.20,
                },
                ReturnWindow {
                    days: 252,
                    weight: 0.20,
                },
            ],
        }
    }
}

impl RankingConfig {
    /// Bars a symbol needs before every metric is computable. Symbols below
    /// this are excluded entirely — no partial metrics.
    pub fn min_history(&self) -> usize {
        let longest_window = self
            .return_windows
            .iter()
            .map(|w| w.days)
            .max()
            .unwrap_or(0)
            + 1;
        longest_window
            .max(self.rvol_window + 1)
            .max(self.adr_window)
            .max(self.extension_ma)
    }
}

/// Pass-one output for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnScore {
    pub symbol: String,
    pub score: f64,
}

pub struct RankingEngine {
    config: RankingConfig,
}

impl RankingEngine {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Weighted sum over the configured windows of the symbol's trailing
    /// return minus the benchmark's. Pass one of the ranking barrier.
    pub fn relative_score(
        &self,
        store: &SeriesStore,
        benchmark: &SeriesStore,
    ) -> Result<f64, EngineError> {
        let needed = self.config.min_history();
        if store.len() < needed {
            return Err(EngineError::InsufficientHistory {
                needed,
                have: store.len(),
            });
        }
        if benchmark.len() < needed {
            return Err(EngineError::Upstream(format!(
                "benchmark '{}' has {} bars, ranking needs {}",
                benchmark.symbol(),
                benchmark.len(),
                needed
            )));
        }

        let mut score = 0.0;
        for window in &self.config.return_windows {
            let roc = Roc::new(window.days);
            let sym = roc.latest(store.bars());
            let bench = roc.latest(benchmark.bars());
            if sym.is_nan() || bench.is_nan() {
                return Err(EngineError::Computation(format!(
                    "{}: undefined {}-day return",
                    store.symbol(),
                    window.days
                )));
            }
            score += window.weight * (sym - bench);
        }
        Ok(score)
    }

    /// As-of day volume over its trailing average, excluding the as-of day
    /// from the average.
    pub fn rvol(&self, store: &SeriesStore) -> Result<f64, EngineError> {
        let window = self.config.rvol_window;
        if store.len() < window + 1 {
            return Err(EngineError::InsufficientHistory {
                needed: window + 1,
                have: store.len(),
            });
        }
        let bars = store.bars();
        let last = bars.len() - 1;
        let avg: f64 = bars[last - window..last]
            .iter()
            .map(|b| b.volume as f64)
            .sum::<f64>()
            / window as f64;
        if avg <= 0.0 {
            return Err(EngineError::Computation(format!(
                "{}: zero average volume",
                store.symbol()
            )));
        }
        Ok(bars[last].volume as f64 / avg)
    }

    /// Mean of (high - low) / close over the window, as a percent.
    pub fn adr_pct(&self, store: &SeriesStore) -> Result<f64, EngineError> {
        let window = self.config.adr_window;
        if store.len() < window {
            return Err(EngineError::InsufficientHistory {
                needed: window,
                have: store.len(),
            });
        }
        let bars = store.bars();
        let sum: f64 = bars[bars.len() - window..]
            .iter()
            .map(|b| b.range_pct())
            .sum();
        Ok(sum / window as f64)
    }

    /// Extension of the close above the configured moving average, in ATR
    /// units. Negative when the close sits below the average.
    pub fn atr_extension(&self, store: &SeriesStore) -> Result<f64, EngineError> {
        let last = match store.len().checked_sub(1) {
            Some(i) => i,
            None => {
                return Err(EngineError::InsufficientHistory {
                    needed: self.config.extension_ma,
                    have: 0,
                })
            }
        };
        let ma = store
            .sma(self.config.extension_ma)
            .and_then(|s| s.get(last).copied())
            .unwrap_or(f64::NAN);
        let atr = store
            .atr()
            .and_then(|s| s.get(last).copied())
            .unwrap_or(f64::NAN);
        if ma.is_nan() || atr.is_nan() {
            return Err(EngineError::InsufficientHistory {
                needed: self.config.extension_ma,
                have: store.len(),
            });
        }
        if atr <= 0.0 {
            return Err(EngineError::Computation(format!(
                "{}: non-positive ATR",
                store.symbol()
            )));
        }
        Ok((store.bars()[last].close - ma) / atr)
    }
}

/// Pass two: convert raw scores into percentile ranks 0-99.
///
/// A symbol's rank is the share of the universe scoring strictly below it,
/// scaled to 0-99 and rounded. Identical scores receive identical ranks;
/// higher scores never rank below lower ones. Non-finite scores are dropped.
/// A single-symbol universe ranks 50 — there is nothing to rank against.
pub fn assign_ranks(scores: &[ReturnScore]) -> BTreeMap<String, u8> {
    let mut finite: Vec<&ReturnScore> = scores.iter().filter(|s| s.score.is_finite()).collect();
    let n = finite.len();
    let mut ranks = BTreeMap::new();
    if n == 0 {
        return ranks;
    }
    if n == 1 {
        ranks.insert(finite[0].symbol.clone(), 50);
        return ranks;
    }

    finite.sort_by(|a, b| a.score.partial_cmp(&b.score).expect("scores are finite"));
    let sorted: Vec<f64> = finite.iter().map(|s| s.score).collect();

    for entry in &finite {
        let below = sorted.partition_point(|s| *s < entry.score);
        let rank = (99.0 * below as f64 / (n - 1) as f64).round() as u8;
        ranks.insert(entry.symbol.clone(), rank.min(99));
    }
    ranks
}
