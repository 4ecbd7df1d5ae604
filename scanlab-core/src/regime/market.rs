//! Market-cycle classifier for the benchmark.
//!
//! Two independent signals per day:
//! - **Volume pressure**: sign of the close-to-close change times that day's
//!   volume, summed over a trailing window and normalized by the window's
//!   total volume (range [-1, 1]), then EMA-smoothed. A rough
//!   accumulation/distribution gauge.
//! - **Momentum**: stochastic of Wilder RSI over a trailing window, with a
//!   WMA-smoothed K line (heavy smoothing keeps the cycle readable).
//!
//! A day is Green when both signals clear their bullish thresholds, Red when
//! both sit below the bearish thresholds, otherwise Neutral. A transition
//! label (`GreenToRed` / `RedToGreen`) replaces the steady label only on the
//! day the market moves from one zone into the other; the next day resolves
//! to the steady state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{HistoryRecord, MarketCycleState};
use crate::error::EngineError;
use crate::indicators::{ema_of_series, wma_of_series, Indicator, Rsi};
use crate::series::SeriesStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Trailing window for the signed-volume sum.
    pub pressure_window: usize,
    /// EMA smoothing applied to the normalized pressure.
    pub pressure_smooth: usize,
    pub pressure_bull: f64,
    pub pressure_bear: f64,
    pub rsi_period: usize,
    /// Stochastic window over the RSI series.
    pub stoch_window: usize,
    /// WMA smoothing of the stochastic K line.
    pub k_smooth: usize,
    pub momentum_bull: f64,
    pub momentum_bear: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            pressure_window: 12,
            pressure_smooth: 7,
            pressure_bull: 0.05,
            pressure_bear: -0.05,
            rsi_period: 14,
            stoch_window: 14,
            k_smooth: 5,
            momentum_bull: 60.0,
            momentum_bear: 40.0,
        }
    }
}

impl RegimeConfig {
    /// Bars required before both signals produce values.
    pub fn warmup_bars(&self) -> usize {
        let momentum = self.rsi_period + self.stoch_window + self.k_smooth - 2;
        let pressure = self.pressure_window + self.pressure_smooth - 1;
        momentum.max(pressure)
    }
}

/// Latest-day view of the benchmark cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleAssessment {
    pub date: NaiveDate,
    pub state: MarketCycleState,
    /// Normalized volume pressure, NaN during warmup.
    pub pressure: f64,
    /// Smoothed stochastic-RSI K line, NaN during warmup.
    pub momentum: f64,
    /// True when the series is shorter than the warmup window; the state is
    /// then Neutral by construction, not by measurement.
    pub insufficient_history: bool,
}

pub struct RegimeClassifier {
    config: RegimeConfig,
}

/// Zone on one day before transition labeling.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Zone {
    Bull,
    Bear,
    Flat,
}

impl RegimeClassifier {
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Classify every day of the benchmark series.
    ///
    /// Warmup days are Neutral. The store guarantees monotonic dates, so the
    /// only rejected input is an empty series.
    pub fn classify(&self, store: &SeriesStore) -> Result<Vec<HistoryRecord>, EngineError> {
        if store.is_empty() {
            return Err(EngineError::DataIntegrity("empty benchmark series".into()));
        }

        let (pressure, momentum) = self.signals(store);
        let bars = store.bars();

        let mut records = Vec::with_capacity(bars.len());
        let mut last_zone: Option<Zone> = None;
        let mut prev_state = MarketCycleState::Neutral;

        for (i, bar) in bars.iter().enumerate() {
            let zone = self.zone(pressure[i], momentum[i]);
            let state = match zone {
                Zone::Bull => match last_zone {
                    Some(Zone::Bear) => MarketCycleState::RedToGreen,
                    _ => MarketCycleState::Green,
                },
                Zone::Bear => match last_zone {
                    Some(Zone::Bull) => MarketCycleState::GreenToRed,
                    _ => MarketCycleState::Red,
                },
                Zone::Flat => MarketCycleState::Neutral,
            };
            if zone != Zone::Flat {
                last_zone = Some(zone);
            }

            let status_text = status_text(state, prev_state);
            records.push(HistoryRecord::new(bar.date, state, status_text));
            prev_state = state;
        }

        Ok(records)
    }

    /// Classify the latest day only.
    pub fn latest(&self, store: &SeriesStore) -> Result<CycleAssessment, EngineError> {
        let records = self.classify(store)?;
        let last = records
            .last()
            .expect("classify returns one record per bar of a non-empty series");
        let (pressure, momentum) = self.signals(store);
        let i = store.len() - 1;
        Ok(CycleAssessment {
            date: last.date,
            state: last.cycle_state,
            pressure: pressure[i],
            momentum: momentum[i],
            insufficient_history: store.len() < self.config.warmup_bars(),
        })
    }

    fn zone(&self, pressure: f64, momentum: f64) -> Zone {
        if pressure.is_nan() || momentum.is_nan() {
            return Zone::Flat;
        }
        if pressure > self.config.pressure_bull && momentum > self.config.momentum_bull {
            Zone::Bull
        } else if pressure < self.config.pressure_bear && momentum < self.config.momentum_bear {
            Zone::Bear
        } else {
            Zone::Flat
        }
    }

    /// Compute the (pressure, momentum) series, NaN during warmup.
    fn signals(&self, store: &SeriesStore) -> (Vec<f64>, Vec<f64>) {
        let bars = store.bars();
        let n = bars.len();
        let cfg = &self.config;

        // Signed volume: direction of the close change times the day's volume.
        let mut signed = vec![f64::NAN; n];
        for i in 1..n {
            let diff = bars[i].close - bars[i - 1].close;
            let sign = if diff > 0.0 {
                1.0
            } else if diff < 0.0 {
                -1.0
            } else {
                0.0
            };
            signed[i] = sign * bars[i].volume as f64;
        }

        // Rolling sum normalized by the window's total volume.
        let mut raw_pressure = vec![f64::NAN; n];
        if n > cfg.pressure_window {
            for i in cfg.pressure_window..n {
                let start = i + 1 - cfg.pressure_window;
                let sum: f64 = signed[start..=i].iter().sum();
                let total: f64 = bars[start..=i].iter().map(|b| b.volume as f64).sum();
                if total > 0.0 {
                    raw_pressure[i] = sum / total;
                }
            }
        }
        let pressure = smooth_valid_suffix(&raw_pressure, cfg.pressure_smooth);

        // Stochastic of RSI, WMA-smoothed.
        let rsi = Rsi::new(cfg.rsi_period).compute(bars);
        let mut stoch = vec![f64::NAN; n];
        for i in 0..n {
            if i + 1 < cfg.stoch_window {
                continue;
            }
            let window = &rsi[i + 1 - cfg.stoch_window..=i];
            if window.iter().any(|v| v.is_nan()) {
                continue;
            }
            let lo = window.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            // Degenerate window (RSI pinned flat): fall back to the RSI level
            // itself, which shares the 0-100 scale.
            stoch[i] = if hi - lo == 0.0 {
                rsi[i]
            } else {
                (rsi[i] - lo) / (hi - lo) * 100.0
            };
        }
        let momentum = wma_of_series(&stoch, cfg.k_smooth);

        (pressure, momentum)
    }
}

/// EMA over the valid suffix of a series with a NaN warmup prefix.
fn smooth_valid_suffix(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    match values.iter().position(|v| !v.is_nan()) {
        None => vec![f64::NAN; n],
        Some(start) => {
            let mut result = vec![f64::NAN; n];
            let tail = ema_of_series(&values[start..], period);
            result[start..].copy_from_slice(&tail);
            result
        }
    }
}

fn status_text(state: MarketCycleState, prev: MarketCycleState) -> String {
    match state {
        MarketCycleState::RedToGreen => "Red to Green".into(),
        MarketCycleState::GreenToRed => "Green to Red".into(),
        MarketCycleState::Green => {
            if prev.is_bullish() {
                "still Green".into()
            } else {
                "Start Green".into()
            }
        }
        MarketCycleState::Red => {
            if prev.is_bearish() {
                "still Red".into()
            } else {
                "Start Red".into()
            }
        }
        MarketCycleState::Neutral => "Neutral".into(),
    }
}
