//! Volatility-contraction scanner.
//!
//! Three separate stages so callers can tell a watchlist candidate from an
//! actionable signal from a noisy false breakout:
//! - **pattern**: a trailing run of strictly shrinking swing legs over a
//!   rising long-term average;
//! - **trigger**: a close above the final swing high on a volume surge,
//!   which emits a `BreakoutSignal`;
//! - **confirmation**: the close holds the breakout level for a trailing
//!   window, stamping `qualified_date`. A close back below the level inside
//!   the window invalidates the signal — it is dropped, no failure record.
//!
//! The scan is a pure function of the bar history: rescanning fixed history
//! reproduces the same report.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BreakoutSignal, ContractionSequence};
use crate::error::EngineError;
use crate::scan::pivots::{swing_pivots, Pivot, PivotKind};
use crate::series::SeriesStore;

/// Where a symbol sits in the pattern lifecycle as of the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// Trend prerequisite not met.
    Idle,
    /// Above a rising long-term average, no contraction structure yet.
    PriorUptrend,
    /// Enough shrinking legs to count as a contraction.
    ContractionForming,
    /// Final leg below the tightness threshold.
    Tight,
    /// Volume-confirmed breakout, confirmation window still open.
    Breakout,
    /// Breakout held the level through the confirmation window.
    Qualified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcpConfig {
    /// Long-term moving average the trend filter checks against.
    pub trend_ma: usize,
    /// The average itself must have risen over this many bars.
    pub trend_rise_window: usize,
    /// Swing-pivot detection half-window.
    pub pivot_order: usize,
    /// Minimum legs in the contracting run (anchor included).
    pub min_legs: usize,
    /// Most legs kept in the reported sequence.
    pub max_legs: usize,
    /// Final leg range (percent of its swing high) below this is tight.
    pub tightness_max_pct: f64,
    /// Final-leg volume below this fraction of average volume is a dry-up.
    pub dry_up_ratio: f64,
    /// Breakout-day volume must exceed this multiple of its average.
    pub breakout_volume_multiple: f64,
    /// Trading days the close must hold the level after a breakout.
    pub confirmation_window: usize,
    /// Average-volume window for the breakout check (as-of day excluded).
    pub volume_avg_window: usize,
}

impl Default for VcpConfig {
    fn default() -> Self {
        Self {
            trend_ma: 200,
            trend_rise_window: 20,
            pivot_order: 5,
            min_legs: 3,
            max_legs: 4,
            tightness_max_pct: 4.0,
            dry_up_ratio: 0.7,
            breakout_volume_multiple: 1.5,
            confirmation_window: 5,
            volume_avg_window: 20,
        }
    }
}

impl VcpConfig {
    /// Bars required before a scan can run at all.
    pub fn min_history(&self) -> usize {
        self.trend_ma + self.trend_rise_window
    }
}

/// Scanner output for one symbol, valid as of the series' last bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub symbol: String,
    pub state: ScanState,
    /// Present once a qualifying contraction run exists.
    pub contraction: Option<ContractionSequence>,
    /// Present only for a live (pending or qualified) breakout.
    pub signal: Option<BreakoutSignal>,
}

/// One swing-high-to-swing-low leg.
#[derive(Debug, Clone, Copy)]
struct Leg {
    high_idx: usize,
    low_idx: usize,
    high_price: f64,
    range_pct: f64,
}

enum BreakoutOutcome {
    None,
    Invalidated,
    Pending(BreakoutSignal),
    Qualified(BreakoutSignal),
}

pub struct VcpScanner {
    config: VcpConfig,
}

impl VcpScanner {
    pub fn new(config: VcpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VcpConfig {
        &self.config
    }

    pub fn scan(&self, store: &SeriesStore) -> Result<ScanReport, EngineError> {
        let cfg = &self.config;
        let bars = store.bars();
        let n = bars.len();
        let needed = cfg.min_history();
        if n < needed {
            return Err(EngineError::InsufficientHistory { needed, have: n });
        }
        let symbol = store.symbol().to_string();
        let last = n - 1;

        // Trend prerequisite: close above a rising long-term average.
        let sma = store.sma(cfg.trend_ma).ok_or_else(|| {
            EngineError::Computation(format!(
                "{symbol}: sma_{} not maintained by series spec",
                cfg.trend_ma
            ))
        })?;
        let ma_now = sma[last];
        let ma_then = sma[last - cfg.trend_rise_window];
        if ma_now.is_nan() || ma_then.is_nan() {
            return Err(EngineError::InsufficientHistory { needed, have: n });
        }
        if bars[last].close <= ma_now || ma_now <= ma_then {
            return Ok(ScanReport {
                symbol,
                state: ScanState::Idle,
                contraction: None,
                signal: None,
            });
        }

        // Swing structure.
        let pivots = swing_pivots(bars, cfg.pivot_order);
        let legs = legs_from_pivots(&pivots);
        let run = trailing_contraction(&legs, cfg.max_legs);

        if run.len() < cfg.min_legs {
            return Ok(ScanReport {
                symbol,
                state: ScanState::PriorUptrend,
                contraction: None,
                signal: None,
            });
        }

        let final_leg = run[run.len() - 1];
        let contraction = self.build_sequence(bars, store, run);

        let mut state = if contraction.is_tight {
            ScanState::Tight
        } else {
            ScanState::ContractionForming
        };
        let mut signal = None;

        if contraction.is_tight {
            match self.detect_breakout(bars, &final_leg, &symbol, &contraction)? {
                BreakoutOutcome::None | BreakoutOutcome::Invalidated => {}
                BreakoutOutcome::Pending(sig) => {
                    state = ScanState::Breakout;
                    signal = Some(sig);
                }
                BreakoutOutcome::Qualified(sig) => {
                    state = ScanState::Qualified;
                    signal = Some(sig);
                }
            }
        }

        Ok(ScanReport {
            symbol,
            state,
            contraction: Some(contraction),
            signal,
        })
    }

    fn build_sequence(
        &self,
        bars: &[Bar],
        store: &SeriesStore,
        run: &[Leg],
    ) -> ContractionSequence {
        let leg_ranges_pct: Vec<f64> = run.iter().map(|l| l.range_pct).collect();
        // The run is strictly decreasing, so every denominator is positive.
        let ratios: Vec<f64> = leg_ranges_pct.windows(2).map(|w| w[1] / w[0]).collect();

        let final_leg = run[run.len() - 1];
        let is_tight = final_leg.range_pct < self.config.tightness_max_pct;

        let leg_bars = &bars[final_leg.high_idx..=final_leg.low_idx];
        let leg_vol =
            leg_bars.iter().map(|b| b.volume as f64).sum::<f64>() / leg_bars.len() as f64;
        let avg = store
            .avg_volume()
            .and_then(|s| s.get(final_leg.low_idx).copied())
            .unwrap_or(f64::NAN);
        let is_dry_up = avg.is_finite() && avg > 0.0 && leg_vol < self.config.dry_up_ratio * avg;

        ContractionSequence {
            leg_ranges_pct,
            ratios,
            is_tight,
            is_dry_up,
        }
    }

    fn detect_breakout(
        &self,
        bars: &[Bar],
        leg: &Leg,
        symbol: &str,
        contraction: &ContractionSequence,
    ) -> Result<BreakoutOutcome, EngineError> {
        let cfg = &self.config;
        let level = leg.high_price;
        let last = bars.len() - 1;

        for j in (leg.low_idx + 1)..=last {
            if bars[j].close <= level {
                continue;
            }
            if j < cfg.volume_avg_window {
                continue;
            }
            let avg = bars[j - cfg.volume_avg_window..j]
                .iter()
                .map(|b| b.volume as f64)
                .sum::<f64>()
                / cfg.volume_avg_window as f64;
            if avg <= 0.0 {
                return Err(EngineError::Computation(format!(
                    "{symbol}: zero average volume at breakout check"
                )));
            }
            let ratio = bars[j].volume as f64 / avg;
            if ratio < cfg.breakout_volume_multiple {
                continue;
            }

            // Trigger found. Walk the confirmation window.
            let window_end = j + cfg.confirmation_window;
            for k in (j + 1)..=window_end.min(last) {
                if bars[k].close < level {
                    return Ok(BreakoutOutcome::Invalidated);
                }
            }

            let mut signal = BreakoutSignal {
                symbol: symbol.to_string(),
                signal_date: bars[leg.low_idx].date,
                breakout_date: bars[j].date,
                vcp_metrics: contraction.clone(),
                qualified_date: None,
                rs_rating: None,
                volume_increase_pct: Some(((ratio - 1.0) * 1000.0).round() / 10.0),
            };
            if window_end <= last {
                signal.qualified_date = Some(bars[window_end].date);
                return Ok(BreakoutOutcome::Qualified(signal));
            }
            return Ok(BreakoutOutcome::Pending(signal));
        }

        Ok(BreakoutOutcome::None)
    }
}

/// Pair each pivot high with the pivot low that follows it.
fn legs_from_pivots(pivots: &[Pivot]) -> Vec<Leg> {
    let mut legs = Vec::new();
    for pair in pivots.windows(2) {
        if pair[0].kind == PivotKind::High && pair[1].kind == PivotKind::Low {
            let high = &pair[0];
            let low = &pair[1];
            if high.price > 0.0 {
                legs.push(Leg {
                    high_idx: high.index,
                    low_idx: low.index,
                    high_price: high.price,
                    range_pct: (high.price - low.price) / high.price * 100.0,
                });
            }
        }
    }
    legs
}

/// Trailing run of strictly shrinking legs, capped at `max_legs`.
fn trailing_contraction(legs: &[Leg], max_legs: usize) -> &[Leg] {
    if legs.is_empty() || max_legs == 0 {
        return &[];
    }
    let mut start = legs.len() - 1;
    while start > 0
        && legs.len() - start < max_legs
        && legs[start - 1].range_pct > legs[start].range_pct
    {
        start -= 1;
    }
    &legs[start..]
}
