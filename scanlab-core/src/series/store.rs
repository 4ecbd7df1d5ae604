//! SeriesStore — one symbol's ordered daily bars plus derived rolling series.
//!
//! The store owns the bar sequence and keeps its derived series (moving
//! averages, ATR, average volume) recomputed from the bars on every append,
//! so derived values can never diverge from the underlying data. Validation
//! happens at the boundary: a store that exists holds a well-formed series.

use chrono::NaiveDate;

use crate::domain::Bar;
use crate::error::EngineError;
use crate::indicators::{Atr, AvgVolume, Indicator, IndicatorValues, Sma};

/// Which derived series a store maintains.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub sma_periods: Vec<usize>,
    pub atr_period: usize,
    pub avg_volume_period: usize,
    /// Largest calendar-day gap tolerated between consecutive bars. Covers
    /// weekends and holiday clusters; anything larger is a data hole.
    pub max_gap_days: i64,
}

impl Default for SeriesSpec {
    fn default() -> Self {
        Self {
            sma_periods: vec![50, 200],
            atr_period: 14,
            avg_volume_period: 50,
            max_gap_days: 14,
        }
    }
}

/// In-memory representation of one symbol's daily history.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    symbol: String,
    bars: Vec<Bar>,
    spec: SeriesSpec,
    derived: IndicatorValues,
}

impl SeriesStore {
    /// Build a store from bars already ordered by date.
    ///
    /// Rejects out-of-order or duplicate dates, insane OHLC, bars tagged with
    /// a different symbol, and calendar gaps beyond `spec.max_gap_days`.
    pub fn new(
        symbol: impl Into<String>,
        bars: Vec<Bar>,
        spec: SeriesSpec,
    ) -> Result<Self, EngineError> {
        let symbol = symbol.into();
        validate_bars(&symbol, &bars, None, spec.max_gap_days)?;
        let mut store = Self {
            symbol,
            bars,
            spec,
            derived: IndicatorValues::new(),
        };
        store.recompute();
        Ok(store)
    }

    pub fn with_defaults(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, EngineError> {
        Self::new(symbol, bars, SeriesSpec::default())
    }

    /// Append newer bars. The first appended bar must postdate the current
    /// last bar; derived series are recomputed before returning.
    pub fn append(&mut self, bars: Vec<Bar>) -> Result<(), EngineError> {
        validate_bars(
            &self.symbol,
            &bars,
            self.bars.last().map(|b| b.date),
            self.spec.max_gap_days,
        )?;
        self.bars.extend(bars);
        self.recompute();
        Ok(())
    }

    /// A copy of this store containing only bars dated `as_of` or earlier.
    ///
    /// Used by the orchestrator to pin every symbol to the same as-of date.
    /// A prefix of a valid series is valid, so this cannot fail.
    pub fn truncated(&self, as_of: NaiveDate) -> SeriesStore {
        let bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| b.date <= as_of)
            .cloned()
            .collect();
        let mut store = Self {
            symbol: self.symbol.clone(),
            bars,
            spec: self.spec.clone(),
            derived: IndicatorValues::new(),
        };
        store.recompute();
        store
    }

    fn recompute(&mut self) {
        let mut derived = IndicatorValues::new();
        for &period in &self.spec.sma_periods {
            let sma = Sma::new(period);
            derived.insert(sma.name().to_string(), sma.compute(&self.bars));
        }
        let atr = Atr::new(self.spec.atr_period);
        derived.insert(atr.name().to_string(), atr.compute(&self.bars));
        let avg_vol = AvgVolume::new(self.spec.avg_volume_period);
        derived.insert(avg_vol.name().to_string(), avg_vol.compute(&self.bars));
        self.derived = derived;
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn spec(&self) -> &SeriesSpec {
        &self.spec
    }

    /// SMA series for one of the spec's periods; `None` if not maintained.
    pub fn sma(&self, period: usize) -> Option<&[f64]> {
        self.derived.get_series(&format!("sma_{period}"))
    }

    /// ATR series for the spec's period.
    pub fn atr(&self) -> Option<&[f64]> {
        self.derived
            .get_series(&format!("atr_{}", self.spec.atr_period))
    }

    /// Rolling average volume series for the spec's period.
    pub fn avg_volume(&self) -> Option<&[f64]> {
        self.derived
            .get_series(&format!("avg_vol_{}", self.spec.avg_volume_period))
    }
}

fn validate_bars(
    symbol: &str,
    bars: &[Bar],
    prev_last_date: Option<NaiveDate>,
    max_gap_days: i64,
) -> Result<(), EngineError> {
    let mut last_date = prev_last_date;
    for bar in bars {
        if bar.symbol != symbol {
            return Err(EngineError::DataIntegrity(format!(
                "{symbol}: bar tagged '{}' on {}",
                bar.symbol, bar.date
            )));
        }
        if !bar.is_sane() {
            return Err(EngineError::DataIntegrity(format!(
                "{symbol}: insane OHLC on {}",
                bar.date
            )));
        }
        if let Some(prev) = last_date {
            if bar.date <= prev {
                return Err(EngineError::DataIntegrity(format!(
                    "{symbol}: non-monotonic date {} after {}",
                    bar.date, prev
                )));
            }
            let gap = (bar.date - prev).num_days();
            if gap > max_gap_days {
                return Err(EngineError::DataIntegrity(format!(
                    "{symbol}: {gap}-day gap between {} and {}",
                    prev, bar.date
                )));
            }
        }
        last_date = Some(bar.date);
    }
    Ok(())
}
