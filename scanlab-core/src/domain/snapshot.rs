//! Screen results and the daily snapshot handed to persistence.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::cycle::MarketCycleState;
use crate::domain::signal::{BreakoutSignal, ContractionSequence};
use crate::regime::VolatilityRegime;

/// Per-symbol ranking metrics, computed fresh each run. Not persisted on
/// their own — only as part of a `ScreenResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMetrics {
    /// Relative strength rating: dense percentile 0-99 across the universe.
    pub rrs: u8,
    /// Current volume over its trailing average, as a multiple.
    pub rvol: f64,
    /// Average daily high-low range as a percent of price.
    pub adr_pct: f64,
}

/// One qualifying symbol in a daily snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub ticker: String,
    pub rrs: u8,
    pub rvol: f64,
    pub adr_pct: f64,
    /// Extension of the close above the 50-day average, in ATR units.
    pub atr_multiple: f64,
    pub vcp_metrics: ContractionSequence,
    /// Present when the scanner confirmed a breakout for this symbol.
    pub breakout: Option<BreakoutSignal>,
    pub volatility_regime: VolatilityRegime,
}

impl ScreenResult {
    pub fn has_qualified_breakout(&self) -> bool {
        self.breakout.as_ref().is_some_and(|b| b.is_qualified())
    }
}

/// The daily screen output, owned by the orchestrator for the duration of
/// one run and then handed off to persistence. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    /// `YYYYMMDD` of the as-of date.
    pub date_key: String,
    /// Unique by ticker.
    pub results: Vec<ScreenResult>,
    /// Symbols actually evaluated this run (includes skips, excludes symbols
    /// never reached after a cancellation).
    pub total_scanned: usize,
    /// Size of the configured universe; `total_scanned < total_universe`
    /// marks a degraded or cancelled run.
    pub total_universe: usize,
    pub updated_at: NaiveDateTime,
    /// Benchmark cycle state the whole run was evaluated under.
    pub benchmark_state: MarketCycleState,
    /// Count of symbols per volatility regime across the scanned universe.
    pub volatility_distribution: BTreeMap<String, usize>,
    /// Hash of (universe, benchmark, as-of date) identifying the inputs.
    pub dataset_hash: String,
}

impl DailySnapshot {
    /// Ticker lookup used by the serving layer.
    pub fn result_for(&self, ticker: &str) -> Option<&ScreenResult> {
        self.results.iter().find(|r| r.ticker == ticker)
    }

    pub fn is_degraded(&self) -> bool {
        self.total_scanned < self.total_universe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_result(ticker: &str) -> ScreenResult {
        ScreenResult {
            ticker: ticker.into(),
            rrs: 92,
            rvol: 2.35,
            adr_pct: 4.1,
            atr_multiple: 1.8,
            vcp_metrics: ContractionSequence::default(),
            breakout: None,
            volatility_regime: VolatilityRegime::Contraction,
        }
    }

    fn sample_snapshot() -> DailySnapshot {
        DailySnapshot {
            date_key: "20240607".into(),
            results: vec![sample_result("NVDA"), sample_result("AMD")],
            total_scanned: 3,
            total_universe: 3,
            updated_at: NaiveDate::from_ymd_opt(2024, 6, 7)
                .unwrap()
                .and_hms_opt(22, 15, 0)
                .unwrap(),
            benchmark_state: MarketCycleState::Green,
            volatility_distribution: BTreeMap::new(),
            dataset_hash: "abc123".into(),
        }
    }

    #[test]
    fn result_lookup_by_ticker() {
        let snap = sample_snapshot();
        assert!(snap.result_for("AMD").is_some());
        assert!(snap.result_for("TSLA").is_none());
    }

    #[test]
    fn degraded_when_scan_incomplete() {
        let mut snap = sample_snapshot();
        assert!(!snap.is_degraded());
        snap.total_scanned = 2;
        assert!(snap.is_degraded());
    }

    #[test]
    fn snapshot_field_names_are_stable() {
        let snap = sample_snapshot();
        let value: serde_json::Value = serde_json::to_value(&snap).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 8);
        for key in [
            "date_key",
            "results",
            "total_scanned",
            "total_universe",
            "updated_at",
            "benchmark_state",
            "volatility_distribution",
            "dataset_hash",
        ] {
            assert!(obj.contains_key(key), "missing field {key}");
        }
    }

    #[test]
    fn result_field_names_are_stable() {
        let result = sample_result("NVDA");
        let value: serde_json::Value = serde_json::to_value(&result).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "ticker",
            "rrs",
            "rvol",
            "adr_pct",
            "atr_multiple",
            "vcp_metrics",
            "breakout",
            "volatility_regime",
        ] {
            assert!(obj.contains_key(key), "missing field {key}");
        }
    }

    #[test]
    fn snapshot_roundtrip() {
        let snap = sample_snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let deser: DailySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, deser);
    }
}
