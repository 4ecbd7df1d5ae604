//! Screen orchestration — one as-of date, one snapshot.
//!
//! Run shape:
//! 1. Load and classify the benchmark. Any failure here is fatal — no
//!    snapshot is published from a run that cannot see the market state.
//! 2. Pass one: fan the universe out across a bounded rayon pool. Each
//!    symbol independently computes its raw relative-return score, RVol,
//!    ADR%, ATR extension, VCP scan, and volatility regime. Per-symbol
//!    failures are logged, counted, and isolated.
//! 3. Barrier: collect every score, assign percentile ranks.
//! 4. Pass two: apply the acceptance policy and assemble the snapshot.
//!
//! Cancellation is cooperative: the flag is checked before each symbol, and
//! a cancelled run still yields a valid snapshot whose `total_scanned`
//! reflects only the symbols actually evaluated.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use scanlab_core::domain::{
    date_key, BreakoutSignal, DailySnapshot, HistoryRecord, ScreenResult,
};
use scanlab_core::error::EngineError;
use scanlab_core::ranking::{assign_ranks, RankingEngine, ReturnScore};
use scanlab_core::regime::{
    RegimeClassifier, VolatilityRegime, VolatilityRegimeClassifier,
};
use scanlab_core::scan::{ScanReport, VcpScanner};
use scanlab_core::series::SeriesStore;

use crate::config::ScreenConfig;
use crate::source::{BarSource, SourceError};

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("universe is empty")]
    EmptyUniverse,

    #[error("upstream source failed for benchmark '{symbol}': {source}")]
    Upstream {
        symbol: String,
        #[source]
        source: SourceError,
    },

    #[error("benchmark '{symbol}': {source}")]
    Benchmark {
        symbol: String,
        #[source]
        source: EngineError,
    },
}

/// Why a symbol was left out of the ranked set.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Everything one run produces, handed off to persistence.
#[derive(Debug, Clone)]
pub struct ScreenOutcome {
    pub snapshot: DailySnapshot,
    pub history_record: HistoryRecord,
    /// Live breakout signals (pending and qualified), rated.
    pub signals: Vec<BreakoutSignal>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Pass-one output for one successfully evaluated symbol.
struct SymbolComputation {
    symbol: String,
    score: f64,
    rvol: f64,
    adr_pct: f64,
    atr_multiple: f64,
    avg_volume: f64,
    close: f64,
    scan: ScanReport,
    volatility: VolatilityRegime,
}

enum SymbolOutcome {
    Computed(Box<SymbolComputation>),
    Skipped(SkippedSymbol),
    /// Cancelled before evaluation; not counted as scanned.
    NotReached,
}

pub struct ScreenOrchestrator {
    config: ScreenConfig,
    ranking: RankingEngine,
    scanner: VcpScanner,
    regime: RegimeClassifier,
    volatility: VolatilityRegimeClassifier,
}

impl ScreenOrchestrator {
    pub fn new(config: ScreenConfig) -> Self {
        let ranking = RankingEngine::new(config.ranking.clone());
        let scanner = VcpScanner::new(config.vcp.clone());
        let regime = RegimeClassifier::new(config.regime.clone());
        let volatility = VolatilityRegimeClassifier::new(config.volatility.clone());
        Self {
            config,
            ranking,
            scanner,
            regime,
            volatility,
        }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Run one screen. Every symbol is evaluated against the same as-of
    /// date and the same benchmark state.
    pub fn run(
        &self,
        source: &dyn BarSource,
        benchmark_symbol: &str,
        universe: &[String],
        as_of: NaiveDate,
        cancel: Option<&AtomicBool>,
    ) -> Result<ScreenOutcome, RunError> {
        if universe.is_empty() {
            return Err(RunError::EmptyUniverse);
        }

        // Benchmark first; its failure aborts the run.
        let bench_bars =
            source
                .load(benchmark_symbol)
                .map_err(|source| RunError::Upstream {
                    symbol: benchmark_symbol.to_string(),
                    source,
                })?;
        let bench_store =
            SeriesStore::new(benchmark_symbol, bench_bars, self.config.series_spec())
                .map_err(|source| RunError::Benchmark {
                    symbol: benchmark_symbol.to_string(),
                    source,
                })?
                .truncated(as_of);
        let history = self
            .regime
            .classify(&bench_store)
            .map_err(|source| RunError::Benchmark {
                symbol: benchmark_symbol.to_string(),
                source,
            })?;
        let history_record = history
            .last()
            .cloned()
            .expect("classify yields one record per bar");
        let benchmark_state = history_record.cycle_state;
        info!(
            benchmark = benchmark_symbol,
            state = ?benchmark_state,
            %as_of,
            universe = universe.len(),
            "benchmark classified, starting screen"
        );

        // Pass one: per-symbol fan-out.
        let evaluate = |symbol: &String| -> SymbolOutcome {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return SymbolOutcome::NotReached;
            }
            self.evaluate_symbol(source, symbol, &bench_store, as_of)
        };

        let outcomes: Vec<SymbolOutcome> = if self.config.run.worker_threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.run.worker_threads)
                .build()
                .expect("failed to build worker pool");
            pool.install(|| universe.par_iter().map(evaluate).collect())
        } else {
            universe.iter().map(evaluate).collect()
        };

        let mut computations: Vec<SymbolComputation> = Vec::new();
        let mut skipped = Vec::new();
        let mut total_scanned = 0usize;
        for outcome in outcomes {
            match outcome {
                SymbolOutcome::Computed(c) => {
                    total_scanned += 1;
                    computations.push(*c);
                }
                SymbolOutcome::Skipped(s) => {
                    total_scanned += 1;
                    skipped.push(s);
                }
                SymbolOutcome::NotReached => {}
            }
        }

        // Barrier: every pass-one score must exist before ranks are assigned.
        let scores: Vec<ReturnScore> = computations
            .iter()
            .map(|c| ReturnScore {
                symbol: c.symbol.clone(),
                score: c.score,
            })
            .collect();
        let ranks = assign_ranks(&scores);

        // Pass two: acceptance policy and snapshot assembly.
        let acceptance = &self.config.acceptance;
        let mut results: Vec<ScreenResult> = Vec::new();
        let mut signals: Vec<BreakoutSignal> = Vec::new();
        let mut volatility_distribution: BTreeMap<String, usize> = BTreeMap::new();

        for comp in computations {
            let Some(&rrs) = ranks.get(&comp.symbol) else {
                continue;
            };
            *volatility_distribution
                .entry(comp.volatility.as_str().to_string())
                .or_insert(0) += 1;

            let mut breakout = comp.scan.signal.clone();
            if let Some(signal) = breakout.as_mut() {
                signal.rs_rating = Some(rrs);
                signals.push(signal.clone());
            }

            let accepted = rrs >= acceptance.min_rrs
                && comp.rvol >= acceptance.min_rvol
                && comp.adr_pct >= acceptance.min_adr_pct
                && comp.adr_pct <= acceptance.max_adr_pct
                && comp.avg_volume >= acceptance.min_avg_volume
                && comp.close >= acceptance.min_price;
            if !accepted {
                debug!(symbol = %comp.symbol, rrs, rvol = comp.rvol, adr = comp.adr_pct, "below acceptance");
                continue;
            }

            results.push(ScreenResult {
                ticker: comp.symbol,
                rrs,
                rvol: comp.rvol,
                adr_pct: comp.adr_pct,
                atr_multiple: comp.atr_multiple,
                vcp_metrics: comp.scan.contraction.unwrap_or_default(),
                breakout,
                volatility_regime: comp.volatility,
            });
        }

        // Qualified breakouts lead, then by rating; ticker breaks ties so
        // repeated runs order identically.
        results.sort_by(|a, b| {
            b.has_qualified_breakout()
                .cmp(&a.has_qualified_breakout())
                .then(b.rrs.cmp(&a.rrs))
                .then(a.ticker.cmp(&b.ticker))
        });

        let snapshot = DailySnapshot {
            date_key: date_key(as_of),
            results,
            total_scanned,
            total_universe: universe.len(),
            updated_at: chrono::Utc::now().naive_utc(),
            benchmark_state,
            volatility_distribution,
            dataset_hash: dataset_hash(universe, benchmark_symbol, as_of),
        };

        if snapshot.is_degraded() {
            warn!(
                total_scanned,
                total_universe = universe.len(),
                "degraded run: universe not fully scanned"
            );
        }
        info!(
            results = snapshot.results.len(),
            signals = signals.len(),
            skipped = skipped.len(),
            total_scanned,
            "screen complete"
        );

        Ok(ScreenOutcome {
            snapshot,
            history_record,
            signals,
            skipped,
        })
    }

    fn evaluate_symbol(
        &self,
        source: &dyn BarSource,
        symbol: &str,
        benchmark: &SeriesStore,
        as_of: NaiveDate,
    ) -> SymbolOutcome {
        let skip = |reason: String| {
            warn!(symbol, %reason, "symbol skipped");
            SymbolOutcome::Skipped(SkippedSymbol {
                symbol: symbol.to_string(),
                reason,
            })
        };

        let bars = match source.load(symbol) {
            Ok(bars) => bars,
            Err(e) => return skip(e.to_string()),
        };
        let store = match SeriesStore::new(symbol, bars, self.config.series_spec()) {
            Ok(store) => store.truncated(as_of),
            Err(e) => return skip(e.to_string()),
        };
        let Some(last_date) = store.last_date() else {
            return skip("no bars at or before the as-of date".into());
        };
        if (as_of - last_date).num_days() > self.config.run.stale_days {
            return skip(format!("stale series: last bar {last_date}"));
        }

        let score = match self.ranking.relative_score(&store, benchmark) {
            Ok(score) => score,
            Err(e) => return skip(e.to_string()),
        };
        let rvol = match self.ranking.rvol(&store) {
            Ok(v) => v,
            Err(e) => return skip(e.to_string()),
        };
        let adr_pct = match self.ranking.adr_pct(&store) {
            Ok(v) => v,
            Err(e) => return skip(e.to_string()),
        };
        let atr_multiple = match self.ranking.atr_extension(&store) {
            Ok(v) => v,
            Err(e) => return skip(e.to_string()),
        };
        let scan = match self.scanner.scan(&store) {
            Ok(report) => report,
            Err(e) => return skip(e.to_string()),
        };
        let volatility = match self.volatility.classify(&store) {
            Ok(reading) => reading.regime,
            Err(e) => return skip(e.to_string()),
        };

        let last = store.len() - 1;
        let avg_volume = store
            .avg_volume()
            .and_then(|s| s.get(last).copied())
            .unwrap_or(f64::NAN);
        if !avg_volume.is_finite() {
            return skip("no trailing average volume".into());
        }

        SymbolOutcome::Computed(Box::new(SymbolComputation {
            symbol: symbol.to_string(),
            score,
            rvol,
            adr_pct,
            atr_multiple,
            avg_volume,
            close: store.bars()[last].close,
            scan,
            volatility,
        }))
    }
}

/// Content hash identifying the inputs a snapshot was computed from.
fn dataset_hash(universe: &[String], benchmark: &str, as_of: NaiveDate) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(benchmark.as_bytes());
    hasher.update(as_of.to_string().as_bytes());
    let mut sorted: Vec<&str> = universe.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    for symbol in sorted {
        hasher.update(symbol.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}
