//! Scanlab CLI — run the daily screen and inspect the market cycle.
//!
//! Commands:
//! - `scan` — screen a universe as of a date and persist the snapshot,
//!   cycle-history record, breakout signals, and a CSV results table
//! - `regime` — classify the benchmark and print the recent cycle history

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scanlab_core::domain::BreakoutSignal;
use scanlab_core::regime::RegimeClassifier;
use scanlab_core::series::SeriesStore;
use scanlab_runner::{
    export_results_csv, BarSource, CsvBarSource, CycleHistory, ScreenConfig,
    ScreenOrchestrator, ScreenOutcome, SignalStore, SnapshotStore, Universe,
};

#[derive(Parser)]
#[command(
    name = "scanlab",
    about = "Scanlab CLI — market-cycle classification and breakout screening"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daily screen over a universe of symbols.
    Scan {
        /// Path to a TOML screen config. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory of {SYMBOL}.csv daily bar files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Universe TOML (sectors of tickers).
        #[arg(long)]
        universe: PathBuf,

        /// Benchmark symbol.
        #[arg(long, default_value = "SPY")]
        benchmark: String,

        /// As-of date (YYYY-MM-DD). Defaults to the benchmark's last bar —
        /// the last session the data collaborator completed.
        #[arg(long)]
        as_of: Option<String>,

        /// Output directory for snapshots, history, signals, and CSV.
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,
    },
    /// Classify the benchmark and print the recent cycle history.
    Regime {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long, default_value = "SPY")]
        benchmark: String,

        /// Days of history to print.
        #[arg(long, default_value_t = 20)]
        days: usize,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            config,
            data_dir,
            universe,
            benchmark,
            as_of,
            output_dir,
        } => run_scan(config, data_dir, universe, benchmark, as_of, output_dir),
        Commands::Regime {
            data_dir,
            benchmark,
            days,
            config,
        } => run_regime(data_dir, benchmark, days, config),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ScreenConfig> {
    match path {
        Some(p) => {
            ScreenConfig::from_file(p).with_context(|| format!("loading {}", p.display()))
        }
        None => Ok(ScreenConfig::default()),
    }
}

fn resolve_as_of(
    source: &CsvBarSource,
    benchmark: &str,
    requested: Option<&str>,
) -> Result<NaiveDate> {
    if let Some(s) = requested {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid as-of date '{s}'"));
    }
    let bars = source.load(benchmark)?;
    bars.last()
        .map(|b| b.date)
        .context("benchmark has no bars to derive an as-of date from")
}

fn run_scan(
    config_path: Option<PathBuf>,
    data_dir: PathBuf,
    universe_path: PathBuf,
    benchmark: String,
    as_of: Option<String>,
    output_dir: PathBuf,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let universe = Universe::from_file(&universe_path)
        .with_context(|| format!("loading universe {}", universe_path.display()))?;
    let symbols = universe.all_tickers();

    let source = CsvBarSource::new(&data_dir);
    let as_of = resolve_as_of(&source, &benchmark, as_of.as_deref())?;

    let orchestrator = ScreenOrchestrator::new(config);
    let outcome = orchestrator.run(&source, &benchmark, &symbols, as_of, None)?;

    persist_outcome(&outcome, &output_dir)?;
    print_summary(&outcome, &benchmark);

    Ok(())
}

fn persist_outcome(outcome: &ScreenOutcome, output_dir: &PathBuf) -> Result<()> {
    let snapshots = SnapshotStore::new(output_dir.join("snapshots"));
    let snapshot_path = snapshots.save(&outcome.snapshot)?;

    let history = CycleHistory::new(output_dir.join("history.jsonl"));
    history.append(&outcome.history_record)?;

    let signal_store = SignalStore::new(output_dir.join("signals"));
    let mut by_symbol: BTreeMap<&str, Vec<BreakoutSignal>> = BTreeMap::new();
    for signal in &outcome.signals {
        by_symbol
            .entry(signal.symbol.as_str())
            .or_default()
            .push(signal.clone());
    }
    for (symbol, signals) in by_symbol {
        signal_store.upsert(symbol, &signals)?;
    }

    let csv = export_results_csv(&outcome.snapshot)?;
    let csv_path = output_dir.join(format!("results-{}.csv", outcome.snapshot.date_key));
    std::fs::write(&csv_path, csv)
        .with_context(|| format!("writing {}", csv_path.display()))?;

    println!("Snapshot saved to: {}", snapshot_path.display());
    println!("Results CSV:       {}", csv_path.display());
    Ok(())
}

fn print_summary(outcome: &ScreenOutcome, benchmark: &str) {
    let snapshot = &outcome.snapshot;
    println!();
    println!("=== Screen Snapshot ===");
    println!("Date key:       {}", snapshot.date_key);
    println!(
        "Benchmark:      {benchmark} ({:?} — {})",
        snapshot.benchmark_state, outcome.history_record.status_text
    );
    println!(
        "Scanned:        {}/{}",
        snapshot.total_scanned, snapshot.total_universe
    );
    println!("Skipped:        {}", outcome.skipped.len());
    println!("Results:        {}", snapshot.results.len());
    println!("Signals:        {}", outcome.signals.len());

    if !snapshot.volatility_distribution.is_empty() {
        let dist: Vec<String> = snapshot
            .volatility_distribution
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("Volatility:     {}", dist.join(", "));
    }

    if !snapshot.results.is_empty() {
        println!();
        println!(
            "{:<8} {:>4} {:>6} {:>6} {:>6}  {}",
            "Ticker", "RRS", "RVol", "ADR%", "xATR", "Breakout"
        );
        println!("{}", "-".repeat(52));
        for r in snapshot.results.iter().take(25) {
            let breakout = match &r.breakout {
                Some(b) if b.is_qualified() => format!("qualified {}", b.breakout_date),
                Some(b) => format!("pending {}", b.breakout_date),
                None => String::new(),
            };
            println!(
                "{:<8} {:>4} {:>6.2} {:>6.2} {:>6.2}  {}",
                r.ticker, r.rrs, r.rvol, r.adr_pct, r.atr_multiple, breakout
            );
        }
        if snapshot.results.len() > 25 {
            println!("... and {} more", snapshot.results.len() - 25);
        }
    }
    println!();
}

fn run_regime(
    data_dir: PathBuf,
    benchmark: String,
    days: usize,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let source = CsvBarSource::new(&data_dir);
    let bars = source.load(&benchmark)?;
    let store = SeriesStore::new(benchmark.as_str(), bars, config.series_spec())?;

    let classifier = RegimeClassifier::new(config.regime.clone());
    let records = classifier.classify(&store)?;
    let latest = classifier.latest(&store)?;

    println!();
    println!("=== Market Cycle: {benchmark} ===");
    for record in records.iter().rev().take(days).rev() {
        println!(
            "{}  {:<12} {}",
            record.date,
            format!("{:?}", record.cycle_state),
            record.status_text
        );
    }
    println!();
    println!(
        "Latest: {:?} (pressure {:.3}, momentum {:.1})",
        latest.state, latest.pressure, latest.momentum
    );
    if latest.insufficient_history {
        println!("WARNING: series shorter than the warmup window; state defaults to Neutral");
    }
    println!();

    Ok(())
}
