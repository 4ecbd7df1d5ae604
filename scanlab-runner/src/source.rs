//! Bar sources — the boundary to the data collaborator.
//!
//! The engine never fetches market data itself; a `BarSource` hands over
//! bars that are already materialized. The CSV source backs the CLI, the
//! in-memory source backs tests and embedding callers. The "last complete
//! session" boundary is the explicit as-of date the orchestrator receives —
//! bars past it are never evaluated.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use scanlab_core::domain::Bar;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Hands over one symbol's ordered daily bars.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Ordered daily bars for one symbol, oldest first.
    fn load(&self, symbol: &str) -> Result<Vec<Bar>, SourceError>;
}

/// Directory of `{SYMBOL}.csv` files with a
/// `date,open,high,low,close,volume` header.
pub struct CsvBarSource {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, SourceError> {
        let path = self.dir.join(format!("{symbol}.csv"));
        if !path.exists() {
            return Err(SourceError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let display = path.display().to_string();
        let mut reader = csv::Reader::from_path(&path).map_err(|e| SourceError::Parse {
            path: display.clone(),
            message: e.to_string(),
        })?;

        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|e| SourceError::Parse {
                path: display.clone(),
                message: e.to_string(),
            })?;
            bars.push(Bar {
                symbol: symbol.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        Ok(bars)
    }
}

/// In-memory source for tests and embedding callers.
#[derive(Default)]
pub struct MemoryBarSource {
    bars: HashMap<String, Vec<Bar>>,
}

impl MemoryBarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.bars.insert(symbol.into(), bars);
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.bars.keys().map(String::as_str).collect()
    }
}

impl BarSource for MemoryBarSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, SourceError> {
        self.bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| SourceError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_bars(symbol: &str, n: usize) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..n)
            .map(|i| Bar {
                symbol: symbol.to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume: 10_000,
            })
            .collect()
    }

    #[test]
    fn memory_source_roundtrip() {
        let mut source = MemoryBarSource::new();
        source.insert("SPY", sample_bars("SPY", 5));
        let bars = source.load("SPY").unwrap();
        assert_eq!(bars.len(), 5);
        assert!(matches!(
            source.load("QQQ"),
            Err(SourceError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn csv_source_reads_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SPY.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "date,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-01-02,100.0,101.5,99.5,101.0,1200000").unwrap();
        writeln!(file, "2024-01-03,101.0,102.0,100.0,101.5,900000").unwrap();

        let source = CsvBarSource::new(dir.path());
        let bars = source.load("SPY").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].volume, 1_200_000);
        assert_eq!(bars[1].close, 101.5);
        assert_eq!(bars[0].symbol, "SPY");
    }

    #[test]
    fn csv_source_missing_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvBarSource::new(dir.path());
        assert!(matches!(
            source.load("NOPE"),
            Err(SourceError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn csv_source_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BAD.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "date,open,high,low,close,volume").unwrap();
        writeln!(file, "not-a-date,1,2,3,4,5").unwrap();

        let source = CsvBarSource::new(dir.path());
        assert!(matches!(
            source.load("BAD"),
            Err(SourceError::Parse { .. })
        ));
    }
}
