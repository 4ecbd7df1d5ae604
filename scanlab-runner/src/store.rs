//! Snapshot, cycle-history, and signal persistence.
//!
//! Plain JSON on disk, shaped for the serving collaborator's lookups:
//! - one snapshot file per `date_key`, so re-running a date replaces its
//!   results instead of duplicating them;
//! - an append-only JSONL cycle history (one record per line, resilient to
//!   partial writes, never rewritten);
//! - per-symbol signal files keyed by breakout date, where a newer signal
//!   for the same key supersedes the stored one.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use scanlab_core::domain::{BreakoutSignal, DailySnapshot, HistoryRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("serialize: {0}")]
    Serde(#[from] serde_json::Error),
}

// ─── Daily snapshots ─────────────────────────────────────────────────

/// One JSON file per date key under a snapshot directory.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, date_key: &str) -> PathBuf {
        self.dir.join(format!("snapshot-{date_key}.json"))
    }

    /// Persist a snapshot, replacing any existing snapshot for the same
    /// date key. Returns the written path.
    pub fn save(&self, snapshot: &DailySnapshot) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&snapshot.date_key);
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(&self, date_key: &str) -> Result<Option<DailySnapshot>, StoreError> {
        let path = self.path_for(date_key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Date keys with a stored snapshot, ascending.
    pub fn list_date_keys(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(key) = name
                .strip_prefix("snapshot-")
                .and_then(|rest| rest.strip_suffix(".json"))
            {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// ─── Market-cycle history ────────────────────────────────────────────

/// Append-only JSONL market-cycle history.
pub struct CycleHistory {
    path: PathBuf,
}

impl CycleHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records, oldest first. Malformed lines are skipped.
    pub fn load(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let reader = io::BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(_) => continue, // skip malformed lines
            }
        }
        Ok(records)
    }

    /// Append a record unless its date key is already present; records are
    /// never rewritten. Returns `Ok(true)` if the record was written.
    pub fn append(&self, record: &HistoryRecord) -> Result<bool, StoreError> {
        let existing = self.load()?;
        if existing.iter().any(|r| r.date_key == record.date_key) {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(true)
    }
}

// ─── Breakout signals ────────────────────────────────────────────────

/// Per-symbol JSON files of breakout signals keyed by breakout date.
pub struct SignalStore {
    dir: PathBuf,
}

impl SignalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.json"))
    }

    pub fn load(&self, symbol: &str) -> Result<Vec<BreakoutSignal>, StoreError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Merge signals for one symbol. An incoming signal replaces the stored
    /// one with the same breakout date; stored signals for other dates are
    /// untouched.
    pub fn upsert(&self, symbol: &str, signals: &[BreakoutSignal]) -> Result<(), StoreError> {
        if signals.is_empty() {
            return Ok(());
        }
        let mut merged = self.load(symbol)?;
        for incoming in signals {
            match merged
                .iter_mut()
                .find(|s| s.breakout_date == incoming.breakout_date)
            {
                Some(existing) => *existing = incoming.clone(),
                None => merged.push(incoming.clone()),
            }
        }
        merged.sort_by_key(|s| s.breakout_date);

        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&merged)?;
        fs::write(self.path_for(symbol), json)?;
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
