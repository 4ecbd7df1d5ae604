//! Engine error taxonomy.
//!
//! Per-symbol failures (insufficient history, computation edge cases,
//! malformed series) are isolated by the orchestrator: the symbol is skipped
//! and the batch continues. The same errors on the benchmark abort the run.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Malformed input series: out-of-order dates, insane OHLC, oversized gaps.
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// Not enough bars for the requested lookback.
    #[error("insufficient history: need {needed} bars, have {have}")]
    InsufficientHistory { needed: usize, have: usize },

    /// Arithmetic edge case for one symbol (zero average volume, NaN input).
    #[error("computation: {0}")]
    Computation(String),

    /// The upstream data collaborator failed for the whole run.
    #[error("upstream unavailable: {0}")]
    Upstream(String),
}
