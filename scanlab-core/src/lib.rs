//! Scanlab Core — market-cycle classification and breakout screening engine.
//!
//! This crate contains the computational heart of the screener:
//! - Domain records (bars, cycle states, ranked metrics, signals, snapshots)
//! - SeriesStore: per-symbol bar history plus derived rolling series
//! - Indicator implementations (SMA, EMA, WMA, ATR, RSI, ROC, average volume)
//! - Market-cycle regime classifier (volume pressure + momentum oscillator)
//! - Volatility-regime classifier (short/long realized-vol ratio)
//! - Ranking engine (relative-strength percentile, RVol, ADR%)
//! - VCP scanner (swing pivots, contraction sequence, breakout confirmation)
//!
//! No I/O happens here; the runner crate owns sources, persistence, and the
//! parallel fan-out.

pub mod domain;
pub mod error;
pub mod indicators;
pub mod ranking;
pub mod regime;
pub mod scan;
pub mod series;
