//! Scanlab Runner — screen orchestration, configuration, sources, and
//! persistence around the core engine.

pub mod config;
pub mod export;
pub mod orchestrator;
pub mod source;
pub mod store;
pub mod universe;

pub use config::{AcceptanceConfig, ConfigError, RunSettings, ScreenConfig};
pub use export::export_results_csv;
pub use orchestrator::{RunError, ScreenOrchestrator, ScreenOutcome, SkippedSymbol};
pub use source::{BarSource, CsvBarSource, MemoryBarSource, SourceError};
pub use store::{CycleHistory, SignalStore, SnapshotStore, StoreError};
pub use universe::{Universe, UniverseError};
