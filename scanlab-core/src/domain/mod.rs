//! Domain records: bars, cycle states, ranked metrics, signals, snapshots.

pub mod bar;
pub mod cycle;
pub mod signal;
pub mod snapshot;

pub use bar::Bar;
pub use cycle::{date_key, HistoryRecord, MarketCycleState};
pub use signal::{BreakoutSignal, ContractionSequence};
pub use snapshot::{DailySnapshot, RankedMetrics, ScreenResult};
