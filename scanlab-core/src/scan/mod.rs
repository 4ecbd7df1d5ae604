//! Pattern scanning: swing pivots and the volatility-contraction scanner.

pub mod pivots;
pub mod vcp;

pub use pivots::{swing_pivots, Pivot, PivotKind};
pub use vcp::{ScanReport, ScanState, VcpConfig, VcpScanner};
