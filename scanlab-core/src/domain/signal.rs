//! Contraction metrics and breakout signal records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Swing-leg contraction metrics for one symbol.
///
/// `leg_ranges_pct` holds chronological swing-high-to-swing-low ranges as a
/// percent of the swing high. `ratios[i] = leg_ranges_pct[i+1] /
/// leg_ranges_pct[i]`, so a contracting pattern has every ratio below 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContractionSequence {
    pub leg_ranges_pct: Vec<f64>,
    pub ratios: Vec<f64>,
    /// Latest leg range below the tightness threshold.
    pub is_tight: bool,
    /// Final-leg volume below the dry-up threshold of its trailing average.
    pub is_dry_up: bool,
}

impl ContractionSequence {
    /// True when every successive leg is smaller than the one before.
    pub fn is_contracting(&self) -> bool {
        !self.ratios.is_empty() && self.ratios.iter().all(|r| *r < 1.0)
    }
}

/// Created when the scanner confirms a breakout. Immutable once created; a
/// later signal on the same symbol supersedes it rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutSignal {
    pub symbol: String,
    /// Date the contraction pattern completed (the final swing low).
    pub signal_date: NaiveDate,
    /// Day the close first exceeded the contraction high on volume.
    pub breakout_date: NaiveDate,
    pub vcp_metrics: ContractionSequence,
    /// Day the confirmation window closed without a failure. `None` while the
    /// window is still open.
    pub qualified_date: Option<NaiveDate>,
    /// Relative-strength rating at breakout, attached by the orchestrator.
    pub rs_rating: Option<u8>,
    /// Breakout-day volume vs. its trailing average, in percent.
    pub volume_increase_pct: Option<f64>,
}

impl BreakoutSignal {
    pub fn is_qualified(&self) -> bool {
        self.qualified_date.is_some()
    }
}
