//! Market-cycle states and the per-day history record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Market-cycle state for the benchmark on one trading day.
///
/// The transition labels (`GreenToRed` / `RedToGreen`) appear only on the
/// single day the combined signal crosses from one zone into the other; the
/// following day records the new steady state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketCycleState {
    Green,
    Red,
    Neutral,
    GreenToRed,
    RedToGreen,
}

impl MarketCycleState {
    /// Resolve a transition label to the state it lands on.
    pub fn steady(self) -> Self {
        match self {
            MarketCycleState::GreenToRed => MarketCycleState::Red,
            MarketCycleState::RedToGreen => MarketCycleState::Green,
            other => other,
        }
    }

    pub fn is_transition(self) -> bool {
        matches!(
            self,
            MarketCycleState::GreenToRed | MarketCycleState::RedToGreen
        )
    }

    pub fn is_bullish(self) -> bool {
        self.steady() == MarketCycleState::Green
    }

    pub fn is_bearish(self) -> bool {
        self.steady() == MarketCycleState::Red
    }
}

/// Compact `YYYYMMDD` key used by persisted records and lookups.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// One record per trading day for the benchmark. Append-only, ordered by
/// date, never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: NaiveDate,
    pub date_key: String,
    pub cycle_state: MarketCycleState,
    pub status_text: String,
}

impl HistoryRecord {
    pub fn new(date: NaiveDate, cycle_state: MarketCycleState, status_text: String) -> Self {
        Self {
            date,
            date_key: date_key(date),
            cycle_state,
            status_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_resolves_to_steady() {
        assert_eq!(MarketCycleState::GreenToRed.steady(), MarketCycleState::Red);
        assert_eq!(
            MarketCycleState::RedToGreen.steady(),
            MarketCycleState::Green
        );
        assert_eq!(MarketCycleState::Neutral.steady(), MarketCycleState::Neutral);
    }

    #[test]
    fn transition_detection() {
        assert!(MarketCycleState::GreenToRed.is_transition());
        assert!(!MarketCycleState::Green.is_transition());
    }

    #[test]
    fn bullish_includes_transition_into_green() {
        assert!(MarketCycleState::Green.is_bullish());
        assert!(MarketCycleState::RedToGreen.is_bullish());
        assert!(!MarketCycleState::GreenToRed.is_bullish());
        assert!(MarketCycleState::GreenToRed.is_bearish());
    }

    #[test]
    fn date_key_format() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_key(d), "20240307");
    }

    #[test]
    fn history_record_carries_date_key() {
        let d = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let rec = HistoryRecord::new(d, MarketCycleState::Green, "still Green".into());
        assert_eq!(rec.date_key, "20241231");
        assert_eq!(rec.cycle_state, MarketCycleState::Green);
    }

    #[test]
    fn history_record_serialization() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let rec = HistoryRecord::new(d, MarketCycleState::RedToGreen, "Red to Green".into());
        let json = serde_json::to_string(&rec).unwrap();
        let deser: HistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, deser);
    }
}
