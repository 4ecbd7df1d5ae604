//! Snapshot export — the results table as CSV for external tools.

use anyhow::{Context, Result};

use scanlab_core::domain::DailySnapshot;

/// Render a snapshot's results as CSV.
///
/// Columns: ticker, rrs, rvol, adr_pct, atr_multiple, volatility_regime,
/// is_tight, is_dry_up, breakout_date, qualified_date, volume_increase_pct
pub fn export_results_csv(snapshot: &DailySnapshot) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "ticker",
        "rrs",
        "rvol",
        "adr_pct",
        "atr_multiple",
        "volatility_regime",
        "is_tight",
        "is_dry_up",
        "breakout_date",
        "qualified_date",
        "volume_increase_pct",
    ])?;

    for r in &snapshot.results {
        let breakout_date = r
            .breakout
            .as_ref()
            .map(|b| b.breakout_date.to_string())
            .unwrap_or_default();
        let qualified_date = r
            .breakout
            .as_ref()
            .and_then(|b| b.qualified_date)
            .map(|d| d.to_string())
            .unwrap_or_default();
        let volume_increase = r
            .breakout
            .as_ref()
            .and_then(|b| b.volume_increase_pct)
            .map(|v| format!("{v:.1}"))
            .unwrap_or_default();

        wtr.write_record([
            r.ticker.as_str(),
            &r.rrs.to_string(),
            &format!("{:.2}", r.rvol),
            &format!("{:.2}", r.adr_pct),
            &format!("{:.2}", r.atr_multiple),
            r.volatility_regime.as_str(),
            &r.vcp_metrics.is_tight.to_string(),
            &r.vcp_metrics.is_dry_up.to_string(),
            &breakout_date,
            &qualified_date,
            &volume_increase,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scanlab_core::domain::{
        BreakoutSignal, ContractionSequence, MarketCycleState, ScreenResult,
    };
    use scanlab_core::regime::VolatilityRegime;
    use std::collections::BTreeMap;

    fn sample_snapshot() -> DailySnapshot {
        let breakout = BreakoutSignal {
            symbol: "NVDA".into(),
            signal_date: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            breakout_date: NaiveDate::from_ymd_opt(2024, 5, 24).unwrap(),
            vcp_metrics: ContractionSequence {
                leg_ranges_pct: vec![18.0, 9.0, 3.0],
                ratios: vec![0.5, 1.0 / 3.0],
                is_tight: true,
                is_dry_up: true,
            },
            qualified_date: Some(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()),
            rs_rating: Some(95),
            volume_increase_pct: Some(180.0),
        };
        DailySnapshot {
            date_key: "20240531".into(),
            results: vec![
                ScreenResult {
                    ticker: "NVDA".into(),
                    rrs: 95,
                    rvol: 2.31,
                    adr_pct: 4.5,
                    atr_multiple: 1.9,
                    vcp_metrics: breakout.vcp_metrics.clone(),
                    breakout: Some(breakout),
                    volatility_regime: VolatilityRegime::Contraction,
                },
                ScreenResult {
                    ticker: "AMD".into(),
                    rrs: 82,
                    rvol: 1.40,
                    adr_pct: 3.8,
                    atr_multiple: 0.7,
                    vcp_metrics: ContractionSequence::default(),
                    breakout: None,
                    volatility_regime: VolatilityRegime::Transition,
                },
            ],
            total_scanned: 3,
            total_universe: 3,
            updated_at: NaiveDate::from_ymd_opt(2024, 5, 31)
                .unwrap()
                .and_hms_opt(22, 0, 0)
                .unwrap(),
            benchmark_state: MarketCycleState::Green,
            volatility_distribution: BTreeMap::new(),
            dataset_hash: "hash".into(),
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_result() {
        let csv = export_results_csv(&sample_snapshot()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ticker,rrs,rvol"));
    }

    #[test]
    fn csv_carries_breakout_columns() {
        let csv = export_results_csv(&sample_snapshot()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[1].contains("NVDA"));
        assert!(lines[1].contains("2024-05-24"));
        assert!(lines[1].contains("2024-05-31"));
        assert!(lines[1].contains("180.0"));
        // The no-breakout row leaves the date columns empty.
        assert!(lines[2].contains("AMD"));
        assert!(lines[2].contains(",,"));
    }

    #[test]
    fn csv_empty_results() {
        let mut snapshot = sample_snapshot();
        snapshot.results.clear();
        let csv = export_results_csv(&snapshot).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
