//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Rank bounds — percentile ranks always land in 0..=99
//! 2. Rank monotonicity — a higher score never ranks below a lower one
//! 3. Rank extremes — distinct scores pin the worst symbol to 0 and the best to 99
//! 4. Tie consistency — equal scores always share a rank
//! 5. RVol positivity — positive volume history yields a strictly positive RVol
//! 6. Scanner determinism — rescanning a random-walk series reproduces the report

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use chrono::{Duration, NaiveDate};
use scanlab_core::domain::Bar;
use scanlab_core::ranking::{assign_ranks, RankingConfig, RankingEngine, ReturnScore};
use scanlab_core::scan::{VcpConfig, VcpScanner};
use scanlab_core::series::{SeriesSpec, SeriesStore};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_scores() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0..100.0_f64, 2..40)
}

fn to_return_scores(values: &[f64]) -> Vec<ReturnScore> {
    values
        .iter()
        .enumerate()
        .map(|(i, &score)| ReturnScore {
            symbol: format!("S{i:03}"),
            score,
        })
        .collect()
}

// ── 1-3. Rank bounds, monotonicity, extremes ─────────────────────────

proptest! {
    #[test]
    fn ranks_always_in_bounds(values in arb_scores()) {
        let ranks = assign_ranks(&to_return_scores(&values));
        for (_, rank) in ranks {
            prop_assert!(rank <= 99);
        }
    }

    /// Higher weighted score implies rank greater than or equal to any
    /// lower-scoring symbol's rank.
    #[test]
    fn ranks_monotone_in_score(values in arb_scores()) {
        let scores = to_return_scores(&values);
        let ranks = assign_ranks(&scores);
        for a in &scores {
            for b in &scores {
                if a.score > b.score {
                    prop_assert!(
                        ranks[&a.symbol] >= ranks[&b.symbol],
                        "score {} ranked {} below score {} ranked {}",
                        a.score, ranks[&a.symbol], b.score, ranks[&b.symbol]
                    );
                }
            }
        }
    }

    /// With all-distinct scores the universe spans the full 0-99 scale.
    #[test]
    fn distinct_scores_span_full_scale(n in 2usize..40) {
        let values: Vec<f64> = (0..n).map(|i| i as f64 * 1.5 - 10.0).collect();
        let scores = to_return_scores(&values);
        let ranks = assign_ranks(&scores);
        let min = ranks.values().min().copied().unwrap();
        let max = ranks.values().max().copied().unwrap();
        prop_assert_eq!(min, 0);
        prop_assert_eq!(max, 99);
    }

    // ── 4. Ties ──────────────────────────────────────────────────────

    #[test]
    fn tied_scores_share_ranks(values in arb_scores(), dup_idx in 0usize..10) {
        let mut scores = to_return_scores(&values);
        // Force a tie by copying one score onto another symbol.
        let src = dup_idx % scores.len();
        let copied = scores[src].score;
        scores.push(ReturnScore { symbol: "TIE".into(), score: copied });

        let ranks = assign_ranks(&scores);
        prop_assert_eq!(ranks[&scores[src].symbol], ranks["TIE"]);
    }
}

// ── 5. RVol positivity ───────────────────────────────────────────────

proptest! {
    #[test]
    fn rvol_is_strictly_positive(seed in 0u64..1000) {
        let store = random_walk_store(seed, 80);
        let engine = RankingEngine::new(RankingConfig {
            rvol_window: 50,
            ..RankingConfig::default()
        });
        let rvol = engine.rvol(&store).unwrap();
        prop_assert!(rvol > 0.0);
    }
}

// ── 6. Scanner determinism ───────────────────────────────────────────

proptest! {
    #[test]
    fn scanner_is_deterministic_on_random_walks(seed in 0u64..200) {
        let store = random_walk_store(seed, 140);
        let scanner = VcpScanner::new(VcpConfig {
            trend_ma: 60,
            trend_rise_window: 10,
            pivot_order: 3,
            ..VcpConfig::default()
        });
        let first = scanner.scan(&store);
        let second = scanner.scan(&store);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            (a, b) => prop_assert!(false, "diverging outcomes: {a:?} vs {b:?}"),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Seeded geometric random walk with positive volume.
fn random_walk_store(seed: u64, days: usize) -> SeriesStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let base_date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut close = 100.0;
    let bars: Vec<Bar> = (0..days)
        .map(|i| {
            let open = close;
            let step: f64 = rng.gen_range(-0.03..0.035);
            close = (close * (1.0 + step)).max(1.0);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            Bar {
                symbol: "WALK".into(),
                date: base_date + Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: rng.gen_range(100_000..5_000_000),
            }
        })
        .collect();
    SeriesStore::new(
        "WALK",
        bars,
        SeriesSpec {
            sma_periods: vec![50, 60, 200],
            atr_period: 14,
            avg_volume_period: 50,
            max_gap_days: 14,
        },
    )
    .unwrap()
}
