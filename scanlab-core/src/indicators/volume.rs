//! Rolling average volume.
//!
//! Rolling mean of daily share volume over a lookback window. Relative
//! volume and dry-up checks compare a day's volume against this series at
//! the prior index, so the day under test never feeds its own average.

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct AvgVolume {
    period: usize,
    name: String,
}

impl AvgVolume {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "average volume period must be >= 1");
        Self {
            period,
            name: format!("avg_vol_{period}"),
        }
    }
}

impl Indicator for AvgVolume {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let mut sum: f64 = bars.iter().take(self.period).map(|b| b.volume as f64).sum();
        result[self.period - 1] = sum / self.period as f64;

        for i in self.period..n {
            sum += bars[i].volume as f64 - bars[i - self.period].volume as f64;
            result[i] = sum / self.period as f64;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn make_volume_bars(volumes: &[u64]) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        volumes
            .iter()
            .enumerate()
            .map(|(i, &volume)| Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume,
            })
            .collect()
    }

    #[test]
    fn avg_volume_3_basic() {
        let bars = make_volume_bars(&[300, 600, 900, 1200, 1500]);
        let avg = AvgVolume::new(3);
        let result = avg.compute(&bars);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 600.0, DEFAULT_EPSILON);
        assert_approx(result[3], 900.0, DEFAULT_EPSILON);
        assert_approx(result[4], 1200.0, DEFAULT_EPSILON);
    }

    #[test]
    fn avg_volume_too_few_bars() {
        let bars = make_volume_bars(&[100, 200]);
        let avg = AvgVolume::new(5);
        assert!(avg.compute(&bars).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn avg_volume_lookback() {
        assert_eq!(AvgVolume::new(50).lookback(), 49);
    }
}
