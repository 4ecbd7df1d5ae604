//! Rate of Change (ROC).
//!
//! Percentage price change over N bars.
//! ROC[t] = (close[t] - close[t-period]) / close[t-period] * 100
//! Lookback: period.

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self {
            period,
            name: format!("roc_{period}"),
        }
    }

    /// ROC at the final bar only, as used by the trailing-return score.
    pub fn latest(&self, bars: &[Bar]) -> f64 {
        if bars.len() <= self.period {
            return f64::NAN;
        }
        let curr = bars[bars.len() - 1].close;
        let prev = bars[bars.len() - 1 - self.period].close;
        if prev.is_nan() || curr.is_nan() || prev == 0.0 {
            f64::NAN
        } else {
            (curr - prev) / prev * 100.0
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let prev = bars[i - self.period].close;
            let curr = bars[i].close;
            if prev.is_nan() || curr.is_nan() || prev == 0.0 {
                result[i] = f64::NAN;
            } else {
                result[i] = (curr - prev) / prev * 100.0;
            }
        }

        result
    }
}
