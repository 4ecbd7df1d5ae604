//! Regime classification: market cycle for the benchmark, volatility regime
//! per symbol.

pub mod market;
pub mod volatility;

pub use market::{CycleAssessment, RegimeClassifier, RegimeConfig};
pub use volatility::{
    VolatilityRegime, VolatilityRegimeClassifier, VolatilityRegimeConfig, VolatilityReading,
};
