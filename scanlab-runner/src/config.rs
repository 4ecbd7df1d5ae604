//! Serializable screen configuration.
//!
//! One TOML file gathers every policy constant the screen depends on:
//! acceptance thresholds, regime windows, ranking weights, scanner
//! parameters, volatility bounds, and run settings. Every section defaults,
//! so a partial file (or none) is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use scanlab_core::ranking::RankingConfig;
use scanlab_core::regime::{RegimeConfig, VolatilityRegimeConfig};
use scanlab_core::scan::VcpConfig;
use scanlab_core::series::SeriesSpec;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Acceptance policy for the daily screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Minimum relative-strength rating (0-99 percentile).
    pub min_rrs: u8,
    /// Minimum relative volume multiple.
    pub min_rvol: f64,
    pub min_adr_pct: f64,
    pub max_adr_pct: f64,
    /// Liquidity floor: trailing average share volume.
    pub min_avg_volume: f64,
    pub min_price: f64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            min_rrs: 70,
            min_rvol: 1.0,
            min_adr_pct: 2.5,
            max_adr_pct: 15.0,
            min_avg_volume: 500_000.0,
            min_price: 5.0,
        }
    }
}

/// Run-level settings that are not part of any one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Worker threads for the per-symbol fan-out. 1 runs sequentially.
    pub worker_threads: usize,
    /// Skip symbols whose last bar lags the as-of date by more than this.
    pub stale_days: i64,
    /// ATR period maintained on every series store.
    pub atr_period: usize,
    /// Largest tolerated calendar gap between consecutive bars.
    pub max_gap_days: i64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            worker_threads: 8,
            stale_days: 5,
            atr_period: 14,
            max_gap_days: 14,
        }
    }
}

/// Complete screen configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScreenConfig {
    pub acceptance: AcceptanceConfig,
    pub regime: RegimeConfig,
    pub ranking: RankingConfig,
    pub vcp: VcpConfig,
    pub volatility: VolatilityRegimeConfig,
    pub run: RunSettings,
}

impl ScreenConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScreenConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.acceptance.min_adr_pct > self.acceptance.max_adr_pct {
            return Err(ConfigError::Invalid(
                "acceptance.min_adr_pct exceeds max_adr_pct".into(),
            ));
        }
        if self.acceptance.min_rvol <= 0.0 {
            return Err(ConfigError::Invalid(
                "acceptance.min_rvol must be positive".into(),
            ));
        }
        if self.ranking.return_windows.is_empty() {
            return Err(ConfigError::Invalid(
                "ranking.return_windows must not be empty".into(),
            ));
        }
        if self.ranking.return_windows.iter().any(|w| w.weight <= 0.0) {
            return Err(ConfigError::Invalid(
                "ranking window weights must be positive".into(),
            ));
        }
        if self.vcp.tightness_max_pct <= 0.0 {
            return Err(ConfigError::Invalid(
                "vcp.tightness_max_pct must be positive".into(),
            ));
        }
        if self.vcp.min_legs < 2 {
            return Err(ConfigError::Invalid("vcp.min_legs must be at least 2".into()));
        }
        if self.volatility.low_bound > self.volatility.high_bound {
            return Err(ConfigError::Invalid(
                "volatility.low_bound exceeds high_bound".into(),
            ));
        }
        if self.run.worker_threads == 0 {
            return Err(ConfigError::Invalid(
                "run.worker_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Series spec every store in a run is built with, derived from the
    /// engine configs so each component finds the rolling series it needs.
    pub fn series_spec(&self) -> SeriesSpec {
        let mut sma_periods = vec![self.ranking.extension_ma, self.vcp.trend_ma];
        sma_periods.sort_unstable();
        sma_periods.dedup();
        SeriesSpec {
            sma_periods,
            atr_period: self.run.atr_period,
            avg_volume_period: self.ranking.rvol_window,
            max_gap_days: self.run.max_gap_days,
        }
    }
}
