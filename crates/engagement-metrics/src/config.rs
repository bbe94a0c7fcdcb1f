//! Run configuration threaded through every pipeline stage.
//!
//! A [`ReportConfig`] is an explicit value: no stage reads global state, so a
//! report is fully reproducible from its inputs and this struct.

use crate::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for one report run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Trailing window length in days for rolling averages (default: 7)
    pub window_size: usize,
    /// Multiple of the rolling average above which a day is a spike (default: 1.5)
    pub spike_multiplier: f64,
    /// Number of days kept in the top-N impressions ranking (default: 10)
    pub top_n: usize,
    /// Months in each window of the growth trend comparison (default: 3)
    pub trend_window_months: usize,
    /// Months with fewer days present are flagged as partial (default: 28)
    pub min_days_per_month: usize,
    /// Number of weekdays reported as best posting days (default: 3)
    pub best_weekdays: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            window_size: 7,
            spike_multiplier: 1.5,
            top_n: 10,
            trend_window_months: 3,
            min_days_per_month: 28,
            best_weekdays: 3,
        }
    }
}

impl ReportConfig {
    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(MetricsError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !self.spike_multiplier.is_finite() || self.spike_multiplier <= 0.0 {
            return Err(MetricsError::InvalidConfig(format!(
                "spike_multiplier must be a positive finite number, got {}",
                self.spike_multiplier
            )));
        }
        if self.top_n == 0 {
            return Err(MetricsError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }
        if self.trend_window_months == 0 {
            return Err(MetricsError::InvalidConfig(
                "trend_window_months must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
