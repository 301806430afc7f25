//! Engine configuration
//!
//! The constants behind the forecasting heuristics. Defaults reproduce the
//! documented methodology; a TOML file can override any subset of them.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Tunable constants of the forecasting engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Share of the raw year-over-year growth that may be carried forward as momentum
    pub organic_cap: f64,
    /// Growth premium removed per month into the horizon
    pub decay_step: f64,
    /// Lowest fraction of the growth premium kept after decay
    pub decay_floor: f64,
    /// Rate applied per lessons-learned point
    pub lesson_point_rate: f64,
    /// Lessons-learned points are clamped to +/- this value
    pub lesson_point_range: f64,
    /// Rate substituted for a parameter value that cannot be parsed
    pub default_rate: f64,
    /// Year to forecast, see `DataLoader::from_config`; inferred from the data when absent
    pub forecast_year: Option<i32>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            organic_cap: 0.30,
            decay_step: 0.01,
            decay_floor: 0.85,
            lesson_point_rate: 0.005,
            lesson_point_range: 10.0,
            default_rate: 0.0,
            forecast_year: None,
        }
    }
}

impl ForecastConfig {
    /// Parse a configuration from TOML, filling unspecified keys with defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ForecastError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every constant is within its meaningful range
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.organic_cap) {
            return Err(ForecastError::InvalidConfig(format!(
                "organic_cap must be within [0, 1], got {}",
                self.organic_cap
            )));
        }
        if !(0.0..=1.0).contains(&self.decay_step) {
            return Err(ForecastError::InvalidConfig(format!(
                "decay_step must be within [0, 1], got {}",
                self.decay_step
            )));
        }
        if self.decay_floor <= 0.0 || self.decay_floor > 1.0 {
            return Err(ForecastError::InvalidConfig(format!(
                "decay_floor must be within (0, 1], got {}",
                self.decay_floor
            )));
        }
        if self.lesson_point_range <= 0.0 || !self.lesson_point_rate.is_finite() {
            return Err(ForecastError::InvalidConfig(
                "lesson points need a positive range and a finite rate".to_string(),
            ));
        }
        if !self.default_rate.is_finite() || self.default_rate <= -1.0 {
            return Err(ForecastError::InvalidConfig(format!(
                "default_rate must be finite and above -1, got {}",
                self.default_rate
            )));
        }
        Ok(())
    }

    /// Fraction of the growth premium kept at a horizon index (0 = first forecasted month)
    pub fn decay_factor(&self, horizon_index: u32) -> f64 {
        (1.0 - self.decay_step * horizon_index as f64).max(self.decay_floor)
    }

    /// Convert lessons-learned points to a rate, clamping to the allowed range
    pub fn lesson_rate(&self, points: f64) -> f64 {
        points.clamp(-self.lesson_point_range, self.lesson_point_range) * self.lesson_point_rate
    }
}
