//! Engine configuration.
//!
//! Controls the ranges the chart generator draws from. Every value has a
//! default; `from_env` overrides them from `BAZI_*` environment variables.

use std::ops::RangeInclusive;
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },

    #[error("Empty range for {key}: {min} > {max}")]
    EmptyRange { key: &'static str, min: i64, max: i64 },
}

/// Ranges used when synthesizing charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Fewest luck-pillar steps walked from the month pillar.
    pub luck_steps_min: u32,
    /// Most luck-pillar steps walked from the month pillar.
    pub luck_steps_max: u32,
    /// Earliest year a random chart may be born in.
    pub random_year_min: i32,
    /// Latest year a random chart may be born in.
    pub random_year_max: i32,
    /// Highest day of month a random chart may use. Kept at 28 or below so
    /// every month is valid.
    pub random_day_max: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            luck_steps_min: 2,
            luck_steps_max: 6,
            random_year_min: 1950,
            random_year_max: 2019,
            random_day_max: 28,
        }
    }
}

impl EngineConfig {
    /// Load configuration, overriding defaults from the environment.
    ///
    /// Recognized variables: `BAZI_LUCK_STEPS_MIN`, `BAZI_LUCK_STEPS_MAX`,
    /// `BAZI_YEAR_MIN`, `BAZI_YEAR_MAX`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "BAZI_LUCK_STEPS_MIN")? {
            config.luck_steps_min = v;
        }
        if let Some(v) = parse_var(&lookup, "BAZI_LUCK_STEPS_MAX")? {
            config.luck_steps_max = v;
        }
        if let Some(v) = parse_var(&lookup, "BAZI_YEAR_MIN")? {
            config.random_year_min = v;
        }
        if let Some(v) = parse_var(&lookup, "BAZI_YEAR_MAX")? {
            config.random_year_max = v;
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the inclusive luck step range.
    pub fn with_luck_steps(mut self, min: u32, max: u32) -> Self {
        self.luck_steps_min = min;
        self.luck_steps_max = max;
        self
    }

    /// Set the inclusive birth year range for random charts.
    pub fn with_random_years(mut self, min: i32, max: i32) -> Self {
        self.random_year_min = min;
        self.random_year_max = max;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.luck_steps_min > self.luck_steps_max {
            return Err(ConfigError::EmptyRange {
                key: "luck_steps",
                min: self.luck_steps_min as i64,
                max: self.luck_steps_max as i64,
            });
        }
        if self.random_year_min > self.random_year_max {
            return Err(ConfigError::EmptyRange {
                key: "random_year",
                min: self.random_year_min as i64,
                max: self.random_year_max as i64,
            });
        }
        if !(1..=28).contains(&self.random_day_max) {
            return Err(ConfigError::Invalid {
                key: "random_day_max".to_string(),
                value: self.random_day_max.to_string(),
            });
        }
        Ok(())
    }

    pub fn luck_steps(&self) -> RangeInclusive<u32> {
        self.luck_steps_min..=self.luck_steps_max
    }

    pub fn random_years(&self) -> RangeInclusive<i32> {
        self.random_year_min..=self.random_year_max
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
            }),
    }
}
