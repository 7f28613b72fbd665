//! Planner configuration.
//!
//! Defaults, overlaid by `PLANNER_*` environment variables. The binary loads
//! `.env.local` first and applies command-line flags last.

use std::time::Duration;

use crate::dispatcher::{DEFAULT_BATCH_SIZE, DispatcherOptions, FailurePolicy};
use crate::error::ConfigError;
use crate::house_list::{DEFAULT_HOUSE_LIST_URL, HouseListConfig};
use crate::optimizer::OptimizerConfig;
use crate::playback::{DEFAULT_TICK_INTERVAL, DEFAULT_VISIT_THRESHOLD_KM};

pub const ENV_API_URL: &str = "PLANNER_API_URL";
pub const ENV_HOUSE_LIST_URL: &str = "PLANNER_HOUSE_LIST_URL";
pub const ENV_TIMEOUT_SECS: &str = "PLANNER_TIMEOUT_SECS";
pub const ENV_BATCH_SIZE: &str = "PLANNER_BATCH_SIZE";
pub const ENV_VISIT_THRESHOLD_KM: &str = "PLANNER_VISIT_THRESHOLD_KM";
pub const ENV_TICK_MS: &str = "PLANNER_TICK_MS";
pub const ENV_FAILURE_POLICY: &str = "PLANNER_FAILURE_POLICY";

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub api_url: String,
    pub house_list_url: String,
    pub timeout_secs: u64,
    pub batch_size: usize,
    pub visit_threshold_km: f64,
    pub tick_interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_url: OptimizerConfig::default().base_url,
            house_list_url: DEFAULT_HOUSE_LIST_URL.to_string(),
            timeout_secs: OptimizerConfig::default().timeout_secs,
            batch_size: DEFAULT_BATCH_SIZE,
            visit_threshold_km: DEFAULT_VISIT_THRESHOLD_KM,
            tick_interval: DEFAULT_TICK_INTERVAL,
            failure_policy: FailurePolicy::KeepCompleted,
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_API_URL) {
            config.api_url = url;
        }
        if let Some(url) = get(ENV_HOUSE_LIST_URL) {
            config.house_list_url = url;
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            config.timeout_secs = parse_value(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = get(ENV_BATCH_SIZE) {
            config.batch_size = parse_batch_size(ENV_BATCH_SIZE, &raw)?;
        }
        if let Some(raw) = get(ENV_VISIT_THRESHOLD_KM) {
            config.visit_threshold_km = parse_threshold(ENV_VISIT_THRESHOLD_KM, &raw)?;
        }
        if let Some(raw) = get(ENV_TICK_MS) {
            config.tick_interval = Duration::from_millis(parse_value(ENV_TICK_MS, &raw)?);
        }
        if let Some(raw) = get(ENV_FAILURE_POLICY) {
            config.failure_policy = parse_failure_policy(ENV_FAILURE_POLICY, &raw)?;
        }

        Ok(config)
    }

    pub fn optimizer(&self) -> OptimizerConfig {
        OptimizerConfig {
            base_url: self.api_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn house_list(&self) -> HouseListConfig {
        HouseListConfig {
            url: self.house_list_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn dispatcher(&self) -> DispatcherOptions {
        DispatcherOptions {
            failure_policy: self.failure_policy,
            ..DispatcherOptions::default()
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

pub fn parse_batch_size(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match parse_value::<usize>(key, raw)? {
        0 => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
        size => Ok(size),
    }
}

pub fn parse_threshold(key: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = parse_value(key, raw)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        })
    }
}

/// `keep` / `keep-completed` or `discard` / `discard-all`.
pub fn parse_failure_policy(key: &'static str, raw: &str) -> Result<FailurePolicy, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "keep" | "keep-completed" => Ok(FailurePolicy::KeepCompleted),
        "discard" | "discard-all" => Ok(FailurePolicy::DiscardAll),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
