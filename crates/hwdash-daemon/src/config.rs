//! Configuration management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::chart::ChartSeries;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hardware backend ("sysfs" or "fixture")
    #[serde(default)]
    pub backend: BackendKind,

    /// Aggregator tick interval in milliseconds
    #[serde(default = "default_dashboard_interval")]
    pub dashboard_interval_ms: u64,

    /// Debounce sampling period in milliseconds
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Default number of points kept per chart series
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Append-only log for unhandled faults
    #[serde(default = "default_failure_log")]
    pub failure_log: PathBuf,

    /// Web server configuration
    #[serde(default)]
    pub web: WebConfig,

    /// Chart pollers; the built-in series when omitted
    #[serde(default = "default_charts")]
    pub charts: Vec<ChartConfig>,
}

/// Hardware backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Live Linux hwmon/procfs readings
    #[default]
    Sysfs,
    /// Simulated demo machine
    Fixture,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sysfs" => Ok(BackendKind::Sysfs),
            "fixture" | "demo" => Ok(BackendKind::Fixture),
            _ => bail!("unknown backend '{s}' (expected sysfs or fixture)"),
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Serve the JSON API
    #[serde(default = "default_web_enable")]
    pub enable: bool,

    /// Listen address (e.g., "127.0.0.1:8787")
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: default_web_enable(),
            listen: default_listen(),
        }
    }
}

/// One chart poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Series name, e.g. "cpu-clock"
    pub series: String,

    /// Poll interval in milliseconds
    pub interval_ms: u64,

    /// Window capacity; falls back to `window_capacity`
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl ChartConfig {
    fn new(series: &str, interval_ms: u64) -> Self {
        Self {
            series: series.to_string(),
            interval_ms,
            capacity: None,
        }
    }
}

// Default value functions
fn default_dashboard_interval() -> u64 {
    1000
}

fn default_debounce() -> u64 {
    1000
}

fn default_window_capacity() -> usize {
    20
}

fn default_failure_log() -> PathBuf {
    PathBuf::from("error_log.txt")
}

fn default_web_enable() -> bool {
    true
}

fn default_listen() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_charts() -> Vec<ChartConfig> {
    vec![
        ChartConfig::new("cpu-clock", 500),
        ChartConfig::new("cpu-temperature", 1000),
        ChartConfig::new("gpu-temperature", 1000),
        ChartConfig::new("gpu-clock", 1000),
    ]
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Rejects intervals and capacities that would stall or starve a task.
    pub fn validate(&self) -> Result<()> {
        if self.dashboard_interval_ms == 0 {
            bail!("dashboard_interval_ms must be greater than zero");
        }
        if self.debounce_ms == 0 {
            bail!("debounce_ms must be greater than zero");
        }
        if self.window_capacity == 0 {
            bail!("window_capacity must be greater than zero");
        }
        for chart in &self.charts {
            chart.series.parse::<ChartSeries>()?;
            if chart.interval_ms == 0 {
                bail!("chart '{}' has a zero interval", chart.series);
            }
            if chart.capacity == Some(0) {
                bail!("chart '{}' has a zero capacity", chart.series);
            }
        }
        Ok(())
    }

    /// Effective window capacity for `chart`.
    pub fn capacity_for(&self, chart: &ChartConfig) -> usize {
        chart.capacity.unwrap_or(self.window_capacity)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            dashboard_interval_ms: default_dashboard_interval(),
            debounce_ms: default_debounce(),
            window_capacity: default_window_capacity(),
            failure_log: default_failure_log(),
            web: WebConfig::default(),
            charts: default_charts(),
        }
    }
}
