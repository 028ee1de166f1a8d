//! Runtime configuration.
//!
//! Values come from compiled-in defaults, optionally overridden by a TOML
//! file, and finally by command-line flags applied in `main`.
//!
//! ```toml
//! duration_cutoff = "250us"
//! pass_output = false
//! keep_running = false
//! load_timeout = "30s"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "TESTGANTT_CONFIG";

pub const DEFAULT_DURATION_CUTOFF: Duration = Duration::from_micros(100);

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runs and pauses at or below this duration are left out of the chart.
    #[serde(deserialize_with = "deserialize_duration")]
    pub duration_cutoff: Duration,
    /// Echo every consumed input line to stderr.
    pub pass_output: bool,
    /// Keep serving after the browser signalled that the page loaded.
    pub keep_running: bool,
    /// How long serve mode waits for the browser to load the page.
    #[serde(deserialize_with = "deserialize_duration")]
    pub load_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_cutoff: DEFAULT_DURATION_CUTOFF,
            pass_output: true,
            keep_running: false,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to compiled-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("no config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// The cutoff as a signed delta, for comparison against execution durations.
    pub fn cutoff(&self) -> TimeDelta {
        TimeDelta::from_std(self.duration_cutoff).unwrap_or_else(|_| TimeDelta::max_value())
    }
}

/// Parse a human-readable duration such as `100µs`, `100us`, `2s` or `1m 30s`.
pub fn parse_duration(input: &str) -> Result<Duration, humantime::DurationError> {
    // Accept both the micro sign and the Greek mu.
    let normalized = input.trim().replace(['µ', 'μ'], "u");
    humantime::parse_duration(&normalized)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}
