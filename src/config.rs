//! Engine configuration loading: tick cadence, feed sizing, result reporting
//! retry policy.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/courtside.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_CONFIG_PATH";

/// Longest match the engine accepts, one day.
pub const MAX_DURATION_SECONDS: u32 = 86_400;

const DEFAULT_DURATION_SECONDS: u32 = 600;
const DEFAULT_TICK_PERIOD_MS: u64 = 1_000;
const DEFAULT_FEED_CAPACITY: usize = 64;
const DEFAULT_REPORT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_REPORT_INITIAL_BACKOFF_MS: u64 = 500;
const MAX_REPORT_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared by every session of a registry.
pub struct EngineConfig {
    /// Match duration used when a descriptor does not carry one.
    pub default_duration_seconds: u32,
    /// Wall-clock time between two clock ticks.
    pub tick_period: Duration,
    /// Snapshots buffered per subscriber before it starts lagging.
    pub feed_capacity: usize,
    /// Retry policy for handing final results to a sink.
    pub report: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bounded exponential backoff.
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled after each failure.
    pub initial_backoff: Duration,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after `attempt` (zero based) failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_REPORT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_REPORT_INITIAL_BACKOFF_MS),
            max_backoff: MAX_REPORT_BACKOFF,
        }
    }
}

impl EngineConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        tick_period_ms = config.tick_period.as_millis() as u64,
                        "loaded engine config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_duration_seconds: u32,
    tick_period_ms: u64,
    feed_capacity: usize,
    report_max_attempts: u32,
    report_initial_backoff_ms: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            default_duration_seconds: DEFAULT_DURATION_SECONDS,
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            report_max_attempts: DEFAULT_REPORT_MAX_ATTEMPTS,
            report_initial_backoff_ms: DEFAULT_REPORT_INITIAL_BACKOFF_MS,
        }
    }
}

impl From<RawConfig> for EngineConfig {
    fn from(value: RawConfig) -> Self {
        if value.default_duration_seconds > MAX_DURATION_SECONDS {
            warn!(
                requested = value.default_duration_seconds,
                max = MAX_DURATION_SECONDS,
                "default duration too long; capping"
            );
        }

        // Zero values would stall the ticker or drop every snapshot.
        Self {
            default_duration_seconds: value
                .default_duration_seconds
                .clamp(1, MAX_DURATION_SECONDS),
            tick_period: Duration::from_millis(value.tick_period_ms.max(1)),
            feed_capacity: value.feed_capacity.max(1),
            report: RetryPolicy {
                max_attempts: value.report_max_attempts.max(1),
                initial_backoff: Duration::from_millis(value.report_initial_backoff_ms),
                max_backoff: MAX_REPORT_BACKOFF,
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_tick_once_per_second() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_period, Duration::from_secs(1));
        assert_eq!(config.default_duration_seconds, 600);
        assert_eq!(config.feed_capacity, 64);
        assert_eq!(config.report.max_attempts, 3);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = EngineConfig::from_json(r#"{ "tick_period_ms": 250 }"#).unwrap();
        assert_eq!(config.tick_period, Duration::from_millis(250));
        assert_eq!(config.feed_capacity, 64);
    }

    #[test]
    fn zero_values_are_raised_to_minimums() {
        let config = EngineConfig::from_json(
            r#"{ "tick_period_ms": 0, "feed_capacity": 0, "report_max_attempts": 0 }"#,
        )
        .unwrap();
        assert_eq!(config.tick_period, Duration::from_millis(1));
        assert_eq!(config.feed_capacity, 1);
        assert_eq!(config.report.max_attempts, 1);
    }

    #[test]
    fn default_duration_is_capped_at_one_day() {
        let config =
            EngineConfig::from_json(r#"{ "default_duration_seconds": 100000 }"#).unwrap();
        assert_eq!(config.default_duration_seconds, MAX_DURATION_SECONDS);

        let config = EngineConfig::from_json(r#"{ "default_duration_seconds": 0 }"#).unwrap();
        assert_eq!(config.default_duration_seconds, 1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
        };
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(5));
        assert_eq!(policy.backoff(40), Duration::from_secs(5));
    }
}
