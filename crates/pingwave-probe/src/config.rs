//! Probe service configuration.
//!
//! A [`ProbeConfig`] is fixed at construction time. It can be built in code
//! or loaded from a TOML file:
//!
//! ```toml
//! interval = "3000ms"
//! grace = "1s"
//! endpoints = ["https://example.com/", "https://example.org/health"]
//!
//! [transport]
//! pool_idle_timeout = "90s"
//! pool_max_idle_per_host = 8
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Default time between waves, and the deadline of every probe in a wave.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default upper bound `close()` waits for in-flight probes.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

/// Connection pool settings for the default HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// How long an idle pooled connection is kept around.
    pub pool_idle_timeout: Duration,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 8,
        }
    }
}

/// Configuration of a [`ProbeService`](crate::ProbeService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Endpoints probed every wave, in order. Duplicates are probed
    /// independently. URLs are not validated here; a malformed one shows
    /// up as an error in its probe result.
    pub endpoints: Vec<String>,
    /// Wave interval and per-probe deadline.
    pub interval: Duration,
    /// Upper bound on the shutdown drain.
    pub grace: Duration,
    /// Optional cap on concurrently probing workers.
    pub max_concurrency: Option<usize>,
    pub transport: TransportConfig,
}

impl ProbeConfig {
    /// Config with default timings for the given endpoints.
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            interval: DEFAULT_INTERVAL,
            grace: DEFAULT_GRACE,
            max_concurrency: None,
            transport: TransportConfig::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Load a config from a TOML file. Call [`validate`](Self::validate)
    /// once any overrides are applied.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        raw.resolve()
    }

    /// Check the invariants the service relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

/// On-disk shape, durations still as strings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    endpoints: Vec<String>,
    interval: Option<String>,
    grace: Option<String>,
    max_concurrency: Option<usize>,
    #[serde(default)]
    transport: RawTransportConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTransportConfig {
    pool_idle_timeout: Option<String>,
    pool_max_idle_per_host: Option<usize>,
}

impl RawConfig {
    fn resolve(self) -> ConfigResult<ProbeConfig> {
        let defaults = TransportConfig::default();
        Ok(ProbeConfig {
            endpoints: self.endpoints,
            interval: resolve_duration("interval", self.interval, DEFAULT_INTERVAL)?,
            grace: resolve_duration("grace", self.grace, DEFAULT_GRACE)?,
            max_concurrency: self.max_concurrency,
            transport: TransportConfig {
                pool_idle_timeout: resolve_duration(
                    "transport.pool_idle_timeout",
                    self.transport.pool_idle_timeout,
                    defaults.pool_idle_timeout,
                )?,
                pool_max_idle_per_host: self
                    .transport
                    .pool_max_idle_per_host
                    .unwrap_or(defaults.pool_max_idle_per_host),
            },
        })
    }
}

fn resolve_duration(
    field: &'static str,
    value: Option<String>,
    default: Duration,
) -> ConfigResult<Duration> {
    match value {
        None => Ok(default),
        Some(value) => parse_duration(&value).ok_or(ConfigError::Duration { field, value }),
    }
}

/// Parse a duration string like "3000ms", "5s", "1m", or a bare number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
