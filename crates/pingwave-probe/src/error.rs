//! Error types for the probe service.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for lifecycle operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why a single probe did not produce a fully-read response.
///
/// Carried as data inside a [`ProbeResult`](crate::ProbeResult); never
/// propagated out of the scheduler. A non-2xx status is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("probe cancelled")]
    Cancelled,

    #[error("body read error: {0}")]
    Body(String),
}

/// Lifecycle misuse of a [`ProbeService`](crate::ProbeService).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("probe service already started")]
    AlreadyStarted,

    #[error("probe service is closed")]
    Closed,

    #[error("no tokio runtime available to spawn the scheduler")]
    NoRuntime,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build transport: {0}")]
    Transport(String),
}

/// Errors loading or validating a [`ProbeConfig`](crate::ProbeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for `{field}`: {value}")]
    Duration { field: &'static str, value: String },

    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("probe interval must be greater than zero")]
    ZeroInterval,

    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,
}
