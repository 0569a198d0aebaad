//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Proxy base URL must be http(s)")]
    InvalidProxyUrl,

    #[error("Site URL must be http(s)")]
    InvalidSiteUrl,

    #[error("API secret must be at least 32 characters")]
    ApiSecretTooShort,

    #[error("Invalid currency code")]
    InvalidCurrency,
}
