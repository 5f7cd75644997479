//! Configuration management for the lead bot
//!
//! Supports loading configuration from:
//! - YAML files (config/default.yaml, config/{env}.yaml)
//! - Environment variables (LEADBOT__ prefix, `__` separator)
//!
//! Scoring weights and priority thresholds are configuration, not
//! architecture — see [`ScoringConfig`].

pub mod constants;
pub mod scoring;
pub mod settings;

pub use scoring::{PriorityThresholds, ScoringConfig};
pub use settings::{
    load_settings, ObservabilityConfig, PersistenceConfig, RuntimeEnvironment, ServerConfig,
    Settings, WhatsAppConfig, WindowConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
