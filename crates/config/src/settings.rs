//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ScoringConfig};

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Messaging platform (WhatsApp Cloud API) configuration
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Reply-window policy
    #[serde(default)]
    pub window: WindowConfig,

    /// Persistence configuration (ScyllaDB)
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Lead scoring rules
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Optional path to a quiz catalog YAML file; built-in catalog otherwise.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret echoed back during the platform's verification
    /// handshake (GET /webhook).
    #[serde(default)]
    pub verify_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            verify_token: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Outbound messaging API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub phone_number_id: String,

    #[serde(default)]
    pub access_token: String,

    /// Bounded timeout for every outbound API call.
    #[serde(default = "default_send_timeout")]
    pub timeout_seconds: u64,

    /// Template language code.
    #[serde(default = "default_language")]
    pub language: String,

    /// Named template used for the greeting reply.
    #[serde(default = "default_welcome_template")]
    pub welcome_template: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            phone_number_id: String::new(),
            access_token: String::new(),
            timeout_seconds: default_send_timeout(),
            language: default_language(),
            welcome_template: default_welcome_template(),
        }
    }
}

fn default_api_base() -> String {
    "https://graph.facebook.com/v24.0".to_string()
}

fn default_send_timeout() -> u64 {
    10
}

fn default_language() -> String {
    "pt_BR".to_string()
}

fn default_welcome_template() -> String {
    "welcome_gost_gothd".to_string()
}

/// Reply-window policy configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Automated replies are allowed for this many hours after the user's
    /// last inbound message.
    #[serde(default = "default_window_hours")]
    pub hours: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            hours: default_window_hours(),
        }
    }
}

impl WindowConfig {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.hours)
    }
}

fn default_window_hours() -> i64 {
    24
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    /// ScyllaDB host addresses
    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    /// ScyllaDB keyspace name
    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    /// ScyllaDB replication factor
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "leadbot".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false, // Disabled by default for development
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON (structured ingestion) instead of human-readable.
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.window.hours < 1 {
            return Err(ConfigError::InvalidValue {
                field: "window.hours".to_string(),
                message: format!("Must be at least 1 hour, got {}", self.window.hours),
            });
        }

        if self.whatsapp.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "whatsapp.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        let thresholds = &self.scoring.priority_thresholds;
        if thresholds.high <= thresholds.medium {
            return Err(ConfigError::InvalidValue {
                field: "scoring.priority_thresholds".to_string(),
                message: format!(
                    "high ({}) must be greater than medium ({})",
                    thresholds.high, thresholds.medium
                ),
            });
        }

        // Credentials are required once we are past development
        if self.environment.is_strict() {
            if self.whatsapp.access_token.is_empty() {
                return Err(ConfigError::MissingField(
                    "whatsapp.access_token".to_string(),
                ));
            }
            if self.whatsapp.phone_number_id.is_empty() {
                return Err(ConfigError::MissingField(
                    "whatsapp.phone_number_id".to_string(),
                ));
            }
            if self.server.verify_token.is_none() {
                return Err(ConfigError::MissingField("server.verify_token".to_string()));
            }
        } else {
            if self.whatsapp.access_token.is_empty() {
                tracing::warn!("whatsapp.access_token not configured; outbound sends will fail");
            }
            if self.server.verify_token.is_none() {
                tracing::warn!("server.verify_token not configured; webhook verification disabled");
            }
        }

        Ok(())
    }
}

/// Load settings from config files and environment variables.
///
/// Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("LEADBOT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.window.hours, 24);
        assert!(!settings.persistence.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_window_duration() {
        let window = WindowConfig { hours: 24 };
        assert_eq!(window.duration(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let mut settings = Settings::default();
        settings.scoring.priority_thresholds.high = 10;
        settings.scoring.priority_thresholds.medium = 30;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_production_requires_credentials() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        assert!(settings.validate().is_err());

        settings.whatsapp.access_token = "token".to_string();
        settings.whatsapp.phone_number_id = "123".to_string();
        settings.server.verify_token = Some("secret".to_string());
        assert!(settings.validate().is_ok());
    }
}
