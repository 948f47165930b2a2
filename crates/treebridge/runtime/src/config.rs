//! Configuration for the tree bridge

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node identity allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// First identity handed out; must be at least 1
    #[serde(default = "default_first_node_id")]
    pub first_node_id: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            first_node_id: default_first_node_id(),
        }
    }
}

/// Call server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Calls that may queue before callers wait
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Emit a debug event for every settled call
    #[serde(default)]
    pub log_calls: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_calls: false,
        }
    }
}

/// Logging configuration, consumed by binaries installing a subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_first_node_id() -> u64 {
    1
}

fn default_channel_capacity() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BridgeConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `TREEBRIDGE__<SECTION>__<KEY>` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&BridgeConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TREEBRIDGE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: BridgeConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.first_node_id == 0 {
            return Err(ConfigError::Invalid(
                "identity.first_node_id must be at least 1".to_string(),
            ));
        }
        if self.server.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "server.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::default();
        assert_eq!(config.identity.first_node_id, 1);
        assert_eq!(config.server.channel_capacity, 64);
        assert!(config.telemetry.enabled);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_first_node_id_is_rejected() {
        let mut config = BridgeConfig::default();
        config.identity.first_node_id = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = BridgeConfig::load(None).unwrap();
        assert_eq!(config.server.channel_capacity, 64);
    }

    #[test]
    fn load_reads_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[identity]\nfirst_node_id = 100\n\n[logging]\nlevel = \"debug\"\njson = true"
        )
        .unwrap();

        let config = BridgeConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.identity.first_node_id, 100);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.server.channel_capacity, 64);
    }
}
