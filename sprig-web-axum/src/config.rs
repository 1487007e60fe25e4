//! Server configuration. Read from the same settings source as
//! [ApplicationConfig](sprig::config::ApplicationConfig), using the `listenAddress` key.

use config::Config;
use serde::Deserialize;
use sprig::config::load_settings;
use sprig::error::ConfigurationError;
use std::sync::Arc;

/// Server configuration.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address on which to listen.
    pub listen_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl From<OptionalServerConfig> for ServerConfig {
    fn from(value: OptionalServerConfig) -> Self {
        let default = Self::default();
        Self {
            listen_address: value.listen_address.unwrap_or(default.listen_address),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_address: impl Into<String>) -> Self {
        Self {
            listen_address: listen_address.into(),
        }
    }

    /// Reads the configuration from the settings source at given location.
    pub fn from_location(location: &str) -> Result<Self, ConfigurationError> {
        Self::from_settings(load_settings(location)?).map_err(|source| {
            ConfigurationError::UnreadableSettings {
                location: location.to_string(),
                source: Arc::new(source),
            }
        })
    }

    fn from_settings(settings: Config) -> Result<Self, config::ConfigError> {
        settings
            .try_deserialize::<OptionalServerConfig>()
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalServerConfig {
    #[serde(
        rename = "listenAddress",
        alias = "listenaddress",
        alias = "listen_address"
    )]
    listen_address: Option<String>,
}
