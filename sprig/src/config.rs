//! Startup configuration. Settings are read once, from a single source given by location, and can
//! be overridden by environment variables prefixed with `SPRIG_`.
//!
//! The source format is deduced from the file extension - `.properties` files are read as INI,
//! which covers plain `key=value` lines. Recognized keys:
//!
//! * `scanPackage` (required) - root module path to scan for beans, in `a::b` or `a.b` notation,
//! * `contextPath` - application context prefix stripped from request paths,
//! * `installTracingLogger` - install a default `tracing` subscriber on startup (default `true`).

use crate::error::ConfigurationError;
use crate::scanner::SCAN_PACKAGE;
use config::{Config, Environment, File, FileFormat, Source};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

const CONFIG_ENV_PREFIX: &str = "SPRIG";

/// Default location of the settings source.
pub const CONFIG_FILE: &str = "application.properties";

/// Reads the settings source at given location, with environment overrides applied. Environment
/// keys are matched to source keys ignoring case and `_`, so `SPRIG_CONTEXT_PATH` overrides
/// `contextPath`.
pub fn load_settings(location: &str) -> Result<Config, ConfigurationError> {
    let unreadable = |source| ConfigurationError::UnreadableSettings {
        location: location.to_string(),
        source: Arc::new(source),
    };

    let settings = settings_file(location).collect().map_err(unreadable)?;
    let overrides = Environment::with_prefix(CONFIG_ENV_PREFIX)
        .collect()
        .map_err(unreadable)?;

    overrides
        .into_iter()
        .try_fold(
            Config::builder().add_source(settings_file(location)),
            |builder, (key, value)| {
                let key = settings
                    .keys()
                    .find(|candidate| fold_key(candidate) == fold_key(&key))
                    .cloned()
                    .unwrap_or(key);
                builder.set_override(key, value)
            },
        )
        .and_then(|builder| builder.build())
        .map_err(unreadable)
}

fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn settings_file(location: &str) -> File<config::FileSourceFile, FileFormat> {
    match Path::new(location)
        .extension()
        .and_then(|extension| extension.to_str())
    {
        Some("properties") | Some("ini") => File::new(location, FileFormat::Ini),
        _ => File::with_name(location),
    }
    .required(true)
}

/// Core application configuration.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    /// Root module path to scan.
    pub scan_package: String,
    /// Prefix stripped from request paths before routing.
    pub context_path: String,
    /// Should a default tracing logger be installed on startup.
    pub install_tracing_logger: bool,
}

impl ApplicationConfig {
    /// Creates a configuration scanning given package, with defaults for everything else.
    pub fn new(scan_package: impl Into<String>) -> Self {
        Self {
            scan_package: scan_package.into(),
            context_path: String::new(),
            install_tracing_logger: true,
        }
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn with_tracing_logger(mut self, install_tracing_logger: bool) -> Self {
        self.install_tracing_logger = install_tracing_logger;
        self
    }

    /// Reads the configuration from the settings source at given location.
    pub fn from_location(location: &str) -> Result<Self, ConfigurationError> {
        load_settings(location)?
            .try_deserialize::<OptionalApplicationConfig>()
            .map_err(|source| ConfigurationError::UnreadableSettings {
                location: location.to_string(),
                source: Arc::new(source),
            })?
            .try_into()
    }
}

impl TryFrom<OptionalApplicationConfig> for ApplicationConfig {
    type Error = ConfigurationError;

    fn try_from(value: OptionalApplicationConfig) -> Result<Self, Self::Error> {
        let scan_package = value
            .scan_package
            .filter(|package| !package.trim().is_empty())
            .ok_or_else(|| ConfigurationError::MissingProperty(SCAN_PACKAGE.to_string()))?;

        let default = Self::new(scan_package);
        Ok(Self {
            context_path: value.context_path.unwrap_or(default.context_path),
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            ..default
        })
    }
}

// keys missing from the source arrive case-folded or snake-cased from environment variables
#[derive(Deserialize)]
struct OptionalApplicationConfig {
    #[serde(rename = "scanPackage", alias = "scanpackage", alias = "scan_package")]
    scan_package: Option<String>,
    #[serde(rename = "contextPath", alias = "contextpath", alias = "context_path")]
    context_path: Option<String>,
    #[serde(
        rename = "installTracingLogger",
        alias = "installtracinglogger",
        alias = "install_tracing_logger"
    )]
    install_tracing_logger: Option<bool>,
}
