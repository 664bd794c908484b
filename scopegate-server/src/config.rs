//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment and
//! validated before the server starts:
//!
//! ```toml
//! bind_address = "0.0.0.0:8080"
//!
//! [engine]
//! collaborator_timeout_ms = 2000
//!
//! [hydra]
//! admin_url = "http://hydra:4445"
//!
//! [keto]
//! url = "http://keto:4466"
//!
//! [directory]
//! users = ["alice", "bob"]
//! ```
//!
//! Without `[hydra]` and `[keto]` the server runs standalone on in-memory
//! collaborators; `[standalone] tokens` then maps bearer tokens to subjects.

use scopegate_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SCOPEGATE_CONFIG";

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`ServerConfig`]
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are out of range or inconsistent
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

/// OAuth2 provider (Hydra admin API)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydraConfig {
    /// Admin endpoint, e.g. `http://hydra:4445`
    pub admin_url: String,
    /// Redirect URI registered for the root client
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// Policy service (Keto)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KetoConfig {
    /// Endpoint, e.g. `http://keto:4466`
    pub url: String,
}

/// Users that may be role members
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// User ids
    #[serde(default)]
    pub users: Vec<String>,
}

/// Settings for running without external collaborators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandaloneConfig {
    /// Bearer token to subject
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,
}

/// Telemetry export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Export traces over OTLP
    pub otel_enabled: bool,
    /// OTLP collector endpoint
    pub otlp_endpoint: String,
    /// Service name reported to the collector
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            otel_enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "scopegate-server".to_string(),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_address: String,
    /// Attach diagnostics to authorization responses
    pub debug: bool,
    /// Decision procedure settings
    pub engine: EngineConfig,
    /// OAuth2 provider; in-memory when absent
    pub hydra: Option<HydraConfig>,
    /// Policy service; in-memory when absent
    pub keto: Option<KetoConfig>,
    /// Known users
    pub directory: DirectoryConfig,
    /// In-memory introspection data
    pub standalone: StandaloneConfig,
    /// Telemetry export
    pub telemetry: TelemetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:8080".to_string(),
            debug: false,
            engine: EngineConfig::default(),
            hydra: None,
            keto: None,
            directory: DirectoryConfig::default(),
            standalone: StandaloneConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl ServerConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration: file (if any), then process environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => ServerConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Some(url) = lookup("HYDRA_ADMIN_URL") {
            match &mut self.hydra {
                Some(hydra) => hydra.admin_url = url,
                None => {
                    self.hydra = Some(HydraConfig {
                        admin_url: url,
                        callback_url: None,
                    })
                }
            }
        }
        if let Some(url) = lookup("KETO_URL") {
            self.keto = Some(KetoConfig { url });
        }
        if let Some(enabled) = lookup("OTEL_ENABLED") {
            self.telemetry.otel_enabled = parse_bool(&enabled);
        }
        if let Some(endpoint) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.telemetry.otlp_endpoint = endpoint;
        }
        if lookup("DEBUG").is_some() {
            self.debug = true;
        }
    }

    /// Check values; reports every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(format!("bind_address '{}' is not a socket address", self.bind_address));
        }
        if self.engine.collaborator_timeout_ms == 0 {
            errors.push("engine.collaborator_timeout_ms must be positive".to_string());
        }
        if self.engine.min_token_length == 0 {
            errors.push("engine.min_token_length must be positive".to_string());
        }
        if let Some(hydra) = &self.hydra {
            if !is_http_url(&hydra.admin_url) {
                errors.push(format!("hydra.admin_url '{}' is not an http(s) URL", hydra.admin_url));
            }
        }
        if let Some(keto) = &self.keto {
            if !is_http_url(&keto.url) {
                errors.push(format!("keto.url '{}' is not an http(s) URL", keto.url));
            }
        }
        if self.hydra.is_some() != self.keto.is_some() {
            errors.push("hydra and keto must be configured together".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|_| {
                ConfigError::Validation(vec![format!(
                    "invalid bind_address '{}'",
                    self.bind_address
                )])
            })
    }

    /// Whether external collaborators are configured
    pub fn is_standalone(&self) -> bool {
        self.hydra.is_none() && self.keto.is_none()
    }
}
