//! Service configuration.
//!
//! The configuration is a TOML document layered with environment variables
//! by the `config` crate. Environment variables use the `GITWEBHOOKS` prefix
//! and `__` as the nesting separator, e.g. `GITWEBHOOKS__SERVER__PORT=9000`
//! or `GITWEBHOOKS__PROVIDERS__GITHUB__SECRET=...`.
//!
//! ```toml
//! [server]
//! port = 6789
//!
//! [providers.github]
//! verify = true
//! secret = "s3cret"
//! handle_events = "push,release"
//!
//! [[repositories]]
//! name = "owner/repo"
//! cwd = "/srv/app"
//! cmd = "git pull && make deploy"
//! ```

use git_webhooks_core::{
    config::{parse_event_list, CustomHeaders},
    Provider, ProviderConfig, ProviderConfigs, RepositoryConfig, RepositoryRegistry,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "GITWEBHOOKS";

/// Placeholder written over secrets by [`ServiceConfig::redacted`].
pub const REDACTED: &str = "********";

// ============================================================================
// ServiceConfig
// ============================================================================

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Per-provider settings
    pub providers: ProvidersConfig,

    /// Deployment targets
    pub repositories: Vec<RepositorySection>,
}

impl ServiceConfig {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// A missing file is an error only when `required` is set. Environment
    /// values are kept as text so secrets such as `007123` survive intact;
    /// numeric and boolean fields are converted during deserialization.
    pub fn load(path: Option<&Path>, required: bool) -> Result<Self, ServiceConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .required(required)
                    .format(config::FileFormat::Toml),
            );
        }

        let service_config: ServiceConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        service_config.validate()?;
        Ok(service_config)
    }

    /// Check the configuration without starting anything.
    pub fn validate(&self) -> Result<(), ServiceConfigError> {
        if self.server.port == 0 {
            return Err(ServiceConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }
        if self.server.max_body_size == 0 {
            return Err(ServiceConfigError::Invalid {
                message: "server.max_body_size must be non-zero".to_string(),
            });
        }
        self.provider_configs()?;
        self.repository_registry()?;
        Ok(())
    }

    /// Resolved provider configurations; absent sections get defaults.
    pub fn provider_configs(&self) -> Result<ProviderConfigs, ServiceConfigError> {
        let configs: ProviderConfigs = Provider::ALL
            .into_iter()
            .map(|provider| match self.providers.section(provider) {
                Some(section) => section.to_provider_config(provider),
                None => ProviderConfig::new(provider),
            })
            .collect();
        configs.validate()?;
        Ok(configs)
    }

    pub fn repository_registry(&self) -> Result<RepositoryRegistry, ServiceConfigError> {
        let mut registry = RepositoryRegistry::new();
        for section in &self.repositories {
            registry.register(RepositoryConfig::new(
                section.name.clone(),
                section.cwd.clone(),
                section.cmd.clone(),
            ))?;
        }
        Ok(registry)
    }

    /// Copy with every non-empty secret replaced by [`REDACTED`].
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for section in copy.providers.sections_mut() {
            if !section.secret.is_empty() {
                section.secret = REDACTED.to_string();
            }
        }
        copy
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ServiceConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ============================================================================
// Server and logging
// ============================================================================

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6789,
            max_body_size: 1024 * 1024,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,

    /// Log file path (optional)
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file_path: None,
        }
    }
}

// ============================================================================
// Providers
// ============================================================================

/// Provider sections. A missing section means default settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<ProviderSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gitee: Option<ProviderSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<ProviderSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<ProviderSection>,
}

impl ProvidersConfig {
    pub fn section(&self, provider: Provider) -> Option<&ProviderSection> {
        match provider {
            Provider::Github => self.github.as_ref(),
            Provider::Gitee => self.gitee.as_ref(),
            Provider::Gitlab => self.gitlab.as_ref(),
            Provider::Custom => self.custom.as_ref(),
        }
    }

    fn sections_mut(&mut self) -> impl Iterator<Item = &mut ProviderSection> {
        [
            self.github.as_mut(),
            self.gitee.as_mut(),
            self.gitlab.as_mut(),
            self.custom.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

/// One provider's settings as written in the configuration.
///
/// The `header_*` and `identifier_path` keys apply to the custom provider
/// only; unset keys keep their defaults.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub verify: bool,

    pub secret: String,

    pub handle_events: EventList,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_event: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_path: Option<String>,
}

impl ProviderSection {
    pub fn to_provider_config(&self, provider: Provider) -> ProviderConfig {
        let mut config = ProviderConfig::new(provider)
            .with_secret(self.secret.as_str())
            .with_handle_events(self.handle_events.to_vec());
        config.verify = self.verify;

        if provider == Provider::Custom {
            let defaults = CustomHeaders::default();
            config = config.with_custom_headers(CustomHeaders {
                header_name: self.header_name.clone().unwrap_or(defaults.header_name),
                header_value: self.header_value.clone().unwrap_or(defaults.header_value),
                header_event: self.header_event.clone().unwrap_or(defaults.header_event),
                header_token: self.header_token.clone().unwrap_or(defaults.header_token),
                identifier_path: self
                    .identifier_path
                    .clone()
                    .unwrap_or(defaults.identifier_path),
            });
        }

        config
    }
}

impl std::fmt::Debug for ProviderSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSection")
            .field("verify", &self.verify)
            .field("secret", &"<REDACTED>")
            .field("handle_events", &self.handle_events)
            .field("header_name", &self.header_name)
            .field("header_value", &self.header_value)
            .field("header_event", &self.header_event)
            .field("header_token", &self.header_token)
            .field("identifier_path", &self.identifier_path)
            .finish()
    }
}

/// Event names, written either as a comma-separated string or as an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventList {
    List(Vec<String>),
    Csv(String),
}

impl EventList {
    /// Trimmed, non-empty event names.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            EventList::List(events) => events
                .iter()
                .map(|e| e.trim())
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
            EventList::Csv(raw) => parse_event_list(raw),
        }
    }
}

impl Default for EventList {
    fn default() -> Self {
        EventList::List(Vec::new())
    }
}

// ============================================================================
// Repositories
// ============================================================================

/// One `[[repositories]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySection {
    /// Identifier as reported by the provider, e.g. `owner/repo`.
    pub name: String,

    /// Working directory of the command.
    pub cwd: PathBuf,

    /// Shell command line.
    pub cmd: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error(transparent)]
    Validation(#[from] git_webhooks_core::ConfigError),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
