//! Resolved configuration value objects.
//!
//! These types are produced once by the service's configuration loader and
//! shared read-only (behind `Arc`) by every request. Nothing in this module
//! reads files or the environment.

use crate::Provider;
use std::collections::HashMap;
use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// WebhookSecret
// ============================================================================

/// Shared secret for a provider: an HMAC key or a plain token.
///
/// The value is wiped from memory on drop and never appears in `Debug`
/// output. Use [`WebhookSecret::expose`] at the point of comparison only.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WebhookSecret").field(&"<REDACTED>").finish()
    }
}

impl From<&str> for WebhookSecret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WebhookSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// CustomHeaders
// ============================================================================

pub const DEFAULT_CUSTOM_HEADER_NAME: &str = "X-Custom-Webhook";
pub const DEFAULT_CUSTOM_HEADER_VALUE: &str = "custom";
pub const DEFAULT_CUSTOM_HEADER_EVENT: &str = "X-Custom-Event";
pub const DEFAULT_CUSTOM_HEADER_TOKEN: &str = "X-Custom-Token";

/// Header and payload layout of the user-defined provider.
///
/// An empty string means "not configured" for every field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHeaders {
    /// Header whose presence identifies the custom provider.
    pub header_name: String,

    /// Prefix the identifying header's value must start with.
    pub header_value: String,

    /// Header carrying the event name.
    pub header_event: String,

    /// Header carrying the shared token.
    pub header_token: String,

    /// Dot-separated path to the repository identifier in the payload.
    pub identifier_path: String,
}

impl Default for CustomHeaders {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_CUSTOM_HEADER_NAME.to_string(),
            header_value: DEFAULT_CUSTOM_HEADER_VALUE.to_string(),
            header_event: DEFAULT_CUSTOM_HEADER_EVENT.to_string(),
            header_token: DEFAULT_CUSTOM_HEADER_TOKEN.to_string(),
            identifier_path: String::new(),
        }
    }
}

// ============================================================================
// ProviderConfig
// ============================================================================

/// Per-provider settings.
///
/// # Examples
///
/// ```rust
/// use git_webhooks_core::{Provider, ProviderConfig};
///
/// let config = ProviderConfig::new(Provider::Github)
///     .with_verification("s3cret")
///     .with_handle_events(["push"]);
///
/// assert!(config.allows_event(Some("push")));
/// assert!(!config.allows_event(Some("issues")));
/// assert!(!config.allows_event(None));
/// ```
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,

    /// Whether signature or token verification is required.
    pub verify: bool,

    pub secret: WebhookSecret,

    /// Accepted event names. Empty accepts every event.
    pub handle_events: Vec<String>,

    /// Header layout; present only for [`Provider::Custom`].
    pub custom: Option<CustomHeaders>,
}

impl ProviderConfig {
    /// Default configuration: no verification, empty secret, every event accepted.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            verify: false,
            secret: WebhookSecret::default(),
            handle_events: Vec::new(),
            custom: (provider == Provider::Custom).then(CustomHeaders::default),
        }
    }

    /// Enable verification with the given secret.
    pub fn with_verification(mut self, secret: impl Into<WebhookSecret>) -> Self {
        self.verify = true;
        self.secret = secret.into();
        self
    }

    /// Set the secret without turning verification on.
    pub fn with_secret(mut self, secret: impl Into<WebhookSecret>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn with_handle_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.handle_events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom_headers(mut self, headers: CustomHeaders) -> Self {
        self.custom = Some(headers);
        self
    }

    /// Check an event name against `handle_events`.
    ///
    /// An empty list accepts everything, including a missing event. A
    /// non-empty list requires the event to be present and listed.
    pub fn allows_event(&self, event: Option<&str>) -> bool {
        if self.handle_events.is_empty() {
            return true;
        }
        match event {
            Some(event) => self.handle_events.iter().any(|e| e == event),
            None => false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verify && self.secret.is_empty() {
            return Err(ConfigError::ProviderValidation {
                provider: self.provider,
                message: "verification is enabled but no secret is configured".to_string(),
            });
        }

        if let Some(custom) = &self.custom {
            if self.verify && custom.header_token.is_empty() {
                return Err(ConfigError::ProviderValidation {
                    provider: self.provider,
                    message: "verification is enabled but header_token is empty".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Split a comma-separated event list, trimming entries and dropping empty ones.
pub fn parse_event_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// ProviderConfigs
// ============================================================================

/// Provider configurations keyed by provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigs {
    entries: HashMap<Provider, ProviderConfig>,
}

impl ProviderConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    /// One default [`ProviderConfig`] per provider.
    pub fn with_defaults() -> Self {
        Provider::ALL.into_iter().map(ProviderConfig::new).collect()
    }

    /// Insert a configuration, replacing any existing one for the same provider.
    pub fn insert(&mut self, config: ProviderConfig) -> &mut Self {
        self.entries.insert(config.provider, config);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.entries.get(&provider)
    }

    /// Custom provider configuration, if any.
    pub fn custom(&self) -> Option<&ProviderConfig> {
        self.get(Provider::Custom)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        Provider::ALL
            .into_iter()
            .filter_map(move |p| self.entries.get(&p))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.iter().try_for_each(ProviderConfig::validate)
    }
}

impl FromIterator<ProviderConfig> for ProviderConfigs {
    fn from_iter<T: IntoIterator<Item = ProviderConfig>>(iter: T) -> Self {
        let mut configs = Self::new();
        for config in iter {
            configs.insert(config);
        }
        configs
    }
}

// ============================================================================
// RepositoryConfig
// ============================================================================

/// Deployment target for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Identifier as the providers report it, e.g. `owner/repo`.
    pub name: String,

    /// Working directory of the deployment command.
    pub cwd: PathBuf,

    /// Shell command line to run.
    pub cmd: String,
}

impl RepositoryConfig {
    pub fn new(name: impl Into<String>, cwd: impl Into<PathBuf>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cwd: cwd.into(),
            cmd: cmd.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::RepositoryValidation {
                repository: self.name.clone(),
                message: "name must not be empty".to_string(),
            });
        }
        if self.cwd.as_os_str().is_empty() {
            return Err(ConfigError::RepositoryValidation {
                repository: self.name.clone(),
                message: "cwd must not be empty".to_string(),
            });
        }
        if self.cmd.trim().is_empty() {
            return Err(ConfigError::RepositoryValidation {
                repository: self.name.clone(),
                message: "cmd must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// RepositoryRegistry
// ============================================================================

/// Repository configurations keyed by identifier.
///
/// Lookups are exact: identifiers are case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct RepositoryRegistry {
    repositories: HashMap<String, RepositoryConfig>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateRepository`] if the name is already taken,
    /// or the repository's own validation error.
    pub fn register(&mut self, repository: RepositoryConfig) -> Result<&mut Self, ConfigError> {
        repository.validate()?;
        if self.repositories.contains_key(&repository.name) {
            return Err(ConfigError::DuplicateRepository {
                repository: repository.name,
            });
        }
        self.repositories.insert(repository.name.clone(), repository);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.get(name)
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Provider '{provider}' configuration is invalid: {message}")]
    ProviderValidation { provider: Provider, message: String },

    #[error("Repository '{repository}' configuration is invalid: {message}")]
    RepositoryValidation { repository: String, message: String },

    #[error("Repository '{repository}' is configured more than once")]
    DuplicateRepository { repository: String },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
