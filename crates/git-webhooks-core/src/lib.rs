//! # git-webhooks core
//!
//! Domain logic for receiving git hosting webhooks and turning them into
//! deployment runs.
//!
//! A request travels through four stages:
//!
//! 1. [`request::parse_request`] turns the raw header map and body into a
//!    [`request::WebhookRequest`].
//! 2. [`webhook::detect_provider`] decides which hosting provider sent it.
//! 3. [`webhook::handle_webhook`] runs the provider-specific event filter,
//!    signature verification and repository identifier extraction.
//! 4. [`dispatch::Dispatcher`] looks the identifier up in the repository
//!    registry and hands the repository to a [`executor::DeploymentLauncher`].
//!
//! ## Usage
//!
//! ```rust
//! use git_webhooks_core::Provider;
//!
//! let provider: Provider = "gitee".parse().unwrap();
//! assert_eq!(provider.as_str(), "gitee");
//! assert_eq!(provider.to_string(), "gitee");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod config;
pub mod dispatch;
pub mod executor;
pub mod request;
pub mod webhook;

pub use config::{ConfigError, ProviderConfig, ProviderConfigs, RepositoryConfig, RepositoryRegistry, WebhookSecret};
pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher};
pub use executor::{DeploymentLauncher, ShellLauncher};
pub use request::{parse_request, RequestParseError, WebhookHeaders, WebhookRequest};
pub use webhook::{detect_provider, handle_webhook, VerificationResult, WebhookError};

// ============================================================================
// Provider
// ============================================================================

/// Git hosting service that can send webhooks to this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Gitee,
    Gitlab,
    Custom,
}

impl Provider {
    /// Every provider, in detection order.
    pub const ALL: [Provider; 4] = [
        Provider::Github,
        Provider::Gitee,
        Provider::Gitlab,
        Provider::Custom,
    ];

    /// Lowercase name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Github => "github",
            Provider::Gitee => "gitee",
            Provider::Gitlab => "gitlab",
            Provider::Custom => "custom",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProviderError {
                value: s.to_string(),
            })
    }
}

/// Error returned when a string does not name a known [`Provider`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider '{value}'; expected one of github, gitee, gitlab, custom")]
pub struct UnknownProviderError {
    pub value: String,
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
