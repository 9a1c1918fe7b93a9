//! Request dispatch: from raw request to launched deployment.

use crate::{
    config::{ProviderConfigs, RepositoryRegistry},
    executor::DeploymentLauncher,
    request::{parse_request, RequestParseError, WebhookHeaders},
    webhook::{detect_provider, handle_webhook, WebhookError},
    Provider,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A dispatched delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub provider: Provider,
    pub event: Option<String>,
    pub repository: String,
}

/// Routes webhook requests to deployments.
///
/// Holds the resolved provider and repository configuration, both immutable
/// and shared, and the launcher used to start deployments. Cloning is cheap.
#[derive(Clone)]
pub struct Dispatcher {
    providers: Arc<ProviderConfigs>,
    repositories: Arc<RepositoryRegistry>,
    launcher: Arc<dyn DeploymentLauncher>,
}

impl Dispatcher {
    pub fn new(
        providers: ProviderConfigs,
        repositories: RepositoryRegistry,
        launcher: Arc<dyn DeploymentLauncher>,
    ) -> Self {
        Self {
            providers: Arc::new(providers),
            repositories: Arc::new(repositories),
            launcher,
        }
    }

    pub fn providers(&self) -> &ProviderConfigs {
        &self.providers
    }

    pub fn repositories(&self) -> &RepositoryRegistry {
        &self.repositories
    }

    /// Parse, detect, filter, verify and extract, then launch the matching
    /// repository's deployment.
    ///
    /// The launch is not awaited. On success the caller answers 200 `OK`; on
    /// failure [`DispatchError::status_code`] gives the response status.
    #[instrument(skip_all)]
    pub fn dispatch(&self, headers: WebhookHeaders, body: Bytes) -> Result<DispatchOutcome, DispatchError> {
        let mut request = parse_request(headers, body)?;

        let detection =
            detect_provider(request.headers(), self.providers.custom()).ok_or(DispatchError::ProviderUndetected)?;
        debug!(
            provider = %detection.provider,
            event = ?detection.event,
            content_type = %request.content_type(),
            content_length = request.content_length(),
            "Provider detected"
        );
        request.set_detection(detection.provider, detection.event);
        let provider = detection.provider;

        let config = self
            .providers
            .get(provider)
            .ok_or(DispatchError::ProviderNotConfigured { provider })?;

        let identifier = handle_webhook(&request, config)?
            .ok_or(DispatchError::MissingRepositoryIdentifier { provider })?;

        let Some(repository) = self.repositories.get(&identifier) else {
            warn!(provider = %provider, repository = %identifier, "Repository is not configured");
            return Err(DispatchError::RepositoryNotConfigured {
                repository: identifier,
            });
        };

        self.launcher.launch(repository);

        info!(
            provider = %provider,
            event = ?request.event(),
            repository = %identifier,
            "Deployment dispatched"
        );

        Ok(DispatchOutcome {
            provider,
            event: request.event().map(str::to_string),
            repository: identifier,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("providers", &self.providers)
            .field("repositories", &self.repositories.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Reasons a request was not dispatched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The body could not be read or decoded. Maps to 400.
    #[error(transparent)]
    Parse(#[from] RequestParseError),

    /// No provider header matched. Maps to 412.
    #[error("Unable to detect the webhook provider")]
    ProviderUndetected,

    /// The detected provider has no configuration. Maps to 412.
    #[error("Provider '{provider}' is not configured")]
    ProviderNotConfigured { provider: Provider },

    /// Event filtered out (406) or verification failed (401).
    #[error(transparent)]
    Rejected(#[from] WebhookError),

    /// The payload carries no repository identifier. Maps to 404.
    #[error("No repository identifier in {provider} payload")]
    MissingRepositoryIdentifier { provider: Provider },

    /// The identifier matches no configured repository. Maps to 404.
    #[error("Repository '{repository}' is not configured")]
    RepositoryNotConfigured { repository: String },
}

impl DispatchError {
    /// HTTP status code for this rejection.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Parse(_) => 400,
            Self::ProviderUndetected | Self::ProviderNotConfigured { .. } => 412,
            Self::Rejected(WebhookError::UnsupportedEvent { .. }) => 406,
            Self::Rejected(WebhookError::SignatureValidation { .. }) => 401,
            Self::MissingRepositoryIdentifier { .. } | Self::RepositoryNotConfigured { .. } => 404,
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
