//! Static provider adapter table.
//!
//! Each [`ProviderAdapter`] describes where a provider puts its event name,
//! its token or signature, and its repository identifier, and which
//! [`SignatureVerifier`] checks it. The table is built at compile time and
//! looked up by [`Provider`]; adding a provider means adding a row.

use super::verifier::{
    GiteeSignatureVerifier, GithubSignatureVerifier, SignatureVerifier, TokenVerifier,
    VerificationInput, VerificationResult,
};
use crate::{
    config::{CustomHeaders, ProviderConfig},
    request::WebhookRequest,
    Provider,
};

pub const GITHUB_EVENT_HEADER: &str = "X-GitHub-Event";
pub const GITHUB_SIGNATURE_HEADER: &str = "X-Hub-Signature";
pub const GITEE_EVENT_HEADER: &str = "X-Gitee-Event";
pub const GITEE_TOKEN_HEADER: &str = "X-Gitee-Token";
pub const GITEE_TIMESTAMP_HEADER: &str = "X-Gitee-Timestamp";
pub const GITLAB_EVENT_HEADER: &str = "X-Gitlab-Event";
pub const GITLAB_TOKEN_HEADER: &str = "X-Gitlab-Token";

// ============================================================================
// Source
// ============================================================================

/// Where a header name or payload path comes from.
#[derive(Clone, Copy)]
pub enum Source {
    /// Fixed by the provider's protocol.
    Fixed(&'static str),

    /// Read from the custom provider's header layout. Empty means unset.
    Custom(fn(&CustomHeaders) -> &str),
}

impl Source {
    /// Resolve the name, or `None` when it is not configured.
    pub fn resolve<'a>(&self, config: &'a ProviderConfig) -> Option<&'a str> {
        match self {
            Source::Fixed(name) => Some(*name),
            Source::Custom(select) => config
                .custom
                .as_ref()
                .map(|headers| select(headers))
                .filter(|name| !name.is_empty()),
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Fixed(name) => f.debug_tuple("Fixed").field(name).finish(),
            Source::Custom(_) => f.write_str("Custom"),
        }
    }
}

fn custom_event_header(headers: &CustomHeaders) -> &str {
    &headers.header_event
}

fn custom_token_header(headers: &CustomHeaders) -> &str {
    &headers.header_token
}

fn custom_identifier_path(headers: &CustomHeaders) -> &str {
    &headers.identifier_path
}

// ============================================================================
// ProviderAdapter
// ============================================================================

/// Provider-specific pieces of the webhook handling flow.
#[derive(Debug)]
pub struct ProviderAdapter {
    pub provider: Provider,

    /// Header carrying the event name.
    pub event_header: Source,

    /// Header carrying the signature or token.
    pub token_header: Source,

    /// Header carrying a signing timestamp.
    pub timestamp_header: Option<&'static str>,

    /// Dot-separated path to the repository identifier in the payload.
    pub identifier_path: Source,

    pub verifier: &'static dyn SignatureVerifier,

    /// Verify whenever the token header is present, even if `verify` is off.
    pub always_validate_when_token_present: bool,
}

static ADAPTERS: [ProviderAdapter; 4] = [
    ProviderAdapter {
        provider: Provider::Github,
        event_header: Source::Fixed(GITHUB_EVENT_HEADER),
        token_header: Source::Fixed(GITHUB_SIGNATURE_HEADER),
        timestamp_header: None,
        identifier_path: Source::Fixed("repository.full_name"),
        verifier: &GithubSignatureVerifier,
        always_validate_when_token_present: false,
    },
    ProviderAdapter {
        provider: Provider::Gitee,
        event_header: Source::Fixed(GITEE_EVENT_HEADER),
        token_header: Source::Fixed(GITEE_TOKEN_HEADER),
        timestamp_header: Some(GITEE_TIMESTAMP_HEADER),
        identifier_path: Source::Fixed("repository.full_name"),
        verifier: &GiteeSignatureVerifier,
        always_validate_when_token_present: true,
    },
    ProviderAdapter {
        provider: Provider::Gitlab,
        event_header: Source::Fixed(GITLAB_EVENT_HEADER),
        token_header: Source::Fixed(GITLAB_TOKEN_HEADER),
        timestamp_header: None,
        identifier_path: Source::Fixed("project.path_with_namespace"),
        verifier: &TokenVerifier,
        always_validate_when_token_present: false,
    },
    ProviderAdapter {
        provider: Provider::Custom,
        event_header: Source::Custom(custom_event_header),
        token_header: Source::Custom(custom_token_header),
        timestamp_header: None,
        identifier_path: Source::Custom(custom_identifier_path),
        verifier: &TokenVerifier,
        always_validate_when_token_present: false,
    },
];

impl ProviderAdapter {
    /// Adapter for `provider`.
    pub fn for_provider(provider: Provider) -> &'static ProviderAdapter {
        match provider {
            Provider::Github => &ADAPTERS[0],
            Provider::Gitee => &ADAPTERS[1],
            Provider::Gitlab => &ADAPTERS[2],
            Provider::Custom => &ADAPTERS[3],
        }
    }

    /// Every adapter, in detection order.
    pub fn all() -> &'static [ProviderAdapter] {
        &ADAPTERS
    }

    pub fn token<'a>(&self, request: &'a WebhookRequest, config: &ProviderConfig) -> Option<&'a str> {
        let header = self.token_header.resolve(config)?;
        request.headers().get(header)
    }

    /// Run the provider's verifier against the request.
    pub fn verify(&self, request: &WebhookRequest, config: &ProviderConfig) -> VerificationResult {
        let input = VerificationInput {
            payload: request.raw_body(),
            token: self.token(request, config),
            timestamp: self
                .timestamp_header
                .and_then(|header| request.headers().get(header)),
            secret: config.secret.expose(),
        };
        self.verifier.verify(&input)
    }

    /// Repository identifier from the payload; `None` when absent or not a string.
    pub fn extract_identifier(&self, request: &WebhookRequest, config: &ProviderConfig) -> Option<String> {
        let path = self.identifier_path.resolve(config)?;
        request.body().lookup_str(path).map(str::to_string)
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
