//! Webhook handling flow.
//!
//! Every provider goes through the same three steps, driven by its entry in
//! the [`adapter`] table:
//!
//! 1. **Event filter**: the event name must be accepted by `handle_events`.
//! 2. **Verification**: when `verify` is on, or when the adapter verifies
//!    whenever a token is present (Gitee), the provider's verifier must pass.
//! 3. **Extraction**: the repository identifier is read from the payload.

use crate::{config::ProviderConfig, request::WebhookRequest, Provider};
use tracing::{debug, instrument, warn};

pub mod adapter;
pub mod detection;
pub mod verifier;

pub use adapter::ProviderAdapter;
pub use detection::{detect_provider, Detection};
pub use verifier::{SignatureVerifier, VerificationResult};

/// Run the event filter, verification and extraction steps for one request.
///
/// Returns the repository identifier, or `None` when the payload does not
/// carry one.
///
/// # Errors
///
/// - [`WebhookError::UnsupportedEvent`] if the event is filtered out.
/// - [`WebhookError::SignatureValidation`] if verification fails.
#[instrument(skip(request, config), fields(provider = %config.provider, event = ?request.event()))]
pub fn handle_webhook(request: &WebhookRequest, config: &ProviderConfig) -> Result<Option<String>, WebhookError> {
    let provider = config.provider;

    if !config.allows_event(request.event()) {
        warn!("Event is not in handle_events");
        return Err(WebhookError::UnsupportedEvent {
            provider,
            event: request.event().map(str::to_string),
        });
    }

    let adapter = ProviderAdapter::for_provider(provider);
    let token_present = adapter.token(request, config).is_some();
    if config.verify || (adapter.always_validate_when_token_present && token_present) {
        let result = adapter.verify(request, config);
        if !result.is_valid {
            warn!(reason = %result.message, "Webhook verification failed");
            return Err(WebhookError::SignatureValidation {
                provider,
                message: result.message,
            });
        }
        debug!("Webhook verification passed");
    }

    Ok(adapter.extract_identifier(request, config))
}

/// Rejections produced by [`handle_webhook`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("Event {event:?} is not handled for provider '{provider}'")]
    UnsupportedEvent {
        provider: Provider,
        event: Option<String>,
    },

    #[error("Verification failed for provider '{provider}': {message}")]
    SignatureValidation { provider: Provider, message: String },
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
