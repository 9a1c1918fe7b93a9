//! Provider detection from request headers.

use super::adapter::{ProviderAdapter, Source};
use crate::{config::ProviderConfig, request::WebhookHeaders, Provider};
use tracing::debug;

/// Provider and event name identified from a request's headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub provider: Provider,
    pub event: Option<String>,
}

/// Identify the sending provider.
///
/// Fixed event headers are checked first, in order: `X-GitHub-Event`,
/// `X-Gitee-Event`, `X-Gitlab-Event`. The first one present wins and its value
/// is the event name. Otherwise the custom provider matches when its
/// identifying header (`header_name`) is present, non-empty and starts with
/// `header_value`; the event is then read from `header_event` if configured.
///
/// Returns `None` when nothing matches.
///
/// # Examples
///
/// ```rust
/// use git_webhooks_core::{detect_provider, Provider, WebhookHeaders};
///
/// let headers: WebhookHeaders = [("X-Gitlab-Event", "Push Hook")].into_iter().collect();
/// let detection = detect_provider(&headers, None).unwrap();
/// assert_eq!(detection.provider, Provider::Gitlab);
/// assert_eq!(detection.event.as_deref(), Some("Push Hook"));
/// ```
pub fn detect_provider(headers: &WebhookHeaders, custom: Option<&ProviderConfig>) -> Option<Detection> {
    let fixed = ProviderAdapter::all()
        .iter()
        .find_map(|adapter| match adapter.event_header {
            Source::Fixed(header) => headers.get(header).map(|event| Detection {
                provider: adapter.provider,
                event: Some(event.to_string()),
            }),
            Source::Custom(_) => None,
        });
    if fixed.is_some() {
        return fixed;
    }

    let config = custom?;
    let layout = config.custom.as_ref()?;
    if layout.header_name.is_empty() {
        return None;
    }

    let value = headers.get(&layout.header_name)?;
    if value.is_empty() || !value.starts_with(&layout.header_value) {
        debug!(
            header = %layout.header_name,
            "Custom provider header present but value does not match"
        );
        return None;
    }

    let event = ProviderAdapter::for_provider(Provider::Custom)
        .event_header
        .resolve(config)
        .and_then(|header| headers.get(header))
        .map(str::to_string);

    Some(Detection {
        provider: Provider::Custom,
        event,
    })
}

#[cfg(test)]
#[path = "detection_tests.rs"]
mod tests;
