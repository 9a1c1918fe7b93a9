//! Webhook request model and parser.
//!
//! [`parse_request`] consumes the raw header map and body of an HTTP POST and
//! produces a [`WebhookRequest`]. Provider and event are left empty; they are
//! filled in by [`crate::webhook::detect_provider`].

use crate::Provider;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// WebhookHeaders
// ============================================================================

/// Request headers as received.
///
/// Names keep their original spelling; lookups ignore ASCII case.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    entries: Vec<(String, String)>,
}

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for WebhookHeaders
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ============================================================================
// RequestBody
// ============================================================================

/// Decoded request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/json` object.
    Json(Map<String, Value>),

    /// `application/x-www-form-urlencoded` fields, first value per key.
    Form(HashMap<String, String>),
}

impl RequestBody {
    /// Walk a dot-separated path and return the terminal value if it is a string.
    ///
    /// Every intermediate segment must resolve to a JSON object. Form bodies are
    /// flat, so only single-segment paths can match there.
    pub fn lookup_str(&self, path: &str) -> Option<&str> {
        if path.is_empty() {
            return None;
        }
        let mut segments = path.split('.');
        let first = segments.next()?;

        match self {
            RequestBody::Json(object) => {
                let start = object.get(first)?;
                segments
                    .try_fold(start, |current, key| current.as_object()?.get(key))?
                    .as_str()
            }
            RequestBody::Form(fields) => {
                let value = fields.get(first)?;
                match segments.next() {
                    Some(_) => None,
                    None => Some(value.as_str()),
                }
            }
        }
    }
}

// ============================================================================
// WebhookRequest
// ============================================================================

/// A parsed webhook request.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    headers: WebhookHeaders,
    raw_body: Bytes,
    body: RequestBody,
    content_type: String,
    content_length: usize,
    provider: Option<Provider>,
    event: Option<String>,
}

impl WebhookRequest {
    pub fn headers(&self) -> &WebhookHeaders {
        &self.headers
    }

    /// Exact bytes that were signed by the sender.
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Declared `Content-Length`, equal to the length of [`Self::raw_body`].
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn provider(&self) -> Option<Provider> {
        self.provider
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Record the result of provider detection.
    pub fn set_detection(&mut self, provider: Provider, event: Option<String>) {
        self.provider = Some(provider);
        self.event = event;
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Build a [`WebhookRequest`] from the raw header map and body.
///
/// Exactly `Content-Length` bytes of `body` are used as the payload. The
/// content type selects the decoder: anything containing `application/json`
/// is decoded as a JSON object, anything containing
/// `application/x-www-form-urlencoded` as form fields (first value per key,
/// blank values dropped). Every other content type is rejected.
///
/// # Errors
///
/// See [`RequestParseError`]. All variants map to a 400 response.
///
/// # Examples
///
/// ```rust
/// use bytes::Bytes;
/// use git_webhooks_core::{parse_request, WebhookHeaders};
///
/// let body = Bytes::from_static(br#"{"ref":"main"}"#);
/// let headers: WebhookHeaders = [
///     ("Content-Type", "application/json"),
///     ("Content-Length", "14"),
/// ]
/// .into_iter()
/// .collect();
///
/// let request = parse_request(headers, body).unwrap();
/// assert_eq!(request.body().lookup_str("ref"), Some("main"));
/// assert!(request.provider().is_none());
/// ```
pub fn parse_request(headers: WebhookHeaders, body: Bytes) -> Result<WebhookRequest, RequestParseError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .ok_or(RequestParseError::MissingContentLength)?;
    let length: usize = declared
        .trim()
        .parse()
        .map_err(|_| RequestParseError::InvalidContentLength {
            value: declared.to_string(),
        })?;
    if length == 0 {
        return Err(RequestParseError::EmptyBody);
    }
    if body.len() < length {
        return Err(RequestParseError::TruncatedBody {
            expected: length,
            actual: body.len(),
        });
    }
    let raw_body = body.slice(..length);

    let content_type = headers.get(CONTENT_TYPE).unwrap_or_default().to_string();
    let parsed = if content_type.contains(JSON_CONTENT_TYPE) {
        decode_json(&raw_body)?
    } else if content_type.contains(FORM_CONTENT_TYPE) {
        decode_form(&raw_body)
    } else {
        return Err(RequestParseError::UnsupportedContentType { content_type });
    };

    debug!(
        content_type = %content_type,
        content_length = length,
        "Parsed webhook request body"
    );

    Ok(WebhookRequest {
        headers,
        raw_body,
        body: parsed,
        content_type,
        content_length: length,
        provider: None,
        event: None,
    })
}

fn decode_json(payload: &[u8]) -> Result<RequestBody, RequestParseError> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| RequestParseError::InvalidJson {
        message: e.to_string(),
    })?;
    match value {
        Value::Object(object) => Ok(RequestBody::Json(object)),
        _ => Err(RequestParseError::NotAnObject),
    }
}

fn decode_form(payload: &[u8]) -> RequestBody {
    let mut fields = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(payload) {
        if value.is_empty() {
            continue;
        }
        fields.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    RequestBody::Form(fields)
}

// ============================================================================
// Errors
// ============================================================================

/// Reasons a request body cannot be turned into a [`WebhookRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestParseError {
    #[error("Missing Content-Length header")]
    MissingContentLength,

    #[error("Invalid Content-Length header: '{value}'")]
    InvalidContentLength { value: String },

    #[error("Request body is empty")]
    EmptyBody,

    #[error("Request body truncated: expected {expected} bytes, received {actual}")]
    TruncatedBody { expected: usize, actual: usize },

    #[error("Unsupported content type: '{content_type}'")]
    UnsupportedContentType { content_type: String },

    #[error("Invalid JSON payload: {message}")]
    InvalidJson { message: String },

    #[error("JSON payload is not an object")]
    NotAnObject,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
