//! Signature and token verifiers.
//!
//! Each provider authenticates its deliveries differently:
//!
//! | Verifier                     | Scheme                                                     |
//! |------------------------------|------------------------------------------------------------|
//! | [`GithubSignatureVerifier`]  | `sha1=` + hex HMAC-SHA1 of the raw body                    |
//! | [`GiteeSignatureVerifier`]   | plain password, or base64 HMAC-SHA256 of `"{ts}\n{secret}"` |
//! | [`TokenVerifier`]            | plain token equality (GitLab, custom)                      |
//!
//! Verifiers never fail with an error: every outcome is a [`VerificationResult`].
//! All secret comparisons run in constant time.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const MISSING_SIGNATURE: &str = "Missing signature";
pub const SECRET_NOT_CONFIGURED: &str = "Secret not configured";
pub const INVALID_SIGNATURE_FORMAT: &str = "Invalid signature format";
pub const INVALID_SIGNATURE: &str = "Invalid signature";
pub const MISSING_SIGNATURE_OR_PASSWORD: &str = "Missing signature or password";
pub const INVALID_TIMESTAMP_FORMAT: &str = "Invalid timestamp format";
pub const INVALID_PASSWORD: &str = "Invalid password";
pub const MISSING_TOKEN: &str = "Missing token";
pub const INVALID_TOKEN: &str = "Invalid token";

const GITHUB_SIGNATURE_PREFIX: &str = "sha1=";

// ============================================================================
// VerificationResult
// ============================================================================

/// Outcome of a verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub is_valid: bool,
    pub message: String,
}

impl VerificationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            message: "Verification successful".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

// ============================================================================
// SignatureVerifier
// ============================================================================

/// Everything a verifier may need from the request and the provider configuration.
#[derive(Debug, Clone, Copy)]
pub struct VerificationInput<'a> {
    /// Raw request body, exactly as signed.
    pub payload: &'a [u8],

    /// Signature or token header value.
    pub token: Option<&'a str>,

    /// Timestamp header value, for providers that sign one.
    pub timestamp: Option<&'a str>,

    pub secret: &'a str,
}

/// Provider-specific authentication check.
pub trait SignatureVerifier: std::fmt::Debug + Send + Sync {
    fn verify(&self, input: &VerificationInput<'_>) -> VerificationResult;
}

/// GitHub `X-Hub-Signature` verification (HMAC-SHA1, hex, `sha1=` prefix).
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubSignatureVerifier;

impl SignatureVerifier for GithubSignatureVerifier {
    fn verify(&self, input: &VerificationInput<'_>) -> VerificationResult {
        let Some(signature) = input.token else {
            return VerificationResult::failure(MISSING_SIGNATURE);
        };
        if input.secret.is_empty() {
            return VerificationResult::failure(SECRET_NOT_CONFIGURED);
        }
        if !signature.starts_with(GITHUB_SIGNATURE_PREFIX) {
            return VerificationResult::failure(INVALID_SIGNATURE_FORMAT);
        }

        let expected = format!(
            "{}{}",
            GITHUB_SIGNATURE_PREFIX,
            hex::encode(hmac_sha1(input.secret.as_bytes(), input.payload))
        );
        if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            VerificationResult::success()
        } else {
            VerificationResult::failure(INVALID_SIGNATURE)
        }
    }
}

/// Gitee verification.
///
/// The `X-Gitee-Token` header carries either the plain password or, when
/// `X-Gitee-Timestamp` is present, a base64 HMAC-SHA256 of
/// `"{timestamp}\n{secret}"` keyed by the secret. A plain password match is
/// accepted first.
#[derive(Debug, Clone, Copy, Default)]
pub struct GiteeSignatureVerifier;

impl SignatureVerifier for GiteeSignatureVerifier {
    fn verify(&self, input: &VerificationInput<'_>) -> VerificationResult {
        let Some(token) = input.token else {
            return VerificationResult::failure(MISSING_SIGNATURE_OR_PASSWORD);
        };

        if constant_time_eq(token.as_bytes(), input.secret.as_bytes()) {
            return VerificationResult::success();
        }

        let Some(timestamp) = input.timestamp else {
            return VerificationResult::failure(INVALID_PASSWORD);
        };
        let Ok(timestamp) = timestamp.trim().parse::<i64>() else {
            return VerificationResult::failure(INVALID_TIMESTAMP_FORMAT);
        };

        let expected = gitee_signature(timestamp, input.secret);
        if constant_time_eq(expected.as_bytes(), token.as_bytes()) {
            VerificationResult::success()
        } else {
            VerificationResult::failure(INVALID_SIGNATURE)
        }
    }
}

/// Plain shared-token equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenVerifier;

impl SignatureVerifier for TokenVerifier {
    fn verify(&self, input: &VerificationInput<'_>) -> VerificationResult {
        let Some(token) = input.token else {
            return VerificationResult::failure(MISSING_TOKEN);
        };
        if constant_time_eq(token.as_bytes(), input.secret.as_bytes()) {
            VerificationResult::success()
        } else {
            VerificationResult::failure(INVALID_TOKEN)
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Gitee signature for a timestamp: base64(HMAC-SHA256(secret, "{ts}\n{secret}")).
pub fn gitee_signature(timestamp: i64, secret: &str) -> String {
    let string_to_sign = format!("{}\n{}", timestamp, secret);
    BASE64.encode(hmac_sha256(secret.as_bytes(), string_to_sign.as_bytes()))
}

fn hmac_sha1(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = match Hmac::<Sha1>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA1 accepts keys of any length"),
    };
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = match Hmac::<Sha256>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    };
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time byte comparison. Unequal lengths compare unequal immediately.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
#[path = "verifier_tests.rs"]
mod tests;
