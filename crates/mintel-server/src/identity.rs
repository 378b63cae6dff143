//! Caller identity for the research endpoints.
//!
//! The intake token is a JWT issued by the auth provider. With a shared
//! secret its HS256 signature and expiry are checked here; in trust mode the
//! payload is only decoded because a gateway in front already verified it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use mintel_core::AuthMode;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no access_token provided")]
    Missing,
    #[error("invalid access token: {0}")]
    Invalid(&'static str),
    #[error("access token expired")]
    Expired,
    #[error("token verification is not configured on the server")]
    Unconfigured,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

#[derive(Deserialize)]
struct Claims {
    sub: Option<String>,
    exp: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct IdentityVerifier {
    mode: AuthMode,
}

impl IdentityVerifier {
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self { mode }
    }

    /// Returns the token's `sub` claim.
    ///
    /// # Errors
    ///
    /// [`IdentityError::Unconfigured`] when neither verification mode is
    /// set; otherwise the reason the token was rejected.
    pub fn subject(&self, token: &str) -> Result<String, IdentityError> {
        self.subject_at(token, Utc::now().timestamp())
    }

    fn subject_at(&self, token: &str, now: i64) -> Result<String, IdentityError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(IdentityError::Missing);
        }
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(IdentityError::Invalid("expected three dot-separated segments"));
        };

        match &self.mode {
            AuthMode::Unconfigured => return Err(IdentityError::Unconfigured),
            AuthMode::TrustUpstream => {}
            AuthMode::Hs256 { secret } => {
                let header: Header = decode_segment(header)?;
                if header.alg != "HS256" {
                    return Err(IdentityError::Invalid("unsupported signing algorithm"));
                }
                let signature = decode_bytes(signature)?;
                let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                    .map_err(|_| IdentityError::Invalid("unusable signing key"))?;
                mac.update(token[..header_and_payload_len(token)].as_bytes());
                mac.verify_slice(&signature)
                    .map_err(|_| IdentityError::Invalid("signature mismatch"))?;
            }
        }

        let claims: Claims = decode_segment(payload)?;
        match (&self.mode, claims.exp) {
            (_, Some(exp)) if exp <= now => return Err(IdentityError::Expired),
            (AuthMode::Hs256 { .. }, None) => {
                return Err(IdentityError::Invalid("missing exp claim"));
            }
            _ => {}
        }
        claims
            .sub
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .ok_or(IdentityError::Invalid("missing sub claim"))
    }
}

/// Length of `header.payload`, the signed part of a compact JWT.
fn header_and_payload_len(token: &str) -> usize {
    token.rfind('.').unwrap_or(token.len())
}

fn decode_bytes(segment: &str) -> Result<Vec<u8>, IdentityError> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|_| IdentityError::Invalid("segment is not base64url"))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, IdentityError> {
    let bytes = decode_bytes(segment)?;
    serde_json::from_slice(&bytes).map_err(|_| IdentityError::Invalid("segment is not JSON"))
}

/// Signs `claims` with HS256. Used by tests and local tooling.
#[cfg(test)]
pub(crate) fn sign_hs256(claims: &serde_json::Value, secret: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{header}.{payload}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{signing_input}.{signature}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn hs256() -> IdentityVerifier {
        IdentityVerifier::new(AuthMode::Hs256 {
            secret: "shh".to_owned(),
        })
    }

    #[test]
    fn verified_token_yields_subject() {
        let token = sign_hs256(&json!({ "sub": "user-1", "exp": NOW + 60 }), "shh");
        assert_eq!(hs256().subject_at(&token, NOW).unwrap(), "user-1");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_hs256(&json!({ "sub": "user-1", "exp": NOW + 60 }), "other");
        assert_eq!(
            hs256().subject_at(&token, NOW),
            Err(IdentityError::Invalid("signature mismatch"))
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = sign_hs256(&json!({ "sub": "user-1", "exp": NOW + 60 }), "shh");
        let forged = URL_SAFE_NO_PAD.encode(json!({ "sub": "admin", "exp": NOW + 60 }).to_string());
        let parts: Vec<&str> = token.split('.').collect();
        let tampered = format!("{}.{forged}.{}", parts[0], parts[2]);
        assert!(hs256().subject_at(&tampered, NOW).is_err());
    }

    #[test]
    fn expired_and_unbounded_tokens_are_rejected() {
        let expired = sign_hs256(&json!({ "sub": "user-1", "exp": NOW - 1 }), "shh");
        assert_eq!(hs256().subject_at(&expired, NOW), Err(IdentityError::Expired));

        let no_exp = sign_hs256(&json!({ "sub": "user-1" }), "shh");
        assert_eq!(
            hs256().subject_at(&no_exp, NOW),
            Err(IdentityError::Invalid("missing exp claim"))
        );
    }

    #[test]
    fn trust_mode_decodes_without_signature() {
        let token = sign_hs256(&json!({ "sub": "user-9" }), "anything");
        let verifier = IdentityVerifier::new(AuthMode::TrustUpstream);
        assert_eq!(verifier.subject_at(&token, NOW).unwrap(), "user-9");
    }

    #[test]
    fn unconfigured_and_malformed() {
        let verifier = IdentityVerifier::new(AuthMode::Unconfigured);
        assert_eq!(
            verifier.subject_at("a.b.c", NOW),
            Err(IdentityError::Unconfigured)
        );
        assert_eq!(verifier.subject_at("  ", NOW), Err(IdentityError::Missing));
        assert!(matches!(
            hs256().subject_at("not-a-jwt", NOW),
            Err(IdentityError::Invalid(_))
        ));
    }

    #[test]
    fn missing_subject_is_rejected() {
        let token = sign_hs256(&json!({ "exp": NOW + 60 }), "shh");
        assert_eq!(
            hs256().subject_at(&token, NOW),
            Err(IdentityError::Invalid("missing sub claim"))
        );
    }
}
