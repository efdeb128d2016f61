//! Signed, time-bounded session tokens.
//!
//! Tokens use the compact JWT layout with HS256:
//! `base64url(header).base64url(payload).base64url(HMAC-SHA256(key, header "." payload))`.
//! The payload is the caller's [`Claims`] plus `iat`/`exp` in Unix seconds.
//!
//! Verification order is fixed: segment layout, signature (constant time),
//! header algorithm, payload decoding, expiry. Nothing from the payload is
//! trusted before the signature matches.

mod claims;
mod codec;
mod error;

pub use claims::{Claims, TokenHeader, VerifiedClaims, ALG_HS256, RESERVED_CLAIMS};
pub use error::TokenError;

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Minimum HMAC key length accepted by [`TokenService::new`].
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug)]
pub struct TokenService {
    key: SecretSlice<u8>,
    leeway_seconds: i64,
}

impl TokenService {
    /// # Errors
    ///
    /// Returns [`TokenError::WeakKey`] if `key` is shorter than [`MIN_SECRET_LEN`].
    pub fn new(key: SecretSlice<u8>) -> Result<Self, TokenError> {
        if key.expose_secret().len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakKey(MIN_SECRET_LEN));
        }
        Ok(Self {
            key,
            leeway_seconds: 0,
        })
    }

    /// Tolerate clocks running behind by up to `leeway` when checking expiry.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway_seconds = i64::try_from(leeway.as_secs()).unwrap_or(i64::MAX);
        self
    }

    #[must_use]
    pub fn leeway(&self) -> Duration {
        Duration::from_secs(self.leeway_seconds.unsigned_abs())
    }

    /// Issue a token valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::ReservedClaim`] if `claims.extra` sets a reserved
    /// name, or [`TokenError::InvalidTtl`] if `ttl` overflows the timestamp.
    pub fn issue(&self, claims: &Claims, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(claims, ttl, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Same as [`TokenService::issue`].
    pub fn issue_at(&self, claims: &Claims, ttl: Duration, now: i64) -> Result<String, TokenError> {
        if let Some(name) = claims.reserved_extra() {
            return Err(TokenError::ReservedClaim(name.to_string()));
        }
        let ttl_seconds = i64::try_from(ttl.as_secs()).map_err(|_| TokenError::InvalidTtl)?;
        let exp = now.checked_add(ttl_seconds).ok_or(TokenError::InvalidTtl)?;

        let payload = VerifiedClaims {
            claims: claims.clone(),
            iat: now,
            exp,
        };
        let header_b64 = codec::b64e_json(&TokenHeader::hs256())?;
        let payload_b64 = codec::b64e_json(&payload)?;
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature_b64 = codec::b64e(&self.sign(signing_input.as_bytes())?);

        debug!(sub = %claims.sub, role = %claims.role, exp, "issued session token");

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify `token` against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`], [`TokenError::SignatureMismatch`],
    /// [`TokenError::UnsupportedAlgorithm`] or [`TokenError::Expired`]; no
    /// claims are returned on any failure.
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify `token` as if the current time were `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Same as [`TokenService::verify`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<VerifiedClaims, TokenError> {
        let segments = codec::split(token)?;
        let signature = codec::b64d(segments.signature)?;

        let mut mac = self.mac()?;
        mac.update(segments.signing_input().as_bytes());
        if mac.verify_slice(&signature).is_err() {
            warn!("token signature mismatch");
            return Err(TokenError::SignatureMismatch);
        }

        let header: TokenHeader = codec::b64d_json(segments.header)?;
        if header.alg != ALG_HS256 {
            warn!(alg = %header.alg, "token signed with unsupported algorithm");
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let claims: VerifiedClaims = codec::b64d_json(segments.payload)?;
        if now >= claims.exp.saturating_add(self.leeway_seconds) {
            debug!(sub = %claims.claims.sub, exp = claims.exp, "token expired");
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        // HMAC accepts keys of any length; the length was checked in `new`.
        HmacSha256::new_from_slice(self.key.expose_secret())
            .map_err(|_| TokenError::WeakKey(MIN_SECRET_LEN))
    }

    fn sign(&self, input: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = self.mac()?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;
    const KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

    fn service() -> Result<TokenService, TokenError> {
        TokenService::new(SecretSlice::from(KEY.to_vec()))
    }

    fn claims() -> Claims {
        Claims::new("user-42", "admin").with_claim("email", "user@example.com")
    }

    #[test]
    fn issued_token_verifies_with_claims() -> Result<(), TokenError> {
        let service = service()?;
        let token = service.issue_at(&claims(), Duration::from_secs(3600), NOW)?;
        assert_eq!(token.split('.').count(), 3);

        let verified = service.verify_at(&token, NOW + 10)?;
        assert_eq!(verified.sub(), "user-42");
        assert_eq!(verified.role(), "admin");
        assert_eq!(verified.get("email"), Some(&json!("user@example.com")));
        assert_eq!(verified.iat, NOW);
        assert_eq!(verified.exp, NOW + 3600);
        Ok(())
    }

    #[test]
    fn segments_are_url_safe_and_unpadded() -> Result<(), TokenError> {
        let service = service()?;
        let token = service.issue_at(&claims(), Duration::from_secs(60), NOW)?;
        assert!(token
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')));

        let header: serde_json::Value = codec::b64d_json(token.split('.').next().unwrap_or(""))?;
        assert_eq!(header, json!({"alg": "HS256", "typ": "JWT"}));
        Ok(())
    }

    #[test]
    fn zero_ttl_is_expired_immediately() -> Result<(), TokenError> {
        let service = service()?;
        let token = service.issue(&claims(), Duration::ZERO)?;
        assert!(matches!(service.verify(&token), Err(TokenError::Expired)));
        Ok(())
    }

    #[test]
    fn expiry_boundary_and_leeway() -> Result<(), TokenError> {
        let token = service()?.issue_at(&claims(), Duration::from_secs(60), NOW)?;

        let strict = service()?;
        assert!(strict.verify_at(&token, NOW + 59).is_ok());
        assert!(matches!(
            strict.verify_at(&token, NOW + 60),
            Err(TokenError::Expired)
        ));

        let lenient = service()?.with_leeway(Duration::from_secs(30));
        assert!(lenient.verify_at(&token, NOW + 89).is_ok());
        assert!(matches!(
            lenient.verify_at(&token, NOW + 90),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn any_payload_mutation_is_a_signature_mismatch() -> Result<(), TokenError> {
        let service = service()?;
        let token = service.issue_at(&claims(), Duration::from_secs(3600), NOW)?;
        let header_len = token.find('.').unwrap_or(0) + 1;
        let payload_len = token[header_len..].find('.').unwrap_or(0);

        for idx in header_len..header_len + payload_len {
            let mut bytes = token.clone().into_bytes();
            bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap_or_default();
            assert!(
                matches!(
                    service.verify_at(&tampered, NOW),
                    Err(TokenError::SignatureMismatch)
                ),
                "mutation at byte {idx} was not rejected"
            );
        }
        Ok(())
    }

    #[test]
    fn forged_payload_with_reused_signature_is_rejected() -> Result<(), TokenError> {
        let service = service()?;
        let token = service.issue_at(&Claims::new("user-1", "guest"), Duration::from_secs(60), NOW)?;
        let parts: Vec<&str> = token.split('.').collect();

        let forged_payload = codec::b64e_json(&VerifiedClaims {
            claims: Claims::new("user-1", "admin"),
            iat: NOW,
            exp: NOW + 60,
        })?;
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(matches!(
            service.verify_at(&forged, NOW),
            Err(TokenError::SignatureMismatch)
        ));
        Ok(())
    }

    #[test]
    fn other_keys_do_not_verify() -> Result<(), TokenError> {
        let token = service()?.issue_at(&claims(), Duration::from_secs(60), NOW)?;
        let other = TokenService::new(SecretSlice::from(vec![7u8; 32]))?;
        assert!(matches!(
            other.verify_at(&token, NOW),
            Err(TokenError::SignatureMismatch)
        ));
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_rejected() -> Result<(), TokenError> {
        let service = service()?;
        let token = service.issue_at(&claims(), Duration::from_secs(60), NOW)?;
        let cases = [
            String::new(),
            "only.two".to_string(),
            format!("{token}.extra"),
            format!("{token}*"),
            token.replace('-', "+").replace('_', "/") + "==",
        ];
        for case in cases {
            assert!(
                matches!(service.verify_at(&case, NOW), Err(TokenError::Malformed)),
                "{case:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn non_hs256_header_is_rejected_even_when_signed() -> Result<(), TokenError> {
        let service = service()?;
        let header = codec::b64e_json(&json!({"alg": "none", "typ": "JWT"}))?;
        let payload = codec::b64e_json(&VerifiedClaims {
            claims: claims(),
            iat: NOW,
            exp: NOW + 60,
        })?;
        let input = format!("{header}.{payload}");
        let signature = codec::b64e(&service.sign(input.as_bytes())?);
        let token = format!("{input}.{signature}");

        assert!(matches!(
            service.verify_at(&token, NOW),
            Err(TokenError::UnsupportedAlgorithm(alg)) if alg == "none"
        ));
        Ok(())
    }

    #[test]
    fn reserved_extra_claims_are_refused() -> Result<(), TokenError> {
        let service = service()?;
        let result = service.issue_at(
            &Claims::new("u", "r").with_claim("exp", NOW + 999_999),
            Duration::from_secs(60),
            NOW,
        );
        assert!(matches!(result, Err(TokenError::ReservedClaim(name)) if name == "exp"));
        Ok(())
    }

    #[test]
    fn short_keys_are_refused() {
        let result = TokenService::new(SecretSlice::from(vec![1u8; MIN_SECRET_LEN - 1]));
        assert!(matches!(result, Err(TokenError::WeakKey(MIN_SECRET_LEN))));
    }
}
