//! Signed claim codec
//!
//! Wraps `jsonwebtoken` (HS256). Expiry is evaluated against the caller's
//! clock instead of the library's wall clock, so every time window in the
//! service is measured on the same scale.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use sk_shared::config::JwtConfig;

use crate::domain::entities::token::{TokenClaims, TokenKind};
use crate::errors::{DomainError, DomainResult, TokenError};

/// Encodes and decodes signed token claim sets
#[derive(Clone)]
pub struct ClaimCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    unverified: Validation,
    issuer: String,
    audience: String,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl ClaimCodec {
    /// Creates a codec from the JWT configuration
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss", "aud"]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let mut unverified = Validation::new(Algorithm::HS256);
        unverified.insecure_disable_signature_validation();
        unverified.validate_exp = false;
        unverified.validate_aud = false;
        unverified.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            header: Header::new(Algorithm::HS256),
            validation,
            unverified,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: config.access_token_expiry,
            refresh_ttl: config.refresh_token_expiry,
        }
    }

    /// Generates a fresh opaque session identifier
    pub fn new_session_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Access token lifetime in seconds
    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_ttl
    }

    /// Mints a signed token issued at `now`
    ///
    /// A refresh token without `session_id` starts a new session; an access
    /// token without one is minted sessionless.
    pub fn encode(
        &self,
        kind: TokenKind,
        user_id: Uuid,
        session_id: Option<&str>,
        extra: Map<String, Value>,
        now: i64,
    ) -> DomainResult<(String, TokenClaims)> {
        let session_id = match (kind, session_id) {
            (_, Some(sid)) => Some(sid.to_string()),
            (TokenKind::Refresh, None) => Some(Self::new_session_id()),
            (TokenKind::Access, None) => None,
        };
        let lifetime = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let mut claims =
            TokenClaims::new(kind, user_id, session_id, now, lifetime).with_extra(extra);
        claims.iss = self.issuer.clone();
        claims.aud = self.audience.clone();

        let token = encode(&self.header, &claims, &self.encoding_key).map_err(|e| {
            DomainError::Internal {
                message: format!("Failed to sign token: {}", e),
            }
        })?;
        Ok((token, claims))
    }

    /// Mints an access token bound to the same session and user as `refresh`
    pub fn derive_access(
        &self,
        refresh: &TokenClaims,
        now: i64,
    ) -> DomainResult<(String, TokenClaims)> {
        let user_id = refresh.user_id().ok_or(TokenError::TokenInvalid)?;
        self.encode(
            TokenKind::Access,
            user_id,
            refresh.session_id(),
            refresh.extra.clone(),
            now,
        )
    }

    /// Full check: signature, structure, issuer, audience, required claims
    /// and expiry at `now`
    pub fn decode_verified(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(kind = ?e.kind(), "Token failed verification");
                TokenError::TokenInvalid
            })?
            .claims;

        if claims.is_expired_at(now) {
            debug!(exp = claims.exp, now, "Token expired");
            return Err(TokenError::TokenInvalid);
        }
        if claims.user_id().is_none() {
            debug!("Token subject is not a user id");
            return Err(TokenError::TokenInvalid);
        }
        Ok(claims)
    }

    /// Structure-only decode used to read `sid`/`iat` before the verified
    /// path. The result is untrusted and must never authenticate anything.
    pub fn decode_unverified(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.unverified)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(kind = ?e.kind(), "Token is malformed");
                TokenError::TokenInvalid
            })
    }
}
