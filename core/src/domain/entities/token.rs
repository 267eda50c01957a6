//! Token entities for session-bound JWT authentication.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Claim names owned by the codec; callers cannot override them through extras
pub const RESERVED_CLAIMS: [&str; 8] = ["token_type", "sub", "sid", "iat", "exp", "jti", "iss", "aud"];

/// Which half of a token pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential presented on every request
    Access,
    /// Longer-lived credential exchanged for fresh access tokens
    Refresh,
}

/// Claims structure for JWT payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Access or refresh
    pub token_type: TokenKind,

    /// Subject (user ID)
    pub sub: String,

    /// Session identifier shared by a refresh token and every access token
    /// derived from it. Absent only on tokens minted before sessions existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// Issued at timestamp (epoch seconds)
    pub iat: i64,

    /// Expiration timestamp (epoch seconds)
    pub exp: i64,

    /// JWT ID (unique identifier for the token)
    pub jti: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Caller-supplied claims carried by every token of the session
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Creates claims for a token issued at `issued_at` living `lifetime_seconds`
    ///
    /// Issuer and audience are left empty for the codec to stamp.
    pub fn new(
        token_type: TokenKind,
        user_id: Uuid,
        session_id: Option<String>,
        issued_at: i64,
        lifetime_seconds: i64,
    ) -> Self {
        Self {
            token_type,
            sub: user_id.to_string(),
            sid: session_id,
            iat: issued_at,
            exp: issued_at + lifetime_seconds,
            jti: Uuid::new_v4().to_string(),
            iss: String::new(),
            aud: String::new(),
            extra: Map::new(),
        }
    }

    /// Attaches extra claims, dropping any that collide with reserved names
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra
            .into_iter()
            .filter(|(key, _)| !RESERVED_CLAIMS.contains(&key.as_str()))
            .collect();
        self
    }

    /// Parses the user ID from the subject claim
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// Returns the session identifier, if the token carries one
    pub fn session_id(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// Checks whether the token has expired at `now` (epoch seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    /// Checks if this is an access token
    pub fn is_access(&self) -> bool {
        self.token_type == TokenKind::Access
    }

    /// Checks if this is a refresh token
    pub fn is_refresh(&self) -> bool {
        self.token_type == TokenKind::Refresh
    }
}

/// Result of issuing or refreshing a session
///
/// Serialized verbatim into the grace cache, so every racer replaying a
/// refresh observes byte-identical tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token; `None` when refresh rotation is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_in: Option<i64>,

    /// Session both tokens belong to
    pub session_id: String,
}

impl TokenPair {
    /// Creates a pair carrying both an access and a refresh token
    pub fn new(
        session_id: String,
        access_token: String,
        access_expires_in: i64,
        refresh_token: String,
        refresh_expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token: Some(refresh_token),
            access_expires_in,
            refresh_expires_in: Some(refresh_expires_in),
            session_id,
        }
    }

    /// Creates a result carrying only a new access token
    pub fn access_only(session_id: String, access_token: String, access_expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token: None,
            access_expires_in,
            refresh_expires_in: None,
            session_id,
        }
    }

    /// Whether this pair rotated the refresh token
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}
