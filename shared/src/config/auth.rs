//! Token signing and session rotation configuration

use serde::{Deserialize, Serialize};

/// JWT signing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// JWT secret key for signing tokens
    pub secret: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds; also the TTL of revocation records
    pub refresh_token_expiry: i64,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    #[serde(default = "default_audience")]
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::from(DEFAULT_SECRET),
            access_token_expiry: 900,     // 15 minutes
            refresh_token_expiry: 604800, // 7 days
            issuer: String::from("sessionkeep"),
            audience: default_audience(),
        }
    }
}

const DEFAULT_SECRET: &str = "your-secret-key-change-in-production";

impl JwtConfig {
    /// Create a new JWT configuration with secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }

    /// Check if using default secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }
}

/// Refresh rotation, grace window and per-session lock settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RotationConfig {
    /// How long a just-retired token stays usable, and how long the
    /// last refresh result is replayed to racing callers
    #[serde(default = "default_grace_period")]
    pub grace_period_seconds: u64,

    /// When false, refresh only ever returns a new access token
    #[serde(default = "default_rotate")]
    pub rotate_refresh_tokens: bool,

    /// Lease ceiling of the per-session refresh lock
    #[serde(default = "default_lock_hold")]
    pub lock_hold_timeout_seconds: u64,

    /// How long a racer waits for the refresh lock before giving up
    #[serde(default = "default_lock_wait")]
    pub lock_wait_timeout_seconds: u64,

    /// Epoch second until which tokens without a session claim are still
    /// honoured. `None` rejects them outright.
    #[serde(default)]
    pub legacy_sessionless_sunset: Option<i64>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            grace_period_seconds: default_grace_period(),
            rotate_refresh_tokens: default_rotate(),
            lock_hold_timeout_seconds: default_lock_hold(),
            lock_wait_timeout_seconds: default_lock_wait(),
            legacy_sessionless_sunset: None,
        }
    }
}

impl RotationConfig {
    /// Set the grace period in seconds
    pub fn with_grace_period(mut self, seconds: u64) -> Self {
        self.grace_period_seconds = seconds;
        self
    }

    /// Enable or disable refresh token rotation
    pub fn with_rotation(mut self, enabled: bool) -> Self {
        self.rotate_refresh_tokens = enabled;
        self
    }

    /// Set hold and wait timeouts of the refresh lock
    pub fn with_lock_timeouts(mut self, hold_seconds: u64, wait_seconds: u64) -> Self {
        self.lock_hold_timeout_seconds = hold_seconds;
        self.lock_wait_timeout_seconds = wait_seconds;
        self
    }

    /// Keep accepting sessionless tokens until `sunset` (epoch seconds)
    pub fn with_legacy_sunset(mut self, sunset: i64) -> Self {
        self.legacy_sessionless_sunset = Some(sunset);
        self
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,

    /// Rotation configuration
    #[serde(default)]
    pub rotation: RotationConfig,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = JwtConfig::default();
        let rotation_defaults = RotationConfig::default();

        Self {
            jwt: JwtConfig {
                secret: std::env::var("JWT_SECRET").unwrap_or(defaults.secret),
                access_token_expiry: env_or("JWT_ACCESS_TOKEN_EXPIRY", defaults.access_token_expiry),
                refresh_token_expiry: env_or(
                    "JWT_REFRESH_TOKEN_EXPIRY",
                    defaults.refresh_token_expiry,
                ),
                issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
                audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
            },
            rotation: RotationConfig {
                grace_period_seconds: env_or(
                    "TOKEN_GRACE_PERIOD_SECONDS",
                    rotation_defaults.grace_period_seconds,
                ),
                rotate_refresh_tokens: env_or(
                    "TOKEN_ROTATE_REFRESH_TOKENS",
                    rotation_defaults.rotate_refresh_tokens,
                ),
                lock_hold_timeout_seconds: env_or(
                    "TOKEN_LOCK_HOLD_TIMEOUT_SECONDS",
                    rotation_defaults.lock_hold_timeout_seconds,
                ),
                lock_wait_timeout_seconds: env_or(
                    "TOKEN_LOCK_WAIT_TIMEOUT_SECONDS",
                    rotation_defaults.lock_wait_timeout_seconds,
                ),
                legacy_sessionless_sunset: std::env::var("TOKEN_LEGACY_SESSIONLESS_SUNSET")
                    .ok()
                    .and_then(|v| v.parse().ok()),
            },
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_audience() -> String {
    String::from("sessionkeep-api")
}

fn default_grace_period() -> u64 {
    60
}

fn default_rotate() -> bool {
    true
}

fn default_lock_hold() -> u64 {
    5
}

fn default_lock_wait() -> u64 {
    1
}
