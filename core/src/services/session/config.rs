//! Configuration for the session token service

use std::time::Duration;

use sk_shared::config::{AppConfig, JwtConfig, RotationConfig};

/// Configuration for the session token service
#[derive(Debug, Clone, Default)]
pub struct SessionTokenConfig {
    /// Signing and lifetime settings
    pub jwt: JwtConfig,
    /// Rotation, grace window and lock settings
    pub rotation: RotationConfig,
    /// Namespace prepended to every cache key
    pub key_prefix: Option<String>,
}

impl SessionTokenConfig {
    /// Create a configuration from its parts
    pub fn new(jwt: JwtConfig, rotation: RotationConfig) -> Self {
        Self {
            jwt,
            rotation,
            key_prefix: None,
        }
    }

    /// Set the cache key namespace
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Grace window in seconds
    pub fn grace_period_seconds(&self) -> u64 {
        self.rotation.grace_period_seconds
    }

    /// Refresh token lifetime in seconds, also the revocation record TTL
    pub fn refresh_lifetime_seconds(&self) -> u64 {
        self.jwt.refresh_token_expiry.max(0) as u64
    }

    /// Lease ceiling of the refresh lock
    pub fn lock_hold_timeout(&self) -> Duration {
        Duration::from_secs(self.rotation.lock_hold_timeout_seconds)
    }

    /// Maximum wait for the refresh lock
    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.rotation.lock_wait_timeout_seconds)
    }
}

impl From<&AppConfig> for SessionTokenConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            jwt: config.auth.jwt.clone(),
            rotation: config.auth.rotation.clone(),
            key_prefix: config.cache.key_prefix.clone(),
        }
    }
}
