//! Typed stores over the shared session cache
//!
//! Each store owns its key naming and TTL policy. Absent keys are the
//! normal steady state; a value that cannot be parsed is reported as
//! `BackendError::Corrupt` so callers fail closed instead of treating it
//! as absent.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::entities::token::TokenPair;
use crate::errors::BackendError;

use super::cache::SessionCache;

/// `enforce_at` sentinel meaning the session is revoked unconditionally
pub const SESSION_REVOKED: i64 = 0;

/// Cache key builder, optionally namespaced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: Option<String>,
}

impl CacheKeys {
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()),
        }
    }

    fn make(&self, key: String) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key,
        }
    }

    pub fn revocation(&self, session_id: &str) -> String {
        self.make(format!("token_revocation:{}", session_id))
    }

    pub fn whitelist(&self, session_id: &str, issued_at: i64) -> String {
        self.make(format!("token_whitelist:{}:{}", session_id, issued_at))
    }

    pub fn grace(&self, session_id: &str) -> String {
        self.make(format!("token_grace:{}", session_id))
    }

    pub fn lock(&self, session_id: &str) -> String {
        self.make(format!("token_refresh_lock:{}", session_id))
    }
}

/// Session id -> `enforce_at` cutover
pub struct RevocationStore<C: SessionCache> {
    cache: Arc<C>,
    keys: CacheKeys,
    ttl_seconds: u64,
}

impl<C: SessionCache> RevocationStore<C> {
    /// `ttl_seconds` should be the refresh token lifetime, so a record
    /// outlives every token it could apply to
    pub fn new(cache: Arc<C>, keys: CacheKeys, ttl_seconds: u64) -> Self {
        Self {
            cache,
            keys,
            ttl_seconds,
        }
    }

    /// Current cutover for a session, if any
    pub async fn enforce_at(&self, session_id: &str) -> Result<Option<i64>, BackendError> {
        let key = self.keys.revocation(session_id);
        match self.cache.get(&key).await? {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|_| {
                warn!(key = %key, "Unparseable revocation record");
                BackendError::Corrupt { key }
            }),
        }
    }

    /// Moves the cutover to `enforce_at`
    pub async fn set_enforce_at(&self, session_id: &str, enforce_at: i64) -> Result<(), BackendError> {
        let key = self.keys.revocation(session_id);
        self.cache
            .set_with_expiry(&key, &enforce_at.to_string(), self.ttl_seconds)
            .await?;
        debug!(session_id = %session_id, enforce_at, "Cutover written");
        Ok(())
    }

    /// Moves the cutover forward to `enforce_at` unless the session was
    /// revoked in the meantime; returns `false` in that case
    pub async fn advance(&self, session_id: &str, enforce_at: i64) -> Result<bool, BackendError> {
        let key = self.keys.revocation(session_id);
        let advanced = self
            .cache
            .advance_cutover(&key, enforce_at, self.ttl_seconds)
            .await?;
        if advanced {
            debug!(session_id = %session_id, enforce_at, "Cutover advanced");
        }
        Ok(advanced)
    }

    /// Revokes every token of the session, whitelisted or not
    pub async fn revoke(&self, session_id: &str) -> Result<(), BackendError> {
        self.set_enforce_at(session_id, SESSION_REVOKED).await
    }
}

impl<C: SessionCache> Clone for RevocationStore<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            keys: self.keys.clone(),
            ttl_seconds: self.ttl_seconds,
        }
    }
}

/// (session id, issued_at) exemptions from the cutover
pub struct WhitelistStore<C: SessionCache> {
    cache: Arc<C>,
    keys: CacheKeys,
    ttl_seconds: u64,
}

impl<C: SessionCache> WhitelistStore<C> {
    pub fn new(cache: Arc<C>, keys: CacheKeys, ttl_seconds: u64) -> Self {
        Self {
            cache,
            keys,
            ttl_seconds,
        }
    }

    pub async fn contains(&self, session_id: &str, issued_at: i64) -> Result<bool, BackendError> {
        let key = self.keys.whitelist(session_id, issued_at);
        Ok(self.cache.get(&key).await?.is_some())
    }

    pub async fn add(&self, session_id: &str, issued_at: i64) -> Result<(), BackendError> {
        let key = self.keys.whitelist(session_id, issued_at);
        self.cache.set_with_expiry(&key, "1", self.ttl_seconds).await
    }
}

impl<C: SessionCache> Clone for WhitelistStore<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            keys: self.keys.clone(),
            ttl_seconds: self.ttl_seconds,
        }
    }
}

/// Session id -> last pair issued by a refresh
pub struct GraceCache<C: SessionCache> {
    cache: Arc<C>,
    keys: CacheKeys,
    ttl_seconds: u64,
}

impl<C: SessionCache> GraceCache<C> {
    pub fn new(cache: Arc<C>, keys: CacheKeys, ttl_seconds: u64) -> Self {
        Self {
            cache,
            keys,
            ttl_seconds,
        }
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<TokenPair>, BackendError> {
        let key = self.keys.grace(session_id);
        match self.cache.get(&key).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                warn!(key = %key, error = %e, "Unparseable grace entry");
                BackendError::Corrupt { key }
            }),
        }
    }

    pub async fn put(&self, session_id: &str, pair: &TokenPair) -> Result<(), BackendError> {
        let key = self.keys.grace(session_id);
        let value = serde_json::to_string(pair)
            .map_err(|e| BackendError::Cache(format!("Failed to serialize pair: {}", e)))?;
        self.cache.set_with_expiry(&key, &value, self.ttl_seconds).await
    }

    pub async fn clear(&self, session_id: &str) -> Result<bool, BackendError> {
        self.cache.delete(&self.keys.grace(session_id)).await
    }
}

impl<C: SessionCache> Clone for GraceCache<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            keys: self.keys.clone(),
            ttl_seconds: self.ttl_seconds,
        }
    }
}
