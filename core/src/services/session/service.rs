//! Session token service implementation

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::entities::account::Account;
use crate::domain::entities::token::{TokenClaims, TokenKind, TokenPair};
use crate::errors::{AuthError, DomainError, DomainResult, SessionError, TokenError};
use crate::repositories::AccountRepository;

use super::cache::{DistributedLock, SessionCache};
use super::clock::{Clock, SystemClock};
use super::codec::ClaimCodec;
use super::config::SessionTokenConfig;
use super::stores::{CacheKeys, GraceCache, RevocationStore, WhitelistStore, SESSION_REVOKED};

/// Issues, verifies, rotates and revokes session-bound token pairs
///
/// Every field is shared, so clones are cheap and observe the same cache,
/// account store and clock.
pub struct SessionTokenService<C, A>
where
    C: SessionCache + DistributedLock + 'static,
    A: AccountRepository + 'static,
{
    cache: Arc<C>,
    accounts: Arc<A>,
    clock: Arc<dyn Clock>,
    codec: Arc<ClaimCodec>,
    revocations: RevocationStore<C>,
    whitelist: WhitelistStore<C>,
    grace: GraceCache<C>,
    keys: CacheKeys,
    config: Arc<SessionTokenConfig>,
}

impl<C, A> SessionTokenService<C, A>
where
    C: SessionCache + DistributedLock + 'static,
    A: AccountRepository + 'static,
{
    /// Creates a service on the system clock
    pub fn new(cache: Arc<C>, accounts: Arc<A>, config: SessionTokenConfig) -> Self {
        Self::with_clock(cache, accounts, config, Arc::new(SystemClock))
    }

    /// Creates a service with an explicit clock
    pub fn with_clock(
        cache: Arc<C>,
        accounts: Arc<A>,
        config: SessionTokenConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let keys = CacheKeys::new(config.key_prefix.clone());
        let grace_ttl = config.grace_period_seconds();
        let revocation_ttl = config.refresh_lifetime_seconds();

        Self {
            revocations: RevocationStore::new(Arc::clone(&cache), keys.clone(), revocation_ttl),
            whitelist: WhitelistStore::new(Arc::clone(&cache), keys.clone(), grace_ttl),
            grace: GraceCache::new(Arc::clone(&cache), keys.clone(), grace_ttl),
            codec: Arc::new(ClaimCodec::new(&config.jwt)),
            config: Arc::new(config),
            cache,
            accounts,
            clock,
            keys,
        }
    }

    pub fn config(&self) -> &SessionTokenConfig {
        &self.config
    }

    /// Starts a new session for `account`
    ///
    /// # Errors
    /// * `AuthError::AccountInactive` - The account may not sign in
    pub fn issue(&self, account: &Account) -> DomainResult<TokenPair> {
        self.issue_with_claims(account, Map::new())
    }

    /// Starts a new session whose tokens all carry `extra` claims
    ///
    /// Extra claims colliding with registered names are dropped. No cache
    /// writes happen here; a session only touches the cache once it is
    /// rotated or revoked.
    pub fn issue_with_claims(
        &self,
        account: &Account,
        extra: Map<String, Value>,
    ) -> DomainResult<TokenPair> {
        if !account.is_active {
            warn!(user_id = %account.id, "Refusing to issue tokens for inactive account");
            return Err(AuthError::AccountInactive.into());
        }

        let now = self.clock.now();
        let (refresh_token, refresh_claims) =
            self.codec
                .encode(TokenKind::Refresh, account.id, None, extra, now)?;
        let (access_token, _) = self.codec.derive_access(&refresh_claims, now)?;
        let session_id = refresh_claims.sid.ok_or_else(|| DomainError::Internal {
            message: "Refresh token minted without a session id".to_string(),
        })?;

        info!(user_id = %account.id, session_id = %session_id, "Session issued");

        Ok(TokenPair::new(
            session_id,
            access_token,
            self.codec.access_ttl(),
            refresh_token,
            self.codec.refresh_ttl(),
        ))
    }

    /// Decides whether `claims` have been revoked
    ///
    /// Account-wide revocation applies to every token, with or without a
    /// session. Backend failures are returned as errors; callers choose how
    /// to fail closed.
    pub async fn is_revoked(&self, claims: &TokenClaims) -> DomainResult<bool> {
        let user_id = match claims.user_id() {
            Some(id) => id,
            None => return Ok(true),
        };

        match self.accounts.find_by_id(user_id).await? {
            None => {
                debug!(user_id = %user_id, "Token subject has no account");
                return Ok(true);
            }
            Some(account) if account.issued_before_revocation(claims.iat) => {
                debug!(user_id = %user_id, iat = claims.iat, "Token predates account-wide revocation");
                return Ok(true);
            }
            Some(_) => {}
        }

        let session_id = match claims.session_id() {
            Some(sid) => sid,
            None => return Ok(!self.accepts_sessionless()),
        };

        let enforce_at = match self.revocations.enforce_at(session_id).await? {
            None => return Ok(false),
            Some(enforce_at) => enforce_at,
        };
        if enforce_at == SESSION_REVOKED {
            return Ok(true);
        }
        if claims.iat >= enforce_at {
            return Ok(false);
        }

        let whitelisted = self.whitelist.contains(session_id, claims.iat).await?;
        Ok(!whitelisted)
    }

    fn accepts_sessionless(&self) -> bool {
        match self.config.rotation.legacy_sessionless_sunset {
            Some(sunset) => {
                let accepted = self.clock.now() < sunset;
                if accepted {
                    warn!(sunset, "Accepting sessionless token before legacy sunset");
                }
                accepted
            }
            None => false,
        }
    }

    /// Authenticates a request by its access token
    ///
    /// # Errors
    /// * `TokenError::TokenInvalid` - Malformed, expired, badly signed or not an access token
    /// * `TokenError::TokenRevoked` - Revoked, or revocation status could not be read
    pub async fn verify(&self, access_token: &str) -> DomainResult<TokenClaims> {
        let claims = self.codec.decode_verified(access_token, self.clock.now())?;
        if !claims.is_access() {
            debug!("Refresh token presented for verification");
            return Err(TokenError::TokenInvalid.into());
        }

        match self.is_revoked(&claims).await {
            Ok(false) => Ok(claims),
            Ok(true) => {
                debug!(session_id = ?claims.sid, "Access token revoked");
                Err(TokenError::TokenRevoked.into())
            }
            Err(e) => {
                warn!(session_id = ?claims.sid, error = %e, "Revocation status unavailable, rejecting token");
                Err(TokenError::TokenRevoked.into())
            }
        }
    }

    /// Exchanges a refresh token for a new pair
    ///
    /// Concurrent and retried calls presenting the same token within the
    /// grace period all receive the pair produced by the first of them.
    ///
    /// # Errors
    /// * `TokenError::TokenInvalid` - Malformed, expired, sessionless or revoked
    /// * `AuthError::AccountInactive` - Account deactivated since issuance
    /// * `SessionError::LockContention` - Another refresh of this session is in flight
    /// * `SessionError::BackendUnavailable` - Cache or account store unreachable
    pub async fn refresh(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        let raw = self.codec.decode_unverified(refresh_token)?;
        if !raw.is_refresh() {
            return Err(TokenError::TokenInvalid.into());
        }
        let session_id = raw.sid.clone().ok_or(TokenError::TokenInvalid)?;

        if self.is_revoked(&raw).await? {
            debug!(session_id = %session_id, "Revoked refresh token presented");
            return Err(TokenError::TokenInvalid.into());
        }

        let cached = self.grace.get(&session_id).await?;
        let claims = self.codec.decode_verified(refresh_token, self.clock.now())?;
        if claims.sid.as_deref() != Some(session_id.as_str()) {
            return Err(TokenError::TokenInvalid.into());
        }
        if let Some(pair) = cached {
            debug!(session_id = %session_id, "Refresh served from grace cache");
            return Ok(pair);
        }
        if self.is_revoked(&claims).await? {
            return Err(TokenError::TokenInvalid.into());
        }

        let lease = self
            .cache
            .acquire(
                &self.keys.lock(&session_id),
                self.config.lock_hold_timeout(),
                self.config.lock_wait_timeout(),
            )
            .await?
            .ok_or_else(|| {
                warn!(session_id = %session_id, "Refresh lock busy");
                SessionError::LockContention
            })?;

        // Runs detached so a dropped caller cannot leave the rotation half applied
        let service = self.clone();
        let task = tokio::spawn(async move {
            let result = service.rotate_locked(&session_id, &claims).await;
            if let Err(e) = service.cache.release(&lease).await {
                warn!(session_id = %session_id, error = %e, "Failed to release refresh lock");
            }
            result
        });

        task.await.map_err(|e| DomainError::Internal {
            message: format!("Refresh task failed: {}", e),
        })?
    }

    async fn rotate_locked(&self, session_id: &str, presented: &TokenClaims) -> DomainResult<TokenPair> {
        if self.is_revoked(presented).await? {
            return Err(TokenError::TokenInvalid.into());
        }
        if let Some(pair) = self.grace.get(session_id).await? {
            debug!(session_id = %session_id, "Concurrent refresh already rotated");
            return Ok(pair);
        }

        let user_id = presented.user_id().ok_or(TokenError::TokenInvalid)?;
        if self.accounts.find_active(user_id).await?.is_none() {
            warn!(user_id = %user_id, session_id = %session_id, "Refresh for inactive account");
            return Err(AuthError::AccountInactive.into());
        }

        let now = self.clock.now();
        let rotate = self.config.rotation.rotate_refresh_tokens;
        let pair = if rotate {
            let (refresh_token, refresh_claims) = self.codec.encode(
                TokenKind::Refresh,
                user_id,
                Some(session_id),
                presented.extra.clone(),
                now,
            )?;
            let (access_token, _) = self.codec.derive_access(&refresh_claims, now)?;
            TokenPair::new(
                session_id.to_string(),
                access_token,
                self.codec.access_ttl(),
                refresh_token,
                self.codec.refresh_ttl(),
            )
        } else {
            let (access_token, _) = self.codec.derive_access(presented, now)?;
            TokenPair::access_only(session_id.to_string(), access_token, self.codec.access_ttl())
        };

        // Grace, whitelist, cutover: a crash between any two leaves the old
        // token usable and racers served from the grace entry
        self.grace.put(session_id, &pair).await?;
        if rotate {
            self.whitelist.add(session_id, presented.iat).await?;
            // revoke_session takes no lock; never overwrite its sentinel
            if !self.revocations.advance(session_id, now).await? {
                warn!(session_id = %session_id, "Session revoked during rotation");
                return Err(TokenError::TokenInvalid.into());
            }
        }

        info!(user_id = %user_id, session_id = %session_id, rotated = rotate, "Session refreshed");
        Ok(pair)
    }

    /// Revokes every token of one session immediately
    pub async fn revoke_session(&self, session_id: &str) -> DomainResult<()> {
        self.revocations.revoke(session_id).await?;
        // Cached pair is dead under the sentinel
        self.grace.clear(session_id).await?;
        info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Revokes every token the account holds, on every device
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> DomainResult<()> {
        let now = self.clock.now();
        let at = Utc
            .timestamp_opt(now, 0)
            .single()
            .ok_or_else(|| DomainError::Internal {
                message: format!("Clock returned an invalid timestamp: {}", now),
            })?;

        if self.accounts.set_revoked_since(user_id, at).await? {
            info!(user_id = %user_id, revoked_since = %at, "All sessions revoked");
        } else {
            warn!(user_id = %user_id, "Revoke-all requested for unknown account");
        }
        Ok(())
    }

    /// Ends the session an access token belongs to
    pub async fn logout(&self, access_token: &str) -> DomainResult<()> {
        let claims = self.verify(access_token).await?;
        match claims.session_id() {
            Some(session_id) => self.revoke_session(session_id).await,
            None => {
                warn!(user_id = %claims.sub, "Logout with sessionless token; nothing to revoke");
                Ok(())
            }
        }
    }
}

impl<C, A> Clone for SessionTokenService<C, A>
where
    C: SessionCache + DistributedLock + 'static,
    A: AccountRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            accounts: Arc::clone(&self.accounts),
            clock: Arc::clone(&self.clock),
            codec: Arc::clone(&self.codec),
            revocations: self.revocations.clone(),
            whitelist: self.whitelist.clone(),
            grace: self.grace.clone(),
            keys: self.keys.clone(),
            config: Arc::clone(&self.config),
        }
    }
}
