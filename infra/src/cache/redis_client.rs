//! Redis cache client implementation
//!
//! Provides a Redis client with a multiplexed connection, retry logic and
//! per-operation response timeouts. It backs the session cache (revocation
//! records, whitelist entries, grace pairs) and the per-session refresh lock.

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult, Script};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use sk_core::errors::BackendError;
use sk_core::services::session::{DistributedLock, LockLease, SessionCache};

use crate::cache::CacheConfig;
use crate::InfrastructureError;

/// Deletes the lock key only while it still holds the caller's lease token
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Takes the lock key, or confirms it is already held by this lease token,
/// so a retried attempt whose first reply was lost still acquires
const ACQUIRE_LOCK_SCRIPT: &str = r#"
local current = redis.call("GET", KEYS[1])
if current == ARGV[1] then
    return 1
elseif current then
    return 0
end
redis.call("SET", KEYS[1], ARGV[1], "PX", ARGV[2])
return 1
"#;

/// Raises an integer cutover without replacing the revoked sentinel 0
const ADVANCE_CUTOVER_SCRIPT: &str = r#"
local current = redis.call("GET", KEYS[1])
if current then
    local stored = tonumber(current)
    if not stored then
        return -1
    elseif stored == 0 then
        return 0
    elseif stored >= tonumber(ARGV[1]) then
        return 1
    end
end
redis.call("SET", KEYS[1], ARGV[1], "EX", ARGV[2])
return 1
"#;

const CUTOVER_REVOKED: i64 = 0;
const CUTOVER_CORRUPT: i64 = -1;

const LEASE_TOKEN_LEN: usize = 32;

/// Redis cache client with connection multiplexing and retry logic
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: CacheConfig,
    /// Idempotent set-if-absent script for lock acquisition
    acquire_script: Script,
    /// Compare-and-delete script for lock release
    release_script: Script,
    /// Compare-and-set script for session cutovers
    cutover_script: Script,
}

impl RedisClient {
    /// Create a new Redis client
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Redis client or error
    ///
    /// # Example
    /// ```no_run
    /// use sk_infra::cache::{CacheConfig, RedisClient};
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let config = CacheConfig::new("redis://localhost:6379");
    ///     let client = RedisClient::new(config).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        info!(
            "Creating Redis client with URL: {} (max_retries: {})",
            mask_url(&config.url),
            config.max_retries
        );

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection =
            Self::create_connection_with_retry(client, config.max_retries, config.retry_delay_ms)
                .await?;

        info!("Redis client created successfully");

        Ok(Self {
            connection,
            config,
            acquire_script: Script::new(ACQUIRE_LOCK_SCRIPT),
            release_script: Script::new(RELEASE_LOCK_SCRIPT),
            cutover_script: Script::new(ADVANCE_CUTOVER_SCRIPT),
        })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: Client,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            match client.get_multiplexed_async_connection().await {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    // Exponential backoff with cap at 5 seconds
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// Set a value with expiration time
    ///
    /// # Arguments
    /// * `key` - Cache key
    /// * `value` - Value to cache
    /// * `expiry_seconds` - Time to live in seconds
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<(), InfrastructureError> {
        debug!("Setting key '{}' with expiry {}s", key, expiry_seconds);

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                let value = value.to_string();
                // SETEX rejects a zero TTL
                let expiry = expiry_seconds.max(1);

                Box::pin(async move { conn.set_ex::<_, _, ()>(key, value, expiry).await })
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to set key '{}': {}", key, e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Get a value from cache
    ///
    /// # Returns
    /// * `Result<Option<String>, InfrastructureError>` - Cached value or None if not found
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        debug!("Getting key '{}'", key);

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.get::<_, Option<String>>(key).await })
            })
            .await;

        result.map_err(|e| {
            error!("Failed to get key '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// Delete a key from cache
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if key was deleted, false if not found
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        debug!("Deleting key '{}'", key);

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.del::<_, u32>(key).await })
            })
            .await;

        match result {
            Ok(deleted_count) => Ok(deleted_count > 0),
            Err(e) => {
                error!("Failed to delete key '{}': {}", key, e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Get time-to-live for a key
    ///
    /// # Returns
    /// * `Result<Option<i64>, InfrastructureError>` - TTL in seconds, None if key doesn't exist or has no expiry
    pub async fn ttl(&self, key: &str) -> Result<Option<i64>, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.ttl::<_, i64>(key).await })
            })
            .await;

        match result {
            Ok(ttl) if ttl >= 0 => Ok(Some(ttl)),
            Ok(_) => Ok(None),
            Err(e) => {
                error!("Failed to get TTL for key '{}': {}", key, e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let result = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await;

        match result {
            Ok(response) if response == "PONG" => Ok(true),
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Single acquisition attempt for `token`
    ///
    /// Returns `true` if the key was free or already held by `token`, so
    /// retrying after a lost reply never reports the caller's own lease as
    /// contention.
    pub async fn try_lock(&self, key: &str, token: &str, hold_ms: u64) -> Result<bool, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                let script = self.acquire_script.clone();
                let key = key.to_string();
                let token = token.to_string();

                Box::pin(async move {
                    script
                        .key(key)
                        .arg(token)
                        .arg(hold_ms)
                        .invoke_async::<_, i64>(&mut conn)
                        .await
                })
            })
            .await;

        match result {
            Ok(acquired) => Ok(acquired == 1),
            Err(e) => {
                error!("Failed to acquire lock '{}': {}", key, e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Take `key` for `hold_timeout`, polling until `wait_timeout` elapses
    pub async fn acquire_lock(
        &self,
        key: &str,
        hold_timeout: Duration,
        wait_timeout: Duration,
    ) -> Result<Option<LockLease>, InfrastructureError> {
        let token = generate_lease_token();
        let hold_ms = (hold_timeout.as_millis() as u64).max(1);
        let poll = Duration::from_millis(self.config.lock_poll_interval_ms.max(1));
        let deadline = Instant::now() + wait_timeout;

        loop {
            if self.try_lock(key, &token, hold_ms).await? {
                debug!("Acquired lock '{}' for {}ms", key, hold_ms);
                return Ok(Some(LockLease {
                    key: key.to_string(),
                    token,
                }));
            }

            let now = Instant::now();
            if now >= deadline {
                debug!("Lock '{}' still held after {:?}", key, wait_timeout);
                return Ok(None);
            }
            sleep(poll.min(deadline - now)).await;
        }
    }

    /// Release a lease if it still owns its key
    pub async fn release_lock(&self, lease: &LockLease) -> Result<bool, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                let script = self.release_script.clone();
                let key = lease.key.clone();
                let token = lease.token.clone();

                Box::pin(async move {
                    script
                        .key(key)
                        .arg(token)
                        .invoke_async::<_, i64>(&mut conn)
                        .await
                })
            })
            .await;

        match result {
            Ok(deleted) => {
                if deleted == 0 {
                    warn!("Lock '{}' expired before release", lease.key);
                }
                Ok(deleted > 0)
            }
            Err(e) => {
                error!("Failed to release lock '{}': {}", lease.key, e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Raise the cutover at `key` to `value` unless it holds the revoked sentinel
    ///
    /// Returns the script status: `1` applied or already newer, `0` revoked,
    /// `-1` stored value is not an integer.
    pub async fn advance_cutover(
        &self,
        key: &str,
        value: i64,
        expiry_seconds: u64,
    ) -> Result<i64, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                let script = self.cutover_script.clone();
                let key = key.to_string();

                Box::pin(async move {
                    script
                        .key(key)
                        .arg(value)
                        .arg(expiry_seconds.max(1))
                        .invoke_async::<_, i64>(&mut conn)
                        .await
                })
            })
            .await;

        result.map_err(|e| {
            error!("Failed to advance cutover '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// Execute a Redis operation with automatic retry logic
    ///
    /// Each attempt is bounded by the configured response timeout; retries
    /// use exponential backoff capped at 5 seconds.
    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(
            MultiplexedConnection,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = RedisResult<T>> + Send>>,
    {
        let mut attempts = 0;
        let mut delay = self.config.retry_delay_ms;
        let max_retries = self.config.max_retries.max(1);
        let response_timeout = Duration::from_secs(self.config.response_timeout.max(1));

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            let outcome = match timeout(response_timeout, operation(conn)).await {
                Ok(result) => result,
                Err(_) => Err(RedisError::from((
                    redis::ErrorKind::IoError,
                    "Redis response timed out",
                ))),
            };

            match outcome {
                Ok(result) => return Ok(result),
                Err(e) if attempts < max_retries && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!("Redis operation failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl SessionCache for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(RedisClient::get(self, key).await?)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), BackendError> {
        Ok(RedisClient::set_with_expiry(self, key, value, ttl_seconds).await?)
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        Ok(RedisClient::delete(self, key).await?)
    }

    async fn advance_cutover(
        &self,
        key: &str,
        value: i64,
        ttl_seconds: u64,
    ) -> Result<bool, BackendError> {
        match RedisClient::advance_cutover(self, key, value, ttl_seconds).await? {
            CUTOVER_CORRUPT => {
                warn!("Unparseable cutover at '{}'", key);
                Err(BackendError::Corrupt {
                    key: key.to_string(),
                })
            }
            CUTOVER_REVOKED => Ok(false),
            _ => Ok(true),
        }
    }
}

#[async_trait]
impl DistributedLock for RedisClient {
    async fn acquire(
        &self,
        key: &str,
        hold_timeout: Duration,
        wait_timeout: Duration,
    ) -> Result<Option<LockLease>, BackendError> {
        Ok(self.acquire_lock(key, hold_timeout, wait_timeout).await?)
    }

    async fn release(&self, lease: &LockLease) -> Result<bool, BackendError> {
        Ok(self.release_lock(lease).await?)
    }
}

/// Random token identifying one lock holder
pub(crate) fn generate_lease_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LEASE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Check if a Redis error is retriable
///
/// Determines if an error is transient and the operation should be retried.
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask sensitive parts of Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
