//! Capability traits over the shared cache backend

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::BackendError;

/// Key-value cache with per-key TTL
///
/// Shared by every process running the token service. Absent keys are a
/// normal steady state and must be reported as `Ok(None)`, never as errors.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Write a value that expires after `ttl_seconds`
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), BackendError>;

    /// Delete a value; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, BackendError>;

    /// Atomically raise the integer cutover stored at `key` to `value`
    ///
    /// The stored value is left alone when it is already `>= value`, and
    /// when it is `0` (revoked), so a concurrent revocation always wins.
    ///
    /// # Returns
    /// * `Ok(true)` - The cutover is now at least `value`
    /// * `Ok(false)` - The key holds the revoked sentinel
    /// * `Err(BackendError::Corrupt)` - The stored value is not an integer
    async fn advance_cutover(
        &self,
        key: &str,
        value: i64,
        ttl_seconds: u64,
    ) -> Result<bool, BackendError>;
}

/// A held lock: the key plus the random token proving ownership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub key: String,
    pub token: String,
}

/// Lease-based mutual exclusion across processes
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Try to take `key` for at most `hold_timeout`, waiting up to
    /// `wait_timeout` for the current holder.
    ///
    /// # Returns
    /// * `Ok(Some(LockLease))` - Lock acquired
    /// * `Ok(None)` - Still held by someone else after `wait_timeout`
    /// * `Err(BackendError)` - Backend failure
    async fn acquire(
        &self,
        key: &str,
        hold_timeout: Duration,
        wait_timeout: Duration,
    ) -> Result<Option<LockLease>, BackendError>;

    /// Release a lease if it still owns its key
    ///
    /// Returns `false` when the lease had already expired (and possibly
    /// been taken by someone else); the successor's lock is left untouched.
    async fn release(&self, lease: &LockLease) -> Result<bool, BackendError>;
}
