//! Mock implementations for testing the session token service

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Map;
use uuid::Uuid;

use sk_shared::config::{JwtConfig, RotationConfig};

use crate::domain::entities::account::Account;
use crate::errors::BackendError;
use crate::repositories::MockAccountRepository;
use crate::services::session::{
    ClaimCodec, Clock, DistributedLock, LockLease, SessionCache, SessionTokenConfig,
    SessionTokenService,
};

pub const T0: i64 = 1_700_000_000;
pub const SECRET: &str = "test-secret";

/// Clock that only moves when told to
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// In-memory cache whose TTLs run on a `ManualClock`, with a lock table
/// on real time so waiters can actually block
pub struct MockSessionCache {
    clock: Arc<ManualClock>,
    entries: Mutex<HashMap<String, (String, i64)>>,
    locks: Mutex<HashMap<String, (String, Instant)>>,
    writes: Mutex<Vec<String>>,
    after_write: Mutex<Option<(String, String, String)>>,
    unavailable: AtomicBool,
}

impl MockSessionCache {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            after_write: Mutex::new(None),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail as if the cache were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Once a key containing `fragment` is written, store `value` at `key`
    /// without expiry, as another process would between two of the
    /// service's writes
    pub fn interleave_after_write(&self, fragment: &str, key: &str, value: &str) {
        *self.after_write.lock().unwrap() =
            Some((fragment.to_string(), key.to_string(), value.to_string()));
    }

    /// Number of writes to keys containing `fragment`
    pub fn write_count(&self, fragment: &str) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|key| key.contains(fragment))
            .count()
    }

    /// Raw value, ignoring expiry
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, expires)| *expires > Instant::now())
            .unwrap_or(false)
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Cache("mock cache offline".to_string()));
        }
        Ok(())
    }

    fn try_lock(&self, key: &str, hold: Duration) -> Option<LockLease> {
        let mut locks = self.locks.lock().unwrap();
        let now = Instant::now();
        if let Some((_, expires)) = locks.get(key) {
            if *expires > now {
                return None;
            }
        }
        let token = Uuid::new_v4().to_string();
        locks.insert(key.to_string(), (token.clone(), now + hold));
        Some(LockLease {
            key: key.to_string(),
            token,
        })
    }
}

#[async_trait]
impl SessionCache for MockSessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.check_available()?;
        let now = self.clock.now();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|(_, expires_at)| now < *expires_at)
            .map(|(value, _)| value.clone()))
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), BackendError> {
        self.check_available()?;
        let expires_at = self.clock.now() + ttl_seconds as i64;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
        self.writes.lock().unwrap().push(key.to_string());

        let mut hook = self.after_write.lock().unwrap();
        if hook.as_ref().is_some_and(|(fragment, _, _)| key.contains(fragment.as_str())) {
            if let Some((_, other_key, other_value)) = hook.take() {
                self.entries
                    .lock()
                    .unwrap()
                    .insert(other_key, (other_value, i64::MAX));
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        self.check_available()?;
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn advance_cutover(
        &self,
        key: &str,
        value: i64,
        ttl_seconds: u64,
    ) -> Result<bool, BackendError> {
        self.check_available()?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();

        let current = entries
            .get(key)
            .filter(|(_, expires_at)| now < *expires_at)
            .map(|(raw, _)| raw.clone());
        if let Some(raw) = current {
            let stored = raw.trim().parse::<i64>().map_err(|_| BackendError::Corrupt {
                key: key.to_string(),
            })?;
            if stored == 0 {
                return Ok(false);
            }
            if stored >= value {
                return Ok(true);
            }
        }

        entries.insert(key.to_string(), (value.to_string(), now + ttl_seconds as i64));
        self.writes.lock().unwrap().push(key.to_string());
        Ok(true)
    }
}

#[async_trait]
impl DistributedLock for MockSessionCache {
    async fn acquire(
        &self,
        key: &str,
        hold_timeout: Duration,
        wait_timeout: Duration,
    ) -> Result<Option<LockLease>, BackendError> {
        let deadline = Instant::now() + wait_timeout;
        loop {
            self.check_available()?;
            if let Some(lease) = self.try_lock(key, hold_timeout) {
                return Ok(Some(lease));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn release(&self, lease: &LockLease) -> Result<bool, BackendError> {
        self.check_available()?;
        let mut locks = self.locks.lock().unwrap();
        match locks.get(&lease.key) {
            Some((token, _)) if *token == lease.token => {
                locks.remove(&lease.key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig::new(SECRET.to_string())
}

pub fn test_config(rotation: RotationConfig) -> SessionTokenConfig {
    SessionTokenConfig::new(jwt_config(), rotation)
}

pub type TestService = SessionTokenService<MockSessionCache, MockAccountRepository>;

/// Everything a service test needs, sharing one clock
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub cache: Arc<MockSessionCache>,
    pub accounts: Arc<MockAccountRepository>,
    pub service: TestService,
    pub account: Account,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_rotation(RotationConfig::default())
    }

    pub fn with_rotation(rotation: RotationConfig) -> Self {
        Self::with_config(test_config(rotation))
    }

    pub fn with_config(config: SessionTokenConfig) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let cache = Arc::new(MockSessionCache::new(Arc::clone(&clock)));
        let account = Account::new(Uuid::new_v4());
        let accounts = Arc::new(MockAccountRepository::with_account(account.clone()));
        let service = SessionTokenService::with_clock(
            Arc::clone(&cache),
            Arc::clone(&accounts),
            config,
            clock.clone(),
        );
        Self {
            clock,
            cache,
            accounts,
            service,
            account,
        }
    }

    /// A codec sharing the service's signing settings
    pub fn codec(&self) -> ClaimCodec {
        ClaimCodec::new(&self.service.config().jwt)
    }

    /// Mints an access token without a session, as issued before sessions existed
    pub fn sessionless_access_token(&self) -> String {
        let (token, _) = self
            .codec()
            .encode(
                crate::domain::entities::token::TokenKind::Access,
                self.account.id,
                None,
                Map::new(),
                self.clock.now(),
            )
            .unwrap();
        token
    }
}
