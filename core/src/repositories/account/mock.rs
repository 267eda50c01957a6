//! Mock implementation of AccountRepository for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::entities::account::Account;
use crate::errors::{BackendError, DomainError};

use super::r#trait::AccountRepository;

/// In-memory account store with an outage switch
pub struct MockAccountRepository {
    accounts: Arc<Mutex<HashMap<Uuid, Account>>>,
    unavailable: AtomicBool,
}

impl MockAccountRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Create a repository holding a single account
    pub fn with_account(account: Account) -> Self {
        let repo = Self::new();
        repo.insert(account);
        repo
    }

    /// Insert or replace an account
    pub fn insert(&self, account: Account) {
        self.accounts.lock().unwrap().insert(account.id, account);
    }

    /// Read back an account
    pub fn get(&self, id: Uuid) -> Option<Account> {
        self.accounts.lock().unwrap().get(&id).cloned()
    }

    /// Make every subsequent call fail as if the store were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::AccountStore("mock store offline".to_string()).into());
        }
        Ok(())
    }
}

impl Default for MockAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for MockAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DomainError> {
        self.check_available()?;
        Ok(self.get(id))
    }

    async fn set_revoked_since(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError> {
        self.check_available()?;
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.get_mut(&id) {
            Some(account) => {
                account.revoke_sessions_at(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
