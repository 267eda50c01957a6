//! Account repository trait: the token service's view of the account store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::account::Account;
use crate::errors::DomainError;

/// Repository trait for the account fields the token lifecycle consumes
///
/// The account subsystem owns the records. The token service reads the
/// active flag and `revoked_since`, and asks the store to move
/// `revoked_since` forward when every session of an account is revoked.
///
/// # Failure semantics
/// Implementations must report store outages as errors rather than `None`;
/// an absent account is treated as revoked, an unreachable store as
/// "revocation status unknown".
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by its unique identifier
    ///
    /// # Returns
    /// * `Ok(Some(Account))` - Account found, active or not
    /// * `Ok(None)` - No account with given ID
    /// * `Err(DomainError)` - Store error occurred
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DomainError>;

    /// Durably record that every token issued before `at` is revoked
    ///
    /// # Returns
    /// * `Ok(true)` - Account updated
    /// * `Ok(false)` - No account with given ID
    /// * `Err(DomainError)` - Store error occurred
    async fn set_revoked_since(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError>;

    /// Find an account only if it is active
    ///
    /// # Returns
    /// * `Ok(Some(Account))` - Active account
    /// * `Ok(None)` - Account missing or inactive
    /// * `Err(DomainError)` - Store error occurred
    async fn find_active(&self, id: Uuid) -> Result<Option<Account>, DomainError> {
        Ok(self.find_by_id(id).await?.filter(|account| account.is_active))
    }
}
