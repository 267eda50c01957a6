//! Account view consumed by the token service.
//!
//! The account subsystem owns these records; tokens only read the active
//! flag and the account-wide revocation timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The slice of an account record the token lifecycle depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: Uuid,

    /// Whether the account may sign in and refresh
    pub is_active: bool,

    /// Every token issued before this instant is invalid ("log out everywhere")
    pub revoked_since: Option<DateTime<Utc>>,
}

impl Account {
    /// Creates an active account with no revocation in effect
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            is_active: true,
            revoked_since: None,
        }
    }

    /// Marks the account inactive
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Sets the account-wide revocation cutover
    pub fn revoke_sessions_at(&mut self, at: DateTime<Utc>) {
        self.revoked_since = Some(at);
    }

    /// Whether a token issued at `issued_at` (epoch seconds) predates the
    /// account-wide revocation
    pub fn issued_before_revocation(&self, issued_at: i64) -> bool {
        self.revoked_since
            .map(|since| issued_at < since.timestamp())
            .unwrap_or(false)
    }
}
