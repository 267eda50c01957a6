//! Unit tests for the account entity

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::domain::entities::account::Account;

#[test]
fn test_new_account_is_active_without_revocation() {
    let account = Account::new(Uuid::new_v4());

    assert!(account.is_active);
    assert!(account.revoked_since.is_none());
    assert!(!account.issued_before_revocation(0));
}

#[test]
fn test_issued_before_revocation_is_strict() {
    let mut account = Account::new(Uuid::new_v4());
    account.revoke_sessions_at(Utc.timestamp_opt(1_000, 0).unwrap());

    assert!(account.issued_before_revocation(999));
    assert!(!account.issued_before_revocation(1_000));
    assert!(!account.issued_before_revocation(1_001));
}

#[test]
fn test_deactivate() {
    let mut account = Account::new(Uuid::new_v4());
    account.deactivate();

    assert!(!account.is_active);
}
