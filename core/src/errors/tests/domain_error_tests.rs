//! Unit tests for domain error types

use sk_shared::errors::ErrorResponse;

use crate::errors::{AuthError, BackendError, DomainError, SessionError, TokenError};

#[test]
fn test_token_errors_end_session() {
    let invalid = DomainError::from(TokenError::TokenInvalid);
    let revoked = DomainError::from(TokenError::TokenRevoked);

    assert!(invalid.ends_session());
    assert!(revoked.ends_session());
    assert!(!invalid.is_retryable());
    assert_eq!(invalid.error_code(), "TOKEN_INVALID");
    assert_eq!(revoked.error_code(), "TOKEN_REVOKED");
}

#[test]
fn test_contention_is_retryable_and_keeps_session() {
    let err = DomainError::from(SessionError::LockContention);

    assert!(err.is_retryable());
    assert!(!err.ends_session());
    assert_eq!(err.error_code(), "SESSION_BUSY");
}

#[test]
fn test_backend_error_becomes_retryable_unavailable() {
    let err = DomainError::from(BackendError::Cache("connection refused".to_string()));

    assert!(err.is_retryable());
    assert_eq!(err.error_code(), "SERVICE_UNAVAILABLE");
    assert!(matches!(
        err,
        DomainError::Session(SessionError::BackendUnavailable(BackendError::Cache(_)))
    ));
}

#[test]
fn test_error_response_never_leaks_backend_text() {
    let err = DomainError::from(BackendError::Cache("redis://secret@host refused".to_string()));
    let response = ErrorResponse::from(&err);

    assert_eq!(response.error, "SERVICE_UNAVAILABLE");
    assert!(response.retryable);
    assert!(!response.message.contains("redis"));
}

#[test]
fn test_internal_error_response_is_generic() {
    let err = DomainError::Internal {
        message: "refresh task panicked".to_string(),
    };
    let response = ErrorResponse::from(&err);

    assert_eq!(response.error, "INTERNAL_ERROR");
    assert_eq!(response.message, "Internal error");
    assert!(!response.retryable);
}

#[test]
fn test_account_inactive_response() {
    let err = DomainError::from(AuthError::AccountInactive);
    let response = ErrorResponse::from(&err);

    assert_eq!(response.error, "ACCOUNT_INACTIVE");
    assert!(err.ends_session());
}
